//! Reading and writing the manifest object in a blob store.

use super::{Manifest, ManifestError, parse_manifest, to_json};
use crate::store::{BlobStore, StoreError};
use log::debug;
use std::io::{self, Read};

/// Content type the manifest object is written with.
pub const MANIFEST_CONTENT_TYPE: &str = "application/json";

/// Errors reading or writing the manifest object.
#[derive(Debug, thiserror::Error)]
pub enum RemoteManifestError {
    /// The store request failed for a reason other than absence.
    #[error("failed to fetch manifest {path}: {source}")]
    Store {
        /// Manifest object path.
        path: String,
        /// The store error.
        #[source]
        source: StoreError,
    },

    /// The manifest body could not be read.
    #[error("failed to read manifest {path}: {source}")]
    Read {
        /// Manifest object path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The manifest body is not a valid manifest.
    #[error("failed to decode manifest {path}: {source}")]
    Decode {
        /// Manifest object path.
        path: String,
        /// The decode error.
        #[source]
        source: ManifestError,
    },

    /// The encoded manifest could not be written back.
    #[error("failed to write manifest {path}: {source}")]
    Write {
        /// Manifest object path.
        path: String,
        /// The store error.
        #[source]
        source: StoreError,
    },

    /// The manifest could not be encoded.
    #[error("failed to encode manifest {path}: {source}")]
    Encode {
        /// Manifest object path.
        path: String,
        /// The encode error.
        #[source]
        source: ManifestError,
    },
}

/// The outcome of looking up a manifest object.
#[derive(Debug)]
pub enum ManifestLookup {
    /// The object exists and decoded cleanly.
    Found(Manifest),
    /// The object does not exist yet.
    NotFound,
    /// The lookup failed; publishing cannot continue.
    Failed(RemoteManifestError),
}

impl ManifestLookup {
    /// Turn the lookup into a manifest, synthesising an empty one named
    /// `name` when the object is absent.
    ///
    /// # Errors
    ///
    /// Returns the [`RemoteManifestError`] carried by
    /// [`ManifestLookup::Failed`].
    pub fn or_empty(self, name: &str) -> Result<Manifest, RemoteManifestError> {
        match self {
            Self::Found(manifest) => Ok(manifest),
            Self::NotFound => Ok(Manifest::new(name)),
            Self::Failed(err) => Err(err),
        }
    }
}

/// Fetch and decode the manifest at `path`.
#[must_use]
pub fn lookup_manifest<S: BlobStore + ?Sized>(
    store: &S,
    container: &str,
    path: &str,
) -> ManifestLookup {
    let mut reader = match store.get_object(container, path) {
        Ok(reader) => reader,
        Err(e) if e.is_not_found() => {
            debug!("no manifest at {container}/{path}");
            return ManifestLookup::NotFound;
        }
        Err(e) => {
            return ManifestLookup::Failed(RemoteManifestError::Store {
                path: path.to_owned(),
                source: e,
            });
        }
    };

    let mut body = String::new();
    if let Err(e) = reader.read_to_string(&mut body) {
        return ManifestLookup::Failed(RemoteManifestError::Read {
            path: path.to_owned(),
            source: e,
        });
    }
    match parse_manifest(&body) {
        Ok(manifest) => ManifestLookup::Found(manifest),
        Err(e) => ManifestLookup::Failed(RemoteManifestError::Decode {
            path: path.to_owned(),
            source: e,
        }),
    }
}

/// Fetch the manifest at `path`, or start an empty one named `box_name`.
///
/// # Errors
///
/// Returns a [`RemoteManifestError`] for any failure other than absence.
///
/// # Examples
///
/// ```
/// use boxpub::manifest::fetch_or_create;
/// use boxpub::store::memory::MemoryStore;
///
/// let store = MemoryStore::new();
/// let manifest = fetch_or_create(&store, "boxes", "demo.json", "acme/demo").unwrap();
/// assert_eq!(manifest.name(), "acme/demo");
/// assert!(manifest.versions().is_empty());
/// ```
pub fn fetch_or_create<S: BlobStore + ?Sized>(
    store: &S,
    container: &str,
    path: &str,
    box_name: &str,
) -> Result<Manifest, RemoteManifestError> {
    lookup_manifest(store, container, path).or_empty(box_name)
}

/// Encode `manifest` and write it to `path` as JSON.
///
/// # Errors
///
/// Returns a [`RemoteManifestError`] if encoding or the write fails.
pub fn put_manifest<S: BlobStore + ?Sized>(
    store: &S,
    container: &str,
    path: &str,
    manifest: &Manifest,
) -> Result<(), RemoteManifestError> {
    let json = to_json(manifest).map_err(|e| RemoteManifestError::Encode {
        path: path.to_owned(),
        source: e,
    })?;
    store
        .put_object(container, path, json.as_bytes(), MANIFEST_CONTENT_TYPE)
        .map_err(|e| RemoteManifestError::Write {
            path: path.to_owned(),
            source: e,
        })
}
