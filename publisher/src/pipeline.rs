//! Publication orchestrator.
//!
//! A publish is a fixed sequence of stages:
//!
//! ```text
//! Idle -> Validated -> ChecksumComputed -> Uploaded -> ManifestFetched
//!      -> ManifestMerged -> ManifestPublished -> Done
//! ```
//!
//! Each stage runs at most once and a failure stops the sequence. There is
//! no retry and no rollback: a box uploaded before a manifest failure stays
//! in the container, unreferenced. The returned [`PublishError`] names the
//! last stage that completed so the operator knows what already happened.
//!
//! The manifest is never locked. Two publishes for the same box family can
//! race and the last manifest write wins.

use camino::Utf8PathBuf;
use log::debug;
use std::fmt;
use std::fs;
use std::io::{self, Write};

use boxpub::checksum::{ChecksumError, Sha256Digest, compute_sha256};
use boxpub::deadline::{Deadline, DeadlineExceeded};
use boxpub::manifest::{
    Provider, ProviderChange, RemoteManifestError, VersionChoice, VersionError, fetch_or_create,
    put_manifest,
};
use boxpub::store::BlobStore;
use boxpub::upload::{ChunkedUploader, UploadError, UploadReport};

use crate::artifact::{Artifact, ArtifactError, BoxFile};
use crate::azure::AzureBlobStore;
use crate::error::PublisherError;
use crate::output::{human_size, success_message, write_stderr_line};
use crate::settings::PublishSettings;

/// The stages of a publish, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Nothing has happened yet.
    Idle,
    /// The artifact has the expected shape and the version is known.
    Validated,
    /// The box digest has been computed.
    ChecksumComputed,
    /// The box object has been committed.
    Uploaded,
    /// The current manifest has been read, or an empty one created.
    ManifestFetched,
    /// The provider entry has been merged into the manifest.
    ManifestMerged,
    /// The manifest has been written back.
    ManifestPublished,
    /// The publish finished.
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Validated => "validated",
            Self::ChecksumComputed => "checksum computed",
            Self::Uploaded => "uploaded",
            Self::ManifestFetched => "manifest fetched",
            Self::ManifestMerged => "manifest merged",
            Self::ManifestPublished => "manifest published",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// What went wrong in a failed stage.
#[derive(Debug, thiserror::Error)]
pub enum PublishFailure {
    /// The artifact is not a single box file.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// The box file could not be inspected.
    #[error("cannot read box file {path}: {source}")]
    Metadata {
        /// The box file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The configured version is unusable.
    #[error(transparent)]
    Version(#[from] VersionError),

    /// Reading or writing the manifest failed.
    #[error(transparent)]
    Manifest(#[from] RemoteManifestError),

    /// The box could not be hashed.
    #[error(transparent)]
    Checksum(#[from] ChecksumError),

    /// The box upload failed.
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// The overall publish deadline passed.
    #[error(transparent)]
    Deadline(#[from] DeadlineExceeded),
}

/// A failed publish and the last stage that completed before it.
#[derive(Debug, thiserror::Error)]
#[error("publish failed after stage '{completed}': {failure}")]
pub struct PublishError {
    /// The last stage that finished successfully.
    pub completed: Stage,
    /// The failure that stopped the publish.
    pub failure: Box<PublishFailure>,
}

impl PublishError {
    fn new(completed: Stage, failure: impl Into<PublishFailure>) -> Self {
        Self {
            completed,
            failure: Box::new(failure.into()),
        }
    }
}

/// The result of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    /// Public URL of the uploaded box.
    pub url: String,
    /// The version the box was published under.
    pub version: VersionChoice,
    /// The provider name recorded in the manifest.
    pub provider: String,
    /// Object path of the box inside the container.
    pub box_path: String,
    /// Digest recorded in the manifest.
    pub digest: Sha256Digest,
    /// Whether the provider entry was added or replaced.
    pub change: ProviderChange,
    /// Upload statistics.
    pub upload: UploadReport,
}

/// Inputs shared by every stage of one publish.
#[derive(Debug, Clone, Copy)]
pub struct PublishContext<'a> {
    /// Validated settings.
    pub settings: &'a PublishSettings,
    /// Overall deadline for the publish.
    pub deadline: Deadline,
    /// When true, suppress progress output.
    pub quiet: bool,
}

impl<'a> PublishContext<'a> {
    /// Build a context whose deadline starts now.
    #[must_use]
    pub fn new(settings: &'a PublishSettings, quiet: bool) -> Self {
        Self {
            settings,
            deadline: Deadline::from_budget(settings.publish_timeout),
            quiet,
        }
    }
}

/// Publish `artifact` to the Azure container described by `settings`.
///
/// # Errors
///
/// Returns [`PublisherError::Client`] if the store client cannot be built,
/// or [`PublisherError::Publish`] if any stage fails.
pub fn publish(
    settings: &PublishSettings,
    artifact: &Artifact,
    quiet: bool,
    stderr: &mut dyn Write,
) -> Result<PublishOutcome, PublisherError> {
    let store = AzureBlobStore::new(settings)?;
    let context = PublishContext::new(settings, quiet);
    Ok(publish_with(&context, &store, artifact, stderr)?)
}

/// Run the publish stages against an injected store.
///
/// # Errors
///
/// Returns a [`PublishError`] naming the last completed stage.
pub fn publish_with<S: BlobStore + ?Sized>(
    context: &PublishContext<'_>,
    store: &S,
    artifact: &Artifact,
    stderr: &mut dyn Write,
) -> Result<PublishOutcome, PublishError> {
    let mut run = Run {
        context,
        store,
        stderr,
    };
    run.execute(artifact)
}

struct Run<'a, 'w, S: BlobStore + ?Sized> {
    context: &'a PublishContext<'a>,
    store: &'a S,
    stderr: &'w mut dyn Write,
}

impl<S: BlobStore + ?Sized> Run<'_, '_, S> {
    fn execute(&mut self, artifact: &Artifact) -> Result<PublishOutcome, PublishError> {
        let settings = self.context.settings;
        let container = settings.container_name.as_str();

        // Idle -> Validated
        let box_file = self.validate(artifact)?;
        let provider = artifact.provider();
        let version = self.resolve_version()?;

        // Validated -> ChecksumComputed
        self.check_deadline(Stage::Validated, "computing the checksum")?;
        self.progress("Generating checksum");
        let digest = compute_sha256(box_file.path)
            .map_err(|e| PublishError::new(Stage::Validated, e))?;
        self.progress(format!("Checksum is {digest}"));

        // ChecksumComputed -> Uploaded
        self.check_deadline(Stage::ChecksumComputed, "uploading the box")?;
        let box_path = box_object_path(&settings.box_dir, &version, &box_file);
        let url = self.store.object_url(container, &box_path);
        self.progress(format!("Uploading box to {url}"));
        let upload = self.upload_box(&box_path, &box_file)?;
        debug!(
            "committed {} block(s), {} bytes, to {box_path}",
            upload.blocks, upload.bytes
        );

        // Uploaded -> ManifestFetched
        self.check_deadline(Stage::Uploaded, "fetching the manifest")?;
        self.progress("Fetching latest manifest");
        let mut manifest = fetch_or_create(
            self.store,
            container,
            &settings.manifest_path,
            &settings.box_name,
        )
        .map_err(|e| PublishError::new(Stage::Uploaded, e))?;

        // ManifestFetched -> ManifestMerged
        let version_string = version.as_version_string();
        self.progress(format!("Adding {provider} {version_string} box to manifest"));
        let change = manifest.add_provider(
            &version_string,
            Provider::sha256(provider, url.as_str(), &digest),
        );

        // ManifestMerged -> ManifestPublished
        self.check_deadline(Stage::ManifestMerged, "uploading the manifest")?;
        self.progress(format!("Uploading the manifest: {}", settings.manifest_path));
        put_manifest(self.store, container, &settings.manifest_path, &manifest)
            .map_err(|e| PublishError::new(Stage::ManifestMerged, e))?;

        self.progress(success_message(provider, &version_string, change));
        Ok(PublishOutcome {
            url,
            version,
            provider: provider.to_owned(),
            box_path,
            digest,
            change,
            upload,
        })
    }

    fn validate<'f>(&mut self, artifact: &'f Artifact) -> Result<BoxFile<'f>, PublishError> {
        self.check_deadline(Stage::Idle, "validating the artifact")?;
        let box_file = artifact
            .box_file()
            .map_err(|e| PublishError::new(Stage::Idle, e))?;
        let size = fs::metadata(box_file.path)
            .map_err(|e| {
                PublishError::new(
                    Stage::Idle,
                    PublishFailure::Metadata {
                        path: box_file.path.to_owned(),
                        source: e,
                    },
                )
            })?
            .len();
        self.progress(format!(
            "Preparing to upload box for '{}' provider to container '{}'",
            artifact.provider(),
            self.context.settings.container_name
        ));
        self.progress(format!(
            "Box to upload: {} ({})",
            box_file.path,
            human_size(size)
        ));
        Ok(box_file)
    }

    /// Use the configured version, or read the manifest and derive the next.
    ///
    /// Nothing has been written yet, so failures report [`Stage::Idle`].
    fn resolve_version(&mut self) -> Result<VersionChoice, PublishError> {
        let settings = self.context.settings;
        let choice = match settings.version.as_deref() {
            Some(explicit) => {
                VersionChoice::explicit(explicit).map_err(|e| PublishError::new(Stage::Idle, e))?
            }
            None => {
                self.check_deadline(Stage::Idle, "reading the manifest")?;
                let manifest = fetch_or_create(
                    self.store,
                    &settings.container_name,
                    &settings.manifest_path,
                    &settings.box_name,
                )
                .map_err(|e| PublishError::new(Stage::Idle, e))?;
                manifest
                    .resolve_version(None)
                    .map_err(|e| PublishError::new(Stage::Idle, e))?
            }
        };
        if choice.is_derived() {
            self.progress(format!("No version defined, using {choice} as new version"));
        } else {
            self.progress(format!("Using {choice} as new version"));
        }
        Ok(choice)
    }

    fn upload_box(
        &mut self,
        box_path: &str,
        box_file: &BoxFile<'_>,
    ) -> Result<UploadReport, PublishError> {
        let settings = self.context.settings;
        let mut uploader = ChunkedUploader::new(self.store, &settings.container_name)
            .with_deadline(self.context.deadline);
        if let Some(block_size) = settings.block_size {
            uploader = uploader.with_block_size(block_size);
        }
        uploader
            .upload_file(box_path, box_file.path)
            .map_err(|e| PublishError::new(Stage::ChecksumComputed, e))
    }

    fn check_deadline(&self, completed: Stage, operation: &str) -> Result<(), PublishError> {
        self.context
            .deadline
            .check(operation)
            .map_err(|e| PublishError::new(completed, e))
    }

    fn progress(&mut self, message: impl fmt::Display) {
        if !self.context.quiet {
            write_stderr_line(self.stderr, message);
        }
    }
}

/// Object path of the box: `<box_dir>/<version>/<file name>`.
fn box_object_path(box_dir: &str, version: &VersionChoice, box_file: &BoxFile<'_>) -> String {
    let dir = box_dir.trim_end_matches('/');
    format!("{dir}/{version}/{}", box_file.file_name)
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
