//! The box manifest: a named family of versions, each listing providers.
//!
//! On the wire the manifest is the JSON index Vagrant reads to resolve a box
//! name to a download URL:
//!
//! ```json
//! {
//!   "name": "acme/base",
//!   "versions": [
//!     {
//!       "version": "1.0.0",
//!       "providers": [
//!         {
//!           "name": "virtualbox",
//!           "url": "https://acct.blob.core.windows.net/boxes/base/1.0.0/base.box",
//!           "checksum_type": "sha256",
//!           "checksum": "..."
//!         }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Keys the model does not know are carried through untouched. A publish
//! mutates a manifest exactly once, through [`Manifest::add_provider`].

mod codec;
mod provider;
mod remote;
mod version;

pub use codec::{ManifestError, parse_manifest, to_json};
pub use provider::{Provider, provider_for_builder};
pub use remote::{
    MANIFEST_CONTENT_TYPE, ManifestLookup, RemoteManifestError, fetch_or_create, lookup_manifest,
    put_manifest,
};
pub use version::{BoxVersion, VersionChoice, VersionError};

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One version of the box family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    version: String,
    #[serde(default)]
    providers: Vec<Provider>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl VersionEntry {
    /// Create a version with no providers.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            providers: Vec::new(),
            extra: Map::new(),
        }
    }

    /// The version string as stored.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Providers in stored order.
    #[must_use]
    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    /// Find a provider by name.
    #[must_use]
    pub fn provider(&self, name: &str) -> Option<&Provider> {
        self.providers.iter().find(|p| p.name() == name)
    }
}

/// Whether [`Manifest::add_provider`] appended or replaced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderChange {
    /// A new provider entry was appended.
    Added {
        /// True when the version itself was created by this call.
        new_version: bool,
    },
    /// An entry with the same provider name was overwritten in place.
    Replaced,
}

impl ProviderChange {
    /// Return true when an existing entry was overwritten.
    #[must_use]
    pub fn is_replacement(self) -> bool {
        matches!(self, Self::Replaced)
    }
}

/// A box family and its published versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    name: String,
    #[serde(default)]
    versions: Vec<VersionEntry>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl Manifest {
    /// Create a manifest with no versions.
    ///
    /// # Examples
    ///
    /// ```
    /// use boxpub::Manifest;
    ///
    /// let manifest = Manifest::new("acme/base");
    /// assert_eq!(manifest.name(), "acme/base");
    /// assert!(manifest.versions().is_empty());
    /// ```
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            versions: Vec::new(),
            extra: Map::new(),
        }
    }

    /// The box family name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Versions in stored order.
    #[must_use]
    pub fn versions(&self) -> &[VersionEntry] {
        &self.versions
    }

    /// Keys this model does not interpret, preserved for re-encoding.
    #[must_use]
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// Find a version by its exact string.
    #[must_use]
    pub fn find_version(&self, version: &str) -> Option<&VersionEntry> {
        self.versions.iter().find(|v| v.version == version)
    }

    /// The highest numeric version present.
    ///
    /// Entries that are not `MAJOR.MINOR.PATCH` are skipped with a warning.
    #[must_use]
    pub fn latest_version(&self) -> Option<BoxVersion> {
        self.versions
            .iter()
            .filter_map(|entry| match entry.version.parse::<BoxVersion>() {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    warn!("ignoring version in manifest {}: {e}", self.name);
                    None
                }
            })
            .max()
    }

    /// The version a publish without an explicit version would write.
    ///
    /// This is the highest numeric version bumped to the next minor line, or
    /// [`BoxVersion::FIRST`] when the manifest has no numeric version.
    ///
    /// # Examples
    ///
    /// ```
    /// use boxpub::manifest::parse_manifest;
    ///
    /// let manifest = parse_manifest(
    ///     r#"{"name":"demo","versions":[{"version":"0.0.1"},{"version":"0.0.2"}]}"#,
    /// ).unwrap();
    /// assert_eq!(manifest.next_version().to_string(), "0.1.0");
    /// assert_eq!(boxpub::Manifest::new("demo").next_version().to_string(), "0.0.1");
    /// ```
    #[must_use]
    pub fn next_version(&self) -> BoxVersion {
        self.latest_version().map_or(BoxVersion::FIRST, BoxVersion::bump)
    }

    /// Decide the version to publish: `explicit` if given, otherwise
    /// [`Self::next_version`].
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::Empty`] if `explicit` is blank.
    pub fn resolve_version(&self, explicit: Option<&str>) -> Result<VersionChoice, VersionError> {
        match explicit {
            Some(value) => VersionChoice::explicit(value),
            None => Ok(VersionChoice::Derived(self.next_version())),
        }
    }

    /// Record `provider` under `version`.
    ///
    /// The version is appended if absent. Within it, an entry with the same
    /// provider name is replaced in place, unknown keys included, since they
    /// described the previous artifact; otherwise the provider is appended.
    /// No other version or provider is touched.
    ///
    /// # Examples
    ///
    /// ```
    /// use boxpub::{Manifest, Provider, ProviderChange};
    /// use boxpub::checksum::Sha256Digest;
    ///
    /// let digest = Sha256Digest::try_from("c".repeat(64).as_str()).unwrap();
    /// let mut manifest = Manifest::new("demo");
    ///
    /// let first = manifest.add_provider("1.0.0", Provider::sha256("virtualbox", "u1", &digest));
    /// let again = manifest.add_provider("1.0.0", Provider::sha256("virtualbox", "u2", &digest));
    ///
    /// assert_eq!(first, ProviderChange::Added { new_version: true });
    /// assert_eq!(again, ProviderChange::Replaced);
    /// assert_eq!(manifest.versions()[0].providers().len(), 1);
    /// ```
    pub fn add_provider(&mut self, version: &str, provider: Provider) -> ProviderChange {
        let Some(entry) = self.versions.iter_mut().find(|v| v.version == version) else {
            let mut entry = VersionEntry::new(version);
            entry.providers.push(provider);
            self.versions.push(entry);
            return ProviderChange::Added { new_version: true };
        };

        if let Some(existing) = entry
            .providers
            .iter_mut()
            .find(|p| p.name() == provider.name())
        {
            *existing = provider;
            return ProviderChange::Replaced;
        }
        entry.providers.push(provider);
        ProviderChange::Added { new_version: false }
    }
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
