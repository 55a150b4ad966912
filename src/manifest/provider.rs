//! Provider entries and the builder-to-provider lookup.

use crate::checksum::{CHECKSUM_TYPE, Sha256Digest};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One provider-specific artifact within a version.
///
/// Fields are kept as plain strings so that entries written by other tools
/// (for example with a different checksum type) round-trip unchanged.
///
/// # Examples
///
/// ```
/// use boxpub::Provider;
/// use boxpub::checksum::Sha256Digest;
///
/// let digest = Sha256Digest::try_from("a".repeat(64).as_str()).unwrap();
/// let provider = Provider::sha256("virtualbox", "https://example.test/a.box", &digest);
/// assert_eq!(provider.checksum_type(), "sha256");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    name: String,
    url: String,
    checksum_type: String,
    checksum: String,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl Provider {
    /// Build an entry carrying a SHA-256 checksum.
    #[must_use]
    pub fn sha256(name: impl Into<String>, url: impl Into<String>, digest: &Sha256Digest) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            checksum_type: CHECKSUM_TYPE.to_owned(),
            checksum: digest.as_str().to_owned(),
            extra: Map::new(),
        }
    }

    /// Provider name, e.g. `virtualbox`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Location of the uploaded artifact.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Checksum algorithm name.
    #[must_use]
    pub fn checksum_type(&self) -> &str {
        &self.checksum_type
    }

    /// Hex checksum of the artifact.
    #[must_use]
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// Keys this model does not interpret, preserved for re-encoding.
    #[must_use]
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}

/// Map a builder identifier to the provider name recorded in the manifest.
///
/// Unknown identifiers pass through unchanged.
///
/// # Examples
///
/// ```
/// use boxpub::manifest::provider_for_builder;
///
/// assert_eq!(provider_for_builder("vmware"), "vmware_desktop");
/// assert_eq!(provider_for_builder("virtualbox"), "virtualbox");
/// assert_eq!(provider_for_builder("qemu"), "qemu");
/// ```
#[must_use]
pub fn provider_for_builder(builder: &str) -> &str {
    match builder {
        "aws" => "aws",
        "digitalocean" => "digitalocean",
        "virtualbox" => "virtualbox",
        "vmware" => "vmware_desktop",
        "parallels" => "parallels",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("aws", "aws")]
    #[case("digitalocean", "digitalocean")]
    #[case("virtualbox", "virtualbox")]
    #[case("vmware", "vmware_desktop")]
    #[case("parallels", "parallels")]
    #[case("hyperv", "hyperv")]
    #[case("", "")]
    fn maps_builder_to_provider(#[case] builder: &str, #[case] expected: &str) {
        assert_eq!(provider_for_builder(builder), expected);
    }
}
