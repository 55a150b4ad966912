//! JSON encoding and decoding of manifests.

use super::Manifest;
use std::collections::HashSet;

/// Errors arising from manifest decoding or encoding.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// JSON syntax or shape was invalid.
    #[error("manifest parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Two version entries share one version string.
    #[error("manifest lists version {version} more than once")]
    DuplicateVersion {
        /// The repeated version string.
        version: String,
    },

    /// Two provider entries within one version share a name.
    #[error("version {version} lists provider {provider} more than once")]
    DuplicateProvider {
        /// The version holding the duplicates.
        version: String,
        /// The repeated provider name.
        provider: String,
    },
}

/// Decode and validate a manifest.
///
/// # Errors
///
/// Returns [`ManifestError::Json`] for malformed JSON or missing required
/// fields, and a duplicate error if a version or a provider within a
/// version appears twice.
///
/// # Examples
///
/// ```
/// use boxpub::manifest::parse_manifest;
///
/// let manifest = parse_manifest(r#"{"name":"demo","versions":[]}"#).unwrap();
/// assert_eq!(manifest.name(), "demo");
///
/// let dup = r#"{"name":"demo","versions":[{"version":"1.0.0"},{"version":"1.0.0"}]}"#;
/// assert!(parse_manifest(dup).is_err());
/// ```
pub fn parse_manifest(json: &str) -> Result<Manifest, ManifestError> {
    let manifest: Manifest = serde_json::from_str(json)?;
    validate(&manifest)?;
    Ok(manifest)
}

/// Encode a manifest as pretty-printed JSON with a trailing newline.
///
/// # Errors
///
/// Returns [`ManifestError::Json`] if serialisation fails.
pub fn to_json(manifest: &Manifest) -> Result<String, ManifestError> {
    let mut json = serde_json::to_string_pretty(manifest)?;
    json.push('\n');
    Ok(json)
}

fn validate(manifest: &Manifest) -> Result<(), ManifestError> {
    let mut versions = HashSet::new();
    for entry in manifest.versions() {
        if !versions.insert(entry.version()) {
            return Err(ManifestError::DuplicateVersion {
                version: entry.version().to_owned(),
            });
        }
        let mut providers = HashSet::new();
        for provider in entry.providers() {
            if !providers.insert(provider.name()) {
                return Err(ManifestError::DuplicateProvider {
                    version: entry.version().to_owned(),
                    provider: provider.name().to_owned(),
                });
            }
        }
    }
    Ok(())
}
