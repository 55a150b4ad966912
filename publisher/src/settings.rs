//! Publish settings: TOML file, command-line overlay, and validation.
//!
//! Settings are read from an optional TOML file and overlaid field by field
//! with values given on the command line. Validation then checks every field
//! and reports all problems at once, so a misconfigured publish fails before
//! any network traffic with a complete list of what to fix.
//!
//! A settings file looks like:
//!
//! ```toml
//! storage_account_name = "acmeboxes"
//! container_name = "vagrant"
//! access_key = "c2VjcmV0"
//! manifest = "base/manifest.json"
//! box_name = "acme/base"
//! box_dir = "base"
//! # version = "1.2.0"
//! # block_size = 4194304
//! # request_timeout_secs = 30
//! # publish_timeout_secs = 3600
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::io;
use std::time::Duration;
use url::Url;

/// Per-request timeout used when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Environment variable the access key may be read from.
pub const ACCESS_KEY_ENV: &str = "BOXPUB_ACCESS_KEY";

/// One problem found while validating settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsProblem {
    /// A required value is absent or blank.
    #[error("{key} must be set")]
    Missing {
        /// The settings key.
        key: &'static str,
    },

    /// A value still contains template placeholders.
    #[error("error parsing {key} template: {reason}")]
    Template {
        /// The settings key.
        key: &'static str,
        /// What is wrong with the placeholders.
        reason: String,
    },

    /// The access key is not base64.
    #[error("access_key is not valid base64: {reason}")]
    AccessKey {
        /// The decoder's complaint.
        reason: String,
    },

    /// A timeout was set to zero seconds.
    #[error("{key} must be greater than zero")]
    ZeroTimeout {
        /// The settings key.
        key: &'static str,
    },

    /// The endpoint override is not an absolute HTTP(S) URL.
    #[error("endpoint \"{value}\" is not a usable http(s) URL: {reason}")]
    Endpoint {
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Errors arising while loading or validating settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("failed to read settings file {path}: {source}")]
    Read {
        /// The settings file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The settings file is not valid TOML or has unknown keys.
    #[error("invalid settings file {path}: {source}")]
    Parse {
        /// The settings file.
        path: Utf8PathBuf,
        /// The TOML error.
        #[source]
        source: Box<toml::de::Error>,
    },

    /// One or more settings are missing or malformed.
    #[error("invalid settings:\n{}", format_problems(.problems))]
    Invalid {
        /// Every problem found, in key order.
        problems: Vec<SettingsProblem>,
    },
}

fn format_problems(problems: &[SettingsProblem]) -> String {
    problems
        .iter()
        .map(|problem| format!("  * {problem}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Unvalidated settings as they appear in the file or on the command line.
#[derive(Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RawSettings {
    /// Azure storage account name.
    pub storage_account_name: Option<String>,
    /// Blob container holding boxes and the manifest.
    pub container_name: Option<String>,
    /// Base64 storage account key.
    pub access_key: Option<String>,
    /// Object path of the manifest inside the container.
    pub manifest: Option<String>,
    /// Box family name written into a new manifest.
    pub box_name: Option<String>,
    /// Directory prefix for uploaded boxes.
    pub box_dir: Option<String>,
    /// Explicit version; derived from the manifest when absent.
    pub version: Option<String>,
    /// Upload block size in bytes.
    pub block_size: Option<usize>,
    /// Blob service endpoint override.
    pub endpoint: Option<String>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: Option<u64>,
    /// Overall publish timeout in seconds.
    pub publish_timeout_secs: Option<u64>,
}

impl fmt::Debug for RawSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawSettings")
            .field("storage_account_name", &self.storage_account_name)
            .field("container_name", &self.container_name)
            .field("access_key", &self.access_key.as_ref().map(|_| "<redacted>"))
            .field("manifest", &self.manifest)
            .field("box_name", &self.box_name)
            .field("box_dir", &self.box_dir)
            .field("version", &self.version)
            .field("block_size", &self.block_size)
            .field("endpoint", &self.endpoint)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("publish_timeout_secs", &self.publish_timeout_secs)
            .finish()
    }
}

impl RawSettings {
    /// Parse settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns a TOML error for malformed input or unknown keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use boxpub_publisher::settings::RawSettings;
    ///
    /// let raw = RawSettings::parse("container_name = \"vagrant\"").unwrap();
    /// assert_eq!(raw.container_name.as_deref(), Some("vagrant"));
    /// ```
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Read and parse the settings file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Read`] or [`SettingsError::Parse`].
    pub fn load(path: &Utf8Path) -> Result<Self, SettingsError> {
        let text = fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.to_owned(),
            source: e,
        })?;
        Self::parse(&text).map_err(|e| SettingsError::Parse {
            path: path.to_owned(),
            source: Box::new(e),
        })
    }

    /// Combine two layers; values set in `over` win.
    #[must_use]
    pub fn overlay(self, over: Self) -> Self {
        Self {
            storage_account_name: over.storage_account_name.or(self.storage_account_name),
            container_name: over.container_name.or(self.container_name),
            access_key: over.access_key.or(self.access_key),
            manifest: over.manifest.or(self.manifest),
            box_name: over.box_name.or(self.box_name),
            box_dir: over.box_dir.or(self.box_dir),
            version: over.version.or(self.version),
            block_size: over.block_size.or(self.block_size),
            endpoint: over.endpoint.or(self.endpoint),
            request_timeout_secs: over.request_timeout_secs.or(self.request_timeout_secs),
            publish_timeout_secs: over.publish_timeout_secs.or(self.publish_timeout_secs),
        }
    }

    /// Check every field and build [`PublishSettings`].
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] listing every problem found.
    pub fn validate(self) -> Result<PublishSettings, SettingsError> {
        let mut problems = Vec::new();

        let mut required = |key: &'static str, value: Option<String>| -> String {
            let value = value.map(|v| v.trim().to_owned()).unwrap_or_default();
            if value.is_empty() {
                problems.push(SettingsProblem::Missing { key });
            } else if let Err(reason) = check_template(&value) {
                problems.push(SettingsProblem::Template { key, reason });
            }
            value
        };
        let storage_account_name = required("storage_account_name", self.storage_account_name);
        let container_name = required("container_name", self.container_name);
        let access_key = required("access_key", self.access_key);
        let manifest_path = required("manifest", self.manifest);
        let box_name = required("box_name", self.box_name);
        let box_dir = required("box_dir", self.box_dir);

        let version = self
            .version
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty());
        if let Some(Err(reason)) = version.as_deref().map(check_template) {
            problems.push(SettingsProblem::Template {
                key: "version",
                reason,
            });
        }

        let decoded_key = (!access_key.is_empty() && check_template(&access_key).is_ok())
            .then(|| STANDARD.decode(&access_key));
        if let Some(Err(e)) = decoded_key {
            problems.push(SettingsProblem::AccessKey {
                reason: e.to_string(),
            });
        }

        let endpoint = self
            .endpoint
            .and_then(|value| match parse_endpoint(&value) {
                Ok(url) => Some(url),
                Err(reason) => {
                    problems.push(SettingsProblem::Endpoint { value, reason });
                    None
                }
            });

        let request_timeout_secs = self
            .request_timeout_secs
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        if request_timeout_secs == 0 {
            problems.push(SettingsProblem::ZeroTimeout {
                key: "request_timeout_secs",
            });
        }
        if self.publish_timeout_secs == Some(0) {
            problems.push(SettingsProblem::ZeroTimeout {
                key: "publish_timeout_secs",
            });
        }

        if !problems.is_empty() {
            return Err(SettingsError::Invalid { problems });
        }

        Ok(PublishSettings {
            storage_account_name,
            container_name,
            access_key,
            manifest_path,
            box_name,
            box_dir,
            version,
            block_size: self.block_size,
            endpoint,
            request_timeout: Duration::from_secs(request_timeout_secs),
            publish_timeout: self.publish_timeout_secs.map(Duration::from_secs),
        })
    }
}

/// Reject values that still carry `{{ }}` placeholders.
///
/// Templates are rendered by whatever drives the publisher; anything left
/// over here would end up verbatim in object paths.
fn check_template(value: &str) -> Result<(), String> {
    let opens = value.matches("{{").count();
    let closes = value.matches("}}").count();
    if opens != closes {
        return Err("unbalanced {{ }} delimiters".to_owned());
    }
    if opens > 0 {
        return Err("unresolved {{ }} placeholder".to_owned());
    }
    Ok(())
}

fn parse_endpoint(value: &str) -> Result<Url, String> {
    let url = Url::parse(value.trim()).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        "http" | "https" => Err("missing host".to_owned()),
        other => Err(format!("unsupported scheme {other}")),
    }
}

/// Validated settings for one publish.
#[derive(Clone, PartialEq, Eq)]
pub struct PublishSettings {
    /// Azure storage account name.
    pub storage_account_name: String,
    /// Blob container holding boxes and the manifest.
    pub container_name: String,
    /// Base64 storage account key.
    pub access_key: String,
    /// Object path of the manifest inside the container.
    pub manifest_path: String,
    /// Box family name written into a new manifest.
    pub box_name: String,
    /// Directory prefix for uploaded boxes.
    pub box_dir: String,
    /// Explicit version, if one was given.
    pub version: Option<String>,
    /// Requested upload block size in bytes.
    pub block_size: Option<usize>,
    /// Blob service endpoint override.
    pub endpoint: Option<Url>,
    /// Timeout applied to each HTTP request.
    pub request_timeout: Duration,
    /// Budget for the whole publish, if limited.
    pub publish_timeout: Option<Duration>,
}

impl fmt::Debug for PublishSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishSettings")
            .field("storage_account_name", &self.storage_account_name)
            .field("container_name", &self.container_name)
            .field("access_key", &"<redacted>")
            .field("manifest_path", &self.manifest_path)
            .field("box_name", &self.box_name)
            .field("box_dir", &self.box_dir)
            .field("version", &self.version)
            .field("block_size", &self.block_size)
            .field("endpoint", &self.endpoint.as_ref().map(Url::as_str))
            .field("request_timeout", &self.request_timeout)
            .field("publish_timeout", &self.publish_timeout)
            .finish()
    }
}

/// Load the optional settings file, apply `overlay`, and validate.
///
/// # Errors
///
/// Returns a [`SettingsError`] if the file cannot be read or parsed, or if
/// the merged settings are invalid.
pub fn resolve_settings(
    config: Option<&Utf8Path>,
    overlay: RawSettings,
) -> Result<PublishSettings, SettingsError> {
    let base = match config {
        Some(path) => RawSettings::load(path)?,
        None => RawSettings::default(),
    };
    base.overlay(overlay).validate()
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
