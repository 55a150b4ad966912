//! Top-level error type for the `boxpub` binary.

use crate::azure::AzureConfigError;
use crate::pipeline::PublishError;
use crate::settings::SettingsError;
use thiserror::Error;

/// Errors that end a `boxpub` invocation.
#[derive(Debug, Error)]
pub enum PublisherError {
    /// Settings could not be loaded or failed validation.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// The blob store client could not be configured.
    #[error("cannot configure blob store client: {0}")]
    Client(#[from] AzureConfigError),

    /// A publish stage failed.
    #[error(transparent)]
    Publish(#[from] PublishError),

    /// Failed to write output.
    #[error("failed to write output")]
    WriteFailed {
        /// The underlying error that caused the write to fail.
        #[source]
        source: std::io::Error,
    },
}

/// Result alias for publisher operations.
pub type Result<T> = std::result::Result<T, PublisherError>;
