//! The build output handed to the publisher.
//!
//! A build produces an artifact: the identifier of the builder that made it
//! and the files it wrote. Only single-box artifacts can be published.

use boxpub::manifest::provider_for_builder;
use camino::{Utf8Path, Utf8PathBuf};

/// File extension every publishable box carries.
pub const BOX_EXTENSION: &str = ".box";

/// Errors raised when an artifact cannot be published.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArtifactError {
    /// The artifact lists no files.
    #[error("artifact contains no files; expected a single .box file")]
    Empty,

    /// The artifact lists more than one file.
    #[error("artifact contains {} files ({}); expected a single .box file", .files.len(), join(.files))]
    TooManyFiles {
        /// Every file in the artifact.
        files: Vec<Utf8PathBuf>,
    },

    /// The single file is not a box.
    #[error("unknown file in artifact: {path}; expected a .box file")]
    NotABox {
        /// The offending file.
        path: Utf8PathBuf,
    },
}

fn join(files: &[Utf8PathBuf]) -> String {
    files
        .iter()
        .map(|path| path.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A builder identifier and the files it produced.
///
/// # Examples
///
/// ```
/// use boxpub_publisher::artifact::Artifact;
///
/// let artifact = Artifact::new("vmware", vec!["out/base.box".into()]);
/// assert_eq!(artifact.provider(), "vmware_desktop");
/// assert_eq!(artifact.box_file().unwrap().file_name, "base.box");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    builder_id: String,
    files: Vec<Utf8PathBuf>,
}

/// The validated box file of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxFile<'a> {
    /// Local path of the box.
    pub path: &'a Utf8Path,
    /// Final path component, used in the uploaded object name.
    pub file_name: &'a str,
}

impl Artifact {
    /// Describe an artifact.
    #[must_use]
    pub fn new(builder_id: impl Into<String>, files: Vec<Utf8PathBuf>) -> Self {
        Self {
            builder_id: builder_id.into(),
            files,
        }
    }

    /// The builder identifier as given.
    #[must_use]
    pub fn builder_id(&self) -> &str {
        &self.builder_id
    }

    /// The files the build produced.
    #[must_use]
    pub fn files(&self) -> &[Utf8PathBuf] {
        &self.files
    }

    /// The provider name recorded in the manifest.
    #[must_use]
    pub fn provider(&self) -> &str {
        provider_for_builder(&self.builder_id)
    }

    /// The single `.box` file to publish.
    ///
    /// # Errors
    ///
    /// Returns an [`ArtifactError`] unless the artifact holds exactly one
    /// file whose name ends in `.box`.
    pub fn box_file(&self) -> Result<BoxFile<'_>, ArtifactError> {
        let path = match self.files.as_slice() {
            [] => return Err(ArtifactError::Empty),
            [only] => only,
            many => {
                return Err(ArtifactError::TooManyFiles {
                    files: many.to_vec(),
                });
            }
        };
        if !path.as_str().ends_with(BOX_EXTENSION) {
            return Err(ArtifactError::NotABox { path: path.clone() });
        }
        let file_name = path.file_name().unwrap_or(path.as_str());
        Ok(BoxFile { path, file_name })
    }
}
