//! Command-line interface for `boxpub`.
//!
//! Every setting can come from the TOML file named by `--config`; flags given
//! here override the file value for that key.

use crate::artifact::Artifact;
use crate::settings::{ACCESS_KEY_ENV, RawSettings};
use camino::Utf8PathBuf;
use clap::Parser;

/// Publish a Vagrant box to Azure Blob Storage and update its manifest.
#[derive(Parser, Debug, Default)]
#[command(name = "boxpub")]
#[command(version, about)]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Publish with settings from a file, deriving the next version:\n",
    "    $ boxpub --config boxpub.toml --builder virtualbox output/base.box\n\n",
    "  Publish an explicit version, overriding the container:\n",
    "    $ boxpub -c boxpub.toml --container-name staging --box-version 1.2.0 \\\n",
    "        -b vmware output/base.box\n\n",
    "The access key may be supplied through the BOXPUB_ACCESS_KEY environment\n",
    "variable instead of the settings file.",
))]
pub struct Cli {
    /// TOML settings file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Azure storage account name.
    #[arg(long, value_name = "NAME")]
    pub storage_account_name: Option<String>,

    /// Blob container for boxes and the manifest.
    #[arg(long, value_name = "NAME")]
    pub container_name: Option<String>,

    /// Base64 storage account key.
    #[arg(long, value_name = "KEY", env = ACCESS_KEY_ENV, hide_env_values = true)]
    pub access_key: Option<String>,

    /// Object path of the manifest inside the container.
    #[arg(long, value_name = "PATH")]
    pub manifest: Option<String>,

    /// Box family name recorded in a new manifest.
    #[arg(long, value_name = "NAME")]
    pub box_name: Option<String>,

    /// Directory prefix for uploaded boxes.
    #[arg(long, value_name = "DIR")]
    pub box_dir: Option<String>,

    /// Version to publish [default: next minor version in the manifest].
    #[arg(long, value_name = "VERSION")]
    pub box_version: Option<String>,

    /// Upload block size in bytes [default: 4194304].
    #[arg(long, value_name = "BYTES")]
    pub block_size: Option<usize>,

    /// Blob service endpoint [default: the account's public blob endpoint].
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Timeout for each HTTP request, in seconds [default: 30].
    #[arg(long, value_name = "SECS")]
    pub request_timeout_secs: Option<u64>,

    /// Overall time limit for the publish, in seconds.
    #[arg(long, value_name = "SECS")]
    pub publish_timeout_secs: Option<u64>,

    /// Identifier of the builder that produced the box, e.g. `virtualbox`.
    #[arg(short, long, value_name = "ID")]
    pub builder: String,

    /// Suppress progress output (errors still shown).
    #[arg(short, long)]
    pub quiet: bool,

    /// Files produced by the build; exactly one `.box` file is expected.
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<Utf8PathBuf>,
}

impl Cli {
    /// The settings given as flags, to lay over the settings file.
    ///
    /// # Examples
    ///
    /// ```
    /// use boxpub_publisher::cli::Cli;
    ///
    /// let cli = Cli {
    ///     box_version: Some("1.0.0".to_owned()),
    ///     ..Cli::default()
    /// };
    /// assert_eq!(cli.settings_overlay().version.as_deref(), Some("1.0.0"));
    /// ```
    #[must_use]
    pub fn settings_overlay(&self) -> RawSettings {
        RawSettings {
            storage_account_name: self.storage_account_name.clone(),
            container_name: self.container_name.clone(),
            access_key: self.access_key.clone(),
            manifest: self.manifest.clone(),
            box_name: self.box_name.clone(),
            box_dir: self.box_dir.clone(),
            version: self.box_version.clone(),
            block_size: self.block_size,
            endpoint: self.endpoint.clone(),
            request_timeout_secs: self.request_timeout_secs,
            publish_timeout_secs: self.publish_timeout_secs,
        }
    }

    /// The build artifact named on the command line.
    #[must_use]
    pub fn artifact(&self) -> Artifact {
        Artifact::new(self.builder.as_str(), self.files.clone())
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
