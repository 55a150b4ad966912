//! Publish Vagrant boxes to Azure Blob Storage.
//!
//! This crate wires the `boxpub` core (manifest model and chunked upload) to
//! the outside world: settings from a TOML file and the command line, the
//! artifact produced by a build, and an Azure block-blob client.
//!
//! # Modules
//!
//! - [`artifact`] - The build output being published and its shape checks
//! - [`azure`] - Azure Blob Storage client implementing `BlobStore`
//! - [`cli`] - Command-line argument definitions
//! - [`error`] - Top-level error type for the binary
//! - [`output`] - Progress and result formatting
//! - [`pipeline`] - The staged publish sequence
//! - [`settings`] - Settings loading, merging, and validation

pub mod artifact;
pub mod azure;
pub mod cli;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod settings;
