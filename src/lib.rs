//! Core library for publishing Vagrant boxes to a block-based blob store.
//!
//! The crate owns the two pieces of logic that matter for a publish: the box
//! manifest (versions, providers, and the next-version rule) and the chunked
//! block upload protocol. Everything that talks to a real network lives in
//! `boxpub-publisher`; this crate only sees the [`store::BlobStore`]
//! capability.
//!
//! # Modules
//!
//! - [`checksum`] - Streaming SHA-256 digests of box files
//! - [`deadline`] - Overall deadline shared by every publish stage
//! - [`manifest`] - Manifest model, version resolution, and JSON codec
//! - [`store`] - Blob store capability consumed by the uploader
//! - [`upload`] - Block identifiers and the chunked uploader

pub mod checksum;
pub mod deadline;
pub mod manifest;
pub mod store;
pub mod upload;

pub use checksum::{ChecksumError, Sha256Digest, compute_sha256, sha256_reader};
pub use manifest::{Manifest, Provider, ProviderChange, VersionEntry};
pub use store::{BlobStore, BlockListEntry, BlockStatus, StoreError};
pub use upload::{BlockId, ChunkedUploader, UploadError, UploadReport};
