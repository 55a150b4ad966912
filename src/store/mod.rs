//! Blob store capability consumed by the uploader and the publisher.
//!
//! The trait mirrors the block-blob model: an object is declared empty,
//! blocks are staged against it under opaque identifiers, and a single
//! block-list commit decides which blocks (and in what order) make up the
//! readable object. Whole-object reads and writes are used for the small
//! manifest file.
//!
//! Implementations are expected to be synchronous; timeouts belong to the
//! implementation's transport.

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

use crate::upload::BlockId;
use std::fmt;
use std::io::Read;

/// Largest block a block-blob store accepts in one `put_block` call.
pub const MAX_BLOCK_SIZE: usize = 4 * 1024 * 1024;

/// Which block list a committed identifier is resolved against.
///
/// Only `Latest` is ever written: it picks the most recently staged block
/// with that identifier, whether or not it was committed before.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BlockStatus {
    /// Use the newest uploaded block with this identifier.
    #[default]
    Latest,
}

impl BlockStatus {
    /// The element name used by the block list wire format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Latest => "Latest",
        }
    }
}

impl fmt::Display for BlockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in a block list commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockListEntry {
    /// Identifier the block was staged under.
    pub id: BlockId,
    /// Which staged copy of the block to commit.
    pub status: BlockStatus,
}

impl BlockListEntry {
    /// Commit the most recently staged block with `id`.
    #[must_use]
    pub fn latest(id: BlockId) -> Self {
        Self {
            id,
            status: BlockStatus::Latest,
        }
    }
}

/// Errors reported by a blob store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object does not exist.
    #[error("object not found: {location}")]
    NotFound {
        /// URL or path of the missing object.
        location: String,
    },

    /// The request failed in transport or the store answered with an error
    /// status other than not-found.
    #[error("request to {location} failed: {reason}")]
    Http {
        /// URL or path that was requested.
        location: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// Request signing could not be performed.
    #[error("authorisation failed: {reason}")]
    Auth {
        /// Description of the signing failure.
        reason: String,
    },

    /// The store refused an operation that breaks the block protocol.
    #[error("{operation} rejected for {location}: {reason}")]
    Rejected {
        /// The operation that was refused.
        operation: &'static str,
        /// URL or path of the target object.
        location: String,
        /// Why the operation was refused.
        reason: String,
    },

    /// Reading a response body failed.
    #[error("I/O error talking to the store: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Return true when the error means the object does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// The blob store operations a publish needs.
///
/// `container` is the bucket or container name; `path` is the object name
/// inside it, using `/` separators.
#[cfg_attr(test, mockall::automock)]
pub trait BlobStore {
    /// Declare `path` as an empty block object so blocks can be staged
    /// against it.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store refuses the request.
    fn create_empty_object(&self, container: &str, path: &str) -> Result<(), StoreError>;

    /// Stage one block of data under `block_id`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the block could not be stored.
    fn put_block(
        &self,
        container: &str,
        path: &str,
        block_id: &BlockId,
        data: &[u8],
    ) -> Result<(), StoreError>;

    /// Commit `blocks`, in order, as the content of `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if any identifier is unknown or the commit
    /// fails.
    fn put_block_list(
        &self,
        container: &str,
        path: &str,
        blocks: &[BlockListEntry],
    ) -> Result<(), StoreError>;

    /// Open the committed content of `path` for reading.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the object does not exist, or
    /// another [`StoreError`] for any other failure.
    fn get_object(&self, container: &str, path: &str)
    -> Result<Box<dyn Read + Send>, StoreError>;

    /// Write `data` as the whole content of `path`, replacing it.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the write fails.
    fn put_object(
        &self,
        container: &str,
        path: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), StoreError>;

    /// The public URL of `path`.
    fn object_url(&self, container: &str, path: &str) -> String;

    /// The largest block this store accepts.
    fn max_block_size(&self) -> usize {
        MAX_BLOCK_SIZE
    }
}
