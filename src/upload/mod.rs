//! Chunked block upload.
//!
//! Large boxes cannot be sent in one request, so the uploader declares the
//! destination as an empty block object, stages the stream as a series of
//! fixed-size blocks, and finally commits the ordered block list. The object
//! only becomes readable once the commit succeeds; blocks staged before a
//! failure are left for the store to expire.

mod block_id;

pub use block_id::{BlockId, INDEX_WIDTH, InvalidBlockId};

use crate::deadline::{Deadline, DeadlineExceeded};
use crate::store::{BlobStore, BlockListEntry, StoreError};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, trace};
use std::fs;
use std::io::{self, Read};

/// Errors arising from a chunked upload.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The local source could not be opened.
    #[error("failed to open {path} for upload: {source}")]
    Open {
        /// The local file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Reading the local source failed part-way through.
    #[error("failed to read {} at byte {offset}: {source}", describe_source(.path.as_deref()))]
    Read {
        /// The local file, when uploading from a path.
        path: Option<Utf8PathBuf>,
        /// Number of bytes successfully read before the failure.
        offset: u64,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The destination could not be declared as an empty block object.
    #[error("failed to create {path}: {source}")]
    Create {
        /// Destination object path.
        path: String,
        /// The store error.
        #[source]
        source: StoreError,
    },

    /// Staging one block failed.
    #[error("failed to upload block {index} of {path}: {source}")]
    Block {
        /// Destination object path.
        path: String,
        /// Zero-based block index.
        index: u64,
        /// The store error.
        #[source]
        source: StoreError,
    },

    /// Committing the block list failed.
    #[error("failed to commit {blocks} block(s) to {path}: {source}")]
    Commit {
        /// Destination object path.
        path: String,
        /// Number of blocks in the rejected list.
        blocks: usize,
        /// The store error.
        #[source]
        source: StoreError,
    },

    /// The publish deadline passed mid-upload.
    #[error(transparent)]
    Deadline(#[from] DeadlineExceeded),
}

fn describe_source(path: Option<&Utf8Path>) -> String {
    path.map_or_else(|| "upload stream".to_owned(), |p| p.to_string())
}

/// Summary of a committed upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadReport {
    /// Number of blocks committed.
    pub blocks: u64,
    /// Total bytes committed.
    pub bytes: u64,
    /// The block size that was used.
    pub block_size: usize,
}

/// Clamp a requested block size to what the store accepts.
///
/// Zero, or anything above `max`, falls back to `max`.
///
/// # Examples
///
/// ```
/// use boxpub::upload::effective_block_size;
///
/// assert_eq!(effective_block_size(0, 4096), 4096);
/// assert_eq!(effective_block_size(1024, 4096), 1024);
/// assert_eq!(effective_block_size(8192, 4096), 4096);
/// ```
#[must_use]
pub const fn effective_block_size(requested: usize, max: usize) -> usize {
    if requested == 0 || requested > max {
        max
    } else {
        requested
    }
}

/// Uploads streams to a [`BlobStore`] as committed block objects.
///
/// # Examples
///
/// ```
/// use boxpub::store::memory::MemoryStore;
/// use boxpub::upload::ChunkedUploader;
///
/// let store = MemoryStore::new();
/// let uploader = ChunkedUploader::new(&store, "boxes").with_block_size(4);
/// let report = uploader.upload("demo.box", &b"0123456789"[..]).unwrap();
///
/// assert_eq!(report.blocks, 3);
/// assert_eq!(store.object("boxes", "demo.box").unwrap(), b"0123456789");
/// ```
#[derive(Debug)]
pub struct ChunkedUploader<'a, S: BlobStore + ?Sized> {
    store: &'a S,
    container: &'a str,
    block_size: usize,
    deadline: Deadline,
}

impl<'a, S: BlobStore + ?Sized> ChunkedUploader<'a, S> {
    /// Create an uploader using the store's maximum block size.
    #[must_use]
    pub fn new(store: &'a S, container: &'a str) -> Self {
        Self {
            store,
            container,
            block_size: store.max_block_size(),
            deadline: Deadline::none(),
        }
    }

    /// Use `requested` bytes per block, clamped by [`effective_block_size`].
    #[must_use]
    pub fn with_block_size(mut self, requested: usize) -> Self {
        self.block_size = effective_block_size(requested, self.store.max_block_size());
        self
    }

    /// Abort between blocks once `deadline` passes.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    /// The block size in effect.
    #[must_use]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Upload the local file at `source` to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Open`] if the file cannot be opened, and any
    /// error [`Self::upload`] can return, with read failures naming the file.
    pub fn upload_file(&self, path: &str, source: &Utf8Path) -> Result<UploadReport, UploadError> {
        let file = fs::File::open(source).map_err(|e| UploadError::Open {
            path: source.to_owned(),
            source: e,
        })?;
        self.upload_from(path, file, Some(source))
    }

    /// Upload everything `reader` yields to `path`.
    ///
    /// # Errors
    ///
    /// Returns an [`UploadError`] if reading fails, any store call fails, or
    /// the deadline passes. Nothing is readable at `path` unless the final
    /// commit succeeded.
    pub fn upload(&self, path: &str, reader: impl Read) -> Result<UploadReport, UploadError> {
        self.upload_from(path, reader, None)
    }

    fn upload_from(
        &self,
        path: &str,
        mut reader: impl Read,
        source: Option<&Utf8Path>,
    ) -> Result<UploadReport, UploadError> {
        self.deadline.check(&format!("creating {path}"))?;
        self.store
            .create_empty_object(self.container, path)
            .map_err(|e| UploadError::Create {
                path: path.to_owned(),
                source: e,
            })?;

        let mut buffer = vec![0u8; self.block_size];
        let mut blocks: Vec<BlockListEntry> = Vec::new();
        let mut bytes: u64 = 0;
        let mut index: u64 = 0;

        loop {
            let filled = fill_block(&mut reader, &mut buffer).map_err(|e| UploadError::Read {
                path: source.map(Utf8Path::to_owned),
                offset: bytes,
                source: e,
            })?;
            if filled == 0 {
                break;
            }
            self.deadline.check(&format!("block {index} of {path}"))?;

            let id = BlockId::for_index(index);
            let data = buffer.get(..filled).unwrap_or_default();
            self.store
                .put_block(self.container, path, &id, data)
                .map_err(|e| UploadError::Block {
                    path: path.to_owned(),
                    index,
                    source: e,
                })?;
            debug!("staged block {index} ({filled} bytes) for {path}");

            blocks.push(BlockListEntry::latest(id));
            bytes += filled as u64;
            index += 1;

            if filled < buffer.len() {
                break;
            }
        }

        self.deadline.check(&format!("committing {path}"))?;
        self.store
            .put_block_list(self.container, path, &blocks)
            .map_err(|e| UploadError::Commit {
                path: path.to_owned(),
                blocks: blocks.len(),
                source: e,
            })?;
        trace!("committed {index} block(s), {bytes} bytes, to {path}");

        Ok(UploadReport {
            blocks: index,
            bytes,
            block_size: self.block_size,
        })
    }
}

/// Read until `buffer` is full or the stream ends; return the bytes read.
///
/// A short count therefore always means end-of-stream.
fn fill_block(reader: &mut impl Read, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while let Some(rest) = buffer.get_mut(filled..) {
        if rest.is_empty() {
            break;
        }
        match reader.read(rest) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
#[path = "upload_tests.rs"]
mod tests;
