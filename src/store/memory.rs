//! In-process block store used by tests.
//!
//! Enforces the same protocol rules as a real block-blob service: blocks can
//! only be staged against an object that was declared first, blocks larger
//! than the store maximum are refused, and only a block-list commit makes the
//! staged data readable. Every call is recorded so tests can assert on the
//! order of side effects, and individual calls can be made to fail.

use super::{BlobStore, BlockListEntry, StoreError};
use crate::upload::BlockId;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Base URL used by [`MemoryStore::new`].
pub const DEFAULT_BASE_URL: &str = "https://memory.blob.test";

/// The operations a [`MemoryStore`] records and can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// `create_empty_object`
    CreateEmpty,
    /// `put_block`
    PutBlock,
    /// `put_block_list`
    PutBlockList,
    /// `get_object`
    GetObject,
    /// `put_object`
    PutObject,
}

/// A recorded call against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    /// Which operation was invoked.
    pub operation: StoreOperation,
    /// `container/path` of the target object.
    pub target: String,
    /// The block identifier for `put_block`, or the committed identifiers
    /// joined with commas for `put_block_list`.
    pub detail: Option<String>,
}

type ObjectKey = (String, String);

#[derive(Debug, Default)]
struct State {
    objects: HashMap<ObjectKey, Vec<u8>>,
    content_types: HashMap<ObjectKey, String>,
    staged: HashMap<ObjectKey, HashMap<String, Vec<u8>>>,
    calls: Vec<StoreCall>,
    failures: Vec<(StoreOperation, usize)>,
}

impl State {
    fn record(
        &mut self,
        operation: StoreOperation,
        key: &ObjectKey,
        detail: Option<String>,
    ) -> Result<(), StoreError> {
        let nth = self
            .calls
            .iter()
            .filter(|call| call.operation == operation)
            .count();
        let target = format!("{}/{}", key.0, key.1);
        self.calls.push(StoreCall {
            operation,
            target: target.clone(),
            detail,
        });
        if self.failures.contains(&(operation, nth)) {
            return Err(StoreError::Http {
                location: target,
                reason: format!("injected failure on {operation:?} call {nth}"),
            });
        }
        Ok(())
    }
}

/// A thread-safe in-memory [`BlobStore`].
///
/// # Examples
///
/// ```
/// use boxpub::store::BlobStore;
/// use boxpub::store::memory::MemoryStore;
///
/// let store = MemoryStore::new();
/// store.put_object("boxes", "manifest.json", b"{}", "application/json").unwrap();
/// assert_eq!(store.object("boxes", "manifest.json").as_deref(), Some(&b"{}"[..]));
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    base_url: String,
    max_block_size: usize,
    state: Mutex<State>,
}

impl MemoryStore {
    /// Create an empty store using [`DEFAULT_BASE_URL`] and the default
    /// block size limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_block_size(super::MAX_BLOCK_SIZE)
    }

    /// Create an empty store that refuses blocks above `max_block_size`.
    #[must_use]
    pub fn with_max_block_size(max_block_size: usize) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            max_block_size,
            state: Mutex::new(State::default()),
        }
    }

    /// Make the `nth` (0-based) call of `operation` fail with an HTTP error.
    pub fn fail_on(&self, operation: StoreOperation, nth: usize) {
        self.lock().failures.push((operation, nth));
    }

    /// Seed a committed object without recording a call.
    pub fn insert_object(&self, container: &str, path: &str, data: impl Into<Vec<u8>>) {
        self.lock().objects.insert(key(container, path), data.into());
    }

    /// Return the committed content of an object, if any.
    #[must_use]
    pub fn object(&self, container: &str, path: &str) -> Option<Vec<u8>> {
        self.lock().objects.get(&key(container, path)).cloned()
    }

    /// Return the content type recorded by the last `put_object`.
    #[must_use]
    pub fn content_type(&self, container: &str, path: &str) -> Option<String> {
        self.lock().content_types.get(&key(container, path)).cloned()
    }

    /// Number of staged, uncommitted blocks for an object.
    #[must_use]
    pub fn staged_block_count(&self, container: &str, path: &str) -> usize {
        self.lock()
            .staged
            .get(&key(container, path))
            .map_or(0, HashMap::len)
    }

    /// All calls made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// The calls of one operation, in order.
    #[must_use]
    pub fn calls_of(&self, operation: StoreOperation) -> Vec<StoreCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.operation == operation)
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn key(container: &str, path: &str) -> ObjectKey {
    (container.to_owned(), path.to_owned())
}

fn rejected(operation: &'static str, key: &ObjectKey, reason: impl Into<String>) -> StoreError {
    StoreError::Rejected {
        operation,
        location: format!("{}/{}", key.0, key.1),
        reason: reason.into(),
    }
}

impl BlobStore for MemoryStore {
    fn create_empty_object(&self, container: &str, path: &str) -> Result<(), StoreError> {
        let key = key(container, path);
        let mut state = self.lock();
        state.record(StoreOperation::CreateEmpty, &key, None)?;
        state.objects.insert(key.clone(), Vec::new());
        state.staged.insert(key, HashMap::new());
        Ok(())
    }

    fn put_block(
        &self,
        container: &str,
        path: &str,
        block_id: &BlockId,
        data: &[u8],
    ) -> Result<(), StoreError> {
        let key = key(container, path);
        let mut state = self.lock();
        state.record(
            StoreOperation::PutBlock,
            &key,
            Some(block_id.as_str().to_owned()),
        )?;
        if data.len() > self.max_block_size {
            return Err(rejected(
                "put_block",
                &key,
                format!(
                    "block of {} bytes exceeds limit of {}",
                    data.len(),
                    self.max_block_size
                ),
            ));
        }
        let staged = state
            .staged
            .get_mut(&key)
            .ok_or_else(|| rejected("put_block", &key, "object was not created"))?;
        staged.insert(block_id.as_str().to_owned(), data.to_vec());
        Ok(())
    }

    fn put_block_list(
        &self,
        container: &str,
        path: &str,
        blocks: &[BlockListEntry],
    ) -> Result<(), StoreError> {
        let key = key(container, path);
        let ids: Vec<&str> = blocks.iter().map(|entry| entry.id.as_str()).collect();
        let mut state = self.lock();
        state.record(StoreOperation::PutBlockList, &key, Some(ids.join(",")))?;

        let staged = state
            .staged
            .remove(&key)
            .ok_or_else(|| rejected("put_block_list", &key, "object was not created"))?;
        let mut assembled = Vec::new();
        for id in ids {
            let data = staged
                .get(id)
                .ok_or_else(|| rejected("put_block_list", &key, format!("unknown block {id}")))?;
            assembled.extend_from_slice(data);
        }
        state.objects.insert(key, assembled);
        Ok(())
    }

    fn get_object(
        &self,
        container: &str,
        path: &str,
    ) -> Result<Box<dyn Read + Send>, StoreError> {
        let key = key(container, path);
        let mut state = self.lock();
        state.record(StoreOperation::GetObject, &key, None)?;
        let data = state
            .objects
            .get(&key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                location: format!("{}/{}", key.0, key.1),
            })?;
        Ok(Box::new(Cursor::new(data)))
    }

    fn put_object(
        &self,
        container: &str,
        path: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), StoreError> {
        let key = key(container, path);
        let mut state = self.lock();
        state.record(StoreOperation::PutObject, &key, None)?;
        state.objects.insert(key.clone(), data.to_vec());
        state.content_types.insert(key, content_type.to_owned());
        Ok(())
    }

    fn object_url(&self, container: &str, path: &str) -> String {
        format!("{}/{container}/{path}", self.base_url)
    }

    fn max_block_size(&self) -> usize {
        self.max_block_size
    }
}
