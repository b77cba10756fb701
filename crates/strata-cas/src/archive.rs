// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Archive entry resolution.
//!
//! An [`ArchiveSource`] maps a full entry URI string to bytes. The
//! [`ArchiveCache`] fronts a source with a content-addressed store so each URI
//! is fetched once for as long as its blob stays in the store.

use std::collections::HashMap;
use std::sync::Arc;

use crate::{BlobHash, BlobStore, CasError, MemoryTier};

/// Backend that reads archive entries.
///
/// Implementations are assumed to return the same bytes for the same URI for
/// as long as the cache lives.
pub trait ArchiveSource {
    /// Read the entry named by `uri`.
    fn fetch(&self, uri: &str) -> Result<Vec<u8>, CasError>;
}

/// Archive backend holding entries in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryArchive {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryArchive {
    /// Empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, uri: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries.insert(uri.into(), bytes.into());
    }
}

impl ArchiveSource for MemoryArchive {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>, CasError> {
        self.entries.get(uri).cloned().ok_or_else(|| CasError::Missing {
            uri: uri.to_owned(),
        })
    }
}

/// URI-keyed cache over an [`ArchiveSource`].
///
/// The URI index points into a [`MemoryTier`]. Index entries whose blob the
/// tier has evicted are fetched again on the next resolve.
pub struct ArchiveCache {
    source: Box<dyn ArchiveSource>,
    index: HashMap<String, BlobHash>,
    store: MemoryTier,
    fetches: usize,
}

impl ArchiveCache {
    /// Unbounded cache over `source`.
    pub fn new(source: impl ArchiveSource + 'static) -> Self {
        Self::with_store(source, MemoryTier::new())
    }

    /// Cache over `source` holding at most `max_bytes` of payload.
    ///
    /// Once over budget the oldest blobs are evicted (the newest is always
    /// kept), and their URIs are fetched again when next resolved.
    pub fn with_budget(source: impl ArchiveSource + 'static, max_bytes: usize) -> Self {
        Self::with_store(source, MemoryTier::with_limits(max_bytes))
    }

    fn with_store(source: impl ArchiveSource + 'static, store: MemoryTier) -> Self {
        Self {
            source: Box::new(source),
            index: HashMap::new(),
            store,
            fetches: 0,
        }
    }

    /// Bytes of the entry named by `uri`.
    pub fn resolve(&mut self, uri: &str) -> Result<Arc<[u8]>, CasError> {
        if let Some(bytes) = self.index.get(uri).and_then(|h| self.store.get(h)) {
            return Ok(bytes);
        }
        let bytes = self.source.fetch(uri)?;
        self.fetches += 1;
        let hash = self.store.put(&bytes);
        self.index.insert(uri.to_owned(), hash);
        Ok(Arc::from(bytes))
    }

    /// Number of backend reads so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches
    }

    /// Number of distinct blobs held.
    pub fn blob_count(&self) -> usize {
        self.store.len()
    }
}

impl std::fmt::Debug for ArchiveCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveCache")
            .field("entries", &self.index.len())
            .field("blobs", &self.store.len())
            .field("bytes", &self.store.byte_count())
            .field("fetches", &self.fetches)
            .finish_non_exhaustive()
    }
}
