// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Content-addressed blob store for Strata.
//!
//! `strata-cas` provides a [`BlobStore`] trait for content-addressed storage keyed
//! by BLAKE3 hash, an in-memory [`MemoryTier`], and an [`ArchiveCache`] that
//! resolves archive entry URIs to bytes through an [`ArchiveSource`] backend.
//!
//! # Hash Domain Policy
//!
//! CAS hash is content-only: `BLAKE3(bytes)` with no domain prefix. Two archive
//! entries with identical bytes are the same blob regardless of their URI.
//!
//! # Determinism Invariant
//!
//! No public API exposes store iteration order. CAS determinism is content-level
//! (same bytes → same hash), not collection-level.
#![forbid(unsafe_code)]

mod archive;
mod memory;

pub use archive::{ArchiveCache, ArchiveSource, MemoryArchive};
pub use memory::MemoryTier;

use std::sync::Arc;

/// A 32-byte BLAKE3 content hash.
///
/// The inner bytes are public for zero-cost access; the `Display` impl renders
/// lowercase hex for logging and error messages.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct BlobHash(pub [u8; 32]);

impl BlobHash {
    /// View the hash as a byte slice.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for BlobHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl From<blake3::Hash> for BlobHash {
    fn from(hash: blake3::Hash) -> Self {
        Self(*hash.as_bytes())
    }
}

/// Compute the BLAKE3 content hash of `bytes`.
pub fn blob_hash(bytes: &[u8]) -> BlobHash {
    blake3::hash(bytes).into()
}

/// Errors that can occur during CAS and archive operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CasError {
    /// The backend has no entry for the URI.
    #[error("[CAS_MISSING] no archive entry for {uri}")]
    Missing {
        /// Requested URI.
        uri: String,
    },
    /// The backend failed to read the entry.
    #[error("[CAS_BACKEND] {uri}: {message}")]
    Backend {
        /// Requested URI.
        uri: String,
        /// Backend message.
        message: String,
    },
}

/// Content-addressed blob store.
///
/// Implementations store opaque byte blobs keyed by their BLAKE3 hash.
///
/// # Absence Semantics
///
/// [`get`](BlobStore::get) returns `None` for missing blobs; this is **not** an
/// error. Missing blobs are expected (not yet fetched, evicted).
pub trait BlobStore {
    /// Compute hash and store. Returns the content hash.
    fn put(&mut self, bytes: &[u8]) -> BlobHash;

    /// Retrieve blob by hash. Returns `None` if not stored.
    fn get(&self, hash: &BlobHash) -> Option<Arc<[u8]>>;

    /// Check existence without retrieving.
    fn has(&self, hash: &BlobHash) -> bool;
}
