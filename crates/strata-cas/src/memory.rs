// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Budgeted in-memory blob store.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::{blob_hash, BlobHash, BlobStore};

/// Blob store held in memory, evicting oldest blobs once over a byte budget.
///
/// Eviction runs after each insertion and never removes the blob just
/// inserted, so a single blob larger than the budget is still retrievable
/// until the next `put`.
#[derive(Debug, Default)]
pub struct MemoryTier {
    blobs: HashMap<BlobHash, Arc<[u8]>>,
    order: VecDeque<BlobHash>,
    byte_count: usize,
    budget: Option<usize>,
}

impl MemoryTier {
    /// Unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that keeps at most `max_bytes` (plus the newest blob).
    pub fn with_limits(max_bytes: usize) -> Self {
        Self {
            budget: Some(max_bytes),
            ..Self::default()
        }
    }

    /// Number of blobs held.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// `true` when nothing is held.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Sum of held blob sizes.
    pub fn byte_count(&self) -> usize {
        self.byte_count
    }

    /// Drop every blob. The budget is kept.
    pub fn clear(&mut self) {
        self.blobs.clear();
        self.order.clear();
        self.byte_count = 0;
    }

    fn evict_for(&mut self, newest: BlobHash) {
        let Some(budget) = self.budget else {
            return;
        };
        while self.byte_count > budget {
            let Some(oldest) = self.order.front().copied() else {
                break;
            };
            if oldest == newest {
                break;
            }
            self.order.pop_front();
            if let Some(bytes) = self.blobs.remove(&oldest) {
                self.byte_count -= bytes.len();
            }
        }
    }
}

impl BlobStore for MemoryTier {
    fn put(&mut self, bytes: &[u8]) -> BlobHash {
        let hash = blob_hash(bytes);
        if !self.blobs.contains_key(&hash) {
            self.byte_count += bytes.len();
            self.blobs.insert(hash, Arc::from(bytes));
            self.order.push_back(hash);
            self.evict_for(hash);
        }
        hash
    }

    fn get(&self, hash: &BlobHash) -> Option<Arc<[u8]>> {
        self.blobs.get(hash).cloned()
    }

    fn has(&self, hash: &BlobHash) -> bool {
        self.blobs.contains_key(hash)
    }
}
