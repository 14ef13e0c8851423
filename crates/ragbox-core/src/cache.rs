//! Local sync cache: document id → last successfully pushed fingerprint.
//!
//! Owned by exactly one [`SyncCoordinator`](crate::coordinator::SyncCoordinator)
//! and never persisted. Entries only reflect pushes the store confirmed, so
//! a stale entry can at worst cause a skipped upsert, never a lost one after
//! an explicit delete or reconciliation.

use std::collections::{HashMap, HashSet};

/// In-memory fingerprint cache. No eviction; size is bounded by
/// [`retain`](SyncCache::retain) and [`clear`](SyncCache::clear).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncCache {
    entries: HashMap<String, String>,
}

impl SyncCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last confirmed fingerprint for `id`.
    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(String::as_str)
    }

    /// Record `fingerprint` as pushed for `id`, replacing any earlier one.
    pub fn set(&mut self, id: impl Into<String>, fingerprint: impl Into<String>) {
        self.entries.insert(id.into(), fingerprint.into());
    }

    /// Forget `id`, returning its fingerprint if it was cached.
    pub fn remove(&mut self, id: &str) -> Option<String> {
        self.entries.remove(id)
    }

    /// Drop every entry whose id is not in `keep`. O(n) in cache size.
    pub fn retain(&mut self, keep: &HashSet<&str>) {
        self.entries.retain(|id, _| keep.contains(id.as_str()));
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached ids.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a fingerprint is cached for `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Cached ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}
