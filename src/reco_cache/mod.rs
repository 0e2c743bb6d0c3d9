//! Per-user recommendation cache.
//!
//! The only shared mutable resource between the background precompute job
//! and interactive reads. Writes are atomic full-entry replacements behind
//! an `RwLock`; readers get an `Arc` snapshot and can never observe a
//! partially written entry. Absence of an entry is a valid, expected state
//! (new user, cleared cache) handled by the caller's fallback policy.

use crate::scoring::RecommendationScore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// The most recently computed ranked list for one user.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CacheEntry {
    pub user_id: i64,
    /// Descending by score, ties by song id ascending.
    pub scores: Vec<RecommendationScore>,
    pub computed_at: DateTime<Utc>,
}

/// In-memory recommendation cache keyed by user id.
///
/// No automatic expiry; `computed_at` is exposed for staleness checks by
/// callers. Durability across restarts is not required.
#[derive(Default)]
pub struct RecoCache {
    entries: RwLock<HashMap<i64, Arc<CacheEntry>>>,
}

impl RecoCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only O(1) lookup; never triggers computation.
    pub fn get(&self, user_id: i64) -> Option<Arc<CacheEntry>> {
        self.entries.read().unwrap().get(&user_id).cloned()
    }

    /// Atomically replace the entry for the entry's user.
    pub fn put(&self, entry: CacheEntry) {
        let user_id = entry.user_id;
        self.entries
            .write()
            .unwrap()
            .insert(user_id, Arc::new(entry));
    }

    /// Drop one user's entry (logout, forced refresh).
    pub fn clear(&self, user_id: i64) {
        self.entries.write().unwrap().remove(&user_id);
    }

    /// Drop every entry (global events such as a catalog refresh).
    pub fn clear_all(&self) {
        self.entries.write().unwrap().clear();
    }

    pub fn entry_count(&self) -> usize {
        self.entries.read().unwrap().len()
    }
}
