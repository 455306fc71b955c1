//! In-memory cache of resolved statuses.
//!
//! Entries are keyed by [`CitationKey`] (document type, number, date) and
//! live for the lifetime of the cache, normally one process run. Every
//! status is cached, including [`Status::RequestError`], so a flaky source
//! is asked at most once per identity.
//!
//! # Concurrent misses
//!
//! The lock is never held across an await. Two lookups of the same identity
//! that miss at the same moment both resolve, and the later write wins. The
//! enricher re-checks the cache after its concurrency gate, which narrows
//! the window to lookups that are admitted together.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::models::{CitationKey, Status};

/// Cache of statuses resolved during a run
#[derive(Debug, Default)]
pub struct StatusCache {
    entries: Mutex<HashMap<CitationKey, Status>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl StatusCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<CitationKey, Status>> {
        // A panic while holding the lock cannot leave the map half-written.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a status, counting the hit or miss
    pub fn get(&self, key: &CitationKey) -> Option<Status> {
        let found = self.entries().get(key).copied();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    /// Look up a status without touching the statistics
    pub fn peek(&self, key: &CitationKey) -> Option<Status> {
        self.entries().get(key).copied()
    }

    /// Store a status, replacing any previous one
    pub fn insert(&self, key: CitationKey, status: Status) {
        self.entries().insert(key, status);
    }

    /// Return the cached status, or run `resolve` and cache its result
    pub async fn get_or_resolve<F>(&self, key: CitationKey, resolve: F) -> Status
    where
        F: Future<Output = Status>,
    {
        if let Some(status) = self.get(&key) {
            tracing::debug!(citation = %key, status = %status, "Cache hit");
            return status;
        }

        let status = resolve.await;
        self.insert(key, status);
        status
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Drop all entries and reset the statistics
    pub fn clear(&self) {
        self.entries().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

/// Statistics about the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,

    /// Lookups that had to be resolved
    pub misses: u64,

    /// Number of cached identities
    pub entries: usize,
}

impl CacheStats {
    /// Share of lookups answered from the cache, 0.0 when nothing was looked up
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
