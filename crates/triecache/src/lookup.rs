//! Time-expiring lookup cache keyed by [`QuerySignature`]
//!
//! Expired entries are never returned: `get` checks the deadline and drops
//! the entry on the spot, `purge_expired` sweeps the rest.
//!
//! Every invalidation bumps a generation counter under the write lock.
//! A reader that captured the generation before computing a result can
//! store it with [`LookupCache::set_if_current`], which refuses when a
//! mutation happened in between.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use ahash::RandomState;
use parking_lot::RwLock;

use crate::signature::QuerySignature;
use crate::stats::CacheStats;

struct Entry<V> {
    value: V,
    /// `None` when `now + ttl` does not fit in an `Instant`
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Concurrent TTL cache
pub struct LookupCache<V> {
    entries: RwLock<HashMap<QuerySignature, Entry<V>, RandomState>>,
    generation: AtomicU64,
    stats: CacheStats,
}

impl<V: Clone> LookupCache<V> {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::with_hasher(RandomState::new())),
            generation: AtomicU64::new(0),
            stats: CacheStats::new(),
        }
    }

    /// Look up a live entry
    pub fn get(&self, signature: &QuerySignature) -> Option<V> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(signature) {
                Some(entry) if !entry.is_expired(now) => {
                    self.stats.record_hit();
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => {
                    self.stats.record_miss();
                    return None;
                }
            }
        }

        // Expired: drop it unless someone replaced it meanwhile
        let mut entries = self.entries.write();
        if entries.get(signature).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(signature);
            self.stats.record_expirations(1);
        }
        self.stats.record_miss();
        None
    }

    /// Store `value` for `ttl`, replacing any existing entry
    pub fn set(&self, signature: QuerySignature, value: V, ttl: Duration) {
        let mut entries = self.entries.write();
        Self::store(&mut entries, signature, value, ttl);
        self.stats.record_insert();
    }

    /// Store `value` only if no invalidation happened since `generation`
    ///
    /// # Returns
    /// * `bool` - True if the entry was stored
    pub fn set_if_current(
        &self,
        signature: QuerySignature,
        value: V,
        ttl: Duration,
        generation: u64,
    ) -> bool {
        let mut entries = self.entries.write();
        if self.generation.load(Ordering::Acquire) != generation {
            return false;
        }
        Self::store(&mut entries, signature, value, ttl);
        self.stats.record_insert();
        true
    }

    fn store(
        entries: &mut HashMap<QuerySignature, Entry<V>, RandomState>,
        signature: QuerySignature,
        value: V,
        ttl: Duration,
    ) {
        let expires_at = Instant::now().checked_add(ttl);
        entries.insert(signature, Entry { value, expires_at });
    }

    /// Current invalidation generation
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Remove one entry
    ///
    /// # Returns
    /// * `bool` - True if an entry was removed
    pub fn invalidate_key(&self, signature: &QuerySignature) -> bool {
        let mut entries = self.entries.write();
        self.bump();
        let removed = entries.remove(signature).is_some();
        if removed {
            self.stats.record_invalidations(1);
        }
        removed
    }

    /// Remove every entry whose signature matches `predicate`
    ///
    /// # Returns
    /// * `usize` - Number of entries removed
    pub fn invalidate_where<F>(&self, predicate: F) -> usize
    where
        F: Fn(&QuerySignature) -> bool,
    {
        let mut entries = self.entries.write();
        self.bump();
        let before = entries.len();
        entries.retain(|signature, _| !predicate(signature));
        let removed = before - entries.len();
        self.stats.record_invalidations(removed);
        removed
    }

    /// Remove every entry
    ///
    /// # Returns
    /// * `usize` - Number of entries removed
    pub fn flush(&self) -> usize {
        let mut entries = self.entries.write();
        self.bump();
        let removed = entries.len();
        entries.clear();
        self.stats.record_invalidations(removed);
        removed
    }

    /// Drop every expired entry
    ///
    /// # Returns
    /// * `usize` - Number of entries removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - entries.len();
        self.stats.record_expirations(removed);
        removed
    }

    /// Number of stored entries, expired ones not yet swept included
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Get cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    // Callers hold the write lock
    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

impl<V: Clone> Default for LookupCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
