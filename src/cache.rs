//! Filtered-result cache with TTL expiry and LRU eviction
//!
//! Keyed by the normalized (query, country) pair. Entries expire lazily —
//! there is no background sweeper; expiry is enforced on the access path
//! (`get` for the looked-up key, `set` for the whole store). When the store
//! is over capacity after an insert, least-recently-used entries are evicted
//! until it holds at most `max_entries`.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::models::SearchResults;

/// Build the canonical cache key from the two request dimensions.
///
/// Both inputs are trimmed and lower-cased, then joined with `:`. The
/// separator is not escaped, so a raw colon inside the query text can in
/// theory collide with another (query, country) pair — an accepted
/// limitation of the key format, kept for readable log output.
pub fn cache_key(query: &str, country: &str) -> String {
    format!(
        "{}:{}",
        query.trim().to_lowercase(),
        country.trim().to_lowercase()
    )
}

/// A cached filtered result list with its insertion timestamp.
struct CacheEntry {
    results: SearchResults,
    stored_at: Instant,
}

/// Recency-ordered store: `order` holds keys from LRU (front) to MRU (back).
///
/// Every key in `order` appears exactly once and has a matching entry in
/// `entries`; all mutation happens while the outer mutex is held.
#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    order: VecDeque<String>,
}

impl CacheInner {
    /// Move `key` to the MRU position. The key must already be in `order`.
    fn promote(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }

    /// Remove `key` from both the map and the recency order.
    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.entries.remove(key)
    }
}

/// Thread-safe result cache shared by all request handlers.
///
/// One mutex guards the full check-expire-promote-insert-evict sequence of
/// each operation, so concurrent `get`/`set` calls cannot interleave halfway
/// through and corrupt the recency order or the capacity accounting. Neither
/// operation performs I/O inside the critical section.
pub struct ResultCache {
    inner: Mutex<CacheInner>,
    ttl: Duration,
    max_entries: usize,
}

impl ResultCache {
    /// Create a cache with the given TTL and capacity.
    ///
    /// `max_entries` is clamped to a minimum of 1 so the eviction loop can
    /// never discard the entry being inserted.
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Look up the filtered results for (query, country).
    ///
    /// Returns `None` if the key is absent or its entry has aged past the
    /// TTL; an expired entry is deleted on the spot. A hit promotes the key
    /// to the most-recently-used position. A miss is a normal outcome, never
    /// an error.
    pub fn get(&self, query: &str, country: &str) -> Option<SearchResults> {
        self.get_at(query, country, Instant::now())
    }

    /// Store freshly filtered results for (query, country).
    ///
    /// Sweeps every expired entry from the store first (so dead entries free
    /// capacity before any live one is sacrificed), then inserts or
    /// overwrites the key at the MRU position with a fresh timestamp, then
    /// evicts LRU entries until the store holds at most `max_entries`.
    pub fn set(&self, query: &str, country: &str, results: SearchResults) {
        self.set_at(query, country, results, Instant::now());
    }

    /// Number of entries currently stored, including any not yet swept.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether the store currently holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Remove all entries.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.stored_at) >= self.ttl
    }

    /// `get` against an explicit clock, so tests can simulate elapsed time.
    fn get_at(&self, query: &str, country: &str, now: Instant) -> Option<SearchResults> {
        let key = cache_key(query, country);
        let mut inner = self.inner.lock();

        let expired = match inner.entries.get(&key) {
            Some(entry) => self.is_expired(entry, now),
            None => {
                debug!(%key, "cache miss");
                return None;
            }
        };

        if expired {
            inner.remove(&key);
            debug!(%key, "cache entry expired");
            return None;
        }

        inner.promote(&key);
        debug!(%key, "cache hit");
        inner.entries.get(&key).map(|e| e.results.clone())
    }

    /// `set` against an explicit clock, so tests can simulate elapsed time.
    fn set_at(&self, query: &str, country: &str, results: SearchResults, now: Instant) {
        let key = cache_key(query, country);
        let mut inner = self.inner.lock();

        // Global expiry sweep before the capacity check: entries that will
        // never be read again must not count against the size bound.
        let dead: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, e)| self.is_expired(e, now))
            .map(|(k, _)| k.clone())
            .collect();
        for k in &dead {
            inner.remove(k);
            debug!(key = %k, "removed expired cache entry");
        }

        // Insert or overwrite at the MRU position with a fresh timestamp.
        let replaced = inner
            .entries
            .insert(
                key.clone(),
                CacheEntry {
                    results,
                    stored_at: now,
                },
            )
            .is_some();
        if replaced {
            inner.promote(&key);
            debug!(%key, "refreshed cache entry");
        } else {
            inner.order.push_back(key.clone());
            debug!(%key, "cached new entry");
        }

        // Eviction is purely recency-driven: remaining TTL does not matter.
        while inner.entries.len() > self.max_entries {
            match inner.order.pop_front() {
                Some(lru) => {
                    inner.entries.remove(&lru);
                    debug!(key = %lru, "cache at capacity, evicted LRU entry");
                }
                None => break,
            }
        }
    }
}
