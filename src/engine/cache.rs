//! Cache engine core and its thread-safe facade.
//!
//! ## Architecture
//!
//! ```text
//!   ┌─────────────────────────────────────────────────────────────┐
//!   │                      TagCache                               │
//!   │              parking_lot::Mutex<CacheCore>                  │
//!   │                                                             │
//!   │   ┌─────────────────────────────────────────────────────┐   │
//!   │   │                   CacheCore                         │   │
//!   │   │                                                     │   │
//!   │   │   FxHashMap<Arc<str>, CacheEntry>   (primary store) │   │
//!   │   │                                                     │   │
//!   │   │   RecencyList<Arc<str>>             (recency order) │   │
//!   │   │   head ─► [hot] ◄──► ... ◄──► [cold] ◄─ tail        │   │
//!   │   │                                                     │   │
//!   │   │   TagIndex                          (tag ─► keys)   │   │
//!   │   │                                                     │   │
//!   │   │   CacheCounters                     (statistics)    │   │
//!   │   └─────────────────────────────────────────────────────┘   │
//!   └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutating operation keeps the three key-bearing structures in
//! lockstep: a key is in the primary store iff it owns exactly one recency
//! node, and a (tag, key) pair is in the tag index iff that entry's tag set
//! contains the tag. `check_invariants` verifies both directions.
//!
//! ## Operation contracts
//!
//! | Operation          | Counters touched                          |
//! |--------------------|-------------------------------------------|
//! | `set`              | `sets`; `expirations` on stale incumbent; `evictions` per entry evicted |
//! | `get`              | `hits`, or `misses` (+`expirations` if the miss was a lazy expiry)      |
//! | `delete`           | `deletes` on live removal; `expirations` when the key was stale         |
//! | `keys` / `purge`   | `expirations` per stale entry swept       |
//! | `invalidate_tag`   | `deletes` per live removal; `expirations` for stale stragglers          |
//! | `flush`            | resets everything to zero                 |
//!
//! Expired entries are treated as absent everywhere: `get` and `delete`
//! remove them on contact, `keys` sweeps them, and they are never returned
//! or counted as live removals.
//!
//! ## Concurrency
//!
//! `CacheCore` is single-threaded. `TagCache` wraps it in one
//! `parking_lot::Mutex`: operations are short, cross-update several
//! structures, and must be observed atomically, so a single coordinating
//! lock is the correctness baseline. Even `get` writes (recency promotion,
//! counters), which is why this is a `Mutex` and not an `RwLock`. The lock
//! is never held across caller code; `get_or_set` takes its fallback value
//! eagerly for exactly that reason.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::config::CacheConfig;
use crate::ds::{RecencyList, TagIndex};
use crate::engine::entry::CacheEntry;
use crate::engine::stats::{CacheCounters, StatsSnapshot};
use crate::error::{InvariantError, InvariantKind};

/// Single-threaded cache engine.
///
/// All time-dependent operations take an explicit `now: Instant`, which
/// keeps the core deterministic and lets tests drive TTL behavior without
/// sleeping. [`TagCache`] is the clock-stamping, lock-guarded wrapper most
/// callers want.
#[derive(Debug)]
pub struct CacheCore {
    entries: FxHashMap<Arc<str>, CacheEntry>,
    recency: RecencyList<Arc<str>>,
    tags: TagIndex,
    counters: CacheCounters,
    config: CacheConfig,
}

impl CacheCore {
    /// Creates an engine with the given configuration.
    pub fn new(config: CacheConfig) -> Self {
        let (map, list) = match config.max_size() {
            Some(max) => (
                FxHashMap::with_capacity_and_hasher(max, Default::default()),
                RecencyList::with_capacity(max),
            ),
            None => (FxHashMap::default(), RecencyList::new()),
        };
        Self {
            entries: map,
            recency: list,
            tags: TagIndex::new(),
            counters: CacheCounters::default(),
            config,
        }
    }

    /// Returns the configuration this engine was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the number of stored entries, including expired entries that
    /// have not been swept yet (they occupy capacity until accessed).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts or overwrites `key` at time `now`.
    ///
    /// A stale incumbent is lazily expired first (counted as an
    /// expiration). On overwrite the old recency position and tag
    /// memberships are discarded. The entry expires at `now + ttl`, falling
    /// back to the configured default TTL, else never; a zero `ttl` is
    /// honored literally and produces an entry that is expired on its next
    /// access. If the insert pushes the cache over its bound, entries are
    /// evicted coldest-first until the bound holds again.
    ///
    /// Returns `false` and leaves the cache unchanged if `key` is empty or
    /// any tag is an empty string. Duplicate tags are collapsed.
    pub fn set_at(
        &mut self,
        now: Instant,
        key: &str,
        value: impl Into<Arc<str>>,
        ttl: Option<Duration>,
        tags: &[&str],
    ) -> bool {
        if key.is_empty() || tags.iter().any(|tag| tag.is_empty()) {
            return false;
        }

        if let Some(entry) = self.entries.get(key) {
            if entry.is_expired(now) {
                self.remove_entry(key);
                self.counters.record_expiration();
            }
        }

        // Overwrite: the incumbent's recency slot and tag memberships go
        // with it, and its key allocation is reused.
        let key_arc = if let Some((key_arc, old)) = self.entries.remove_entry(key) {
            self.recency.remove(old.node());
            for tag in old.tags() {
                self.tags.remove(tag, &key_arc);
            }
            key_arc
        } else {
            Arc::from(key)
        };

        let expires_at = ttl.or(self.config.default_ttl()).map(|ttl| now + ttl);

        let mut tag_list: Vec<Arc<str>> = Vec::with_capacity(tags.len());
        for &tag in tags {
            if tag_list.iter().any(|seen| &**seen == tag) {
                continue;
            }
            tag_list.push(Arc::from(tag));
        }

        let node = self.recency.push_front(Arc::clone(&key_arc));
        for tag in &tag_list {
            self.tags.insert(Arc::clone(tag), Arc::clone(&key_arc));
        }
        let entry = CacheEntry::new(value.into(), now, expires_at, tag_list, node);
        self.entries.insert(key_arc, entry);

        if let Some(max) = self.config.max_size() {
            while self.entries.len() > max {
                if self.evict_coldest().is_none() {
                    break;
                }
                self.counters.record_eviction();
            }
        }

        self.counters.record_set();
        true
    }

    /// Looks up `key` at time `now`.
    ///
    /// A hit promotes the entry to the hot end of the recency order and
    /// returns a shared copy of the value. A stale entry is removed on
    /// contact and reported as a miss (counting both an expiration and a
    /// miss).
    pub fn get_at(&mut self, now: Instant, key: &str) -> Option<Arc<str>> {
        let expired = match self.entries.get(key) {
            None => {
                self.counters.record_miss();
                return None;
            }
            Some(entry) => entry.is_expired(now),
        };

        if expired {
            self.remove_entry(key);
            self.counters.record_expiration();
            self.counters.record_miss();
            return None;
        }

        let Some(entry) = self.entries.get_mut(key) else {
            self.counters.record_miss();
            return None;
        };
        entry.record_access();
        let node = entry.node();
        let value = Arc::clone(entry.value());
        self.recency.move_to_front(node);
        self.counters.record_hit();
        Some(value)
    }

    /// Removes `key` at time `now`.
    ///
    /// Returns `true` if a live entry was removed. An expired-but-unswept
    /// entry is treated as absent: it is removed, counted as an expiration,
    /// and the call returns `false`, mirroring what `get` would have
    /// reported.
    pub fn delete_at(&mut self, now: Instant, key: &str) -> bool {
        let expired = match self.entries.get(key) {
            None => return false,
            Some(entry) => entry.is_expired(now),
        };

        self.remove_entry(key);
        if expired {
            self.counters.record_expiration();
            false
        } else {
            self.counters.record_delete();
            true
        }
    }

    /// Returns a snapshot of all live keys, sweeping any expired entries
    /// found along the way. Order is unspecified.
    pub fn keys_at(&mut self, now: Instant) -> Vec<Arc<str>> {
        self.sweep_expired(now);
        self.entries.keys().cloned().collect()
    }

    /// Removes every expired entry, counting each as an expiration, and
    /// returns how many were swept.
    pub fn purge_expired_at(&mut self, now: Instant) -> usize {
        self.sweep_expired(now)
    }

    /// Removes every live entry tagged with `tag` and returns how many were
    /// removed. Each live removal counts as a delete; expired entries found
    /// in the bucket are swept as expirations and excluded from the count.
    pub fn invalidate_tag_at(&mut self, now: Instant, tag: &str) -> usize {
        let Some(bucket) = self.tags.take_bucket(tag) else {
            return 0;
        };

        let mut removed = 0;
        for key in bucket {
            let Some(entry) = self.remove_entry(&key) else {
                continue;
            };
            if entry.is_expired(now) {
                self.counters.record_expiration();
            } else {
                self.counters.record_delete();
                removed += 1;
            }
        }
        removed
    }

    /// Returns the live cached value for `key`, or inserts `value` exactly
    /// as [`set_at`](Self::set_at) would and returns the stored copy.
    ///
    /// A hit counts as a get; a miss counts as a get followed by a set.
    /// Returns `None` only when the insert is rejected for invalid input.
    pub fn get_or_set_at(
        &mut self,
        now: Instant,
        key: &str,
        value: impl Into<Arc<str>>,
        ttl: Option<Duration>,
        tags: &[&str],
    ) -> Option<Arc<str>> {
        if let Some(found) = self.get_at(now, key) {
            return Some(found);
        }
        if !self.set_at(now, key, value, ttl, tags) {
            return None;
        }
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Removes every entry, zeroes all statistics counters, and returns how
    /// many entries were dropped.
    pub fn flush(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.recency.clear();
        self.tags.clear();
        self.counters.reset();
        count
    }

    /// Captures a consistent statistics snapshot.
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot::capture(&self.counters, self.entries.len(), self.config.max_size())
    }

    /// Verifies the cross-structure invariants, returning the first
    /// violation found (tagged with the structure it was detected in).
    /// Intended for tests and debug assertions.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.entries.len() != self.recency.len() {
            return Err(InvariantError::new(
                InvariantKind::RecencyOrder,
                format!(
                    "store holds {} entries but recency order holds {}",
                    self.entries.len(),
                    self.recency.len()
                ),
            ));
        }

        if let Some(max) = self.config.max_size() {
            if self.entries.len() > max {
                return Err(InvariantError::new(
                    InvariantKind::Capacity,
                    format!("size {} exceeds max_size {}", self.entries.len(), max),
                ));
            }
        }

        for (key, entry) in &self.entries {
            match self.recency.get(entry.node()) {
                Some(listed) if listed == key => {}
                Some(listed) => {
                    return Err(InvariantError::new(
                        InvariantKind::RecencyOrder,
                        format!("node for {:?} holds {:?}", key, listed),
                    ));
                }
                None => {
                    return Err(InvariantError::new(
                        InvariantKind::RecencyOrder,
                        format!("entry {:?} points at a dead node", key),
                    ));
                }
            }
            for tag in entry.tags() {
                if !self.tags.contains(tag, key) {
                    return Err(InvariantError::new(
                        InvariantKind::TagIndex,
                        format!("entry {:?} carries tag {:?} missing from the index", key, tag),
                    ));
                }
            }
        }

        for key in self.recency.iter() {
            if !self.entries.contains_key(key.as_ref()) {
                return Err(InvariantError::new(
                    InvariantKind::RecencyOrder,
                    format!("order holds {:?} which is not stored", key),
                ));
            }
        }

        for (tag, bucket) in self.tags.iter() {
            if bucket.is_empty() {
                return Err(InvariantError::new(
                    InvariantKind::TagIndex,
                    format!("empty bucket left for tag {:?}", tag),
                ));
            }
            for key in bucket {
                match self.entries.get(key.as_ref()) {
                    Some(entry) if entry.tags().contains(tag) => {}
                    Some(_) => {
                        return Err(InvariantError::new(
                            InvariantKind::TagIndex,
                            format!(
                                "{:?} is listed under tag {:?} but the entry does not carry it",
                                key, tag
                            ),
                        ));
                    }
                    None => {
                        return Err(InvariantError::new(
                            InvariantKind::TagIndex,
                            format!(
                                "{:?} is listed under tag {:?} but the key is not stored",
                                key, tag
                            ),
                        ));
                    }
                }
            }
        }

        Ok(())
    }

    /// Removes `key` from all three structures. Counter updates are the
    /// caller's responsibility since the cause (delete, evict, expire)
    /// decides which counter moves.
    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry> {
        let (key_arc, entry) = self.entries.remove_entry(key)?;
        self.recency.remove(entry.node());
        for tag in entry.tags() {
            self.tags.remove(tag, &key_arc);
        }
        Some(entry)
    }

    fn evict_coldest(&mut self) -> Option<Arc<str>> {
        let key = self.recency.pop_back()?;
        if let Some(entry) = self.entries.remove(&*key) {
            for tag in entry.tags() {
                self.tags.remove(tag, &key);
            }
        }
        Some(key)
    }

    fn sweep_expired(&mut self, now: Instant) -> usize {
        let stale: Vec<Arc<str>> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| Arc::clone(key))
            .collect();

        for key in &stale {
            self.remove_entry(key);
            self.counters.record_expiration();
        }
        stale.len()
    }
}

/// Thread-safe cache facade.
///
/// Wraps a [`CacheCore`] in a single coordinating `parking_lot::Mutex` and
/// stamps every operation with `Instant::now()`. Operations are
/// linearizable: each one acquires the lock, runs to completion against all
/// four internal structures, and releases before returning, so no observer
/// ever sees the tag index referencing a missing key or the recency order
/// holding a stale node.
///
/// # Example
///
/// ```
/// use tagcache::{CacheConfig, TagCache};
///
/// let cache = TagCache::new(CacheConfig::new().with_max_size(1000));
///
/// assert!(cache.set("user:1", "alice", None, &["users"]));
/// assert!(cache.set("user:2", "bob", None, &["users", "admins"]));
///
/// assert_eq!(cache.get("user:1").as_deref(), Some("alice"));
/// assert_eq!(cache.invalidate_tag("users"), 2);
/// assert!(cache.is_empty());
/// ```
#[derive(Debug)]
pub struct TagCache {
    core: Mutex<CacheCore>,
}

impl TagCache {
    /// Creates a cache with the given configuration.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            core: Mutex::new(CacheCore::new(config)),
        }
    }

    /// Inserts or overwrites `key`. See [`CacheCore::set_at`].
    pub fn set(
        &self,
        key: &str,
        value: impl Into<Arc<str>>,
        ttl: Option<Duration>,
        tags: &[&str],
    ) -> bool {
        self.core.lock().set_at(Instant::now(), key, value, ttl, tags)
    }

    /// Returns a shared copy of the value for `key`, promoting it to
    /// most-recently-used. See [`CacheCore::get_at`].
    pub fn get(&self, key: &str) -> Option<Arc<str>> {
        self.core.lock().get_at(Instant::now(), key)
    }

    /// Removes `key`, returning `true` if a live entry was removed.
    /// See [`CacheCore::delete_at`].
    pub fn delete(&self, key: &str) -> bool {
        self.core.lock().delete_at(Instant::now(), key)
    }

    /// Returns a snapshot of all live keys in unspecified order, sweeping
    /// expired entries along the way.
    pub fn keys(&self) -> Vec<Arc<str>> {
        self.core.lock().keys_at(Instant::now())
    }

    /// Removes every live entry tagged with `tag`; returns the number
    /// removed. See [`CacheCore::invalidate_tag_at`].
    pub fn invalidate_tag(&self, tag: &str) -> usize {
        self.core.lock().invalidate_tag_at(Instant::now(), tag)
    }

    /// Returns the cached value for `key` or inserts `value` and returns
    /// the stored copy. See [`CacheCore::get_or_set_at`].
    pub fn get_or_set(
        &self,
        key: &str,
        value: impl Into<Arc<str>>,
        ttl: Option<Duration>,
        tags: &[&str],
    ) -> Option<Arc<str>> {
        self.core
            .lock()
            .get_or_set_at(Instant::now(), key, value, ttl, tags)
    }

    /// Sweeps every expired entry now instead of waiting for lazy removal;
    /// returns how many were swept.
    pub fn purge_expired(&self) -> usize {
        self.core.lock().purge_expired_at(Instant::now())
    }

    /// Removes every entry and zeroes all counters; returns the number of
    /// entries dropped.
    pub fn flush(&self) -> usize {
        self.core.lock().flush()
    }

    /// Captures a consistent statistics snapshot.
    pub fn stats(&self) -> StatsSnapshot {
        self.core.lock().stats()
    }

    /// Renders [`stats`](Self::stats) as a JSON object.
    pub fn stats_json(&self) -> String {
        self.stats().to_json()
    }

    /// Returns the stored entry count, expired-but-unswept included.
    pub fn len(&self) -> usize {
        self.core.lock().len()
    }

    /// Returns `true` if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.core.lock().is_empty()
    }

    /// Verifies cross-structure invariants under the lock.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.core.lock().check_invariants()
    }
}

impl Default for TagCache {
    /// An unbounded cache whose entries never expire by default.
    fn default() -> Self {
        Self::new(CacheConfig::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_TAGS: &[&str] = &[];

    fn core() -> CacheCore {
        CacheCore::new(CacheConfig::new())
    }

    fn bounded(max: usize) -> CacheCore {
        CacheCore::new(CacheConfig::new().with_max_size(max))
    }

    #[test]
    fn set_get_roundtrip() {
        let mut cache = core();
        let now = Instant::now();

        assert!(cache.set_at(now, "a", "1", None, NO_TAGS));
        assert_eq!(cache.get_at(now, "a").as_deref(), Some("1"));
        assert_eq!(cache.get_at(now, "b"), None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.sets, 1);
        assert_eq!(stats.size, 1);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn overwrite_replaces_value_and_tags() {
        let mut cache = core();
        let now = Instant::now();

        cache.set_at(now, "a", "1", None, &["x", "y"]);
        cache.set_at(now, "a", "2", None, &["y", "z"]);

        assert_eq!(cache.get_at(now, "a").as_deref(), Some("2"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.invalidate_tag_at(now, "x"), 0);
        assert_eq!(cache.invalidate_tag_at(now, "z"), 1);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn set_rejects_empty_key_and_empty_tag() {
        let mut cache = core();
        let now = Instant::now();

        assert!(!cache.set_at(now, "", "v", None, NO_TAGS));
        assert!(!cache.set_at(now, "k", "v", None, &["ok", ""]));
        assert!(cache.is_empty());
        assert_eq!(cache.stats().sets, 0);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn duplicate_tags_collapse() {
        let mut cache = core();
        let now = Instant::now();

        cache.set_at(now, "a", "1", None, &["x", "x", "x"]);
        assert_eq!(cache.invalidate_tag_at(now, "x"), 1);
        assert!(cache.is_empty());
        cache.check_invariants().unwrap();
    }

    #[test]
    fn empty_value_is_storable() {
        let mut cache = core();
        let now = Instant::now();

        assert!(cache.set_at(now, "a", "", None, NO_TAGS));
        assert_eq!(cache.get_at(now, "a").as_deref(), Some(""));
    }

    #[test]
    fn per_entry_ttl_wins_over_default() {
        let mut cache = CacheCore::new(
            CacheConfig::new().with_default_ttl(Duration::from_secs(100)),
        );
        let t0 = Instant::now();

        cache.set_at(t0, "short", "v", Some(Duration::from_secs(1)), NO_TAGS);
        cache.set_at(t0, "default", "v", None, NO_TAGS);

        let t1 = t0 + Duration::from_secs(2);
        assert_eq!(cache.get_at(t1, "short"), None);
        assert_eq!(cache.get_at(t1, "default").as_deref(), Some("v"));

        let t2 = t0 + Duration::from_secs(100);
        assert_eq!(cache.get_at(t2, "default"), None);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn expired_get_counts_expiration_and_miss() {
        let mut cache = core();
        let t0 = Instant::now();

        cache.set_at(t0, "k", "v", Some(Duration::from_secs(1)), NO_TAGS);
        assert_eq!(cache.get_at(t0, "k").as_deref(), Some("v"));

        let t1 = t0 + Duration::from_secs(2);
        assert_eq!(cache.get_at(t1, "k"), None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.size, 0);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn zero_ttl_is_a_tombstone() {
        let mut cache = core();
        let now = Instant::now();

        assert!(cache.set_at(now, "k", "v", Some(Duration::ZERO), NO_TAGS));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_at(now, "k"), None);
        assert_eq!(cache.stats().expirations, 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn set_over_stale_incumbent_counts_expiration() {
        let mut cache = core();
        let t0 = Instant::now();

        cache.set_at(t0, "k", "old", Some(Duration::from_secs(1)), &["x"]);
        let t1 = t0 + Duration::from_secs(5);
        cache.set_at(t1, "k", "new", None, NO_TAGS);

        let stats = cache.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.sets, 2);
        assert_eq!(cache.get_at(t1, "k").as_deref(), Some("new"));
        assert_eq!(cache.invalidate_tag_at(t1, "x"), 0);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn delete_live_then_absent() {
        let mut cache = core();
        let now = Instant::now();

        cache.set_at(now, "a", "1", None, &["x"]);
        assert!(cache.delete_at(now, "a"));
        assert!(!cache.delete_at(now, "a"));

        let stats = cache.stats();
        assert_eq!(stats.deletes, 1);
        assert!(cache.is_empty());
        cache.check_invariants().unwrap();
    }

    #[test]
    fn delete_of_expired_entry_reports_absent() {
        let mut cache = core();
        let t0 = Instant::now();

        cache.set_at(t0, "k", "v", Some(Duration::from_secs(1)), NO_TAGS);
        let t1 = t0 + Duration::from_secs(2);

        assert!(!cache.delete_at(t1, "k"));
        let stats = cache.stats();
        assert_eq!(stats.deletes, 0);
        assert_eq!(stats.expirations, 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn eviction_consumes_coldest_first() {
        let mut cache = bounded(2);
        let now = Instant::now();

        cache.set_at(now, "a", "1", None, NO_TAGS);
        cache.set_at(now, "b", "2", None, NO_TAGS);
        // Touch "a" so "b" becomes the eviction candidate.
        cache.get_at(now, "a");
        cache.set_at(now, "c", "3", None, NO_TAGS);

        assert_eq!(cache.get_at(now, "a").as_deref(), Some("1"));
        assert_eq!(cache.get_at(now, "b"), None);
        assert_eq!(cache.get_at(now, "c").as_deref(), Some("3"));
        assert_eq!(cache.stats().evictions, 1);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn overwrite_never_evicts_others() {
        let mut cache = bounded(2);
        let now = Instant::now();

        cache.set_at(now, "a", "1", None, NO_TAGS);
        cache.set_at(now, "b", "2", None, NO_TAGS);
        cache.set_at(now, "a", "1b", None, NO_TAGS);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 0);
        assert_eq!(cache.get_at(now, "b").as_deref(), Some("2"));
        cache.check_invariants().unwrap();
    }

    #[test]
    fn max_size_one_churns_one_entry() {
        let mut cache = bounded(1);
        let now = Instant::now();

        cache.set_at(now, "a", "1", None, NO_TAGS);
        cache.set_at(now, "b", "2", None, NO_TAGS);
        cache.set_at(now, "c", "3", None, NO_TAGS);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().evictions, 2);
        assert_eq!(cache.get_at(now, "c").as_deref(), Some("3"));
        cache.check_invariants().unwrap();
    }

    #[test]
    fn eviction_detaches_tags() {
        let mut cache = bounded(1);
        let now = Instant::now();

        cache.set_at(now, "a", "1", None, &["x"]);
        cache.set_at(now, "b", "2", None, &["x"]);

        // "a" was evicted, so only "b" is left under the tag.
        assert_eq!(cache.invalidate_tag_at(now, "x"), 1);
        assert!(cache.is_empty());
        cache.check_invariants().unwrap();
    }

    #[test]
    fn keys_sweep_expired_entries() {
        let mut cache = core();
        let t0 = Instant::now();

        cache.set_at(t0, "live", "v", None, NO_TAGS);
        cache.set_at(t0, "stale", "v", Some(Duration::from_secs(1)), NO_TAGS);

        let t1 = t0 + Duration::from_secs(2);
        let keys = cache.keys_at(t1);
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].as_ref(), "live");
        assert_eq!(cache.stats().expirations, 1);
        assert_eq!(cache.len(), 1);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn purge_reports_sweep_count() {
        let mut cache = core();
        let t0 = Instant::now();

        cache.set_at(t0, "a", "v", Some(Duration::from_secs(1)), &["x"]);
        cache.set_at(t0, "b", "v", Some(Duration::from_secs(1)), &["x"]);
        cache.set_at(t0, "c", "v", None, &["x"]);

        let t1 = t0 + Duration::from_secs(2);
        assert_eq!(cache.purge_expired_at(t1), 2);
        assert_eq!(cache.purge_expired_at(t1), 0);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().expirations, 2);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn invalidate_tag_removes_all_carriers() {
        let mut cache = core();
        let now = Instant::now();

        cache.set_at(now, "a", "1", None, &["x"]);
        cache.set_at(now, "b", "2", None, &["x", "y"]);
        cache.set_at(now, "c", "3", None, &["y"]);

        assert_eq!(cache.invalidate_tag_at(now, "x"), 2);
        let keys = cache.keys_at(now);
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].as_ref(), "c");
        assert_eq!(cache.stats().deletes, 2);

        // "b" left tag "y" as well; only "c" remains under it.
        assert_eq!(cache.invalidate_tag_at(now, "y"), 1);
        assert!(cache.is_empty());
        cache.check_invariants().unwrap();
    }

    #[test]
    fn invalidate_unknown_tag_is_zero() {
        let mut cache = core();
        let now = Instant::now();
        cache.set_at(now, "a", "1", None, &["x"]);
        assert_eq!(cache.invalidate_tag_at(now, "nope"), 0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalidate_tag_skips_expired_carriers() {
        let mut cache = core();
        let t0 = Instant::now();

        cache.set_at(t0, "live", "v", None, &["x"]);
        cache.set_at(t0, "stale", "v", Some(Duration::from_secs(1)), &["x"]);

        let t1 = t0 + Duration::from_secs(2);
        assert_eq!(cache.invalidate_tag_at(t1, "x"), 1);

        let stats = cache.stats();
        assert_eq!(stats.deletes, 1);
        assert_eq!(stats.expirations, 1);
        assert!(cache.is_empty());
        cache.check_invariants().unwrap();
    }

    #[test]
    fn flush_clears_state_and_counters() {
        let mut cache = bounded(2);
        let now = Instant::now();

        cache.set_at(now, "a", "1", None, &["x"]);
        cache.set_at(now, "b", "2", None, NO_TAGS);
        cache.get_at(now, "a");
        cache.get_at(now, "missing");
        cache.set_at(now, "c", "3", None, NO_TAGS);

        assert_eq!(cache.flush(), 2);
        assert_eq!(cache.flush(), 0);

        let stats = cache.stats();
        assert_eq!(stats.size, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.sets, 0);
        assert_eq!(stats.deletes, 0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.expirations, 0);
        assert_eq!(stats.hit_rate, 0.0);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn get_or_set_returns_cached_then_inserts() {
        let mut cache = core();
        let now = Instant::now();

        let stored = cache.get_or_set_at(now, "k", "first", None, NO_TAGS);
        assert_eq!(stored.as_deref(), Some("first"));

        let cached = cache.get_or_set_at(now, "k", "second", None, NO_TAGS);
        assert_eq!(cached.as_deref(), Some("first"));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.sets, 1);
    }

    #[test]
    fn get_or_set_rejects_invalid_input() {
        let mut cache = core();
        let now = Instant::now();
        assert_eq!(cache.get_or_set_at(now, "", "v", None, NO_TAGS), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn hit_rate_matches_gets() {
        let mut cache = core();
        let now = Instant::now();

        cache.set_at(now, "a", "1", None, NO_TAGS);
        cache.get_at(now, "a");
        cache.get_at(now, "a");
        cache.get_at(now, "missing");
        cache.get_at(now, "missing");

        let stats = cache.stats();
        assert_eq!(stats.hits + stats.misses, 4);
        assert_eq!(stats.hit_rate, 0.5);
    }

    #[test]
    fn facade_smoke() {
        let cache = TagCache::new(CacheConfig::new().with_max_size(2));

        assert!(cache.set("a", "1", None, &["x"]));
        assert!(cache.set("b", "2", None, &["x"]));
        assert_eq!(cache.get("a").as_deref(), Some("1"));
        assert_eq!(cache.len(), 2);

        assert!(cache.set("c", "3", None, NO_TAGS));
        assert_eq!(cache.get("b"), None);

        assert_eq!(cache.invalidate_tag("x"), 1);
        assert!(cache.delete("c"));
        assert!(cache.is_empty());
        assert_eq!(cache.keys().len(), 0);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn facade_stats_json_is_well_formed() {
        let cache = TagCache::default();
        cache.set("a", "1", None, NO_TAGS);
        cache.get("a");

        let json: serde_json::Value =
            serde_json::from_str(&cache.stats_json()).expect("stats must serialize");
        assert_eq!(json["size"], 1);
        assert!(json["max_size"].is_null());
        assert_eq!(json["hits"], 1);
        assert_eq!(json["hit_rate"], 1.0);
    }

    #[test]
    fn facade_get_or_set_and_purge() {
        let cache = TagCache::default();

        let v = cache.get_or_set("k", "v", None, NO_TAGS);
        assert_eq!(v.as_deref(), Some("v"));
        assert_eq!(cache.purge_expired(), 0);

        cache.set("t", "v", Some(Duration::ZERO), NO_TAGS);
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.flush(), 1);
    }
}
