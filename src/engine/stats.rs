//! Operation counters and the public statistics snapshot.

use serde::Serialize;

/// Monotonic operation counters, mutated only under the engine lock.
///
/// `hits + misses` always equals the number of completed `get` calls since
/// the last flush; the counters are reset only by `flush`.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct CacheCounters {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub evictions: u64,
    pub expirations: u64,
}

impl CacheCounters {
    #[inline]
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    #[inline]
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    #[inline]
    pub fn record_set(&mut self) {
        self.sets += 1;
    }

    #[inline]
    pub fn record_delete(&mut self) {
        self.deletes += 1;
    }

    #[inline]
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    #[inline]
    pub fn record_expiration(&mut self) {
        self.expirations += 1;
    }

    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A consistent point-in-time statistics report.
///
/// Captured in one piece under the engine lock, so the counters reconcile
/// with each other (e.g. `hits + misses` equals the gets issued since the
/// last flush). Serializes to the JSON document
/// `{"size":..,"max_size":..,"hits":..,"misses":..,"sets":..,"deletes":..,
/// "evictions":..,"expirations":..,"hit_rate":..}` with `max_size` as
/// `null` for an unbounded cache.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Live entry count, including expired entries not yet swept.
    pub size: usize,
    /// Configured entry bound, `None` when unbounded.
    pub max_size: Option<usize>,
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub evictions: u64,
    pub expirations: u64,
    /// `hits / (hits + misses)`, `0.0` before any get.
    pub hit_rate: f64,
}

impl StatsSnapshot {
    pub(crate) fn capture(
        counters: &CacheCounters,
        size: usize,
        max_size: Option<usize>,
    ) -> Self {
        let gets = counters.hits + counters.misses;
        let hit_rate = if gets == 0 {
            0.0
        } else {
            counters.hits as f64 / gets as f64
        };
        Self {
            size,
            max_size,
            hits: counters.hits,
            misses: counters.misses,
            sets: counters.sets,
            deletes: counters.deletes,
            evictions: counters.evictions,
            expirations: counters.expirations,
            hit_rate,
        }
    }

    /// Renders the snapshot as a JSON object.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
