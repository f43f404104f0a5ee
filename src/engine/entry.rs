//! One record per live key: the value plus its expiry, tags, access count,
//! and the handle into the recency order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::ds::NodeId;

/// A single cache entry.
///
/// The engine owns entries exclusively; callers only ever see `Arc<str>`
/// clones of the value. `node` is the entry's position in the recency list
/// and makes promotion and removal O(1).
#[derive(Debug, Clone)]
pub struct CacheEntry {
    value: Arc<str>,
    inserted_at: Instant,
    expires_at: Option<Instant>,
    access_count: u64,
    tags: Vec<Arc<str>>,
    node: NodeId,
}

impl CacheEntry {
    pub(crate) fn new(
        value: Arc<str>,
        inserted_at: Instant,
        expires_at: Option<Instant>,
        tags: Vec<Arc<str>>,
        node: NodeId,
    ) -> Self {
        Self {
            value,
            inserted_at,
            expires_at,
            access_count: 0,
            tags,
            node,
        }
    }

    /// Returns the stored value.
    #[inline]
    pub fn value(&self) -> &Arc<str> {
        &self.value
    }

    /// Returns the insertion (or last overwrite) instant.
    #[inline]
    pub fn inserted_at(&self) -> Instant {
        self.inserted_at
    }

    /// Returns the expiry instant, or `None` for entries that never expire.
    #[inline]
    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// Returns how many successful gets have touched this entry.
    #[inline]
    pub fn access_count(&self) -> u64 {
        self.access_count
    }

    /// Returns the entry's tags (deduplicated at insert).
    #[inline]
    pub fn tags(&self) -> &[Arc<str>] {
        &self.tags
    }

    #[inline]
    pub(crate) fn node(&self) -> NodeId {
        self.node
    }

    /// Returns `true` once the expiry instant has been reached.
    ///
    /// The comparison is `now >= expires_at`, so an entry inserted with a
    /// zero TTL is already expired on its next access.
    #[inline]
    pub fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(at) if now >= at)
    }

    /// Returns the remaining lifetime at `now`.
    ///
    /// `Some(Duration::ZERO)` once expired, `None` for entries without an
    /// expiry.
    pub fn ttl_remaining(&self, now: Instant) -> Option<Duration> {
        self.expires_at
            .map(|at| at.checked_duration_since(now).unwrap_or(Duration::ZERO))
    }

    #[inline]
    pub(crate) fn record_access(&mut self) {
        self.access_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_node() -> NodeId {
        let mut list = crate::ds::RecencyList::new();
        list.push_front(())
    }

    fn entry(expires_at: Option<Instant>, now: Instant) -> CacheEntry {
        CacheEntry::new(Arc::from("v"), now, expires_at, Vec::new(), dummy_node())
    }

    #[test]
    fn no_expiry_never_expires() {
        let now = Instant::now();
        let e = entry(None, now);
        assert!(!e.is_expired(now + Duration::from_secs(3600)));
        assert_eq!(e.ttl_remaining(now), None);
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let now = Instant::now();
        let e = entry(Some(now + Duration::from_secs(1)), now);

        assert!(!e.is_expired(now));
        assert!(!e.is_expired(now + Duration::from_millis(999)));
        assert!(e.is_expired(now + Duration::from_secs(1)));
        assert!(e.is_expired(now + Duration::from_secs(2)));
    }

    #[test]
    fn zero_ttl_is_expired_immediately() {
        let now = Instant::now();
        let e = entry(Some(now), now);
        assert!(e.is_expired(now));
    }

    #[test]
    fn ttl_remaining_counts_down_and_floors_at_zero() {
        let now = Instant::now();
        let e = entry(Some(now + Duration::from_secs(10)), now);

        assert_eq!(e.ttl_remaining(now), Some(Duration::from_secs(10)));
        assert_eq!(
            e.ttl_remaining(now + Duration::from_secs(4)),
            Some(Duration::from_secs(6))
        );
        assert_eq!(
            e.ttl_remaining(now + Duration::from_secs(30)),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn access_count_increments() {
        let now = Instant::now();
        let mut e = entry(None, now);
        assert_eq!(e.access_count(), 0);
        e.record_access();
        e.record_access();
        assert_eq!(e.access_count(), 2);
    }
}
