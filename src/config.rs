//! Cache construction parameters.
//!
//! `CacheConfig` is immutable once handed to the engine. Both knobs follow
//! the same normalization rule: a configured zero means "unset", so
//! `with_max_size(0)` yields an unbounded cache and
//! `with_default_ttl(Duration::ZERO)` yields entries that never expire
//! unless a per-entry TTL says otherwise.
//!
//! Note that this is distinct from a *per-entry* TTL of zero passed to
//! `set`, which is honored literally and produces an entry that is already
//! expired on its next access.

use std::time::Duration;

/// Immutable configuration for a cache instance.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use tagcache::CacheConfig;
///
/// let config = CacheConfig::new()
///     .with_max_size(10_000)
///     .with_default_ttl(Duration::from_secs(300));
///
/// assert_eq!(config.max_size(), Some(10_000));
/// assert_eq!(config.default_ttl(), Some(Duration::from_secs(300)));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheConfig {
    max_size: Option<usize>,
    default_ttl: Option<Duration>,
}

impl CacheConfig {
    /// Creates a configuration with no entry bound and no default TTL.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of live entries. Zero means unbounded.
    #[inline]
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = if max_size == 0 { None } else { Some(max_size) };
        self
    }

    /// Sets the TTL applied when `set` is called without one. A zero
    /// duration means no default (entries without a per-entry TTL never
    /// expire).
    #[inline]
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = if ttl.is_zero() { None } else { Some(ttl) };
        self
    }

    /// Returns the entry bound, or `None` when unbounded.
    #[inline]
    pub fn max_size(&self) -> Option<usize> {
        self.max_size
    }

    /// Returns the default TTL, or `None` when entries default to
    /// never expiring.
    #[inline]
    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }
}
