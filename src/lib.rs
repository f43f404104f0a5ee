//! tagcache: in-process key-value cache with LRU eviction, TTL expiration,
//! and tag-indexed bulk invalidation.
//!
//! The engine keeps three structures consistent under one coordinating
//! lock: a hash-based primary store, a recency order consumed coldest-first
//! by capacity eviction, and a secondary index from tag to keys that makes
//! bulk invalidation O(bucket) instead of a full scan. Expiration is lazy:
//! an expired entry is removed at the first access that observes it, or by
//! an explicit sweep.
//!
//! ```
//! use std::time::Duration;
//! use tagcache::{CacheConfig, TagCache};
//!
//! let cache = TagCache::new(
//!     CacheConfig::new()
//!         .with_max_size(10_000)
//!         .with_default_ttl(Duration::from_secs(300)),
//! );
//!
//! cache.set("session:9", "{\"user\":1}", None, &["sessions", "user:1"]);
//! assert_eq!(cache.get("session:9").as_deref(), Some("{\"user\":1}"));
//!
//! // Drop everything belonging to user 1 in one call.
//! assert_eq!(cache.invalidate_tag("user:1"), 1);
//!
//! println!("{}", cache.stats_json());
//! ```

pub mod config;
pub mod ds;
pub mod engine;
pub mod error;
pub mod exporter;
pub mod prelude;

pub use config::CacheConfig;
pub use engine::cache::{CacheCore, TagCache};
pub use engine::entry::CacheEntry;
pub use engine::stats::StatsSnapshot;
pub use error::{InvariantError, InvariantKind};
