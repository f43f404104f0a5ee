//! Tag index: maps each tag to the set of keys currently carrying it.
//!
//! Buckets are dropped the moment their last key leaves, so a churning tag
//! vocabulary cannot grow the index without bound. An empty bucket in the
//! map is an invariant violation.
//!
//! Tags are case-sensitive and carry no hierarchy; keys and tags are shared
//! `Arc<str>` so membership costs one pointer-sized clone, not a string
//! allocation.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

/// Secondary index from tag to the keys tagged with it.
#[derive(Debug, Default)]
pub struct TagIndex {
    buckets: FxHashMap<Arc<str>, FxHashSet<Arc<str>>>,
}

impl TagIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of distinct tags currently indexed.
    pub fn tag_count(&self) -> usize {
        self.buckets.len()
    }

    /// Returns `true` if no tags are indexed.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Returns `true` if `key` is in the bucket for `tag`.
    pub fn contains(&self, tag: &str, key: &str) -> bool {
        self.buckets
            .get(tag)
            .map(|bucket| bucket.contains(key))
            .unwrap_or(false)
    }

    /// Returns the number of keys carrying `tag`.
    pub fn bucket_len(&self, tag: &str) -> usize {
        self.buckets.get(tag).map(|bucket| bucket.len()).unwrap_or(0)
    }

    /// Adds `key` to the bucket for `tag`, creating the bucket if needed.
    /// Returns `true` if the key was not already present.
    pub fn insert(&mut self, tag: Arc<str>, key: Arc<str>) -> bool {
        self.buckets.entry(tag).or_default().insert(key)
    }

    /// Removes `key` from the bucket for `tag`, dropping the bucket if it
    /// drains. Returns `true` if the key was present.
    pub fn remove(&mut self, tag: &str, key: &str) -> bool {
        let Some(bucket) = self.buckets.get_mut(tag) else {
            return false;
        };
        let removed = bucket.remove(key);
        if bucket.is_empty() {
            self.buckets.remove(tag);
        }
        removed
    }

    /// Removes and returns the whole bucket for `tag`, if present.
    pub fn take_bucket(&mut self, tag: &str) -> Option<FxHashSet<Arc<str>>> {
        self.buckets.remove(tag)
    }

    /// Iterates `(tag, bucket)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, &FxHashSet<Arc<str>>)> {
        self.buckets.iter()
    }

    /// Drops every bucket.
    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate(&self) {
        for (tag, bucket) in &self.buckets {
            assert!(!bucket.is_empty(), "empty bucket left for tag {:?}", tag);
        }
    }
}
