//! Path classification memo.
//!
//! [`MatchCache`] remembers whether a pathname was protected under the
//! current route set, so repeated navigations between the same few pages do
//! not rescan every prefix. It is gated behind the `cache` feature and uses
//! the [`lru`] crate.
//!
//! The registry clears the cache whenever its set is replaced (load
//! completing, failure policy applied), so an entry never outlives the set
//! it was computed against.
//!
//! # Examples
//!
//! ```
//! use route_gate::cache::MatchCache;
//!
//! let mut cache = MatchCache::new();
//! assert_eq!(cache.get("/dashboard"), None);
//! cache.insert("/dashboard".to_string(), true);
//! assert_eq!(cache.get("/dashboard"), Some(true));
//! assert_eq!(cache.stats().hits, 1);
//! assert_eq!(cache.stats().misses, 1);
//! ```

use crate::{debug_log, trace_log};
use lru::LruCache;
use std::num::NonZeroUsize;

/// Hit, miss and invalidation counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    /// Number of [`MatchCache::clear`] calls.
    pub invalidations: usize,
}

impl CacheStats {
    /// Hit rate in `0.0..=1.0`; `0.0` before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// LRU map from pathname to "is protected".
#[derive(Debug)]
pub struct MatchCache {
    entries: LruCache<String, bool>,
    stats: CacheStats,
}

impl MatchCache {
    const DEFAULT_CAPACITY: usize = 256;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Cache holding at most `capacity` paths; zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(cap),
            stats: CacheStats::default(),
        }
    }

    pub fn get(&mut self, path: &str) -> Option<bool> {
        if let Some(protected) = self.entries.get(path) {
            self.stats.hits += 1;
            trace_log!("Match cache hit for '{}': {}", path, protected);
            Some(*protected)
        } else {
            self.stats.misses += 1;
            None
        }
    }

    pub fn insert(&mut self, path: String, protected: bool) {
        self.entries.push(path, protected);
    }

    /// Drop every entry and count an invalidation.
    pub fn clear(&mut self) {
        let removed = self.entries.len();
        self.entries.clear();
        self.stats.invalidations += 1;
        debug_log!(
            "Match cache cleared: {} entries removed ({} invalidations, hit rate {:.1}%)",
            removed,
            self.stats.invalidations,
            self.stats.hit_rate() * 100.0
        );
    }

    pub const fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MatchCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_then_hit() {
        let mut cache = MatchCache::new();
        assert_eq!(cache.get("/admin"), None);
        cache.insert("/admin".to_string(), false);
        assert_eq!(cache.get("/admin"), Some(false));
        assert_eq!(cache.stats().misses, 1);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_clear_counts_invalidation() {
        let mut cache = MatchCache::new();
        cache.insert("/a".to_string(), true);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().invalidations, 1);
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = MatchCache::with_capacity(2);
        cache.insert("/a".to_string(), true);
        cache.insert("/b".to_string(), true);
        cache.get("/a");
        cache.insert("/c".to_string(), false);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("/b"), None);
        assert_eq!(cache.get("/a"), Some(true));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut cache = MatchCache::with_capacity(0);
        cache.insert("/a".to_string(), true);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_hit_rate() {
        let mut cache = MatchCache::new();
        cache.get("/a");
        cache.insert("/a".to_string(), true);
        cache.get("/a");
        cache.get("/a");
        cache.get("/b");
        assert!((cache.stats().hit_rate() - 0.5).abs() < 0.001);
    }
}
