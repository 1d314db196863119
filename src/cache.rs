//! Process-scoped classifier cache.
//!
//! Classifiers memoize expensive pairwise computations (instruction
//! similarity in particular) here during the parallel scoring phase. The
//! arbiter clears the cache on every match/unmatch mutation, which happens
//! only on the driver thread between passes, so reads never race a clear.

use dashmap::DashMap;

/// What a cached score was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    InsnSimilarity,
    ClassInsnSimilarity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: CacheKind,
    pub a: u32,
    pub b: u32,
}

/// Concurrent score cache, keyed by entity pair.
#[derive(Debug, Default)]
pub struct ClassifierCache {
    map: DashMap<CacheKey, f64>,
}

impl ClassifierCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a pairwise score, computing and inserting it on a miss.
    /// Keys are normalized so (a, b) and (b, a) share an entry.
    pub fn get_or_insert_with<F>(&self, kind: CacheKind, a: u32, b: u32, compute: F) -> f64
    where
        F: FnOnce() -> f64,
    {
        let key = if a <= b {
            CacheKey { kind, a, b }
        } else {
            CacheKey { kind, a: b, b: a }
        };

        if let Some(hit) = self.map.get(&key) {
            return *hit;
        }

        let value = compute();
        self.map.insert(key, value);
        value
    }

    pub fn clear(&self) {
        self.map.clear();
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_symmetrically() {
        let cache = ClassifierCache::new();
        let v = cache.get_or_insert_with(CacheKind::InsnSimilarity, 3, 1, || 0.5);
        assert_eq!(v, 0.5);

        // Reversed pair must hit the same entry, not recompute.
        let v2 = cache.get_or_insert_with(CacheKind::InsnSimilarity, 1, 3, || 0.9);
        assert_eq!(v2, 0.5);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_empties_the_cache() {
        let cache = ClassifierCache::new();
        cache.get_or_insert_with(CacheKind::InsnSimilarity, 1, 2, || 1.0);
        cache.clear();
        assert!(cache.is_empty());
    }
}
