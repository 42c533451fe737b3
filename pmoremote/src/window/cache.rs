use std::num::NonZeroUsize;

use lru::LruCache;

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    pub value: T,
    /// Stale since the last invalidation; still shown, but refetched.
    pub dirty: bool,
}

/// Bounded index → entry cache.
///
/// Reads use `peek`, so eviction follows insertion order: the entry written
/// longest ago is dropped first once capacity is reached.
#[derive(Debug)]
pub struct PageCache<T> {
    entries: LruCache<usize, CacheEntry<T>>,
}

impl<T> PageCache<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    pub fn get(&self, index: usize) -> Option<&CacheEntry<T>> {
        self.entries.peek(&index)
    }

    /// Stores a fresh (non-dirty) value, evicting the oldest entry if full.
    pub fn insert(&mut self, index: usize, value: T) {
        self.entries
            .put(index, CacheEntry { value, dirty: false });
    }

    pub fn mark_all_dirty(&mut self) {
        for (_, entry) in self.entries.iter_mut() {
            entry.dirty = true;
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}
