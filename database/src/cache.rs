use indexmap::IndexMap;
use parking_lot::RwLock;
use rand::Rng;
use stake_utils::mem_size::{MemMode, MemSizeEstimator};
use std::{collections::hash_map::RandomState, hash::BuildHasher, sync::Arc};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CachePolicy {
    /// No caching
    Empty,
    /// Bounds the cache by the number of entries
    Count(usize),
    /// Bounds the cache by the tracked size of its entries (in bytes or units), while always keeping
    /// at least `min_items` entries
    Tracked { max_size: usize, min_items: usize, mem_mode: MemMode },
}

struct Inner<TKey, TData, S = RandomState>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync,
    TData: Clone + Send + Sync + MemSizeEstimator,
{
    // We use IndexMap and not HashMap because it makes it cheaper to remove a random element when the cache is full.
    map: IndexMap<TKey, TData, S>,
    tracked_size: usize,
}

impl<TKey, TData, S> Inner<TKey, TData, S>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync,
    TData: Clone + Send + Sync + MemSizeEstimator,
    S: BuildHasher + Default,
{
    fn new(prealloc_size: usize) -> Self {
        Self { map: IndexMap::with_capacity_and_hasher(prealloc_size, S::default()), tracked_size: 0 }
    }

    fn evict_random(&mut self, mem_mode: Option<MemMode>) {
        let index = rand::thread_rng().gen_range(0..self.map.len());
        if let Some((_, removed)) = self.map.swap_remove_index(index) {
            if let Some(mem_mode) = mem_mode {
                self.tracked_size = self.tracked_size.saturating_sub(removed.estimate_size(mem_mode));
            }
        }
    }
}

/// A shallow-clonable, concurrent cache with random eviction
#[derive(Clone)]
pub struct Cache<TKey, TData, S = RandomState>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync,
    TData: Clone + Send + Sync + MemSizeEstimator,
{
    inner: Arc<RwLock<Inner<TKey, TData, S>>>,
    policy: CachePolicy,
}

impl<TKey, TData, S> Cache<TKey, TData, S>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync,
    TData: Clone + Send + Sync + MemSizeEstimator,
    S: BuildHasher + Default,
{
    pub fn new(policy: CachePolicy) -> Self {
        let prealloc_size = match policy {
            CachePolicy::Empty => 0,
            // Use `size + 1` for not triggering a realloc if a new element exactly overflows capacity
            CachePolicy::Count(max_size) => max_size + 1,
            CachePolicy::Tracked { min_items, .. } => min_items,
        };
        Self { inner: Arc::new(RwLock::new(Inner::new(prealloc_size))), policy }
    }

    pub fn get(&self, key: &TKey) -> Option<TData> {
        self.inner.read().map.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert_impl(&self, inner: &mut Inner<TKey, TData, S>, key: TKey, data: TData) {
        match self.policy {
            CachePolicy::Empty => {}
            CachePolicy::Count(max_size) => {
                if inner.map.len() == max_size && !inner.map.contains_key(&key) {
                    inner.evict_random(None);
                }
                inner.map.insert(key, data);
            }
            CachePolicy::Tracked { max_size, min_items, mem_mode } => {
                inner.tracked_size += data.estimate_size(mem_mode);
                if let Some(removed) = inner.map.insert(key, data) {
                    inner.tracked_size = inner.tracked_size.saturating_sub(removed.estimate_size(mem_mode));
                }
                while inner.tracked_size > max_size && inner.map.len() > min_items {
                    inner.evict_random(Some(mem_mode));
                }
            }
        }
    }

    pub fn insert(&self, key: TKey, data: TData) {
        if matches!(self.policy, CachePolicy::Empty | CachePolicy::Count(0)) {
            return;
        }
        let mut write_guard = self.inner.write();
        self.insert_impl(&mut write_guard, key, data);
    }

    pub fn insert_many(&self, iter: &mut impl Iterator<Item = (TKey, TData)>) {
        if matches!(self.policy, CachePolicy::Empty | CachePolicy::Count(0)) {
            return;
        }
        let mut write_guard = self.inner.write();
        for (key, data) in iter {
            self.insert_impl(&mut write_guard, key, data);
        }
    }

    pub fn remove_all(&self) {
        let mut write_guard = self.inner.write();
        write_guard.map.clear();
        write_guard.tracked_size = 0;
    }
}
