//! Short-lived ability-level snapshots
//!
//! The item store is allowed to be slow-ish and does its own caching, so the
//! engine keeps a snapshot per item for at most a few hundred ms. A snapshot
//! is only reused while the handle's revision matches; any write through the
//! store bumps the revision and forces a fresh read.

use ahash::AHashMap;

use crate::core::types::{EpochMillis, ItemId};
use crate::providers::{AbilityLevels, ItemStore};
use crate::world::ItemHandle;

#[derive(Debug, Clone)]
struct Snapshot {
    revision: u32,
    fetched_at: EpochMillis,
    levels: AbilityLevels,
}

/// TTL-bounded, revision-checked level snapshots
#[derive(Debug, Clone)]
pub struct LevelCache {
    ttl_ms: u64,
    capacity: usize,
    entries: AHashMap<ItemId, Snapshot>,
    hits: u64,
    misses: u64,
}

impl LevelCache {
    pub fn new(ttl_ms: u64, capacity: usize) -> Self {
        Self {
            ttl_ms,
            capacity,
            entries: AHashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Levels for `item`, from the snapshot when still fresh
    pub fn get(&mut self, store: &dyn ItemStore, item: &ItemHandle, now: EpochMillis) -> AbilityLevels {
        if self.ttl_ms == 0 || self.capacity == 0 {
            self.misses += 1;
            return store.ability_levels(item);
        }

        if let Some(snapshot) = self.entries.get(&item.id) {
            let age = now.saturating_sub(snapshot.fetched_at);
            if snapshot.revision == item.revision && age < self.ttl_ms {
                self.hits += 1;
                return snapshot.levels.clone();
            }
        }

        self.misses += 1;
        let levels = store.ability_levels(item);
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&item.id) {
            self.sweep(now);
        }
        self.entries.insert(
            item.id,
            Snapshot {
                revision: item.revision,
                fetched_at: now,
                levels: levels.clone(),
            },
        );
        levels
    }

    /// Drop expired snapshots; if that frees nothing, drop everything
    fn sweep(&mut self, now: EpochMillis) {
        let ttl = self.ttl_ms;
        self.entries
            .retain(|_, s| now.saturating_sub(s.fetched_at) < ttl);
        if self.entries.len() >= self.capacity {
            self.entries.clear();
        }
    }

    pub fn invalidate(&mut self, item: ItemId) {
        self.entries.remove(&item);
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

    /// (hits, misses) since creation
    pub fn hit_counts(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{levels, MemoryItemStore};

    fn store_with(item: &ItemHandle) -> MemoryItemStore {
        let store = MemoryItemStore::new();
        store.insert(item, levels([("laser", 2)]));
        store
    }

    #[test]
    fn test_fresh_snapshot_is_reused() {
        let item = ItemHandle::new("diamond_pickaxe");
        let store = store_with(&item);
        let mut cache = LevelCache::new(250, 16);

        cache.get(&store, &item, 1_000);
        // A write that bypasses the handle is invisible until the TTL runs out
        store.insert(&item, levels([("laser", 3)]));

        assert_eq!(cache.get(&store, &item, 1_100).get("laser"), Some(&2));
        assert_eq!(cache.get(&store, &item, 1_250).get("laser"), Some(&3));
        assert_eq!(cache.hit_counts(), (1, 2));
    }

    #[test]
    fn test_new_revision_bypasses_snapshot() {
        let item = ItemHandle::new("diamond_pickaxe");
        let store = store_with(&item);
        let mut cache = LevelCache::new(1_000, 16);

        cache.get(&store, &item, 0);
        let updated = store.set_ability_level(&item, "laser", 3);
        assert_eq!(cache.get(&store, &updated, 10).get("laser"), Some(&3));
    }

    #[test]
    fn test_zero_ttl_disables_cache() {
        let item = ItemHandle::new("diamond_pickaxe");
        let store = store_with(&item);
        let mut cache = LevelCache::new(0, 16);

        cache.get(&store, &item, 0);
        cache.get(&store, &item, 0);
        assert!(cache.is_empty());
        assert_eq!(cache.hit_counts(), (0, 2));
    }

    #[test]
    fn test_capacity_is_bounded() {
        let store = MemoryItemStore::new();
        let mut cache = LevelCache::new(1_000, 4);
        for _ in 0..20 {
            cache.get(&store, &ItemHandle::new("stick"), 0);
        }
        assert!(cache.len() <= 4);
    }
}
