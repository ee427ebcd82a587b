//! Item ability-state store contract

use std::collections::BTreeMap;
use std::sync::RwLock;

use ahash::AHashMap;

use crate::core::types::{AbilityId, ItemId};
use crate::world::ItemHandle;

/// Ability id -> level for one item. Ordered so iteration is deterministic.
pub type AbilityLevels = BTreeMap<AbilityId, u32>;

/// Persisted per-item ability levels.
///
/// Implementations own their thread-safety; the engine may call them from
/// the game thread while maintenance tasks touch the same data.
pub trait ItemStore: Send + Sync {
    /// Snapshot of the item's ability levels
    fn ability_levels(&self, item: &ItemHandle) -> AbilityLevels;

    /// Set one level and return the updated handle. Level 0 removes the ability.
    fn set_ability_level(&self, item: &ItemHandle, ability: &str, level: u32) -> ItemHandle;
}

/// Thread-safe in-memory item store
#[derive(Debug, Default)]
pub struct MemoryItemStore {
    levels: RwLock<AHashMap<ItemId, AbilityLevels>>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace an item's whole level map
    pub fn insert(&self, item: &ItemHandle, levels: AbilityLevels) {
        let mut guard = self.levels.write().unwrap_or_else(|e| e.into_inner());
        guard.insert(item.id, levels);
    }
}

impl ItemStore for MemoryItemStore {
    fn ability_levels(&self, item: &ItemHandle) -> AbilityLevels {
        let guard = self.levels.read().unwrap_or_else(|e| e.into_inner());
        guard.get(&item.id).cloned().unwrap_or_default()
    }

    fn set_ability_level(&self, item: &ItemHandle, ability: &str, level: u32) -> ItemHandle {
        let mut guard = self.levels.write().unwrap_or_else(|e| e.into_inner());
        let levels = guard.entry(item.id).or_default();
        if level == 0 {
            levels.remove(ability);
        } else {
            levels.insert(ability.to_string(), level);
        }
        item.next_revision()
    }
}

/// Build a level map from `(id, level)` pairs
pub fn levels<'a>(pairs: impl IntoIterator<Item = (&'a str, u32)>) -> AbilityLevels {
    pairs
        .into_iter()
        .map(|(id, level)| (id.to_string(), level))
        .collect()
}
