//! Item handles and dropped stacks

use serde::{Deserialize, Serialize};

use crate::core::types::ItemId;
use crate::world::Material;

/// A concrete item instance held by an actor.
///
/// Handles are values: changing an item's ability levels goes through the
/// item store and produces a new handle with a bumped `revision`, never an
/// in-place edit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemHandle {
    pub id: ItemId,
    /// Tool material ("diamond_pickaxe"), used when computing block drops
    pub kind: Material,
    pub revision: u32,
}

impl ItemHandle {
    pub fn new(kind: impl Into<Material>) -> Self {
        Self {
            id: ItemId::new(),
            kind: kind.into(),
            revision: 0,
        }
    }

    /// The same item one revision later
    pub fn next_revision(&self) -> Self {
        Self {
            id: self.id,
            kind: self.kind.clone(),
            revision: self.revision.wrapping_add(1),
        }
    }
}

/// A stack of dropped or granted items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub material: Material,
    pub count: u32,
}

impl ItemStack {
    pub fn new(material: impl Into<Material>, count: u32) -> Self {
        Self {
            material: material.into(),
            count,
        }
    }
}

/// Total item count across stacks
pub fn total_count(stacks: &[ItemStack]) -> u32 {
    stacks.iter().map(|s| s.count).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_revision_keeps_identity() {
        let item = ItemHandle::new("diamond_pickaxe");
        let next = item.next_revision();
        assert_eq!(next.id, item.id);
        assert_eq!(next.revision, item.revision + 1);
        assert_ne!(next, item);
    }

    #[test]
    fn test_total_count() {
        let stacks = vec![ItemStack::new("stone", 3), ItemStack::new("coal", 2)];
        assert_eq!(total_count(&stacks), 5);
    }
}
