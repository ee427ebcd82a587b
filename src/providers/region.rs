//! Spatial-permission (region protection) contract

use std::sync::RwLock;

use crate::core::types::ActorId;
use crate::world::BlockPos;

pub trait RegionGuard: Send + Sync {
    /// May this actor clear the block at `pos`?
    fn can_clear_at(&self, actor: ActorId, pos: BlockPos) -> bool;

    fn is_available(&self) -> bool;
}

/// No protection plugin installed: everything is permitted
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenRegions;

impl RegionGuard for OpenRegions {
    fn can_clear_at(&self, _actor: ActorId, _pos: BlockPos) -> bool {
        true
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Protected axis-aligned boxes (inclusive corners); everything else is open
#[derive(Debug, Default)]
pub struct DenyRegions {
    boxes: RwLock<Vec<(BlockPos, BlockPos)>>,
}

impl DenyRegions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn protect(&self, a: BlockPos, b: BlockPos) {
        let mut boxes = self.boxes.write().unwrap_or_else(|e| e.into_inner());
        boxes.push((a.min(b), a.max(b)));
    }
}

impl RegionGuard for DenyRegions {
    fn can_clear_at(&self, _actor: ActorId, pos: BlockPos) -> bool {
        let boxes = self.boxes.read().unwrap_or_else(|e| e.into_inner());
        !boxes
            .iter()
            .any(|(lo, hi)| pos.cmpge(*lo).all() && pos.cmple(*hi).all())
    }

    fn is_available(&self) -> bool {
        true
    }
}
