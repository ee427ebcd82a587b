//! World-facing types and the `World` trait effects mutate through
//!
//! The host server owns the real world. Effects only ever see it through
//! [`World`], borrowed mutably for the duration of one action, so the proc
//! engine adds no locking of its own.

pub mod item;
pub mod sparse;

use ahash::AHashSet;
use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::core::error::EffectError;
use crate::core::types::{ActorId, EntityId};

pub use item::{total_count, ItemHandle, ItemStack};
pub use sparse::SparseWorld;

/// Integer block coordinate
pub type BlockPos = IVec3;

/// Block or item type name ("stone", "diamond_ore")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Material(pub String);

impl Material {
    pub const AIR_NAME: &'static str = "air";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn air() -> Self {
        Self(Self::AIR_NAME.to_string())
    }

    pub fn is_air(&self) -> bool {
        self.0 == Self::AIR_NAME
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Material {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for Material {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl std::fmt::Display for Material {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Actor game mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameMode {
    #[default]
    Survival,
    Adventure,
    Creative,
    Spectator,
}

impl GameMode {
    /// Modes where breaking blocks costs nothing, so procs would be free loot
    pub fn is_no_consequence(&self) -> bool {
        matches!(self, GameMode::Creative | GameMode::Spectator)
    }
}

/// Status effects the built-in effects can place on entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusEffect {
    Slowness,
    Poison,
}

/// Snapshot of the acting player, taken by the caller for one action
#[derive(Debug, Clone)]
pub struct ActorView {
    pub id: ActorId,
    pub mode: GameMode,
    pub position: Vec3,
    /// Look direction; need not be normalised
    pub facing: Vec3,
    pub permissions: AHashSet<String>,
}

impl ActorView {
    pub fn new(id: ActorId) -> Self {
        Self {
            id,
            mode: GameMode::Survival,
            position: Vec3::ZERO,
            facing: Vec3::X,
            permissions: AHashSet::new(),
        }
    }

    pub fn in_mode(mut self, mode: GameMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn facing(mut self, facing: Vec3) -> Self {
        self.facing = facing;
        self
    }

    pub fn with_permission(mut self, node: impl Into<String>) -> Self {
        self.permissions.insert(node.into());
        self
    }

    pub fn has_permission(&self, node: &str) -> bool {
        self.permissions.contains(node)
    }
}

/// Centre point of a block cell
pub fn block_center(pos: BlockPos) -> Vec3 {
    pos.as_vec3() + Vec3::splat(0.5)
}

/// Mutable view of the host world used by effects.
///
/// Implementations must return promptly; no call may block on I/O.
pub trait World {
    /// Material at a position (air when empty or unloaded)
    fn block_at(&self, pos: BlockPos) -> Material;

    /// Break resistance; negative means unbreakable
    fn hardness(&self, material: &Material) -> f32;

    /// Drops the block would yield to `tool`, without breaking it
    fn drops_for(&self, pos: BlockPos, tool: &ItemHandle) -> Vec<ItemStack>;

    /// Replace the block with air and return its drops
    fn break_block(&mut self, pos: BlockPos, tool: &ItemHandle)
        -> Result<Vec<ItemStack>, EffectError>;

    /// Put items in the actor's inventory; returns whatever did not fit
    fn give_items(&mut self, actor: ActorId, items: Vec<ItemStack>) -> Vec<ItemStack>;

    /// Spawn items on the ground at a position
    fn drop_items(&mut self, pos: BlockPos, items: Vec<ItemStack>);

    /// Entities within `radius` of `center`
    fn entities_near(&self, center: Vec3, radius: f32) -> Vec<EntityId>;

    fn entity_position(&self, entity: EntityId) -> Option<Vec3>;

    /// Add velocity to an entity
    fn push_entity(&mut self, entity: EntityId, velocity: Vec3);

    fn apply_status(&mut self, entity: EntityId, status: StatusEffect, duration_ms: u64, amplifier: u8);
}
