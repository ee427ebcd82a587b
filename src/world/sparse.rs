//! In-memory sparse world for simulation and tests
//!
//! Only non-air blocks are stored. Every block drops one of itself.

use ahash::AHashMap;
use glam::Vec3;

use crate::core::error::EffectError;
use crate::core::types::{ActorId, EntityId};
use crate::world::{BlockPos, ItemHandle, ItemStack, Material, StatusEffect, World};

/// Default stack slots per actor inventory
pub const DEFAULT_INVENTORY_SLOTS: usize = 36;

/// Entity state tracked by the sparse world
#[derive(Debug, Clone, Default)]
pub struct SimEntity {
    pub position: Vec3,
    pub velocity: Vec3,
    pub statuses: Vec<(StatusEffect, u64, u8)>,
}

/// Hash-backed block world
#[derive(Debug, Clone)]
pub struct SparseWorld {
    blocks: AHashMap<BlockPos, Material>,
    hardness: AHashMap<Material, f32>,
    inventories: AHashMap<ActorId, Vec<ItemStack>>,
    inventory_slots: usize,
    ground: Vec<(BlockPos, ItemStack)>,
    entities: AHashMap<EntityId, SimEntity>,
    broken: u64,
}

impl Default for SparseWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SparseWorld {
    pub fn new() -> Self {
        let mut hardness = AHashMap::new();
        hardness.insert(Material::from("bedrock"), -1.0);
        hardness.insert(Material::from("barrier"), -1.0);
        Self {
            blocks: AHashMap::new(),
            hardness,
            inventories: AHashMap::new(),
            inventory_slots: DEFAULT_INVENTORY_SLOTS,
            ground: Vec::new(),
            entities: AHashMap::new(),
            broken: 0,
        }
    }

    pub fn with_inventory_slots(mut self, slots: usize) -> Self {
        self.inventory_slots = slots;
        self
    }

    pub fn set_block(&mut self, pos: BlockPos, material: impl Into<Material>) {
        let material = material.into();
        if material.is_air() {
            self.blocks.remove(&pos);
        } else {
            self.blocks.insert(pos, material);
        }
    }

    /// Fill an axis-aligned box, both corners inclusive
    pub fn fill(&mut self, from: BlockPos, to: BlockPos, material: impl Into<Material>) {
        let material = material.into();
        let (lo, hi) = (from.min(to), from.max(to));
        for x in lo.x..=hi.x {
            for y in lo.y..=hi.y {
                for z in lo.z..=hi.z {
                    self.set_block(BlockPos::new(x, y, z), material.clone());
                }
            }
        }
    }

    pub fn set_hardness(&mut self, material: impl Into<Material>, hardness: f32) {
        self.hardness.insert(material.into(), hardness);
    }

    pub fn spawn_entity(&mut self, id: EntityId, position: Vec3) {
        self.entities.insert(
            id,
            SimEntity {
                position,
                ..SimEntity::default()
            },
        );
    }

    pub fn entity(&self, id: EntityId) -> Option<&SimEntity> {
        self.entities.get(&id)
    }

    /// Non-air block count
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Blocks broken since creation
    pub fn broken_count(&self) -> u64 {
        self.broken
    }

    pub fn inventory(&self, actor: ActorId) -> &[ItemStack] {
        self.inventories
            .get(&actor)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn ground_items(&self) -> &[(BlockPos, ItemStack)] {
        &self.ground
    }
}

impl World for SparseWorld {
    fn block_at(&self, pos: BlockPos) -> Material {
        self.blocks.get(&pos).cloned().unwrap_or_else(Material::air)
    }

    fn hardness(&self, material: &Material) -> f32 {
        if material.is_air() {
            return 0.0;
        }
        self.hardness.get(material).copied().unwrap_or(1.0)
    }

    fn drops_for(&self, pos: BlockPos, _tool: &ItemHandle) -> Vec<ItemStack> {
        match self.blocks.get(&pos) {
            Some(material) => vec![ItemStack::new(material.clone(), 1)],
            None => Vec::new(),
        }
    }

    fn break_block(
        &mut self,
        pos: BlockPos,
        tool: &ItemHandle,
    ) -> Result<Vec<ItemStack>, EffectError> {
        let drops = self.drops_for(pos, tool);
        if self.blocks.remove(&pos).is_none() {
            return Err(EffectError::World(format!("no block at {}", pos)));
        }
        self.broken += 1;
        Ok(drops)
    }

    fn give_items(&mut self, actor: ActorId, items: Vec<ItemStack>) -> Vec<ItemStack> {
        let slots = self.inventory_slots;
        let inventory = self.inventories.entry(actor).or_default();
        let mut overflow = Vec::new();
        for stack in items {
            if let Some(existing) = inventory.iter_mut().find(|s| s.material == stack.material) {
                existing.count += stack.count;
            } else if inventory.len() < slots {
                inventory.push(stack);
            } else {
                overflow.push(stack);
            }
        }
        overflow
    }

    fn drop_items(&mut self, pos: BlockPos, items: Vec<ItemStack>) {
        self.ground.extend(items.into_iter().map(|stack| (pos, stack)));
    }

    fn entities_near(&self, center: Vec3, radius: f32) -> Vec<EntityId> {
        let mut found: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|(_, e)| e.position.distance(center) <= radius)
            .map(|(id, _)| *id)
            .collect();
        // Hash order is not stable across runs
        found.sort_by_key(|id| id.0);
        found
    }

    fn entity_position(&self, entity: EntityId) -> Option<Vec3> {
        self.entities.get(&entity).map(|e| e.position)
    }

    fn push_entity(&mut self, entity: EntityId, velocity: Vec3) {
        if let Some(e) = self.entities.get_mut(&entity) {
            e.velocity += velocity;
        }
    }

    fn apply_status(
        &mut self,
        entity: EntityId,
        status: StatusEffect,
        duration_ms: u64,
        amplifier: u8,
    ) {
        if let Some(e) = self.entities.get_mut(&entity) {
            e.statuses.retain(|(s, _, _)| *s != status);
            e.statuses.push((status, duration_ms, amplifier));
        }
    }
}
