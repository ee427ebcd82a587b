//! Block-clearing primitives shared by every effect
//!
//! All sweeps skip air and unbreakable blocks, consult the region guard for
//! each block, and stop once their unit limit (or the engine-wide budget)
//! is spent. Iteration order is fixed so a seeded run is reproducible.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::error::EffectError;
use crate::effects::EffectContext;
use crate::world::{block_center, BlockPos, ItemStack, Material};

/// Where the drops of a cleared block go
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DropPolicy {
    /// Actor inventory; whatever does not fit lands on the ground
    #[default]
    Inventory,
    /// Always on the ground at the block
    Ground,
    /// Offered to the auto-sell hook first; unsold drops go to the inventory
    AutoSell,
}

impl<'a> EffectContext<'a> {
    /// Whether this actor may clear the block at `pos`.
    ///
    /// Air and unbreakable blocks never qualify; everything else is up to the
    /// region guard, which permits everything when none is installed.
    pub fn can_clear(&self, pos: BlockPos) -> bool {
        let material = self.world.block_at(pos);
        if material.is_air() || self.world.hardness(&material) < 0.0 {
            return false;
        }
        self.services.can_clear_at(self.actor.id, pos)
    }

    /// Clear one block and route its drops. Returns whether a block was cleared.
    pub fn clear_single(&mut self, pos: BlockPos, policy: DropPolicy) -> Result<bool, EffectError> {
        if self.remaining_budget() == 0 || !self.can_clear(pos) {
            return Ok(false);
        }
        let drops = self.world.break_block(pos, self.item)?;
        self.cleared += 1;
        self.route_drops(pos, drops, policy);
        Ok(true)
    }

    /// Send drops where `policy` says
    pub fn route_drops(&mut self, pos: BlockPos, drops: Vec<ItemStack>, policy: DropPolicy) {
        if drops.is_empty() {
            return;
        }
        let drops = match policy {
            DropPolicy::Ground => {
                self.world.drop_items(pos, drops);
                return;
            }
            DropPolicy::Inventory => drops,
            DropPolicy::AutoSell => self.services.auto_sell.sell(self.actor.id, drops),
        };
        if drops.is_empty() {
            return;
        }
        let overflow = self.world.give_items(self.actor.id, drops);
        if !overflow.is_empty() {
            self.world.drop_items(pos, overflow);
        }
    }

    fn limit(&self, max_units: u32) -> u32 {
        max_units.min(self.remaining_budget())
    }

    /// Clear the cube of side `2 * radius + 1` around `center`, center excluded.
    ///
    /// Visits x, then y, then z in ascending order and stops after
    /// `max_units` blocks. Blocks that cannot be cleared are passed over, so
    /// a mostly empty or protected cube is walked in full; catalog validation
    /// keeps `radius` within [`MAX_AREA_RADIUS`](crate::catalog::MAX_AREA_RADIUS).
    pub fn clear_radius(
        &mut self,
        center: BlockPos,
        radius: u32,
        max_units: u32,
        policy: DropPolicy,
    ) -> Result<u32, EffectError> {
        let limit = self.limit(max_units);
        let r = radius as i32;
        let mut cleared = 0;
        'sweep: for dx in -r..=r {
            for dy in -r..=r {
                for dz in -r..=r {
                    if cleared >= limit {
                        break 'sweep;
                    }
                    if dx == 0 && dy == 0 && dz == 0 {
                        continue;
                    }
                    let pos = center + BlockPos::new(dx, dy, dz);
                    if self.clear_single(pos, policy)? {
                        cleared += 1;
                    }
                }
            }
        }
        Ok(cleared)
    }

    /// Clear blocks along `direction` from `origin`, one step at a time for up
    /// to `range` steps. The origin itself is not touched.
    ///
    /// Air and materials in `skip` are passed over. The first solid block that
    /// [`can_clear`](Self::can_clear) rejects ends the sweep.
    pub fn clear_line(
        &mut self,
        origin: BlockPos,
        direction: Vec3,
        range: u32,
        max_units: u32,
        policy: DropPolicy,
        skip: &[Material],
    ) -> Result<u32, EffectError> {
        let step = direction.normalize_or_zero();
        if step == Vec3::ZERO {
            return Ok(0);
        }
        let limit = self.limit(max_units);
        let start = block_center(origin);
        let mut previous = origin;
        let mut cleared = 0;

        for i in 1..=range {
            if cleared >= limit {
                break;
            }
            let pos = (start + step * i as f32).floor().as_ivec3();
            // Shallow diagonals can land in the same cell twice
            if pos == previous {
                continue;
            }
            previous = pos;

            let material = self.world.block_at(pos);
            if material.is_air() || skip.contains(&material) {
                continue;
            }
            if !self.can_clear(pos) {
                break;
            }
            if self.clear_single(pos, policy)? {
                cleared += 1;
            }
        }
        Ok(cleared)
    }

    /// Clear straight up from `origin` for up to `height` steps, origin
    /// excluded. Blocks that cannot be cleared are passed over.
    pub fn clear_column(
        &mut self,
        origin: BlockPos,
        height: u32,
        max_units: u32,
        policy: DropPolicy,
    ) -> Result<u32, EffectError> {
        let limit = self.limit(max_units);
        let mut cleared = 0;
        for dy in 1..=height as i32 {
            if cleared >= limit {
                break;
            }
            if self.clear_single(origin + BlockPos::new(0, dy, 0), policy)? {
                cleared += 1;
            }
        }
        Ok(cleared)
    }

    /// Deposit `base * multiplier(actor, key)` through the economy.
    /// Returns the amount credited (0 without an economy).
    pub fn grant_currency(&mut self, base: f64, key: &str) -> f64 {
        let amount = base * self.services.multiplier(self.actor.id, key);
        if !amount.is_finite() || amount <= 0.0 {
            return 0.0;
        }
        if self.services.deposit(self.actor.id, amount, &self.ability.id) {
            amount
        } else {
            0.0
        }
    }
}
