//! Built-in effects
//!
//! Each handler reads its tunables from the ability's [`EffectParams`] so
//! servers can retune them from the catalog without code changes.
//!
//! [`EffectParams`]: crate::catalog::EffectParams

use glam::Vec3;

use crate::core::error::EffectError;
use crate::core::types::EntityId;
use crate::effects::dispatch::EffectDispatcher;
use crate::effects::{Effect, EffectContext, FollowUp};
use crate::world::{block_center, BlockPos, StatusEffect};

/// Register every built-in under its default id
pub fn register_builtins(dispatcher: &mut EffectDispatcher) {
    dispatcher.register("explosive", Explosive);
    dispatcher.register("chain-break", ChainBreak);
    dispatcher.register("laser", Laser);
    dispatcher.register("pillar", Pillar);
    dispatcher.register("multiply", Multiply);
    dispatcher.register("treasure", Treasure);
    dispatcher.register("shockwave", Shockwave);
    dispatcher.register("freeze", Freeze);
    dispatcher.register("venom", Venom);
    dispatcher.register("frenzy", Frenzy);
    dispatcher.register("chronos", Chronos);
    dispatcher.register("echo", Echo);
    dispatcher.register("ascend", Ascend);
    dispatcher.register("midas", Midas);
}

/// Point entity effects radiate from: the target block, else the actor
fn focus(ctx: &EffectContext<'_>) -> Vec3 {
    ctx.target.map(block_center).unwrap_or(ctx.actor.position)
}

fn entities_in_range(ctx: &EffectContext<'_>) -> Vec<EntityId> {
    ctx.world
        .entities_near(focus(ctx), ctx.ability.params.radius as f32)
}

fn amplifier(level: u32) -> u8 {
    level.saturating_sub(1).min(u8::MAX as u32) as u8
}

/// Clears the cube around the broken block
pub struct Explosive;

impl Effect for Explosive {
    fn apply(&self, ctx: &mut EffectContext<'_>) -> Result<(), EffectError> {
        let target = ctx.require_target()?;
        let params = &ctx.ability.params;
        let (radius, max_units, policy) = (params.radius, params.max_units, params.drop_policy);
        ctx.clear_radius(target, radius, max_units, policy)?;
        Ok(())
    }
}

/// Continues the break along the actor's facing
pub struct ChainBreak;

impl Effect for ChainBreak {
    fn apply(&self, ctx: &mut EffectContext<'_>) -> Result<(), EffectError> {
        let target = ctx.require_target()?;
        let ability = ctx.ability;
        let params = &ability.params;
        ctx.clear_line(
            target,
            ctx.actor.facing,
            params.range,
            params.max_units,
            params.drop_policy,
            &params.skip,
        )?;
        Ok(())
    }
}

/// Long line from the actor's position, passing over protected blocks
pub struct Laser;

impl Effect for Laser {
    fn apply(&self, ctx: &mut EffectContext<'_>) -> Result<(), EffectError> {
        let origin: BlockPos = ctx.actor.position.floor().as_ivec3();
        let ability = ctx.ability;
        let params = &ability.params;
        ctx.clear_line(
            origin,
            ctx.actor.facing,
            params.range,
            params.max_units,
            params.drop_policy,
            &params.skip,
        )?;
        Ok(())
    }
}

/// Clears the blocks stacked above the broken one
pub struct Pillar;

impl Effect for Pillar {
    fn apply(&self, ctx: &mut EffectContext<'_>) -> Result<(), EffectError> {
        let target = ctx.require_target()?;
        let params = &ctx.ability.params;
        let (height, max_units, policy) = (params.height, params.max_units, params.drop_policy);
        ctx.clear_column(target, height, max_units, policy)?;
        Ok(())
    }
}

/// Extra copies of the target's drops, `amount` per level
pub struct Multiply;

impl Effect for Multiply {
    fn apply(&self, ctx: &mut EffectContext<'_>) -> Result<(), EffectError> {
        let target = ctx.require_target()?;
        let copies = (ctx.ability.params.amount * ctx.level as f64).round().max(1.0) as u32;
        let mut drops = ctx.world.drops_for(target, ctx.item);
        for stack in &mut drops {
            stack.count = stack.count.saturating_mul(copies);
        }
        let policy = ctx.ability.params.drop_policy;
        ctx.route_drops(target, drops, policy);
        Ok(())
    }
}

/// Currency grant of `amount` per level
pub struct Treasure;

impl Effect for Treasure {
    fn apply(&self, ctx: &mut EffectContext<'_>) -> Result<(), EffectError> {
        let base = ctx.ability.params.amount * ctx.level as f64;
        let key = ctx
            .ability
            .multiplier_key
            .clone()
            .unwrap_or_else(|| ctx.ability.id.clone());
        ctx.grant_currency(base, &key);
        Ok(())
    }
}

/// Knocks nearby entities away from the focus point
pub struct Shockwave;

impl Effect for Shockwave {
    fn apply(&self, ctx: &mut EffectContext<'_>) -> Result<(), EffectError> {
        let center = focus(ctx);
        let strength = ctx.ability.params.strength as f32;
        for entity in entities_in_range(ctx) {
            let Some(position) = ctx.world.entity_position(entity) else {
                continue;
            };
            let away = (position - center).normalize_or_zero();
            let velocity = (away + Vec3::new(0.0, 0.4, 0.0)) * strength;
            ctx.world.push_entity(entity, velocity);
        }
        Ok(())
    }
}

/// Slows nearby entities
pub struct Freeze;

impl Effect for Freeze {
    fn apply(&self, ctx: &mut EffectContext<'_>) -> Result<(), EffectError> {
        let duration = ctx.ability.params.duration_ms;
        let amp = amplifier(ctx.level);
        for entity in entities_in_range(ctx) {
            ctx.world.apply_status(entity, StatusEffect::Slowness, duration, amp);
        }
        Ok(())
    }
}

/// Poisons nearby entities
pub struct Venom;

impl Effect for Venom {
    fn apply(&self, ctx: &mut EffectContext<'_>) -> Result<(), EffectError> {
        let duration = ctx.ability.params.duration_ms;
        let amp = amplifier(ctx.level);
        for entity in entities_in_range(ctx) {
            ctx.world.apply_status(entity, StatusEffect::Poison, duration, amp);
        }
        Ok(())
    }
}

/// Temporary proc-chance bonus for the actor
pub struct Frenzy;

impl Effect for Frenzy {
    fn apply(&self, ctx: &mut EffectContext<'_>) -> Result<(), EffectError> {
        let params = &ctx.ability.params;
        let follow_up = FollowUp::ApplyBuff {
            duration_ms: params.duration_ms,
            bonus: params.bonus,
        };
        ctx.request(follow_up);
        Ok(())
    }
}

/// Pulls every cooldown of the actor earlier by `duration_ms` per level
pub struct Chronos;

impl Effect for Chronos {
    fn apply(&self, ctx: &mut EffectContext<'_>) -> Result<(), EffectError> {
        let ms = ctx.ability.params.duration_ms.saturating_mul(ctx.level as u64);
        ctx.request(FollowUp::ReduceCooldowns { ms });
        Ok(())
    }
}

/// Gives another ability on the item a chance to fire
pub struct Echo;

impl Effect for Echo {
    fn apply(&self, ctx: &mut EffectContext<'_>) -> Result<(), EffectError> {
        ctx.request(FollowUp::SecondaryRoll);
        Ok(())
    }
}

/// Raises one other ability on the item by a level.
///
/// Only abilities below their maximum qualify. Does nothing when none do.
pub struct Ascend;

impl Effect for Ascend {
    fn apply(&self, ctx: &mut EffectContext<'_>) -> Result<(), EffectError> {
        let (levels, catalog, ability) = (ctx.levels, ctx.catalog, ctx.ability);
        let own = ability.id.as_str();
        let candidates: Vec<(&str, u32)> = levels
            .iter()
            .filter(|(id, level)| **level > 0 && id.as_str() != own)
            .filter(|(id, level)| catalog.get(id).is_some_and(|def| **level < def.max_level))
            .map(|(id, level)| (id.as_str(), *level))
            .collect();

        let Some(&(id, level)) = ctx.rng.choose(&candidates) else {
            return Ok(());
        };
        let updated = ctx.services.items.set_ability_level(ctx.item, id, level + 1);
        ctx.replace_item(updated);
        Ok(())
    }
}

/// Sells the broken block's drops on the spot
pub struct Midas;

impl Effect for Midas {
    fn apply(&self, ctx: &mut EffectContext<'_>) -> Result<(), EffectError> {
        let target = ctx.require_target()?;
        let policy = ctx.ability.params.drop_policy;
        ctx.clear_single(target, policy)?;
        Ok(())
    }
}
