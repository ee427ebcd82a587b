//! Effect handlers and the context they run in
//!
//! A handler gets one [`EffectContext`] per activation. It mutates the world
//! through the context's primitives (see [`area`]) and may queue
//! [`FollowUp`]s that the engine runs once the handler has returned. Handlers
//! never reach back into the engine directly.

pub mod area;
pub mod builtin;
pub mod dispatch;

use crate::catalog::{AbilityCatalog, AbilityDefinition};
use crate::core::error::EffectError;
use crate::core::types::TriggerKind;
use crate::providers::{AbilityLevels, Services};
use crate::random::WeightedSelector;
use crate::world::{ActorView, BlockPos, ItemHandle, World};

pub use area::DropPolicy;
pub use dispatch::EffectDispatcher;

/// Work an effect asks the engine to do after it returns
#[derive(Debug, Clone, PartialEq)]
pub enum FollowUp {
    /// Re-roll a different, randomly chosen ability on the same item
    SecondaryRoll,
    /// Start or refresh the actor's proc-chance buff
    ApplyBuff { duration_ms: u64, bonus: f64 },
    /// Pull every cooldown of the actor `ms` earlier
    ReduceCooldowns { ms: u64 },
}

/// Everything an effect handler may read or touch during one activation
pub struct EffectContext<'a> {
    pub actor: &'a ActorView,
    pub item: &'a ItemHandle,
    pub target: Option<BlockPos>,
    pub trigger: TriggerKind,
    pub level: u32,
    pub ability: &'a AbilityDefinition,
    pub catalog: &'a AbilityCatalog,
    /// Snapshot of the item's ability levels taken at the start of the action
    pub levels: &'a AbilityLevels,
    pub world: &'a mut dyn World,
    pub services: &'a Services,
    pub rng: &'a mut WeightedSelector,
    unit_budget: u32,
    cleared: u32,
    follow_ups: Vec<FollowUp>,
    updated_item: Option<ItemHandle>,
}

impl<'a> EffectContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        actor: &'a ActorView,
        item: &'a ItemHandle,
        target: Option<BlockPos>,
        trigger: TriggerKind,
        level: u32,
        ability: &'a AbilityDefinition,
        catalog: &'a AbilityCatalog,
        levels: &'a AbilityLevels,
        world: &'a mut dyn World,
        services: &'a Services,
        rng: &'a mut WeightedSelector,
        unit_budget: u32,
    ) -> Self {
        Self {
            actor,
            item,
            target,
            trigger,
            level,
            ability,
            catalog,
            levels,
            world,
            services,
            rng,
            unit_budget,
            cleared: 0,
            follow_ups: Vec::new(),
            updated_item: None,
        }
    }

    /// Target block, or `MissingTarget` for effects that need one
    pub fn require_target(&self) -> Result<BlockPos, EffectError> {
        self.target.ok_or(EffectError::MissingTarget)
    }

    /// Queue work for the engine
    pub fn request(&mut self, follow_up: FollowUp) {
        self.follow_ups.push(follow_up);
    }

    /// Record that the item store produced a new handle for this item
    pub fn replace_item(&mut self, item: ItemHandle) {
        self.updated_item = Some(item);
    }

    /// Blocks cleared so far in this activation
    pub fn cleared(&self) -> u32 {
        self.cleared
    }

    /// Blocks this activation may still clear under the engine-wide ceiling
    pub fn remaining_budget(&self) -> u32 {
        self.unit_budget.saturating_sub(self.cleared)
    }

    /// Hand the queued follow-ups and item update to the engine
    pub fn finish(self) -> EffectOutcome {
        EffectOutcome {
            cleared: self.cleared,
            follow_ups: self.follow_ups,
            updated_item: self.updated_item,
        }
    }
}

/// What an activation left behind for the engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectOutcome {
    pub cleared: u32,
    pub follow_ups: Vec<FollowUp>,
    pub updated_item: Option<ItemHandle>,
}

/// What every effect handler returns
pub type EffectResult = Result<(), EffectError>;

/// Behaviour attached to an ability id
pub trait Effect: Send + Sync {
    fn apply(&self, ctx: &mut EffectContext<'_>) -> EffectResult;
}

impl<F> Effect for F
where
    F: Fn(&mut EffectContext<'_>) -> EffectResult + Send + Sync,
{
    fn apply(&self, ctx: &mut EffectContext<'_>) -> EffectResult {
        self(ctx)
    }
}
