//! Proc engine - decides whether item abilities fire and runs them
//!
//! One engine per server session. It owns cooldowns, buffs and the
//! secondary-roll guard, and is driven synchronously from the game thread:
//! every call completes before it returns, with no locking of its own.
//!
//! Each activation walks the same steps:
//! anti-abuse gate, target filter, cooldown and rate gate, chance roll,
//! cancellable notification, dispatch, then cooldown bookkeeping. Effects
//! queue [`FollowUp`]s instead of calling back in; those run once the
//! handler has returned.

pub mod attempt;
pub mod cache;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use serde::Serialize;

use crate::catalog::{AbilityCatalog, AbilityDefinition};
use crate::cooldown::CooldownTracker;
use crate::core::clock::{Clock, SystemClock};
use crate::core::config::EngineConfig;
use crate::core::error::{EffectError, Result};
use crate::core::types::{ActorId, EpochMillis, TriggerKind};
use crate::effects::{Effect, EffectContext, EffectDispatcher, EffectOutcome, FollowUp};
use crate::providers::{AbilityLevels, Services};
use crate::random::WeightedSelector;
use crate::world::{ActorView, BlockPos, ItemHandle, World};

pub use attempt::{ActivationContext, ProcAttempt};
pub use cache::LevelCache;

/// Time-boxed proc-chance bonus. One per actor; refreshing never stacks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ActiveBuff {
    pub expires_at: EpochMillis,
    pub bonus: f64,
}

impl ActiveBuff {
    pub fn is_active(&self, now: EpochMillis) -> bool {
        now < self.expires_at
    }
}

/// Why an activation stopped before the roll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GateReason {
    UnknownAbility,
    ZeroLevel,
    WrongTrigger,
    NoConsequenceMode,
    MissingPermission,
    TargetFiltered,
    Cooldown,
    RateLimited,
}

/// How one activation attempt ended
#[derive(Debug, Clone, PartialEq)]
pub enum ActivationResult {
    Gated(GateReason),
    Missed,
    Cancelled,
    /// Rolled and published, but no handler is registered
    Unhandled,
    /// Handler ran; `cleared` blocks were removed
    Activated { cleared: u32 },
    /// Handler failed or panicked; bookkeeping was still recorded
    Faulted(EffectError),
}

impl ActivationResult {
    pub fn is_activated(&self) -> bool {
        matches!(self, ActivationResult::Activated { .. })
    }
}

/// One entry of an [`ActionReport`]
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationOutcome {
    pub ability: String,
    pub level: u32,
    pub context: ActivationContext,
    pub result: ActivationResult,
}

/// Everything one `process_action` call did
#[derive(Debug, Clone)]
pub struct ActionReport {
    /// Current handle for the item; differs from the input when an effect
    /// changed the item's abilities
    pub item: ItemHandle,
    pub outcomes: Vec<ActivationOutcome>,
}

impl ActionReport {
    /// Abilities whose effect ran, in activation order
    pub fn activated(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_activated())
            .map(|o| o.ability.as_str())
            .collect()
    }

    pub fn item_changed(&self, original: &ItemHandle) -> bool {
        self.item.revision != original.revision
    }
}

/// Running counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcStats {
    pub attempts: u64,
    pub gated: u64,
    pub misses: u64,
    pub cancelled: u64,
    pub activations: u64,
    pub faults: u64,
    pub unhandled: u64,
    pub secondary_rolls: u64,
}

impl ProcStats {
    /// Fraction of attempts whose effect ran
    pub fn activation_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.activations as f64 / self.attempts as f64
        }
    }

    pub fn merge(&mut self, other: &ProcStats) {
        self.attempts += other.attempts;
        self.gated += other.gated;
        self.misses += other.misses;
        self.cancelled += other.cancelled;
        self.activations += other.activations;
        self.faults += other.faults;
        self.unhandled += other.unhandled;
        self.secondary_rolls += other.secondary_rolls;
    }
}

/// State carried across the activations of one action
struct ActionScope<'s> {
    actor: &'s ActorView,
    target: Option<BlockPos>,
    trigger: TriggerKind,
    levels: AbilityLevels,
    item: ItemHandle,
    outcomes: Vec<ActivationOutcome>,
}

/// The proc/trigger engine
pub struct ProcEngine {
    config: EngineConfig,
    catalog: Arc<AbilityCatalog>,
    dispatcher: EffectDispatcher,
    services: Services,
    cooldowns: CooldownTracker,
    buffs: AHashMap<ActorId, ActiveBuff>,
    secondary_in_progress: AHashSet<ActorId>,
    selector: WeightedSelector,
    clock: Arc<dyn Clock>,
    level_cache: LevelCache,
    stats: ProcStats,
}

impl ProcEngine {
    /// Engine with the built-in effects, the system clock and an
    /// entropy-seeded selector
    pub fn new(config: EngineConfig, catalog: AbilityCatalog, services: Services) -> Result<Self> {
        config.validate()?;
        let level_cache = LevelCache::new(config.level_cache_ttl_ms, config.level_cache_capacity);
        Ok(Self {
            config,
            catalog: Arc::new(catalog),
            dispatcher: EffectDispatcher::with_builtins(),
            services,
            cooldowns: CooldownTracker::new(),
            buffs: AHashMap::new(),
            secondary_in_progress: AHashSet::new(),
            selector: WeightedSelector::from_entropy(),
            clock: Arc::new(SystemClock),
            level_cache,
            stats: ProcStats::default(),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_selector(mut self, selector: WeightedSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: EffectDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Register or replace one effect handler
    pub fn register_effect(&mut self, id: impl Into<String>, effect: impl Effect + 'static) {
        self.dispatcher.register(id, effect);
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &AbilityCatalog {
        &self.catalog
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn cooldowns(&self) -> &CooldownTracker {
        &self.cooldowns
    }

    pub fn stats(&self) -> ProcStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = ProcStats::default();
    }

    pub fn now(&self) -> EpochMillis {
        self.clock.now_ms()
    }

    /// Swap in a new catalog. Cooldowns and buffs are kept.
    pub fn reload_catalog(&mut self, catalog: AbilityCatalog) {
        tracing::info!("Reloaded ability catalog with {} abilities", catalog.len());
        self.catalog = Arc::new(catalog);
        self.level_cache.clear();
    }

    /// Load a catalog from TOML and swap it in. The old catalog stays on error.
    pub fn reload_catalog_from(&mut self, path: &Path) -> Result<usize> {
        let catalog = AbilityCatalog::load_from_toml(path)?;
        let count = catalog.len();
        self.reload_catalog(catalog);
        Ok(count)
    }

    /// Run every matching ability on the item for one game action.
    ///
    /// Abilities are tried in id order against one level snapshot taken at
    /// the start. If an effect changes the item, later activations in the
    /// same action see the new handle.
    pub fn process_action(
        &mut self,
        actor: &ActorView,
        item: &ItemHandle,
        target: Option<BlockPos>,
        trigger: TriggerKind,
        world: &mut dyn World,
    ) -> ActionReport {
        let levels = self.levels_for(item);
        let catalog = Arc::clone(&self.catalog);

        let candidates: Vec<(String, u32)> = levels
            .iter()
            .filter(|(_, level)| **level > 0)
            .filter(|(id, _)| catalog.get(id).is_some_and(|def| def.has_trigger(trigger)))
            .map(|(id, level)| (id.clone(), *level))
            .collect();

        let mut scope = ActionScope {
            actor,
            target,
            trigger,
            levels,
            item: item.clone(),
            outcomes: Vec::with_capacity(candidates.len()),
        };

        for (id, level) in candidates {
            self.activate(&mut scope, &id, level, ActivationContext::Primary, world);
        }

        ActionReport {
            item: scope.item,
            outcomes: scope.outcomes,
        }
    }

    /// Attempt one ability outside a full action. Returns true iff its
    /// effect ran to completion.
    #[allow(clippy::too_many_arguments)]
    pub fn try_activate(
        &mut self,
        actor: &ActorView,
        item: &ItemHandle,
        target: Option<BlockPos>,
        trigger: TriggerKind,
        ability: &str,
        level: u32,
        context: ActivationContext,
        world: &mut dyn World,
    ) -> bool {
        let levels = self.levels_for(item);
        let mut scope = ActionScope {
            actor,
            target,
            trigger,
            levels,
            item: item.clone(),
            outcomes: Vec::new(),
        };
        self.activate(&mut scope, ability, level, context, world)
    }

    /// Re-roll one randomly chosen ability from `levels`.
    ///
    /// Abilities that grant secondary rolls are never candidates, and an
    /// actor already inside a secondary roll gets nothing.
    pub fn try_secondary_roll(
        &mut self,
        actor: &ActorView,
        item: &ItemHandle,
        target: Option<BlockPos>,
        levels: &AbilityLevels,
        trigger: TriggerKind,
        world: &mut dyn World,
    ) -> bool {
        let mut scope = ActionScope {
            actor,
            target,
            trigger,
            levels: levels.clone(),
            item: item.clone(),
            outcomes: Vec::new(),
        };
        self.secondary_roll(&mut scope, world)
    }

    fn secondary_roll(&mut self, scope: &mut ActionScope<'_>, world: &mut dyn World) -> bool {
        let actor = scope.actor.id;
        if self.secondary_in_progress.contains(&actor) {
            tracing::debug!("Secondary roll for {} suppressed: already in progress", actor);
            return false;
        }

        let catalog = Arc::clone(&self.catalog);
        let eligible: Vec<(&str, u32)> = scope
            .levels
            .iter()
            .filter(|(_, level)| **level > 0)
            .filter(|(id, _)| {
                catalog.get(id).is_some_and(|def| {
                    !def.flags.grants_secondary_roll && def.has_trigger(scope.trigger)
                })
            })
            .map(|(id, level)| (id.as_str(), *level))
            .collect();

        let Some(&(id, level)) = self.selector.choose(&eligible) else {
            return false;
        };
        let id = id.to_string();

        self.stats.secondary_rolls += 1;
        self.secondary_in_progress.insert(actor);
        let activated = self.activate(scope, &id, level, ActivationContext::Secondary, world);
        self.secondary_in_progress.remove(&actor);
        activated
    }

    fn activate(
        &mut self,
        scope: &mut ActionScope<'_>,
        ability: &str,
        level: u32,
        context: ActivationContext,
        world: &mut dyn World,
    ) -> bool {
        self.stats.attempts += 1;
        let result = self.run_activation(scope, ability, level, context, world);

        match &result {
            ActivationResult::Gated(_) => self.stats.gated += 1,
            ActivationResult::Missed => self.stats.misses += 1,
            ActivationResult::Cancelled => self.stats.cancelled += 1,
            ActivationResult::Unhandled => self.stats.unhandled += 1,
            ActivationResult::Activated { .. } => self.stats.activations += 1,
            ActivationResult::Faulted(_) => self.stats.faults += 1,
        }

        let activated = result.is_activated();
        scope.outcomes.push(ActivationOutcome {
            ability: ability.to_string(),
            level,
            context,
            result,
        });
        activated
    }

    fn run_activation(
        &mut self,
        scope: &mut ActionScope<'_>,
        ability: &str,
        level: u32,
        context: ActivationContext,
        world: &mut dyn World,
    ) -> ActivationResult {
        let catalog = Arc::clone(&self.catalog);
        let Some(def) = catalog.get(ability) else {
            tracing::debug!("Unknown ability '{}'", ability);
            return ActivationResult::Gated(GateReason::UnknownAbility);
        };
        let actor = scope.actor;
        let now = self.clock.now_ms();

        if let Some(reason) = self.gate(def, level, scope, world, now) {
            tracing::debug!("{} gated for {}: {:?}", ability, actor.id, reason);
            return ActivationResult::Gated(reason);
        }

        let chance = self.chance_at(actor.id, def, level, now);
        if !self.selector.roll(chance) {
            return ActivationResult::Missed;
        }

        let attempt = ProcAttempt {
            actor: actor.id,
            ability: def.id.clone(),
            level,
            item: scope.item.clone(),
            target: scope.target,
            trigger: scope.trigger,
            context,
        };
        if self.services.bus.publish(&attempt) {
            tracing::debug!("{} for {} cancelled by listener", ability, actor.id);
            return ActivationResult::Cancelled;
        }

        let Some(handler) = self.dispatcher.dispatch(ability) else {
            tracing::debug!("No effect registered for '{}'", ability);
            return ActivationResult::Unhandled;
        };

        let applied = self.run_effect(&*handler, def, level, scope, &catalog, world);

        self.cooldowns.record(actor.id, ability, now);
        self.cooldowns.increment(actor.id, ability, now);

        match applied {
            Ok(outcome) => {
                if let Some(updated) = outcome.updated_item {
                    self.level_cache.invalidate(scope.item.id);
                    scope.item = updated;
                }
                for follow_up in outcome.follow_ups {
                    self.run_follow_up(follow_up, scope, world);
                }
                ActivationResult::Activated {
                    cleared: outcome.cleared,
                }
            }
            Err(err) => {
                tracing::warn!(
                    ability = %ability,
                    actor = %actor.id,
                    "Effect failed: {}",
                    err
                );
                ActivationResult::Faulted(err)
            }
        }
    }

    /// Anti-abuse, target filter, then cooldown and rate window
    fn gate(
        &self,
        def: &AbilityDefinition,
        level: u32,
        scope: &ActionScope<'_>,
        world: &dyn World,
        now: EpochMillis,
    ) -> Option<GateReason> {
        let actor = scope.actor;
        if level == 0 {
            return Some(GateReason::ZeroLevel);
        }
        if !def.has_trigger(scope.trigger) {
            return Some(GateReason::WrongTrigger);
        }
        if def.flags.ignore_in_creative && actor.mode.is_no_consequence() {
            return Some(GateReason::NoConsequenceMode);
        }
        if def.flags.require_permission
            && !actor.has_permission(&self.config.permission_for(&def.id))
        {
            return Some(GateReason::MissingPermission);
        }
        if let Some(target) = scope.target {
            if !def.accepts_target(&world.block_at(target)) {
                return Some(GateReason::TargetFiltered);
            }
        }
        if self
            .cooldowns
            .is_on_cooldown(actor.id, &def.id, def.cooldown_ms, now)
        {
            return Some(GateReason::Cooldown);
        }
        if self
            .cooldowns
            .exceeded_rate_limit(actor.id, &def.id, def.rate_cap_per_second, now)
        {
            return Some(GateReason::RateLimited);
        }
        None
    }

    fn run_effect(
        &mut self,
        handler: &dyn Effect,
        def: &AbilityDefinition,
        level: u32,
        scope: &ActionScope<'_>,
        catalog: &AbilityCatalog,
        world: &mut dyn World,
    ) -> std::result::Result<EffectOutcome, EffectError> {
        let mut ctx = EffectContext::new(
            scope.actor,
            &scope.item,
            scope.target,
            scope.trigger,
            def.effective_level(level),
            def,
            catalog,
            &scope.levels,
            world,
            &self.services,
            &mut self.selector,
            self.config.max_units_per_activation,
        );

        let result = if self.config.catch_effect_panics {
            catch_unwind(AssertUnwindSafe(|| handler.apply(&mut ctx)))
                .unwrap_or_else(|payload| Err(EffectError::Panicked(panic_message(payload.as_ref()))))
        } else {
            handler.apply(&mut ctx)
        };

        result.map(|()| ctx.finish())
    }

    fn run_follow_up(
        &mut self,
        follow_up: FollowUp,
        scope: &mut ActionScope<'_>,
        world: &mut dyn World,
    ) {
        let actor = scope.actor.id;
        match follow_up {
            FollowUp::SecondaryRoll => {
                self.secondary_roll(scope, world);
            }
            FollowUp::ApplyBuff { duration_ms, bonus } => {
                self.apply_buff(actor, duration_ms, bonus);
            }
            FollowUp::ReduceCooldowns { ms } => {
                self.cooldowns.reduce_all(actor, ms);
            }
        }
    }

    fn levels_for(&mut self, item: &ItemHandle) -> AbilityLevels {
        let now = self.clock.now_ms();
        self.level_cache.get(self.services.items.as_ref(), item, now)
    }

    /// `clamp(base(level) * multiplier * (1 + buff), 0, 1)`
    fn chance_at(
        &mut self,
        actor: ActorId,
        def: &AbilityDefinition,
        level: u32,
        now: EpochMillis,
    ) -> f64 {
        let key = def
            .multiplier_key
            .as_deref()
            .unwrap_or(&self.config.default_multiplier_key);
        let multiplier = self.services.multiplier(actor, key);
        let bonus = self.buff_bonus(actor, now);
        let chance = def.base_chance(level) * multiplier * (1.0 + bonus);
        if chance.is_nan() {
            0.0
        } else {
            chance.clamp(0.0, 1.0)
        }
    }

    /// Chance `ability` at `level` would roll with for this actor right now
    pub fn effective_chance(&mut self, actor: ActorId, ability: &str, level: u32) -> f64 {
        let catalog = Arc::clone(&self.catalog);
        match catalog.get(ability) {
            Some(def) => {
                let now = self.clock.now_ms();
                self.chance_at(actor, def, level, now)
            }
            None => 0.0,
        }
    }

    /// Start a buff, or reset the expiry of the running one to
    /// `now + duration_ms`. The bonus of a running buff is never changed.
    pub fn apply_buff(&mut self, actor: ActorId, duration_ms: u64, bonus: f64) {
        let now = self.clock.now_ms();
        let expires_at = now.saturating_add(duration_ms);
        match self.buffs.get_mut(&actor) {
            Some(buff) if buff.is_active(now) => {
                buff.expires_at = expires_at;
            }
            _ => {
                let bonus = if bonus.is_finite() { bonus.max(0.0) } else { 0.0 };
                self.buffs.insert(actor, ActiveBuff { expires_at, bonus });
            }
        }
    }

    fn buff_bonus(&mut self, actor: ActorId, now: EpochMillis) -> f64 {
        match self.buffs.get(&actor) {
            Some(buff) if buff.is_active(now) => buff.bonus,
            Some(_) => {
                self.buffs.remove(&actor);
                0.0
            }
            None => 0.0,
        }
    }

    /// The actor's unexpired buff
    pub fn active_buff(&self, actor: ActorId) -> Option<ActiveBuff> {
        let now = self.clock.now_ms();
        self.buffs
            .get(&actor)
            .copied()
            .filter(|b| b.is_active(now))
    }

    /// Ms left on the actor's buff, 0 when none
    pub fn buff_remaining(&self, actor: ActorId) -> u64 {
        let now = self.clock.now_ms();
        self.active_buff(actor)
            .map(|b| b.expires_at.saturating_sub(now))
            .unwrap_or(0)
    }

    /// Ms until `ability` is off cooldown for the actor
    pub fn cooldown_remaining(&self, actor: ActorId, ability: &str) -> u64 {
        let Some(def) = self.catalog.get(ability) else {
            return 0;
        };
        self.cooldowns
            .remaining(actor, ability, def.cooldown_ms, self.clock.now_ms())
    }

    /// Forget everything about an actor that left
    pub fn on_actor_disconnect(&mut self, actor: ActorId) {
        self.cooldowns.clear(actor);
        self.buffs.remove(&actor);
        self.secondary_in_progress.remove(&actor);
    }

    /// Actors with any engine state
    pub fn tracked_actors(&self) -> usize {
        let mut actors: AHashSet<ActorId> = self.buffs.keys().copied().collect();
        actors.extend(self.secondary_in_progress.iter().copied());
        actors.extend(self.cooldowns.actors());
        actors.len()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AbilityFlags, ChanceCurve};
    use crate::core::clock::ManualClock;
    use crate::effects::EffectResult;
    use crate::providers::{levels, FixedMultipliers, ItemStore, MemoryItemStore, RecordingBus};
    use crate::world::{GameMode, Material, SparseWorld};

    fn noop(_ctx: &mut EffectContext<'_>) -> EffectResult {
        Ok(())
    }

    struct Harness {
        engine: ProcEngine,
        clock: ManualClock,
        store: Arc<MemoryItemStore>,
        world: SparseWorld,
        actor: ActorView,
        item: ItemHandle,
    }

    fn always(id: &str) -> AbilityDefinition {
        AbilityDefinition::new(id, 3, ChanceCurve::Constant { value: 1.0 })
    }

    fn harness(catalog: AbilityCatalog, item_levels: AbilityLevels) -> Harness {
        harness_with(catalog, item_levels, |s| s)
    }

    fn harness_with(
        catalog: AbilityCatalog,
        item_levels: AbilityLevels,
        wire: impl FnOnce(Services) -> Services,
    ) -> Harness {
        let clock = ManualClock::new(1_000_000);
        let store = Arc::new(MemoryItemStore::new());
        let item = ItemHandle::new("diamond_pickaxe");
        store.insert(&item, item_levels);

        let mut config = EngineConfig::default();
        config.level_cache_ttl_ms = 0;

        let engine = ProcEngine::new(config, catalog, wire(Services::new(store.clone())))
            .unwrap()
            .with_clock(Arc::new(clock.clone()))
            .with_selector(WeightedSelector::seeded(42));

        let mut world = SparseWorld::new();
        world.fill(BlockPos::new(-3, -3, -3), BlockPos::new(3, 3, 3), "stone");

        Harness {
            engine,
            clock,
            store,
            world,
            actor: ActorView::new(ActorId::new()),
            item,
        }
    }

    impl Harness {
        fn act(&mut self, trigger: TriggerKind) -> ActionReport {
            self.engine.process_action(
                &self.actor,
                &self.item,
                Some(BlockPos::ZERO),
                trigger,
                &mut self.world,
            )
        }

        fn try_once(&mut self, ability: &str) -> bool {
            self.engine.try_activate(
                &self.actor,
                &self.item,
                Some(BlockPos::ZERO),
                TriggerKind::BlockBreak,
                ability,
                1,
                ActivationContext::Primary,
                &mut self.world,
            )
        }
    }

    #[test]
    fn test_matching_abilities_fire_in_id_order() {
        let catalog = AbilityCatalog::new()
            .with(always("b"))
            .with(always("a"))
            .with(always("c").with_triggers([TriggerKind::EntityHit]));
        let mut h = harness(catalog, levels([("a", 1), ("b", 2), ("c", 1)]));
        h.engine.register_effect("a", noop);
        h.engine.register_effect("b", noop);

        let report = h.act(TriggerKind::BlockBreak);
        assert_eq!(report.activated(), vec!["a", "b"]);
        assert!(!report.item_changed(&h.item));
    }

    #[test]
    fn test_zero_level_is_skipped() {
        let catalog = AbilityCatalog::new().with(always("a"));
        let mut h = harness(catalog, levels([("a", 0)]));
        h.engine.register_effect("a", noop);

        assert!(h.act(TriggerKind::BlockBreak).outcomes.is_empty());
    }

    #[test]
    fn test_creative_and_permission_gates() {
        let catalog = AbilityCatalog::new().with(always("guarded").with_flags(AbilityFlags {
            ignore_in_creative: true,
            require_permission: true,
            ..AbilityFlags::default()
        }));
        let mut h = harness(catalog, levels([("guarded", 1)]));
        h.engine.register_effect("guarded", noop);

        h.actor = h.actor.clone().in_mode(GameMode::Creative).with_permission("enchant.guarded");
        assert!(!h.try_once("guarded"));

        h.actor = ActorView::new(h.actor.id);
        assert!(!h.try_once("guarded"));

        h.actor = h.actor.clone().with_permission("enchant.guarded");
        assert!(h.try_once("guarded"));
        assert_eq!(h.engine.stats().gated, 2);
    }

    #[test]
    fn test_target_filter_gates() {
        let catalog = AbilityCatalog::new().with(always("ore-only").allow_blocks(["iron_ore"]));
        let mut h = harness(catalog, levels([("ore-only", 1)]));
        h.engine.register_effect("ore-only", noop);

        assert!(!h.try_once("ore-only"));
        h.world.set_block(BlockPos::ZERO, "iron_ore");
        assert!(h.try_once("ore-only"));
        assert_eq!(h.world.block_at(BlockPos::ZERO), Material::from("iron_ore"));
    }

    #[test]
    fn test_miss_records_nothing() {
        let catalog = AbilityCatalog::new()
            .with(AbilityDefinition::new("never", 1, ChanceCurve::Constant { value: 0.0 }).with_cooldown(1_000));
        let mut h = harness(catalog, levels([("never", 1)]));
        h.engine.register_effect("never", noop);

        for _ in 0..100 {
            assert!(!h.try_once("never"));
        }
        assert_eq!(h.engine.stats().misses, 100);
        assert_eq!(h.engine.cooldowns().tracked_actors(), 0);
    }

    #[test]
    fn test_cooldown_window() {
        let catalog = AbilityCatalog::new().with(always("slow").with_cooldown(1_000));
        let mut h = harness(catalog, levels([("slow", 1)]));
        h.engine.register_effect("slow", noop);

        assert!(h.try_once("slow"));
        h.clock.advance(500);
        assert!(!h.try_once("slow"));
        assert_eq!(h.engine.cooldown_remaining(h.actor.id, "slow"), 500);
        h.clock.advance(501);
        assert!(h.try_once("slow"));
    }

    #[test]
    fn test_rate_cap_gates_fourth() {
        let catalog = AbilityCatalog::new().with(always("burst").with_rate_cap(3));
        let mut h = harness(catalog, levels([("burst", 1)]));
        h.engine.register_effect("burst", noop);

        let fired: Vec<bool> = (0..4)
            .map(|_| {
                h.clock.advance(10);
                h.try_once("burst")
            })
            .collect();
        assert_eq!(fired, vec![true, true, true, false]);

        h.clock.advance(1_000);
        assert!(h.try_once("burst"));
    }

    #[test]
    fn test_cancelled_attempt_is_counted_not_recorded() {
        let bus = Arc::new(RecordingBus::new());
        bus.cancel_ability("slow");
        let catalog = AbilityCatalog::new().with(always("slow").with_cooldown(1_000));
        let wired = bus.clone();
        let mut h = harness_with(catalog, levels([("slow", 1)]), move |s| s.with_bus(wired));
        h.engine.register_effect("slow", noop);

        assert!(!h.try_once("slow"));
        assert_eq!(h.engine.stats().cancelled, 1);
        assert_eq!(h.engine.cooldown_remaining(h.actor.id, "slow"), 0);
        assert_eq!(bus.attempts().len(), 1);
        assert_eq!(bus.attempts()[0].context, ActivationContext::Primary);
    }

    #[test]
    fn test_fault_is_contained_and_bookkept() {
        let catalog = AbilityCatalog::new()
            .with(always("broken").with_cooldown(1_000))
            .with(always("panics").with_cooldown(1_000))
            .with(always("fine"));
        let mut h = harness(catalog, levels([("broken", 1), ("fine", 1), ("panics", 1)]));
        h.engine.register_effect("broken", |_: &mut EffectContext<'_>| -> EffectResult {
            Err(EffectError::World("chunk unloaded".into()))
        });
        h.engine.register_effect("panics", |_: &mut EffectContext<'_>| -> EffectResult {
            panic!("handler bug")
        });
        h.engine.register_effect("fine", noop);

        let report = h.act(TriggerKind::BlockBreak);
        assert_eq!(report.activated(), vec!["fine"]);
        assert!(matches!(
            report.outcomes[2].result,
            ActivationResult::Faulted(EffectError::Panicked(ref msg)) if msg == "handler bug"
        ));
        assert_eq!(h.engine.stats().faults, 2);
        assert_eq!(h.engine.cooldown_remaining(h.actor.id, "broken"), 1_000);
        assert_eq!(h.engine.cooldown_remaining(h.actor.id, "panics"), 1_000);
    }

    #[test]
    fn test_unhandled_ability_is_noop() {
        let catalog = AbilityCatalog::new().with(always("ghost").with_cooldown(1_000));
        let mut h = harness(catalog, levels([("ghost", 1)]));
        h.engine = h.engine.with_dispatcher(EffectDispatcher::new());

        assert!(!h.try_once("ghost"));
        assert_eq!(h.engine.stats().unhandled, 1);
        assert_eq!(h.engine.cooldown_remaining(h.actor.id, "ghost"), 0);
    }

    #[test]
    fn test_multiplier_and_buff_scale_chance() {
        let multipliers = Arc::new(FixedMultipliers::new().with_global("proc-chance", 2.0));
        let catalog = AbilityCatalog::new()
            .with(AbilityDefinition::new("x", 1, ChanceCurve::Constant { value: 0.2 }));
        let h = harness_with(catalog, AbilityLevels::new(), move |s| s.with_multipliers(multipliers));
        let mut engine = h.engine;
        let actor = h.actor.id;

        assert!((engine.effective_chance(actor, "x", 1) - 0.4).abs() < 1e-9);
        engine.apply_buff(actor, 5_000, 0.5);
        assert!((engine.effective_chance(actor, "x", 1) - 0.6).abs() < 1e-9);
        engine.apply_buff(actor, 5_000, 10.0);
        assert!((engine.effective_chance(actor, "x", 1) - 0.6).abs() < 1e-9);
        assert_eq!(engine.effective_chance(actor, "missing", 1), 0.0);
    }

    #[test]
    fn test_chance_is_clamped() {
        let catalog = AbilityCatalog::new()
            .with(AbilityDefinition::new("hot", 1, ChanceCurve::Constant { value: 4.0 }))
            .with(AbilityDefinition::new("cold", 1, ChanceCurve::Constant { value: -1.0 }));
        let mut h = harness(catalog, AbilityLevels::new());
        let actor = h.actor.id;
        assert_eq!(h.engine.effective_chance(actor, "hot", 1), 1.0);
        assert_eq!(h.engine.effective_chance(actor, "cold", 1), 0.0);
    }

    #[test]
    fn test_buff_refresh_extends_without_stacking() {
        let mut h = harness(AbilityCatalog::new(), AbilityLevels::new());
        let actor = h.actor.id;

        h.engine.apply_buff(actor, 10_000, 0.25);
        h.clock.advance(4_000);
        let before = h.engine.buff_remaining(actor);
        h.engine.apply_buff(actor, 10_000, 0.25);

        assert!(h.engine.buff_remaining(actor) >= before);
        assert_eq!(h.engine.buff_remaining(actor), 10_000);
        assert_eq!(h.engine.active_buff(actor).unwrap().bonus, 0.25);

        h.clock.advance(10_001);
        assert!(h.engine.active_buff(actor).is_none());
    }

    #[test]
    fn test_buff_refresh_resets_expiry_to_new_duration() {
        let mut h = harness(AbilityCatalog::new(), AbilityLevels::new());
        let actor = h.actor.id;

        h.engine.apply_buff(actor, 30_000, 0.5);
        h.clock.advance(1_000);
        h.engine.apply_buff(actor, 5_000, 2.0);

        let buff = h.engine.active_buff(actor).unwrap();
        assert_eq!(buff.expires_at, h.clock.now_ms() + 5_000);
        assert_eq!(buff.bonus, 0.5);
    }

    #[test]
    fn test_tracked_actors_counts_union_of_state() {
        let mut h = harness(AbilityCatalog::new(), AbilityLevels::new());
        let buffed = ActorId::new();
        let cooling = ActorId::new();
        let now = h.clock.now_ms();

        h.engine.apply_buff(buffed, 5_000, 0.1);
        h.engine.cooldowns.record(cooling, "x", now);
        assert_eq!(h.engine.tracked_actors(), 2);

        h.engine.cooldowns.record(buffed, "x", now);
        assert_eq!(h.engine.tracked_actors(), 2);

        h.engine.on_actor_disconnect(cooling);
        assert_eq!(h.engine.tracked_actors(), 1);
    }

    #[test]
    fn test_echo_rolls_another_ability_but_never_itself() {
        let catalog = AbilityCatalog::with_defaults();
        let echo = catalog.get("echo").unwrap().clone();
        let catalog = AbilityCatalog::new()
            .with(AbilityDefinition {
                chance: ChanceCurve::Constant { value: 1.0 },
                ..echo
            })
            .with(AbilityDefinition::new("other", 1, ChanceCurve::Constant { value: 1.0 })
                .with_triggers([TriggerKind::EntityHit]))
            .with(AbilityDefinition::new("pick", 1, ChanceCurve::Constant { value: 1.0 }));
        let mut h = harness(catalog, levels([("echo", 1), ("other", 1)]));
        h.engine.register_effect("pick", noop);
        h.engine.register_effect("other", noop);

        // "other" has the wrong trigger, so echo finds nothing to roll
        let report = h.act(TriggerKind::BlockBreak);
        assert_eq!(report.activated(), vec!["echo"]);

        h.store.insert(&h.item, levels([("echo", 1), ("pick", 1)]));
        let report = h.act(TriggerKind::BlockBreak);
        let secondary: Vec<&ActivationOutcome> = report
            .outcomes
            .iter()
            .filter(|o| o.context == ActivationContext::Secondary)
            .collect();
        assert_eq!(secondary.len(), 1);
        assert_eq!(secondary[0].ability, "pick");
    }

    #[test]
    fn test_secondary_roll_does_not_recurse() {
        let catalog = AbilityCatalog::new().with(always("loop"));
        let mut h = harness(catalog, levels([("loop", 1)]));
        // A non-granting effect that still asks for another roll
        h.engine.register_effect("loop", |ctx: &mut EffectContext<'_>| -> EffectResult {
            ctx.request(FollowUp::SecondaryRoll);
            Ok(())
        });

        let lv = levels([("loop", 1)]);
        let (actor, item) = (h.actor.clone(), h.item.clone());
        assert!(h.engine.try_secondary_roll(
            &actor,
            &item,
            Some(BlockPos::ZERO),
            &lv,
            TriggerKind::BlockBreak,
            &mut h.world,
        ));
        assert_eq!(h.engine.stats().activations, 1);
        assert_eq!(h.engine.stats().secondary_rolls, 1);
    }

    #[test]
    fn test_ascend_updates_item_for_rest_of_action() {
        let catalog = AbilityCatalog::with_defaults();
        let ascend = catalog.get("ascend").unwrap().clone();
        let catalog = AbilityCatalog::new()
            .with(AbilityDefinition {
                chance: ChanceCurve::Constant { value: 1.0 },
                cooldown_ms: 0,
                ..ascend
            })
            .with(AbilityDefinition::new("laser", 3, ChanceCurve::Constant { value: 0.0 }));
        let mut h = harness(catalog, levels([("ascend", 1), ("laser", 1)]));

        let report = h.act(TriggerKind::BlockBreak);
        assert!(report.item_changed(&h.item));
        let now = h.store.ability_levels(&report.item);
        assert_eq!(now.get("laser"), Some(&2));
    }

    #[test]
    fn test_disconnect_resets_actor_state() {
        let catalog = AbilityCatalog::new().with(always("slow").with_cooldown(60_000));
        let mut h = harness(catalog, levels([("slow", 1)]));
        h.engine.register_effect("slow", noop);
        let actor = h.actor.id;

        assert!(h.try_once("slow"));
        h.engine.apply_buff(actor, 60_000, 0.5);
        assert!(h.engine.tracked_actors() > 0);

        h.engine.on_actor_disconnect(actor);
        assert_eq!(h.engine.tracked_actors(), 0);
        assert_eq!(h.engine.cooldown_remaining(actor, "slow"), 0);
        assert!(h.engine.active_buff(actor).is_none());
        assert!(h.try_once("slow"));
    }

    #[test]
    fn test_chronos_pulls_cooldowns_forward() {
        let catalog = AbilityCatalog::new()
            .with(always("slow").with_cooldown(5_000))
            .with(always("chronos"));
        let mut h = harness(catalog, levels([("slow", 1)]));
        h.engine.register_effect("slow", noop);
        h.engine.register_effect("chronos", |ctx: &mut EffectContext<'_>| -> EffectResult {
            ctx.request(FollowUp::ReduceCooldowns { ms: 2_000 });
            Ok(())
        });

        assert!(h.try_once("slow"));
        assert!(h.try_once("chronos"));
        assert_eq!(h.engine.cooldown_remaining(h.actor.id, "slow"), 3_000);
    }

    #[test]
    fn test_reload_replaces_catalog() {
        let mut h = harness(AbilityCatalog::new().with(always("a")), AbilityLevels::new());
        h.engine.reload_catalog(AbilityCatalog::with_defaults());
        assert!(!h.engine.catalog().contains("a"));
        assert!(h.engine.catalog().contains("echo"));

        let missing = h.engine.reload_catalog_from(Path::new("/nonexistent/abilities.toml"));
        assert!(missing.is_err());
        assert!(h.engine.catalog().contains("echo"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.level_cache_ttl_ms = 60_000;
        assert!(ProcEngine::new(config, AbilityCatalog::new(), Services::default()).is_err());
    }
}
