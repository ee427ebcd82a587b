//! Ability definitions - immutable once loaded

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::core::error::{EnchantError, Result};
use crate::core::types::{AbilityId, TriggerKind};
use crate::effects::area::DropPolicy;
use crate::world::Material;

/// Largest cube radius a definition may ask for; a radius-16 cube is 33^3 cells
pub const MAX_AREA_RADIUS: u32 = 16;

/// Largest step count for line and column sweeps
pub const MAX_SWEEP_STEPS: u32 = 256;

/// Base proc chance as a function of ability level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ChanceCurve {
    /// Same chance at every level
    Constant { value: f64 },
    /// `base` at level 1, plus `per_level` for each level above
    Linear { base: f64, per_level: f64 },
    /// Explicit chance per level; levels past the end reuse the last entry
    Table { values: Vec<f64> },
}

impl ChanceCurve {
    /// Unclamped chance at `level`; level 0 is always 0
    pub fn at(&self, level: u32) -> f64 {
        if level == 0 {
            return 0.0;
        }
        match self {
            ChanceCurve::Constant { value } => *value,
            ChanceCurve::Linear { base, per_level } => base + per_level * (level - 1) as f64,
            ChanceCurve::Table { values } => {
                let idx = (level as usize - 1).min(values.len().saturating_sub(1));
                values.get(idx).copied().unwrap_or(0.0)
            }
        }
    }

    fn is_valid(&self) -> bool {
        match self {
            ChanceCurve::Constant { value } => value.is_finite(),
            ChanceCurve::Linear { base, per_level } => base.is_finite() && per_level.is_finite(),
            ChanceCurve::Table { values } => {
                !values.is_empty() && values.iter().all(|v| v.is_finite())
            }
        }
    }
}

impl Default for ChanceCurve {
    fn default() -> Self {
        ChanceCurve::Constant { value: 0.0 }
    }
}

/// Anti-abuse and behaviour flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilityFlags {
    /// Never fire for actors in creative or spectator mode
    pub ignore_in_creative: bool,
    /// Actor must hold the per-ability permission node
    pub require_permission: bool,
    /// This ability's effect grants a secondary roll; it is never itself a
    /// secondary-roll candidate
    pub grants_secondary_roll: bool,
}

/// Tunables read by effect handlers. Which fields matter depends on the effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectParams {
    /// Cube radius for area clears, blast radius for entity effects
    pub radius: u32,
    /// Steps for line clears
    pub range: u32,
    /// Steps for column clears
    pub height: u32,
    /// Most blocks one activation may clear
    pub max_units: u32,
    /// Base amount (currency, extra drops)
    pub amount: f64,
    /// Duration of buffs and status effects
    pub duration_ms: u64,
    /// Buff bonus, cooldown-reduction scale
    pub bonus: f64,
    /// Knockback strength
    pub strength: f64,
    pub drop_policy: DropPolicy,
    /// Materials line sweeps pass over without clearing
    pub skip: Vec<Material>,
}

impl Default for EffectParams {
    fn default() -> Self {
        Self {
            radius: 1,
            range: 4,
            height: 3,
            max_units: 16,
            amount: 0.0,
            duration_ms: 0,
            bonus: 0.0,
            strength: 1.0,
            drop_policy: DropPolicy::Inventory,
            skip: Vec::new(),
        }
    }
}

/// Static definition of one ability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityDefinition {
    pub id: AbilityId,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    pub max_level: u32,
    pub triggers: Vec<TriggerKind>,
    /// Minimum ms between activations; 0 or less disables
    #[serde(default)]
    pub cooldown_ms: i64,
    /// Max activations per rolling second; 0 or less disables
    #[serde(default)]
    pub rate_cap_per_second: i64,
    pub chance: ChanceCurve,
    /// Target materials this ability may fire on; empty allows all
    #[serde(default)]
    pub allowed_blocks: AHashSet<Material>,
    /// Target materials this ability never fires on
    #[serde(default)]
    pub denied_blocks: AHashSet<Material>,
    #[serde(default)]
    pub flags: AbilityFlags,
    /// Multiplier-provider key; the engine default applies when absent
    #[serde(default)]
    pub multiplier_key: Option<String>,
    #[serde(default)]
    pub params: EffectParams,
}

impl AbilityDefinition {
    pub fn new(id: impl Into<String>, max_level: u32, chance: ChanceCurve) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            description: String::new(),
            max_level,
            triggers: vec![TriggerKind::BlockBreak],
            cooldown_ms: 0,
            rate_cap_per_second: 0,
            chance,
            allowed_blocks: AHashSet::new(),
            denied_blocks: AHashSet::new(),
            flags: AbilityFlags::default(),
            multiplier_key: None,
            params: EffectParams::default(),
        }
    }

    pub fn with_triggers(mut self, triggers: impl IntoIterator<Item = TriggerKind>) -> Self {
        self.triggers = triggers.into_iter().collect();
        self
    }

    pub fn with_cooldown(mut self, cooldown_ms: i64) -> Self {
        self.cooldown_ms = cooldown_ms;
        self
    }

    pub fn with_rate_cap(mut self, per_second: i64) -> Self {
        self.rate_cap_per_second = per_second;
        self
    }

    pub fn with_flags(mut self, flags: AbilityFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_params(mut self, params: EffectParams) -> Self {
        self.params = params;
        self
    }

    pub fn allow_blocks<M: Into<Material>>(mut self, blocks: impl IntoIterator<Item = M>) -> Self {
        self.allowed_blocks.extend(blocks.into_iter().map(Into::into));
        self
    }

    pub fn deny_blocks<M: Into<Material>>(mut self, blocks: impl IntoIterator<Item = M>) -> Self {
        self.denied_blocks.extend(blocks.into_iter().map(Into::into));
        self
    }

    pub fn has_trigger(&self, trigger: TriggerKind) -> bool {
        self.triggers.contains(&trigger)
    }

    /// Levels above the configured maximum count as the maximum
    pub fn effective_level(&self, level: u32) -> u32 {
        level.min(self.max_level)
    }

    /// Base chance at `level`, before multipliers, buffs and clamping
    pub fn base_chance(&self, level: u32) -> f64 {
        self.chance.at(self.effective_level(level))
    }

    /// Allow/deny filter on a target material
    pub fn accepts_target(&self, material: &Material) -> bool {
        if self.denied_blocks.contains(material) {
            return false;
        }
        self.allowed_blocks.is_empty() || self.allowed_blocks.contains(material)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |reason: &str| -> Result<()> {
            Err(EnchantError::InvalidDefinition {
                id: self.id.clone(),
                reason: reason.to_string(),
            })
        };
        if self.id.trim().is_empty() {
            return fail("id must not be empty");
        }
        if self.max_level == 0 {
            return fail("max_level must be positive");
        }
        if self.triggers.is_empty() {
            return fail("at least one trigger is required");
        }
        if !self.chance.is_valid() {
            return fail("chance curve must be finite and non-empty");
        }
        if self.params.radius > MAX_AREA_RADIUS {
            return fail("params.radius exceeds the area limit");
        }
        if self.params.range > MAX_SWEEP_STEPS || self.params.height > MAX_SWEEP_STEPS {
            return fail("params.range and params.height exceed the sweep limit");
        }
        Ok(())
    }
}
