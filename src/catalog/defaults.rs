//! Built-in ability set
//!
//! One definition per built-in effect, tuned for a survival mining server.
//! Servers normally ship their own TOML; these keep the engine usable
//! without one and give simulations a realistic baseline.

use crate::catalog::{AbilityCatalog, AbilityDefinition, AbilityFlags, ChanceCurve, EffectParams};
use crate::core::types::TriggerKind;
use crate::effects::area::DropPolicy;
use crate::world::Material;

/// Stone-like blocks line and area effects are allowed to start on
pub const MINEABLE: [&str; 8] = [
    "stone",
    "cobblestone",
    "deepslate",
    "andesite",
    "diorite",
    "granite",
    "coal_ore",
    "iron_ore",
];

/// Blocks line sweeps pass over instead of clearing
pub const PROTECTED: [&str; 3] = ["spawner", "obsidian", "chest"];

fn linear(base: f64, per_level: f64) -> ChanceCurve {
    ChanceCurve::Linear { base, per_level }
}

fn creative_guarded() -> AbilityFlags {
    AbilityFlags {
        ignore_in_creative: true,
        ..AbilityFlags::default()
    }
}

impl AbilityCatalog {
    /// The built-in abilities, one per built-in effect
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();

        catalog.insert(
            AbilityDefinition::new("explosive", 5, linear(0.02, 0.02))
                .with_cooldown(500)
                .with_rate_cap(4)
                .with_flags(creative_guarded())
                .allow_blocks(MINEABLE)
                .with_params(EffectParams {
                    radius: 1,
                    max_units: 26,
                    ..EffectParams::default()
                }),
        );

        catalog.insert(
            AbilityDefinition::new("chain-break", 5, linear(0.10, 0.05))
                .with_flags(creative_guarded())
                .allow_blocks(MINEABLE)
                .with_params(EffectParams {
                    range: 4,
                    max_units: 8,
                    ..EffectParams::default()
                }),
        );

        catalog.insert(
            AbilityDefinition::new("laser", 3, linear(0.05, 0.025))
                .with_triggers([TriggerKind::PrimaryAction])
                .with_cooldown(2_000)
                .with_flags(AbilityFlags {
                    ignore_in_creative: true,
                    require_permission: true,
                    ..AbilityFlags::default()
                })
                .with_params(EffectParams {
                    range: 16,
                    max_units: 24,
                    skip: PROTECTED.iter().map(|m| Material::from(*m)).collect(),
                    ..EffectParams::default()
                }),
        );

        catalog.insert(
            AbilityDefinition::new("pillar", 4, linear(0.04, 0.02))
                .with_rate_cap(3)
                .with_flags(creative_guarded())
                .allow_blocks(MINEABLE)
                .with_params(EffectParams {
                    height: 3,
                    max_units: 8,
                    ..EffectParams::default()
                }),
        );

        catalog.insert(
            AbilityDefinition::new("multiply", 3, linear(0.05, 0.05))
                .with_flags(creative_guarded())
                .deny_blocks(["spawner"])
                .with_params(EffectParams {
                    amount: 1.0,
                    ..EffectParams::default()
                }),
        );

        catalog.insert(
            AbilityDefinition::new("treasure", 5, linear(0.01, 0.01))
                .with_flags(creative_guarded())
                .with_params(EffectParams {
                    amount: 25.0,
                    ..EffectParams::default()
                }),
        );

        catalog.insert(
            AbilityDefinition::new("shockwave", 3, linear(0.05, 0.05))
                .with_triggers([TriggerKind::EntityHit])
                .with_cooldown(3_000)
                .with_params(EffectParams {
                    radius: 4,
                    strength: 1.2,
                    ..EffectParams::default()
                }),
        );

        catalog.insert(
            AbilityDefinition::new("freeze", 3, linear(0.08, 0.04))
                .with_triggers([TriggerKind::EntityHit])
                .with_cooldown(1_500)
                .with_params(EffectParams {
                    radius: 3,
                    duration_ms: 2_000,
                    ..EffectParams::default()
                }),
        );

        catalog.insert(
            AbilityDefinition::new("venom", 3, linear(0.10, 0.05))
                .with_triggers([TriggerKind::EntityHit])
                .with_params(EffectParams {
                    radius: 3,
                    duration_ms: 3_000,
                    ..EffectParams::default()
                }),
        );

        catalog.insert(
            AbilityDefinition::new("frenzy", 3, linear(0.01, 0.005))
                .with_cooldown(30_000)
                .with_params(EffectParams {
                    duration_ms: 10_000,
                    bonus: 0.25,
                    ..EffectParams::default()
                }),
        );

        catalog.insert(
            AbilityDefinition::new("chronos", 3, linear(0.02, 0.01)).with_params(EffectParams {
                duration_ms: 1_000,
                ..EffectParams::default()
            }),
        );

        catalog.insert(
            AbilityDefinition::new("echo", 3, linear(0.02, 0.01))
                .with_triggers([TriggerKind::BlockBreak, TriggerKind::PrimaryAction])
                .with_flags(AbilityFlags {
                    grants_secondary_roll: true,
                    ignore_in_creative: true,
                    ..AbilityFlags::default()
                }),
        );

        catalog.insert(
            AbilityDefinition::new("ascend", 2, linear(0.002, 0.002))
                .with_cooldown(60_000)
                .with_flags(creative_guarded()),
        );

        catalog.insert(
            AbilityDefinition::new("midas", 1, ChanceCurve::Constant { value: 0.15 })
                .with_flags(creative_guarded())
                .with_params(EffectParams {
                    drop_policy: DropPolicy::AutoSell,
                    max_units: 1,
                    ..EffectParams::default()
                }),
        );

        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let catalog = AbilityCatalog::with_defaults();
        for def in catalog.iter() {
            assert!(def.validate().is_ok(), "{} failed validation", def.id);
        }
    }

    #[test]
    fn test_chain_break_level_three_is_twenty_percent() {
        let catalog = AbilityCatalog::with_defaults();
        let chain = catalog.get("chain-break").unwrap();
        assert!((chain.base_chance(3) - 0.20).abs() < 1e-9);
    }

    #[test]
    fn test_only_echo_grants_secondary_rolls() {
        let catalog = AbilityCatalog::with_defaults();
        let granters: Vec<&str> = catalog
            .iter()
            .filter(|d| d.flags.grants_secondary_roll)
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(granters, vec!["echo"]);
    }
}
