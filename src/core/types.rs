//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for actors (players and anything else that can hold an item)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub Uuid);

impl ActorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a persisted item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for non-block entities in the world (mobs, other players)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

/// Ability identifiers are the kebab-case names used in configuration ("chain-break")
pub type AbilityId = String;

/// Wall-clock time in milliseconds since the Unix epoch
pub type EpochMillis = u64;

/// Category of game action that makes an ability eligible to attempt activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerKind {
    /// Left click / swing
    PrimaryAction,
    /// Right click / use
    SecondaryAction,
    /// A block was broken by the actor
    BlockBreak,
    /// The actor hit another entity
    EntityHit,
}

impl TriggerKind {
    pub fn name(&self) -> &'static str {
        match self {
            TriggerKind::PrimaryAction => "primary-action",
            TriggerKind::SecondaryAction => "secondary-action",
            TriggerKind::BlockBreak => "block-break",
            TriggerKind::EntityHit => "entity-hit",
        }
    }
}

impl std::str::FromStr for TriggerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary-action" => Ok(TriggerKind::PrimaryAction),
            "secondary-action" => Ok(TriggerKind::SecondaryAction),
            "block-break" => Ok(TriggerKind::BlockBreak),
            "entity-hit" => Ok(TriggerKind::EntityHit),
            other => Err(format!("unknown trigger kind: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_id_uniqueness() {
        let a = ActorId::new();
        let b = ActorId::new();
        assert_ne!(a, b);
        assert_eq!(a, a);
    }

    #[test]
    fn test_trigger_kind_name_roundtrips_through_from_str() {
        for kind in [
            TriggerKind::PrimaryAction,
            TriggerKind::SecondaryAction,
            TriggerKind::BlockBreak,
            TriggerKind::EntityHit,
        ] {
            assert_eq!(kind.name().parse::<TriggerKind>(), Ok(kind));
        }
        assert!("sneeze".parse::<TriggerKind>().is_err());
    }

    #[test]
    fn test_trigger_kind_serde_uses_kebab_case() {
        let json = serde_json::to_string(&TriggerKind::PrimaryAction).unwrap();
        assert_eq!(json, "\"primary-action\"");
    }
}
