//! Per-actor effect multipliers (perks, boosters, ranks)

use std::sync::RwLock;

use ahash::AHashMap;

use crate::core::types::ActorId;

pub trait MultiplierProvider: Send + Sync {
    /// Multiplier for a key; 1.0 when the actor has none
    fn multiplier(&self, actor: ActorId, key: &str) -> f64;

    /// Perk level for a key; 0 when the actor has none
    fn level(&self, actor: ActorId, key: &str) -> u32;

    fn has(&self, actor: ActorId, key: &str) -> bool;

    fn is_available(&self) -> bool;
}

/// No multiplier plugin installed
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMultipliers;

impl MultiplierProvider for NoMultipliers {
    fn multiplier(&self, _actor: ActorId, _key: &str) -> f64 {
        1.0
    }

    fn level(&self, _actor: ActorId, _key: &str) -> u32 {
        0
    }

    fn has(&self, _actor: ActorId, _key: &str) -> bool {
        false
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Table of multipliers per actor and key, with an optional
/// fallback applied to every actor
#[derive(Debug, Default)]
pub struct FixedMultipliers {
    per_actor: RwLock<AHashMap<ActorId, AHashMap<String, (f64, u32)>>>,
    global: AHashMap<String, f64>,
}

impl FixedMultipliers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Multiplier every actor receives for `key` unless overridden
    pub fn with_global(mut self, key: impl Into<String>, multiplier: f64) -> Self {
        self.global.insert(key.into(), multiplier);
        self
    }

    pub fn set(&self, actor: ActorId, key: impl Into<String>, multiplier: f64, level: u32) {
        let mut guard = self.per_actor.write().unwrap_or_else(|e| e.into_inner());
        guard
            .entry(actor)
            .or_default()
            .insert(key.into(), (multiplier, level));
    }

    fn lookup(&self, actor: ActorId, key: &str) -> Option<(f64, u32)> {
        let guard = self.per_actor.read().unwrap_or_else(|e| e.into_inner());
        guard.get(&actor).and_then(|keys| keys.get(key)).copied()
    }
}

impl MultiplierProvider for FixedMultipliers {
    fn multiplier(&self, actor: ActorId, key: &str) -> f64 {
        self.lookup(actor, key)
            .map(|(m, _)| m)
            .or_else(|| self.global.get(key).copied())
            .unwrap_or(1.0)
    }

    fn level(&self, actor: ActorId, key: &str) -> u32 {
        self.lookup(actor, key).map(|(_, l)| l).unwrap_or(0)
    }

    fn has(&self, actor: ActorId, key: &str) -> bool {
        self.lookup(actor, key).is_some() || self.global.contains_key(key)
    }

    fn is_available(&self) -> bool {
        true
    }
}
