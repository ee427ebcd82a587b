//! Ability catalog - every ability definition the engine knows about
//!
//! The catalog is built once per configuration load and never mutated
//! afterwards; a reload swaps in a whole new catalog.

pub mod defaults;
pub mod definition;

use ahash::AHashMap;
use serde::Deserialize;
use std::path::Path;

use crate::core::error::{EnchantError, Result};

pub use definition::{
    AbilityDefinition, AbilityFlags, ChanceCurve, EffectParams, MAX_AREA_RADIUS, MAX_SWEEP_STEPS,
};

/// Catalog of ability definitions, keyed by id
#[derive(Debug, Clone, Default)]
pub struct AbilityCatalog {
    abilities: AHashMap<String, AbilityDefinition>,
}

/// On-disk layout: a list of `[[abilities]]` tables
#[derive(Debug, Deserialize)]
struct TomlCatalog {
    #[serde(default)]
    abilities: Vec<AbilityDefinition>,
}

impl AbilityCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition, replacing any with the same id
    pub fn insert(&mut self, definition: AbilityDefinition) {
        self.abilities.insert(definition.id.clone(), definition);
    }

    pub fn with(mut self, definition: AbilityDefinition) -> Self {
        self.insert(definition);
        self
    }

    pub fn get(&self, id: &str) -> Option<&AbilityDefinition> {
        self.abilities.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.abilities.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.abilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.abilities.is_empty()
    }

    /// Ability ids in sorted order
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.abilities.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &AbilityDefinition> {
        self.abilities.values()
    }

    /// Load a catalog from a TOML file
    pub fn load_from_toml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content).map_err(|e| match e {
            EnchantError::ParseError(msg) => {
                EnchantError::ParseError(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Parse a catalog from a TOML string, validating every definition.
    /// Duplicate ids are rejected rather than silently shadowed.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let data: TomlCatalog = toml::from_str(content)?;

        let mut catalog = Self::new();
        for definition in data.abilities {
            definition.validate()?;
            if catalog.contains(&definition.id) {
                return Err(EnchantError::InvalidDefinition {
                    id: definition.id,
                    reason: "duplicate id".into(),
                });
            }
            catalog.insert(definition);
        }
        Ok(catalog)
    }
}
