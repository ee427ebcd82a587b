//! Engine configuration with documented constants
//!
//! Ability definitions live in the catalog; this struct only holds the knobs
//! that shape how the engine itself behaves.

use serde::{Deserialize, Serialize};

use crate::core::error::{EnchantError, Result};

/// Longest the engine may hold an ability-level snapshot before re-reading
/// the item store. The store does its own caching; anything longer would
/// let the two disagree for a noticeable time.
pub const MAX_LEVEL_CACHE_TTL_MS: u64 = 5_000;

/// Configuration for the proc engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How long an ability-level snapshot may be reused (ms)
    ///
    /// 0 disables the cache and reads the item store on every action.
    pub level_cache_ttl_ms: u64,

    /// Snapshot entries kept before expired ones are swept
    pub level_cache_capacity: usize,

    /// Key handed to the multiplier provider when a definition names none
    pub default_multiplier_key: String,

    /// Prefix of the per-ability permission node ("enchant." + id)
    pub permission_prefix: String,

    /// Hard ceiling on blocks one activation may clear
    ///
    /// Applied on top of each ability's own `max_units`. Caps blocks broken,
    /// not cells visited; sweep geometry is bounded by catalog validation.
    pub max_units_per_activation: u32,

    /// Catch panics raised inside effect handlers
    ///
    /// With this off, a panicking handler unwinds through the caller.
    pub catch_effect_panics: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            level_cache_ttl_ms: 250,
            level_cache_capacity: 4096,
            default_multiplier_key: "proc-chance".into(),
            permission_prefix: "enchant.".into(),
            max_units_per_activation: 512,
            catch_effect_panics: true,
        }
    }
}

impl EngineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.level_cache_ttl_ms > MAX_LEVEL_CACHE_TTL_MS {
            return Err(EnchantError::InvalidConfig(format!(
                "level_cache_ttl_ms ({}) must be <= {}",
                self.level_cache_ttl_ms, MAX_LEVEL_CACHE_TTL_MS
            )));
        }

        if self.max_units_per_activation == 0 {
            return Err(EnchantError::InvalidConfig(
                "max_units_per_activation must be positive".into(),
            ));
        }

        if self.default_multiplier_key.is_empty() {
            return Err(EnchantError::InvalidConfig(
                "default_multiplier_key must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Permission node guarding an ability
    pub fn permission_for(&self, ability: &str) -> String {
        format!("{}{}", self.permission_prefix, ability)
    }
}
