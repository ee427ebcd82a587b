//! Auto-sell hook for the `AutoSell` drop policy

use std::sync::Arc;

use ahash::AHashMap;

use crate::core::types::ActorId;
use crate::providers::economy::Economy;
use crate::world::{ItemStack, Material};

pub trait AutoSellHook: Send + Sync {
    /// Sell what it can and hand back the unsold remainder
    fn sell(&self, actor: ActorId, drops: Vec<ItemStack>) -> Vec<ItemStack>;
}

/// Sells nothing; every drop falls back to normal routing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAutoSell;

impl AutoSellHook for NoAutoSell {
    fn sell(&self, _actor: ActorId, drops: Vec<ItemStack>) -> Vec<ItemStack> {
        drops
    }
}

/// Sells materials at fixed unit prices, paying through an economy
pub struct PriceListAutoSell {
    prices: AHashMap<Material, f64>,
    economy: Arc<dyn Economy>,
}

impl PriceListAutoSell {
    pub fn new(economy: Arc<dyn Economy>) -> Self {
        Self {
            prices: AHashMap::new(),
            economy,
        }
    }

    pub fn with_price(mut self, material: impl Into<Material>, unit_price: f64) -> Self {
        self.prices.insert(material.into(), unit_price);
        self
    }
}

impl AutoSellHook for PriceListAutoSell {
    fn sell(&self, actor: ActorId, drops: Vec<ItemStack>) -> Vec<ItemStack> {
        if !self.economy.is_available() {
            return drops;
        }
        let mut unsold = Vec::new();
        for stack in drops {
            match self.prices.get(&stack.material) {
                Some(price) if *price > 0.0 => {
                    self.economy
                        .deposit(actor, price * stack.count as f64, "auto-sell");
                }
                _ => unsold.push(stack),
            }
        }
        unsold
    }
}
