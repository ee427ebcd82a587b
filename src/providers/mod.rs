//! Collaborator contracts consumed by the engine and effects
//!
//! Every collaborator is injected at construction time. Optional ones have a
//! neutral default so a server without the matching plugin still works:
//! multipliers read as 1.0, every block is clearable, deposits are dropped,
//! withdrawals fail and no listener ever cancels.

pub mod autosell;
pub mod bus;
pub mod economy;
pub mod items;
pub mod multiplier;
pub mod region;

use std::sync::Arc;

use crate::core::types::ActorId;
use crate::world::BlockPos;

pub use autosell::{AutoSellHook, NoAutoSell, PriceListAutoSell};
pub use bus::{NotificationBus, RecordingBus, SilentBus};
pub use economy::{Economy, LedgerEntry, MemoryEconomy, NoEconomy};
pub use items::{levels, AbilityLevels, ItemStore, MemoryItemStore};
pub use multiplier::{FixedMultipliers, MultiplierProvider, NoMultipliers};
pub use region::{DenyRegions, OpenRegions, RegionGuard};

/// The collaborators one engine talks to
#[derive(Clone)]
pub struct Services {
    pub items: Arc<dyn ItemStore>,
    pub multipliers: Arc<dyn MultiplierProvider>,
    pub economy: Arc<dyn Economy>,
    pub regions: Arc<dyn RegionGuard>,
    pub bus: Arc<dyn NotificationBus>,
    pub auto_sell: Arc<dyn AutoSellHook>,
}

impl Services {
    /// Item store plus neutral defaults for everything optional
    pub fn new(items: Arc<dyn ItemStore>) -> Self {
        Self {
            items,
            multipliers: Arc::new(NoMultipliers),
            economy: Arc::new(NoEconomy),
            regions: Arc::new(OpenRegions),
            bus: Arc::new(SilentBus),
            auto_sell: Arc::new(NoAutoSell),
        }
    }

    pub fn with_multipliers(mut self, multipliers: Arc<dyn MultiplierProvider>) -> Self {
        self.multipliers = multipliers;
        self
    }

    pub fn with_economy(mut self, economy: Arc<dyn Economy>) -> Self {
        self.economy = economy;
        self
    }

    pub fn with_regions(mut self, regions: Arc<dyn RegionGuard>) -> Self {
        self.regions = regions;
        self
    }

    pub fn with_bus(mut self, bus: Arc<dyn NotificationBus>) -> Self {
        self.bus = bus;
        self
    }

    pub fn with_auto_sell(mut self, auto_sell: Arc<dyn AutoSellHook>) -> Self {
        self.auto_sell = auto_sell;
        self
    }

    /// Multiplier with the unavailable/garbage cases folded to 1.0
    pub fn multiplier(&self, actor: ActorId, key: &str) -> f64 {
        if !self.multipliers.is_available() {
            return 1.0;
        }
        let value = self.multipliers.multiplier(actor, key);
        if value.is_finite() {
            value
        } else {
            1.0
        }
    }

    /// Region check, permissive when no guard is installed
    pub fn can_clear_at(&self, actor: ActorId, pos: BlockPos) -> bool {
        !self.regions.is_available() || self.regions.can_clear_at(actor, pos)
    }

    /// Deposit if an economy is installed; returns whether it was credited
    pub fn deposit(&self, actor: ActorId, amount: f64, reason: &str) -> bool {
        if !self.economy.is_available() {
            return false;
        }
        self.economy.deposit(actor, amount, reason);
        true
    }

    /// Withdraw, failing closed without an economy
    pub fn withdraw(&self, actor: ActorId, amount: f64, reason: &str) -> bool {
        self.economy.is_available() && self.economy.withdraw(actor, amount, reason)
    }
}

impl Default for Services {
    fn default() -> Self {
        Self::new(Arc::new(MemoryItemStore::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenMultipliers;

    impl MultiplierProvider for BrokenMultipliers {
        fn multiplier(&self, _actor: ActorId, _key: &str) -> f64 {
            f64::INFINITY
        }
        fn level(&self, _actor: ActorId, _key: &str) -> u32 {
            0
        }
        fn has(&self, _actor: ActorId, _key: &str) -> bool {
            true
        }
        fn is_available(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_defaults_are_fail_open() {
        let services = Services::default();
        let actor = ActorId::new();
        assert_eq!(services.multiplier(actor, "proc-chance"), 1.0);
        assert!(services.can_clear_at(actor, BlockPos::ZERO));
        assert!(!services.deposit(actor, 5.0, "test"));
        assert!(!services.withdraw(actor, 5.0, "test"));
    }

    #[test]
    fn test_non_finite_multiplier_is_neutral() {
        let services = Services::default().with_multipliers(Arc::new(BrokenMultipliers));
        assert_eq!(services.multiplier(ActorId::new(), "x"), 1.0);
    }

    #[test]
    fn test_installed_region_guard_is_consulted() {
        let regions = Arc::new(DenyRegions::new());
        regions.protect(BlockPos::ZERO, BlockPos::ZERO);
        let services = Services::default().with_regions(regions);
        assert!(!services.can_clear_at(ActorId::new(), BlockPos::ZERO));
        assert!(services.can_clear_at(ActorId::new(), BlockPos::ONE));
    }

    #[test]
    fn test_installed_economy_credits() {
        let economy = Arc::new(MemoryEconomy::new());
        let services = Services::default().with_economy(economy.clone());
        let actor = ActorId::new();
        assert!(services.deposit(actor, 5.0, "test"));
        assert!(services.withdraw(actor, 2.0, "test"));
        assert_eq!(economy.balance(actor), 3.0);
    }
}
