//! Currency collaborator contract

use std::sync::Mutex;

use ahash::AHashMap;

use crate::core::types::ActorId;

pub trait Economy: Send + Sync {
    fn deposit(&self, actor: ActorId, amount: f64, reason: &str);

    /// Take `amount` if the actor can afford it
    fn withdraw(&self, actor: ActorId, amount: f64, reason: &str) -> bool;

    fn balance(&self, actor: ActorId) -> f64;

    fn is_available(&self) -> bool;
}

/// No economy plugin installed
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEconomy;

impl Economy for NoEconomy {
    fn deposit(&self, _actor: ActorId, _amount: f64, _reason: &str) {}

    fn withdraw(&self, _actor: ActorId, _amount: f64, _reason: &str) -> bool {
        false
    }

    fn balance(&self, _actor: ActorId) -> f64 {
        0.0
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// One ledger line
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub actor: ActorId,
    pub amount: f64,
    pub reason: String,
}

#[derive(Debug, Default)]
struct Ledger {
    balances: AHashMap<ActorId, f64>,
    entries: Vec<LedgerEntry>,
}

/// In-memory balances with a transaction log
#[derive(Debug, Default)]
pub struct MemoryEconomy {
    ledger: Mutex<Ledger>,
}

impl MemoryEconomy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every transaction so far; withdrawals are negative
    pub fn entries(&self) -> Vec<LedgerEntry> {
        let ledger = self.ledger.lock().unwrap_or_else(|e| e.into_inner());
        ledger.entries.clone()
    }
}

impl Economy for MemoryEconomy {
    fn deposit(&self, actor: ActorId, amount: f64, reason: &str) {
        if !amount.is_finite() || amount <= 0.0 {
            return;
        }
        let mut ledger = self.ledger.lock().unwrap_or_else(|e| e.into_inner());
        *ledger.balances.entry(actor).or_insert(0.0) += amount;
        ledger.entries.push(LedgerEntry {
            actor,
            amount,
            reason: reason.to_string(),
        });
    }

    fn withdraw(&self, actor: ActorId, amount: f64, reason: &str) -> bool {
        if !amount.is_finite() || amount < 0.0 {
            return false;
        }
        let mut ledger = self.ledger.lock().unwrap_or_else(|e| e.into_inner());
        let balance = ledger.balances.entry(actor).or_insert(0.0);
        if *balance < amount {
            return false;
        }
        *balance -= amount;
        ledger.entries.push(LedgerEntry {
            actor,
            amount: -amount,
            reason: reason.to_string(),
        });
        true
    }

    fn balance(&self, actor: ActorId) -> f64 {
        let ledger = self.ledger.lock().unwrap_or_else(|e| e.into_inner());
        ledger.balances.get(&actor).copied().unwrap_or(0.0)
    }

    fn is_available(&self) -> bool {
        true
    }
}
