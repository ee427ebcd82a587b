//! Cooldown and rate-limit gating

pub mod tracker;

pub use tracker::{CooldownRecord, CooldownTracker, RateWindow, RATE_WINDOW_MS};
