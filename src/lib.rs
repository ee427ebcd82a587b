//! Enchant Procs - item ability trigger engine
//!
//! Decides, for every qualifying game action, whether an item's abilities
//! fire, and runs the ones that do against the host world.

pub mod catalog;
pub mod cooldown;
pub mod core;
pub mod effects;
pub mod engine;
pub mod providers;
pub mod random;
pub mod world;
