//! Randomness primitives shared by the engine and effects

pub mod selector;

pub use selector::{WeightedSelector, WeightedTable};
