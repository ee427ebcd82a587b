pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use error::{EffectError, EnchantError, Result};
pub use types::{AbilityId, ActorId, EntityId, EpochMillis, ItemId, TriggerKind};
