//! Descriptor published to listeners before an effect runs

use serde::Serialize;

use crate::core::types::{ActorId, TriggerKind};
use crate::world::{BlockPos, ItemHandle};

/// Whether an activation came from the action itself or from a secondary roll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivationContext {
    Primary,
    Secondary,
}

/// One activation that passed gating and won its roll
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcAttempt {
    pub actor: ActorId,
    pub ability: String,
    pub level: u32,
    pub item: ItemHandle,
    pub target: Option<BlockPos>,
    pub trigger: TriggerKind,
    pub context: ActivationContext,
}

impl ProcAttempt {
    pub fn is_secondary(&self) -> bool {
        self.context == ActivationContext::Secondary
    }
}
