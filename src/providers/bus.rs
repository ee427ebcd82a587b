//! Cancellable activation notifications

use std::sync::Mutex;

use ahash::AHashSet;

use crate::engine::attempt::ProcAttempt;

/// Observers of activations about to run.
///
/// `publish` returns true when any listener cancelled the activation.
pub trait NotificationBus: Send + Sync {
    fn publish(&self, attempt: &ProcAttempt) -> bool;
}

/// No listeners; never cancels
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentBus;

impl NotificationBus for SilentBus {
    fn publish(&self, _attempt: &ProcAttempt) -> bool {
        false
    }
}

/// Records every published attempt and cancels the abilities it is told to
#[derive(Debug, Default)]
pub struct RecordingBus {
    seen: Mutex<Vec<ProcAttempt>>,
    cancel: Mutex<AHashSet<String>>,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel every future attempt of `ability`
    pub fn cancel_ability(&self, ability: impl Into<String>) {
        let mut cancel = self.cancel.lock().unwrap_or_else(|e| e.into_inner());
        cancel.insert(ability.into());
    }

    pub fn attempts(&self) -> Vec<ProcAttempt> {
        let seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        seen.clone()
    }
}

impl NotificationBus for RecordingBus {
    fn publish(&self, attempt: &ProcAttempt) -> bool {
        {
            let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
            seen.push(attempt.clone());
        }
        let cancel = self.cancel.lock().unwrap_or_else(|e| e.into_inner());
        cancel.contains(&attempt.ability)
    }
}
