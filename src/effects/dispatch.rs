//! Ability id -> effect handler registry

use std::sync::Arc;

use ahash::AHashMap;

use crate::effects::builtin;
use crate::effects::Effect;

/// Maps ability ids to their handlers.
///
/// An ability in the catalog without a handler is not an error; the engine
/// treats the activation as a no-op.
#[derive(Clone, Default)]
pub struct EffectDispatcher {
    handlers: AHashMap<String, Arc<dyn Effect>>,
}

impl EffectDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatcher with every built-in effect registered
    pub fn with_builtins() -> Self {
        let mut dispatcher = Self::new();
        builtin::register_builtins(&mut dispatcher);
        dispatcher
    }

    /// Register a handler; a later registration under the same id wins
    pub fn register(&mut self, id: impl Into<String>, effect: impl Effect + 'static) {
        self.handlers.insert(id.into(), Arc::new(effect));
    }

    /// Register an already shared handler
    pub fn register_shared(&mut self, id: impl Into<String>, effect: Arc<dyn Effect>) {
        self.handlers.insert(id.into(), effect);
    }

    pub fn dispatch(&self, id: &str) -> Option<Arc<dyn Effect>> {
        self.handlers.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.handlers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered ids in sorted order
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.handlers.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }
}

impl std::fmt::Debug for EffectDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectDispatcher")
            .field("handlers", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::AbilityCatalog;
    use crate::core::error::EffectError;
    use crate::effects::area::tests::Fixture;
    use crate::effects::{EffectContext, FollowUp};

    #[test]
    fn test_unknown_id_dispatches_nothing() {
        let dispatcher = EffectDispatcher::new();
        assert!(dispatcher.dispatch("laser").is_none());
        assert!(dispatcher.is_empty());
    }

    #[test]
    fn test_later_registration_replaces() {
        let mut dispatcher = EffectDispatcher::new();
        dispatcher.register("boom", |_ctx: &mut EffectContext<'_>| -> Result<(), EffectError> {
            Err(EffectError::MissingTarget)
        });
        dispatcher.register("boom", |ctx: &mut EffectContext<'_>| -> Result<(), EffectError> {
            ctx.request(FollowUp::SecondaryRoll);
            Ok(())
        });
        assert_eq!(dispatcher.len(), 1);

        let mut fx = Fixture::new();
        let mut ctx = fx.ctx(None);
        let handler = dispatcher.dispatch("boom").unwrap();
        handler.apply(&mut ctx).unwrap();
        assert_eq!(ctx.finish().follow_ups, vec![FollowUp::SecondaryRoll]);
    }

    #[test]
    fn test_every_default_ability_has_a_builtin() {
        let dispatcher = EffectDispatcher::with_builtins();
        let catalog = AbilityCatalog::with_defaults();
        for id in catalog.ids() {
            assert!(dispatcher.contains(id), "no handler for {}", id);
        }
        assert_eq!(dispatcher.len(), catalog.len());
    }
}
