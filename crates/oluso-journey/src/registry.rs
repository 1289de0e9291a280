//! Step handler registry.
//!
//! Maps a step-type identifier to its handler instance. Built-in handlers
//! register eagerly at startup; custom and plugin-backed handlers register
//! through the same call, so the orchestrator is agnostic to origin.

use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{EngineError, EngineResult};
use crate::handler::StepHandler;

/// Registry of step handlers, keyed by step type.
///
/// Exactly one handler per step type: duplicate registration is rejected
/// rather than overwritten, so a misconfigured deployment fails loudly at
/// startup instead of silently swapping behaviour.
#[derive(Default)]
pub struct StepHandlerRegistry {
    handlers: DashMap<&'static str, Arc<dyn StepHandler>>,
}

impl StepHandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under its declared step type.
    ///
    /// ## Errors
    ///
    /// Returns `EngineError::DuplicateHandler` if the step type is taken.
    pub fn register(&self, handler: Arc<dyn StepHandler>) -> EngineResult<()> {
        let step_type = handler.step_type();
        match self.handlers.entry(step_type) {
            dashmap::Entry::Occupied(_) => {
                Err(EngineError::DuplicateHandler(step_type.to_string()))
            }
            dashmap::Entry::Vacant(entry) => {
                entry.insert(handler);
                Ok(())
            }
        }
    }

    /// Resolves the handler for a step type.
    #[must_use]
    pub fn resolve(&self, step_type: &str) -> Option<Arc<dyn StepHandler>> {
        self.handlers.get(step_type).map(|entry| Arc::clone(&entry))
    }

    /// Checks if a handler is registered for a step type.
    #[must_use]
    pub fn contains(&self, step_type: &str) -> bool {
        self.handlers.contains_key(step_type)
    }

    /// Lists all registered step types.
    #[must_use]
    pub fn registered_types(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|entry| *entry.key()).collect()
    }

    /// Returns the number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` when no handlers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for StepHandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepHandlerRegistry")
            .field("step_types", &self.registered_types())
            .finish()
    }
}
