//! Shared step-context scaffolding for handler unit tests.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use oluso_journey::{ServiceCatalog, StepContext};
use oluso_model::{JourneyState, StepDefinition};

pub(crate) struct TestCtx {
    step: StepDefinition,
    catalog: ServiceCatalog,
    action: Option<String>,
    values: HashMap<String, String>,
    data: HashMap<String, Value>,
    user_id: Option<String>,
}

impl TestCtx {
    pub(crate) fn new(step: StepDefinition) -> Self {
        Self {
            step,
            catalog: ServiceCatalog::new(),
            action: None,
            values: HashMap::new(),
            data: HashMap::new(),
            user_id: None,
        }
    }

    pub(crate) fn with<T>(mut self, service: Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.catalog.register::<T>(service);
        self
    }

    pub(crate) fn action(mut self, action: &str) -> Self {
        self.action = Some(action.to_string());
        self
    }

    pub(crate) fn value(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    pub(crate) fn data(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    pub(crate) fn user(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    pub(crate) fn build(self) -> StepContext {
        let mut state = JourneyState::new("p", "t", self.step.id.clone(), 600);
        state.data = self.data;
        state.user_id = self.user_id;
        StepContext::new(
            &state,
            self.step,
            self.action,
            self.values,
            Arc::new(self.catalog),
        )
    }
}
