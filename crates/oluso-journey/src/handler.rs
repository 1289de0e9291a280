//! Step handler contract.
//!
//! Step handlers are pluggable components that perform one atomic piece of
//! flow logic (credential check, MFA challenge, consent, branching, plugin
//! call). A handler reads and writes the journey through a
//! [`StepContext`] and reports its verdict as a [`StepHandlerResult`];
//! only the orchestrator moves the step pointer.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use oluso_model::{JourneyState, StepDefinition};

use crate::error::EngineResult;

/// The verdict a step handler returns.
#[derive(Debug, Clone)]
pub enum StepHandlerResult {
    /// More input is needed; orchestration pauses at the current step and
    /// the caller renders the named view.
    ShowUi {
        /// View name for the UI layer.
        view: String,
        /// View model passed to the renderer.
        model: Value,
    },
    /// Step complete; advance by default order rules.
    Success {
        /// Claims merged into the journey data bag.
        claims: HashMap<String, Value>,
    },
    /// Step complete with a named outcome; advance to the policy's mapped
    /// branch target instead of the default next step.
    Branch {
        /// Logical outcome name, looked up in the step's branch map.
        outcome: String,
        /// Claims merged into the journey data bag.
        claims: HashMap<String, Value>,
    },
    /// Step failed; the journey terminates in `Failed`.
    Fail {
        /// Machine-readable error code.
        code: String,
        /// Caller-facing description.
        message: String,
    },
}

impl StepHandlerResult {
    /// Creates a `ShowUi` result.
    #[must_use]
    pub fn show_ui(view: impl Into<String>, model: Value) -> Self {
        Self::ShowUi {
            view: view.into(),
            model,
        }
    }

    /// Creates a `Success` result with no claims.
    #[must_use]
    pub fn success() -> Self {
        Self::Success {
            claims: HashMap::new(),
        }
    }

    /// Creates a `Success` result carrying claims.
    #[must_use]
    pub fn success_with(claims: HashMap<String, Value>) -> Self {
        Self::Success { claims }
    }

    /// Creates a `Branch` result with no claims.
    #[must_use]
    pub fn branch(outcome: impl Into<String>) -> Self {
        Self::Branch {
            outcome: outcome.into(),
            claims: HashMap::new(),
        }
    }

    /// Creates a `Branch` result carrying claims.
    #[must_use]
    pub fn branch_with(outcome: impl Into<String>, claims: HashMap<String, Value>) -> Self {
        Self::Branch {
            outcome: outcome.into(),
            claims,
        }
    }

    /// Creates a `Fail` result.
    #[must_use]
    pub fn fail(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fail {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Checks if this is a `ShowUi` result.
    #[must_use]
    pub const fn is_show_ui(&self) -> bool {
        matches!(self, Self::ShowUi { .. })
    }

    /// Checks if this is a `Success` result.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Checks if this is a `Fail` result.
    #[must_use]
    pub const fn is_fail(&self) -> bool {
        matches!(self, Self::Fail { .. })
    }
}

/// Type-indexed catalog of collaborator services.
///
/// Handlers reach their collaborators (user service, MFA service, message
/// senders, plugin executors) through the catalog rather than holding them
/// directly, so the orchestrator stays agnostic to what any handler needs.
#[derive(Default)]
pub struct ServiceCatalog {
    services: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl ServiceCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service under its (possibly unsized) type.
    ///
    /// Registering the same type twice replaces the earlier entry; the
    /// catalog is assembled once at startup, before any journey runs.
    pub fn register<T>(&mut self, service: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.services.insert(TypeId::of::<T>(), Box::new(service));
    }

    /// Resolves a service by type.
    #[must_use]
    pub fn get<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.services
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<Arc<T>>())
            .cloned()
    }

    /// Checks whether a service type is registered.
    #[must_use]
    pub fn contains<T>(&self) -> bool
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.services.contains_key(&TypeId::of::<T>())
    }
}

impl std::fmt::Debug for ServiceCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCatalog")
            .field("len", &self.services.len())
            .finish()
    }
}

/// Per-invocation view of a journey, handed to a handler.
///
/// The context is the projection of the persisted state plus the request
/// input for one handler call; it is never persisted itself. Changes to
/// `data` and `user_id` are merged back into the journey state by the
/// orchestrator after the call.
#[derive(Debug)]
pub struct StepContext {
    /// Journey identifier.
    pub journey_id: String,
    /// Tenant the journey belongs to.
    pub tenant_id: String,
    /// Policy the journey follows.
    pub policy_id: String,
    /// The step definition being executed (configuration is read-only).
    pub step: StepDefinition,
    /// User bound to the journey, if any.
    pub user_id: Option<String>,
    /// Submitted action, if any (e.g. `resend`).
    pub action: Option<String>,
    /// Submitted form values for this request.
    pub values: HashMap<String, String>,
    /// Working copy of the journey data bag.
    pub data: HashMap<String, Value>,

    services: Arc<ServiceCatalog>,
}

impl StepContext {
    /// Builds a context from persisted state and request input.
    #[must_use]
    pub fn new(
        state: &JourneyState,
        step: StepDefinition,
        action: Option<String>,
        values: HashMap<String, String>,
        services: Arc<ServiceCatalog>,
    ) -> Self {
        Self {
            journey_id: state.id.clone(),
            tenant_id: state.tenant_id.clone(),
            policy_id: state.policy_id.clone(),
            step,
            user_id: state.user_id.clone(),
            action,
            values,
            data: state.data.clone(),
            services,
        }
    }

    /// Gets a submitted form value.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Checks whether any input was submitted with this request.
    ///
    /// A first visit to a step (or an auto-advance chain hop) carries no
    /// input; handlers use this to decide between rendering and verifying.
    #[must_use]
    pub fn has_input(&self) -> bool {
        !self.values.is_empty() || self.action.is_some()
    }

    /// Checks whether the submitted action matches.
    #[must_use]
    pub fn is_action(&self, action: &str) -> bool {
        self.action.as_deref() == Some(action)
    }

    /// Reads a data bag value.
    #[must_use]
    pub fn get_data(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Reads a data bag value as a string.
    #[must_use]
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// Writes a data bag value.
    ///
    /// Writes survive `ShowUi` returns: the orchestrator persists the data
    /// bag as mutated even when the step pauses for more input.
    pub fn set_data(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// Resolves a collaborator service from the catalog.
    #[must_use]
    pub fn service<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.services.get::<T>()
    }

    /// Reads a string configuration value for this step, with a default.
    #[must_use]
    pub fn config_str<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.step.config_str(key, default)
    }

    /// Reads a boolean configuration value for this step, with a default.
    #[must_use]
    pub fn config_bool(&self, key: &str, default: bool) -> bool {
        self.step.config_bool(key, default)
    }

    /// Reads an integer configuration value for this step, with a default.
    #[must_use]
    pub fn config_i64(&self, key: &str, default: i64) -> i64 {
        self.step.config_i64(key, default)
    }

    /// Reads a raw configuration value for this step.
    #[must_use]
    pub fn config_value(&self, key: &str) -> Option<&Value> {
        self.step.config_value(key)
    }
}

/// The executable logic behind a step type.
///
/// ## Contract
///
/// - Must be idempotent on repeated `ShowUi`: re-entering the same step
///   with no new input must reach the identical `ShowUi` result.
/// - Must not advance the journey itself; the orchestrator moves the step
///   pointer based on the returned result.
/// - Side effects (sending codes, verifying passwords) happen inside
///   `execute` and are the handler's own concern.
/// - Unexpected failures (downstream outage) are returned as `Err` and
///   converted by the orchestrator into a generic failed journey.
#[async_trait]
pub trait StepHandler: Send + Sync {
    /// The step type identifier this handler serves.
    fn step_type(&self) -> &'static str;

    /// Display name for administrative UIs.
    fn display_name(&self) -> &'static str {
        self.step_type()
    }

    /// Executes one step invocation.
    async fn execute(&self, context: &mut StepContext) -> EngineResult<StepHandlerResult>;
}
