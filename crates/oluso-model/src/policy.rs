//! Journey policy domain model.
//!
//! A policy is the ordered, named flow definition administrators author:
//! which steps run, in what order, which are optional, and where explicit
//! branches jump. Policies are loaded read-only by the engine at journey
//! start and are immutable for the lifetime of that journey.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::condition::ConditionSet;

/// The kind of flow a policy drives.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JourneyType {
    /// Interactive sign-in.
    #[default]
    SignIn,
    /// Self-service registration.
    SignUp,
    /// Password recovery.
    PasswordReset,
    /// Authenticated profile editing.
    ProfileEdit,
    /// Administrator-defined flow.
    Custom(String),
}

/// One step within a policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDefinition {
    /// Identifier, unique within the policy.
    pub id: String,

    /// Step type, resolved against the handler registry.
    pub step_type: String,

    /// Display name for administrative UIs.
    #[serde(default)]
    pub display_name: Option<String>,

    /// Position in the default sequence. Lower runs first.
    pub order: i32,

    /// Whether this step may be skipped.
    ///
    /// An optional step runs only when its `condition` evaluates to true
    /// against the journey data bag at the moment the step is reached.
    #[serde(default)]
    pub optional: bool,

    /// Skip condition for optional steps.
    #[serde(default)]
    pub condition: Option<ConditionSet>,

    /// Free-form configuration, interpreted by the step's handler.
    #[serde(default)]
    pub configuration: HashMap<String, Value>,

    /// Explicit jumps: logical outcome name to target step ID.
    #[serde(default)]
    pub branches: HashMap<String, String>,
}

impl StepDefinition {
    /// Creates a step with the given ID, type, and order.
    #[must_use]
    pub fn new(id: impl Into<String>, step_type: impl Into<String>, order: i32) -> Self {
        Self {
            id: id.into(),
            step_type: step_type.into(),
            display_name: None,
            order,
            optional: false,
            condition: None,
            configuration: HashMap::new(),
            branches: HashMap::new(),
        }
    }

    /// Marks the step optional with the given skip condition.
    #[must_use]
    pub fn optional_when(mut self, condition: ConditionSet) -> Self {
        self.optional = true;
        self.condition = Some(condition);
        self
    }

    /// Marks the step optional with no condition (always skipped).
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Adds a configuration entry.
    #[must_use]
    pub fn config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.configuration.insert(key.into(), value.into());
        self
    }

    /// Adds a branch mapping.
    #[must_use]
    pub fn branch(mut self, outcome: impl Into<String>, target: impl Into<String>) -> Self {
        self.branches.insert(outcome.into(), target.into());
        self
    }

    /// Reads a string configuration value, with a default.
    #[must_use]
    pub fn config_str<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.configuration
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or(default)
    }

    /// Reads a boolean configuration value, with a default.
    #[must_use]
    pub fn config_bool(&self, key: &str, default: bool) -> bool {
        self.configuration
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(default)
    }

    /// Reads an integer configuration value, with a default.
    #[must_use]
    pub fn config_i64(&self, key: &str, default: i64) -> i64 {
        self.configuration
            .get(key)
            .and_then(Value::as_i64)
            .unwrap_or(default)
    }

    /// Reads a raw configuration value.
    #[must_use]
    pub fn config_value(&self, key: &str) -> Option<&Value> {
        self.configuration.get(key)
    }
}

/// An ordered, named flow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyPolicy {
    /// Policy identifier, unique within a tenant.
    pub id: String,

    /// Tenant the policy belongs to.
    pub tenant_id: String,

    /// Kind of flow this policy drives.
    #[serde(default)]
    pub journey_type: JourneyType,

    /// Display name for administrative UIs.
    #[serde(default)]
    pub display_name: Option<String>,

    /// Whether the policy may start new journeys.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// The steps, in definition order.
    ///
    /// Definition order is the tie-break when two steps share an `order`
    /// value, so it is semantically meaningful and must be preserved.
    pub steps: Vec<StepDefinition>,

    /// Policy-selection condition (evaluated by the caller, not the engine).
    #[serde(default)]
    pub conditions: Option<ConditionSet>,

    /// Message shown on successful completion.
    #[serde(default)]
    pub success_message: Option<String>,

    /// When the policy was created.
    pub created_at: DateTime<Utc>,

    /// When the policy was last updated.
    pub updated_at: DateTime<Utc>,
}

const fn default_enabled() -> bool {
    true
}

impl JourneyPolicy {
    /// Creates an enabled policy with the given steps.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        tenant_id: impl Into<String>,
        journey_type: JourneyType,
        steps: Vec<StepDefinition>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            journey_type,
            display_name: None,
            enabled: true,
            steps,
            conditions: None,
            success_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the success message.
    #[must_use]
    pub fn with_success_message(mut self, message: impl Into<String>) -> Self {
        self.success_message = Some(message.into());
        self
    }

    /// Finds a step by ID.
    #[must_use]
    pub fn step(&self, step_id: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    /// Returns the steps sorted by `order`, ties broken by definition order.
    #[must_use]
    pub fn steps_in_order(&self) -> Vec<&StepDefinition> {
        let mut steps: Vec<&StepDefinition> = self.steps.iter().collect();
        // sort_by_key is stable, so definition order survives equal keys
        steps.sort_by_key(|s| s.order);
        steps
    }

    /// Returns the steps after the given order value, in sequence.
    #[must_use]
    pub fn steps_after(&self, order: i32) -> Vec<&StepDefinition> {
        self.steps_in_order()
            .into_iter()
            .filter(|s| s.order > order)
            .collect()
    }
}
