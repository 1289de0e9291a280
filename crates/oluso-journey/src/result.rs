//! Engine inputs and outputs.
//!
//! [`StepInput`] is what the HTTP layer hands the engine on a continue;
//! [`JourneyResult`] is what the engine hands back: a status plus, per
//! status, either the step to render, the completion payload, or error
//! fields.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use oluso_model::JourneyStatus;

/// Error code surfaced when a concurrent continuation already advanced the
/// journey; the caller should re-render from `get_state`.
pub const ALREADY_PROCESSED: &str = "already_processed";

/// The reserved action value that cancels a journey.
pub const CANCEL_ACTION: &str = "cancel";

/// Per-request user input for a journey continuation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepInput {
    /// Step the input was rendered for.
    ///
    /// When set and not matching the journey's current step (a stale form
    /// post), the input values are discarded and the current step is
    /// re-rendered.
    #[serde(default)]
    pub step_id: Option<String>,

    /// Action submitted alongside the values (e.g. `resend`, `cancel`).
    #[serde(default)]
    pub action: Option<String>,

    /// Submitted form values.
    #[serde(default)]
    pub values: HashMap<String, String>,
}

impl StepInput {
    /// Creates an empty input (first render of a step).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates an input carrying a single action.
    #[must_use]
    pub fn action(action: impl Into<String>) -> Self {
        Self {
            step_id: None,
            action: Some(action.into()),
            values: HashMap::new(),
        }
    }

    /// Creates a cancel input.
    #[must_use]
    pub fn cancel() -> Self {
        Self::action(CANCEL_ACTION)
    }

    /// Sets the step ID the input belongs to.
    #[must_use]
    pub fn for_step(mut self, step_id: impl Into<String>) -> Self {
        self.step_id = Some(step_id.into());
        self
    }

    /// Adds a form value.
    #[must_use]
    pub fn value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Checks whether this input is a cancellation.
    #[must_use]
    pub fn is_cancel(&self) -> bool {
        self.action.as_deref() == Some(CANCEL_ACTION)
    }
}

/// Parameters for starting a journey.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    /// Tenant to resolve the policy under.
    pub tenant_id: String,

    /// Already-known user, if the flow starts authenticated (profile edit).
    #[serde(default)]
    pub user_id: Option<String>,

    /// Seed values for the data bag (e.g. `login_hint`, `redirect_uri`).
    #[serde(default)]
    pub initial_data: HashMap<String, Value>,
}

impl StartRequest {
    /// Creates a request for the given tenant.
    #[must_use]
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user_id: None,
            initial_data: HashMap::new(),
        }
    }

    /// Sets the already-authenticated user.
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Seeds a data bag value.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.initial_data.insert(key.into(), value.into());
        self
    }
}

/// The step the caller should render next.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentStep {
    /// Step identifier within the policy.
    pub step_id: String,
    /// Step type.
    pub step_type: String,
    /// View name for the UI layer.
    pub view: String,
    /// View model passed to the renderer.
    pub model: Value,
}

/// Payload of a completed journey.
///
/// The engine signals completion with claims; whether a session or tokens
/// are issued is the caller's decision. A bound `user_id` together with an
/// `authenticated_at` claim signals a real login; their absence signals a
/// data-collection journey (e.g. password reset request).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    /// User bound during the journey, if any.
    pub user_id: Option<String>,
    /// The accumulated data bag at completion.
    pub claims: HashMap<String, Value>,
    /// Redirect target seeded into the data bag, if any.
    pub redirect_uri: Option<String>,
    /// Success message from the policy, if any.
    pub success_message: Option<String>,
}

/// Error details of a failed journey.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyError {
    /// Machine-readable error code.
    pub code: String,
    /// Caller-facing description.
    #[serde(default)]
    pub description: Option<String>,
}

/// What the orchestrator returns after a start or continue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyResult {
    /// Journey identifier.
    pub journey_id: String,
    /// Journey status after this request.
    pub status: JourneyStatus,
    /// Step to render (`InProgress` only).
    #[serde(default)]
    pub current_step: Option<CurrentStep>,
    /// Completion payload (`Completed` only).
    #[serde(default)]
    pub completion: Option<Completion>,
    /// Error details (`Failed`, or benign codes on `InProgress`).
    #[serde(default)]
    pub error: Option<JourneyError>,
}

impl JourneyResult {
    /// Creates an in-progress result with the step to render.
    #[must_use]
    pub fn in_progress(journey_id: impl Into<String>, step: CurrentStep) -> Self {
        Self {
            journey_id: journey_id.into(),
            status: JourneyStatus::InProgress,
            current_step: Some(step),
            completion: None,
            error: None,
        }
    }

    /// Creates a completed result.
    #[must_use]
    pub fn completed(journey_id: impl Into<String>, completion: Completion) -> Self {
        Self {
            journey_id: journey_id.into(),
            status: JourneyStatus::Completed,
            current_step: None,
            completion: Some(completion),
            error: None,
        }
    }

    /// Creates a failed result.
    #[must_use]
    pub fn failed(
        journey_id: impl Into<String>,
        code: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            journey_id: journey_id.into(),
            status: JourneyStatus::Failed,
            current_step: None,
            completion: None,
            error: Some(JourneyError {
                code: code.into(),
                description: Some(description.into()),
            }),
        }
    }

    /// Creates a cancelled result.
    #[must_use]
    pub fn cancelled(journey_id: impl Into<String>) -> Self {
        Self {
            journey_id: journey_id.into(),
            status: JourneyStatus::Cancelled,
            current_step: None,
            completion: None,
            error: None,
        }
    }

    /// Creates an expired result.
    #[must_use]
    pub fn expired(journey_id: impl Into<String>) -> Self {
        Self {
            journey_id: journey_id.into(),
            status: JourneyStatus::Expired,
            current_step: None,
            completion: None,
            error: None,
        }
    }

    /// Creates the benign result for a lost optimistic-concurrency race.
    ///
    /// The journey stays `InProgress` from this caller's perspective; the
    /// competing request already advanced it.
    #[must_use]
    pub fn already_processed(journey_id: impl Into<String>) -> Self {
        Self {
            journey_id: journey_id.into(),
            status: JourneyStatus::InProgress,
            current_step: None,
            completion: None,
            error: Some(JourneyError {
                code: ALREADY_PROCESSED.to_string(),
                description: Some("a concurrent request already advanced this journey".into()),
            }),
        }
    }

    /// Checks if the journey reached a terminal status.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
