//! Journey event logging.
//!
//! Structured events for security-relevant journey activity. Every event
//! carries a timestamp, the journey and policy identifiers, the outcome,
//! and the user identity when known.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Journey event categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JourneyEventType {
    /// A journey was started.
    JourneyStarted,
    /// A step handler was executed.
    StepExecuted,
    /// An optional step was skipped by its condition.
    StepSkipped,
    /// A journey reached the end of its policy.
    JourneyCompleted,
    /// A journey terminated with a failure.
    JourneyFailed,
    /// A journey was cancelled by the user.
    JourneyCancelled,
    /// A journey expired before completion.
    JourneyExpired,
}

/// Outcome of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOutcome {
    /// Operation succeeded.
    Success,
    /// Operation failed.
    Failure,
}

/// A journey audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneyEvent {
    /// Unique event identifier.
    pub id: Uuid,

    /// Timestamp of the event (ISO 8601).
    pub timestamp: DateTime<Utc>,

    /// Type of event.
    pub event_type: JourneyEventType,

    /// Outcome of the event.
    pub outcome: EventOutcome,

    /// Tenant the journey belongs to.
    pub tenant_id: Option<String>,

    /// Journey identifier.
    pub journey_id: Option<String>,

    /// Policy the journey follows.
    pub policy_id: Option<String>,

    /// Step involved, if any.
    pub step_id: Option<String>,

    /// Step type involved, if any.
    pub step_type: Option<String>,

    /// User bound to the journey, if any.
    pub user_id: Option<String>,

    /// Error code (for failure events).
    pub error: Option<String>,
}

impl JourneyEvent {
    /// Creates a new event builder.
    #[must_use]
    pub const fn builder(event_type: JourneyEventType) -> JourneyEventBuilder {
        JourneyEventBuilder::new(event_type)
    }
}

/// Builder for journey events.
pub struct JourneyEventBuilder {
    event_type: JourneyEventType,
    outcome: EventOutcome,
    tenant_id: Option<String>,
    journey_id: Option<String>,
    policy_id: Option<String>,
    step_id: Option<String>,
    step_type: Option<String>,
    user_id: Option<String>,
    error: Option<String>,
}

impl JourneyEventBuilder {
    /// Creates a new event builder.
    #[must_use]
    pub const fn new(event_type: JourneyEventType) -> Self {
        Self {
            event_type,
            outcome: EventOutcome::Success,
            tenant_id: None,
            journey_id: None,
            policy_id: None,
            step_id: None,
            step_type: None,
            user_id: None,
            error: None,
        }
    }

    /// Sets the outcome to failure with an error code.
    #[must_use]
    pub fn failure(mut self, error: impl Into<String>) -> Self {
        self.outcome = EventOutcome::Failure;
        self.error = Some(error.into());
        self
    }

    /// Sets the tenant ID.
    #[must_use]
    pub fn tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Sets the journey ID.
    #[must_use]
    pub fn journey(mut self, journey_id: impl Into<String>) -> Self {
        self.journey_id = Some(journey_id.into());
        self
    }

    /// Sets the policy ID.
    #[must_use]
    pub fn policy(mut self, policy_id: impl Into<String>) -> Self {
        self.policy_id = Some(policy_id.into());
        self
    }

    /// Sets the step context.
    #[must_use]
    pub fn step(mut self, step_id: impl Into<String>, step_type: impl Into<String>) -> Self {
        self.step_id = Some(step_id.into());
        self.step_type = Some(step_type.into());
        self
    }

    /// Sets the user ID.
    #[must_use]
    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Builds the event.
    #[must_use]
    pub fn build(self) -> JourneyEvent {
        JourneyEvent {
            id: Uuid::now_v7(),
            timestamp: Utc::now(),
            event_type: self.event_type,
            outcome: self.outcome,
            tenant_id: self.tenant_id,
            journey_id: self.journey_id,
            policy_id: self.policy_id,
            step_id: self.step_id,
            step_type: self.step_type,
            user_id: self.user_id,
            error: self.error,
        }
    }
}

/// Sink for journey events.
pub trait EventLogger: Send + Sync {
    /// Records an event.
    fn log(&self, event: &JourneyEvent);
}

/// Event logger that writes to the tracing framework.
///
/// Events are logged as structured fields at the INFO level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventLogger;

impl TracingEventLogger {
    /// Creates a new tracing logger.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl EventLogger for TracingEventLogger {
    fn log(&self, event: &JourneyEvent) {
        tracing::info!(
            event_id = %event.id,
            event_type = ?event.event_type,
            outcome = ?event.outcome,
            tenant_id = ?event.tenant_id,
            journey_id = ?event.journey_id,
            policy_id = ?event.policy_id,
            step_id = ?event.step_id,
            step_type = ?event.step_type,
            user_id = ?event.user_id,
            error = ?event.error,
            "journey_event"
        );
    }
}
