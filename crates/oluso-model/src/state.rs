//! Journey state model.
//!
//! One in-flight (or terminal) execution of a policy. The state record is
//! the only thing that survives between HTTP round-trips: the engine is
//! stateless, so everything a later step needs must live in the data bag.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use oluso_core::generate_journey_id;

/// Status of a journey.
///
/// `InProgress` is the only non-terminal status; a journey in any other
/// status can never be continued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JourneyStatus {
    /// Journey is positioned at a step and awaiting input or advancement.
    #[default]
    InProgress,
    /// Journey ran off the end of its policy.
    Completed,
    /// A step failed or a configuration defect was detected.
    Failed,
    /// The user cancelled from the UI layer.
    Cancelled,
    /// The state record outlived its TTL.
    Expired,
}

impl JourneyStatus {
    /// Returns `true` for statuses that permit no further continuation.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

/// One in-flight execution of a policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyState {
    // === Identity ===
    /// Opaque, unguessable journey identifier (primary key).
    pub id: String,
    /// Policy this journey follows.
    pub policy_id: String,
    /// Tenant the journey belongs to.
    pub tenant_id: String,

    // === Position ===
    /// Step the journey is currently positioned at.
    pub current_step_id: String,
    /// Journey status.
    #[serde(default)]
    pub status: JourneyStatus,

    // === Accumulated data ===
    /// Data bag: claims and flags written by steps.
    ///
    /// Monotonically additive during normal flow; steps add or overwrite
    /// keys but the engine never drops prior keys.
    #[serde(default)]
    pub data: HashMap<String, Value>,
    /// User bound to the journey once authenticated.
    #[serde(default)]
    pub user_id: Option<String>,

    // === Timestamps & concurrency ===
    /// When the journey started.
    pub created_at: DateTime<Utc>,
    /// When the state record expires, if ever.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency stamp, incremented by the state store on
    /// every successful update.
    #[serde(default)]
    pub version: u64,
}

impl JourneyState {
    /// Creates a new in-progress journey positioned at `first_step_id`.
    #[must_use]
    pub fn new(
        policy_id: impl Into<String>,
        tenant_id: impl Into<String>,
        first_step_id: impl Into<String>,
        ttl_secs: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: generate_journey_id(),
            policy_id: policy_id.into(),
            tenant_id: tenant_id.into(),
            current_step_id: first_step_id.into(),
            status: JourneyStatus::InProgress,
            data: HashMap::new(),
            user_id: None,
            created_at: now,
            expires_at: Some(now + Duration::seconds(ttl_secs)),
            version: 0,
        }
    }

    /// Checks if the state record is past its expiry timestamp.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() > at)
    }

    /// Reads a data bag value.
    #[must_use]
    pub fn get_data(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Writes a data bag value, overwriting any prior value.
    pub fn set_data(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// Merges a claims map into the data bag, overwriting on conflict.
    pub fn merge_data(&mut self, claims: HashMap<String, Value>) {
        self.data.extend(claims);
    }

    /// Binds the authenticated user.
    pub fn bind_user(&mut self, user_id: impl Into<String>) {
        self.user_id = Some(user_id.into());
    }

    /// Returns `true` once a user has been bound.
    #[must_use]
    pub const fn is_user_bound(&self) -> bool {
        self.user_id.is_some()
    }
}
