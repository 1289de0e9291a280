//! Engine error types.
//!
//! Business-logic failures (bad password, denied consent) are *values*
//! ([`StepHandlerResult::Fail`](crate::handler::StepHandlerResult)) and
//! terminal journey outcomes are statuses on
//! [`JourneyResult`](crate::result::JourneyResult); this error type covers
//! what is left: requests the engine cannot meaningfully answer at all.

use thiserror::Error;

use oluso_store::StoreError;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors returned by the journey engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No journey with this ID, or the journey is already terminal.
    ///
    /// Terminal records may have been physically deleted, so the two cases
    /// are indistinguishable by design. Always user-recoverable by starting
    /// a fresh journey.
    #[error("journey not found: {0}")]
    JourneyNotFound(String),

    /// No such policy for this tenant.
    #[error("policy not found: {policy_id} (tenant {tenant_id})")]
    PolicyNotFound {
        /// Tenant the lookup ran under.
        tenant_id: String,
        /// Requested policy ID.
        policy_id: String,
    },

    /// The policy exists but is disabled.
    #[error("policy is disabled: {0}")]
    PolicyDisabled(String),

    /// A handler is already registered for this step type.
    ///
    /// Registration is rejected rather than overwritten: silently swapping
    /// a login handler at startup is a deployment hazard.
    #[error("duplicate handler registration for step type: {0}")]
    DuplicateHandler(String),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Unexpected handler or engine failure.
    #[error("internal engine error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
