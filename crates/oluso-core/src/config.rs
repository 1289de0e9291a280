//! Engine configuration.
//!
//! Tuning knobs for the journey orchestrator and the reference state store.

use serde::{Deserialize, Serialize};

/// Configuration for the journey engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Journey state time-to-live in seconds.
    ///
    /// An in-flight journey not continued within this window expires and
    /// must be restarted. Default: 30 minutes.
    pub journey_ttl_secs: i64,

    /// Whether terminal journey state records are deleted immediately.
    ///
    /// When `false`, completed/failed records are left for the state
    /// store's TTL purge to collect (useful for audit backends).
    pub cleanup_terminal: bool,

    /// Extra headroom added to the auto-advance chain guard.
    ///
    /// The per-request guard is `policy.steps.len() + chain_guard_slack`.
    pub chain_guard_slack: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            journey_ttl_secs: 30 * 60,
            cleanup_terminal: true,
            chain_guard_slack: 1,
        }
    }
}

impl EngineConfig {
    /// Creates a configuration with the given journey TTL.
    #[must_use]
    pub fn with_ttl_secs(mut self, secs: i64) -> Self {
        self.journey_ttl_secs = secs;
        self
    }

    /// Disables deletion of terminal state records.
    #[must_use]
    pub const fn retain_terminal(mut self) -> Self {
        self.cleanup_terminal = false;
        self
    }
}
