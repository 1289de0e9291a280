//! End-to-end journey engine scenarios.

mod common;

mod engine_guarantees;
mod journey_flows;
mod recovery_flows;
