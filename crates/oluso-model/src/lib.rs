//! # oluso-model
//!
//! Domain model for the Oluso authentication journey engine.
//!
//! A [`JourneyPolicy`] is the ordered step template a journey follows; a
//! [`JourneyState`] is one in-flight execution of a policy, carrying the
//! accumulating data bag across HTTP round-trips.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod condition;
pub mod policy;
pub mod state;

pub use condition::{Condition, ConditionOperator, ConditionSet};
pub use policy::{JourneyPolicy, JourneyType, StepDefinition};
pub use state::{JourneyState, JourneyStatus};
