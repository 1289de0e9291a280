//! # oluso-journey
//!
//! The Oluso journey orchestration engine.
//!
//! A *journey* is one user's traversal of a *policy*, an ordered list of
//! step definitions, from start to a terminal outcome. The engine is
//! request-scoped and stateless between calls: every continuation loads the
//! persisted [`JourneyState`](oluso_model::JourneyState), runs one or more
//! step handlers, persists each transition, and returns a
//! [`JourneyResult`] directing the caller what to render or issue.
//!
//! ## Pieces
//!
//! - [`StepHandler`]: the contract each step type implements
//! - [`StepHandlerRegistry`]: step-type string to handler table
//! - [`condition`]: pure evaluation of skip/branch predicates
//! - [`JourneyOrchestrator`]: the state machine driving it all

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod condition;
pub mod error;
pub mod handler;
pub mod orchestrator;
pub mod registry;
pub mod result;

pub use error::{EngineError, EngineResult};
pub use handler::{ServiceCatalog, StepContext, StepHandler, StepHandlerResult};
pub use orchestrator::JourneyOrchestrator;
pub use registry::StepHandlerRegistry;
pub use result::{Completion, CurrentStep, JourneyResult, StartRequest, StepInput};
