//! # oluso-core
//!
//! Shared foundation for the Oluso authentication journey engine.
//!
//! This crate carries the pieces every other engine crate needs:
//!
//! - Workspace-wide error type with server/client classification
//! - Engine configuration with conservative defaults
//! - Structured journey event logging
//! - Secure random identifier generation for journey IDs

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod event;
pub mod random;

pub use config::EngineConfig;
pub use error::{CoreError, Result};
pub use event::{EventLogger, JourneyEvent, JourneyEventType, TracingEventLogger};
pub use random::{generate_journey_id, random_alphanumeric};
