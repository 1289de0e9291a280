//! # oluso-store
//!
//! Storage provider traits for the Oluso journey engine, plus in-memory
//! reference implementations.
//!
//! The engine assumes nothing about a backend beyond read-your-writes per
//! journey ID and a version-stamped conditional update. Production
//! deployments substitute durable implementations (SQL, Redis) behind the
//! same traits; the in-memory stores here back tests and single-node
//! development setups and are explicitly non-durable.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod memory;
pub mod policy;
pub mod state;

pub use error::{StoreError, StoreResult};
pub use memory::{MemoryPolicyStore, MemoryStateStore};
pub use policy::PolicyStore;
pub use state::StateStore;
