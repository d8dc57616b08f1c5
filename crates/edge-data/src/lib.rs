//! Data-layer contract consumed by the preload orchestrator.
//!
//! This crate provides:
//! - `QueryDescriptor` / `QuerySet` - Opaque, ordered query operations
//! - `FetchPolicy` - Store vs. network preference for a load
//! - `Environment` - Load queries, export and import the record cache
//! - `PreloadedQuery` / `QuerySource` - Disposable handles with shared completion
//! - `EnvironmentCell` - Idempotent once-per-session client environment
//! - `memory::MemoryEnvironment` - In-memory environment for hosts and tests
//!
//! The orchestrator never fetches, caches, or normalizes data itself. It only
//! sequences calls into an `Environment`.

mod descriptor;
mod environment;
mod error;
pub mod memory;
mod policy;
mod query;

pub use descriptor::*;
pub use environment::*;
pub use error::*;
pub use policy::*;
pub use query::*;
