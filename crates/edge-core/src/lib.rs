//! Core abstractions for preloading page data across server and client renders.
//!
//! This crate provides the fundamental types shared by every other crate:
//! - `RouteState` / `RequestContext` - Router snapshot and server request
//! - `ExecutionContext` - Explicit server/client branch for initial props
//! - `Redirect` / `PropsResult` - Props-producing results and redirects
//! - `Variables` / `QueryVariables` - Query parameters per descriptor slot
//! - `LifecyclePhase` - Page lifecycle tracking

mod context;
mod lifecycle;
mod redirect;
mod variables;

pub use context::*;
pub use lifecycle::*;
pub use redirect::*;
pub use variables::*;
