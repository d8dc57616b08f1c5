//! Streaming primitives for preloaded SSR.
//!
//! This crate provides:
//! - `flush` / `flush_all` - Wait for in-flight queries before serializing a response
//! - `BoundaryState` - Explicit suspense state driving fallback, error, or content
//! - `DocumentShell` - Page document with the hydration state script

mod boundary;
mod flush;
mod shell;

pub use boundary::*;
pub use flush::*;
pub use shell::*;
