//! Carrying preloaded queries across the props object and the server/client
//! boundary.
//!
//! This crate provides:
//! - `ContextChannel` / `ContextCarrier` - Hidden payloads on host props
//! - `ServerContext` / `ClientContext` - Per-navigation preload bundles
//! - `SerializedState` - JSON-safe cache snapshot for the client
//! - `HydrationSlot` - Write-once, read-at-most-once global slot
//! - `resolve_on_client` - Rehydrate the client cache without a refetch

mod bridge;
mod channel;
mod context;
mod error;

pub use bridge::*;
pub use channel::*;
pub use context::*;
pub use error::*;
