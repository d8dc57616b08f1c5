//! Hydration bridge error types.

use thiserror::Error;

use crate::bridge::SlotPhase;

/// Errors from the serialized state bridge.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The slot accepts a single write per page load.
    #[error("Hydration slot is {0}, cannot write")]
    AlreadyWritten(SlotPhase),

    /// Failed to serialize the state.
    #[error("Failed to serialize state: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Failed to parse embedded state.
    #[error("Failed to parse state: {0}")]
    Deserialize(#[source] serde_json::Error),
}
