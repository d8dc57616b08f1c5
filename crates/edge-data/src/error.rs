//! Fetch error types.

use thiserror::Error;

/// Failure reported by a query's completion signal.
///
/// `Clone` because one completion is observed by every subscriber.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Transport failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success response from the data server.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Response body could not be decoded.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// A store-only load found nothing in the record cache.
    #[error("Missing data in store for {0}")]
    MissingData(String),

    /// The handle was read after it was disposed.
    #[error("Query handle already disposed")]
    Disposed,

    /// The completion signal went away without an outcome.
    #[error("Query aborted")]
    Aborted,
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Decode(e.to_string())
    }
}
