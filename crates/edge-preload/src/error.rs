//! Orchestrator error types.

use edge_data::FetchError;
use edge_hydration::BridgeError;
use thiserror::Error;

/// Errors surfaced by the lifecycle orchestrator.
#[derive(Error, Debug)]
pub enum PreloadError {
    /// A caller-supplied props loader failed.
    #[error("Props loader failed: {0:#}")]
    Props(anyhow::Error),

    /// A query failed while rendering without a boundary.
    #[error("Query failed: {0}")]
    Fetch(#[from] FetchError),

    /// The serialized state could not be written or parsed.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// A redirect could not be turned into an HTTP response.
    #[error("Invalid redirect: {0}")]
    Redirect(#[from] http::Error),

    /// No environment factory is configured for this side.
    #[error("No {0} environment configured")]
    MissingEnvironment(&'static str),
}

/// Result type for orchestrator operations.
pub type PreloadResult<T> = Result<T, PreloadError>;
