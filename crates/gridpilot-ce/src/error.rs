//! Computing element error types.

use thiserror::Error;

/// Result type alias for computing element operations.
pub type CeResult<T> = Result<T, CeError>;

/// Errors from computing element backends and their factory.
///
/// Query-side failures deliberately collapse into one kind: network, auth
/// and remote-service errors are indistinguishable to the Director, which
/// treats any of them as the resource being unavailable for this call.
#[derive(Debug, Error)]
pub enum CeError {
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("submission failed: {0}")]
    SubmissionFailed(String),

    #[error("unknown computing element type: {0}")]
    UnknownType(String),

    #[error("could not build computing element {id}: {reason}")]
    Build { id: String, reason: String },
}
