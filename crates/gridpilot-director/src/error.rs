//! Director error types.

use thiserror::Error;

/// Result type alias for director operations.
pub type DirectorResult<T> = Result<T, DirectorError>;

/// Why a submission call produced no pilots at all.
///
/// Partial success is not represented here: fewer pilots than requested is
/// a normal return value, and a mid-loop submission failure keeps the
/// partial count.
#[derive(Debug, Error)]
pub enum DirectorError {
    /// No usable computing element, no matching queue, or the queue query
    /// failed.
    #[error("no resource: {0}")]
    NoResource(String),

    /// Credential delegation was denied or unconfigured.
    #[error("credential delegation failed: {0}")]
    NoCredential(#[from] gridpilot_bundle::DelegationError),

    /// Local bundle assembly failed; the whole call aborts, no partial
    /// pilot set exists.
    #[error("pilot packaging failed: {0}")]
    Packaging(#[from] gridpilot_bundle::PackagingError),
}
