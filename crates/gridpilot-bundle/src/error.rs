//! Delegation and packaging error types.

use thiserror::Error;

/// Why a credential could not be delegated.
#[derive(Debug, Error)]
pub enum DelegationError {
    /// No usable credential: the owner group has no authorization attribute
    /// configured, or the issuing store denied the request.
    #[error("no credential for {owner}: {reason}")]
    NoCredential { owner: String, reason: String },
}

/// Why a pilot bundle could not be assembled. Packaging fails atomically:
/// no variant ever coexists with a partial artifact.
#[derive(Debug, Error)]
pub enum PackagingError {
    #[error("unreadable payload {name}: {source}")]
    UnreadablePayload {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("compression failed for payload {name}: {source}")]
    Compression {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write bundle artifact: {0}")]
    Write(#[source] std::io::Error),
}
