//! The computing element trait and its data types.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use gridpilot_core::PilotRequirements;

use crate::error::CeResult;

/// Live occupancy of one computing element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CeOccupancy {
    pub waiting_jobs: u64,
    pub running_jobs: u64,
}

/// One remote queue matching a set of pilot requirements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedQueue {
    /// Identifier of the computing element owning the queue.
    pub ce_id: String,
    pub name: String,
    /// Longest CPU time the queue grants, in seconds.
    pub max_cpu_time_secs: u64,
}

/// Opaque acknowledgement returned by a backend for one accepted pilot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt(pub String);

/// Uniform interface over one remote computing resource.
///
/// All methods are blocking remote I/O from the caller's point of view and
/// may take seconds; implementations own their retry/backoff policy — the
/// Director never retries within a call.
#[async_trait]
pub trait ComputingElement: Send + Sync {
    /// Stable identifier this instance was built for.
    fn id(&self) -> &str;

    /// Current occupancy. Any query, network or auth failure collapses to
    /// [`CeError::ResourceUnavailable`](crate::CeError::ResourceUnavailable).
    async fn dynamic_info(&self) -> CeResult<CeOccupancy>;

    /// Queues able to run pilots with the given requirements.
    ///
    /// Read-only and idempotent on the remote resource.
    async fn available(&self, requirements: &PilotRequirements) -> CeResult<Vec<MatchedQueue>>;

    /// Hand one pilot bootstrap artifact to the resource.
    ///
    /// `pilot` is a self-contained script; it lives in the caller's scratch
    /// directory and may be removed once the call returns, so backends
    /// needing it longer must take their own copy.
    async fn submit_job(&self, pilot: &Path) -> CeResult<SubmissionReceipt>;
}
