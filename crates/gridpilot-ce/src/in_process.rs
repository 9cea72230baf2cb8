//! In-process computing element.
//!
//! Executes submitted pilot artifacts as local child processes. Occupancy
//! comes from the backend's own child table: exited children are reaped on
//! every query, and nothing ever waits (a local slot starts immediately),
//! so `waiting_jobs` is always zero.

use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use gridpilot_core::PilotRequirements;

use crate::element::{CeOccupancy, ComputingElement, MatchedQueue, SubmissionReceipt};
use crate::error::{CeError, CeResult};

/// Default CPU-time capacity of the local queue, in seconds.
const DEFAULT_MAX_CPU_TIME_SECS: u64 = 172_800;

pub struct InProcessCe {
    id: String,
    queue_name: String,
    max_cpu_time_secs: u64,
    /// Spool holding this backend's copies of submitted artifacts; the
    /// caller's original may vanish when its call ends. Removed when the
    /// instance is dropped at the end of the configuration epoch.
    spool: TempDir,
    children: Mutex<Vec<Child>>,
    submissions: AtomicU64,
}

impl InProcessCe {
    pub fn new(id: &str) -> CeResult<Self> {
        Self::with_capacity(id, DEFAULT_MAX_CPU_TIME_SECS)
    }

    pub fn with_capacity(id: &str, max_cpu_time_secs: u64) -> CeResult<Self> {
        let spool = tempfile::Builder::new()
            .prefix("gridpilot-ce-")
            .tempdir()
            .map_err(|e| CeError::Build {
                id: id.to_string(),
                reason: format!("could not create spool directory: {e}"),
            })?;
        Ok(Self {
            id: id.to_string(),
            queue_name: format!("{id}/local"),
            max_cpu_time_secs,
            spool,
            children: Mutex::new(Vec::new()),
            submissions: AtomicU64::new(0),
        })
    }

    /// Drop exited children and return how many are still running.
    async fn reap(&self) -> u64 {
        let mut children = self.children.lock().await;
        children.retain_mut(|child| match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                debug!(%status, "pilot child exited");
                false
            }
            Err(e) => {
                warn!(error = %e, "could not query pilot child, dropping it");
                false
            }
        });
        children.len() as u64
    }
}

#[async_trait]
impl ComputingElement for InProcessCe {
    fn id(&self) -> &str {
        &self.id
    }

    async fn dynamic_info(&self) -> CeResult<CeOccupancy> {
        Ok(CeOccupancy {
            waiting_jobs: 0,
            running_jobs: self.reap().await,
        })
    }

    async fn available(&self, requirements: &PilotRequirements) -> CeResult<Vec<MatchedQueue>> {
        if requirements.cpu_time_secs > self.max_cpu_time_secs {
            return Ok(Vec::new());
        }
        Ok(vec![MatchedQueue {
            ce_id: self.id.clone(),
            name: self.queue_name.clone(),
            max_cpu_time_secs: self.max_cpu_time_secs,
        }])
    }

    async fn submit_job(&self, pilot: &Path) -> CeResult<SubmissionReceipt> {
        let serial = self.submissions.fetch_add(1, Ordering::Relaxed) + 1;
        let copy = self.spool.path().join(format!("pilot-{serial}.sh"));
        std::fs::copy(pilot, &copy)
            .map_err(|e| CeError::SubmissionFailed(format!("could not spool pilot: {e}")))?;

        let child = Command::new("sh")
            .arg(&copy)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CeError::SubmissionFailed(e.to_string()))?;

        self.children.lock().await.push(child);
        debug!(ce = %self.id, serial, pilot = %copy.display(), "pilot started");
        Ok(SubmissionReceipt(format!("{}#{serial}", self.id)))
    }
}
