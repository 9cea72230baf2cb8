//! Computing element factory.
//!
//! Resolves a configured endpoint (identifier + type) to one backend
//! instance. The factory is stateless and safe to call from concurrently
//! running Directors; each Director keeps the instances it builds in its
//! own registry for the duration of a configuration epoch.

use std::sync::Arc;

use tracing::info;

use gridpilot_core::CeEndpoint;

use crate::element::ComputingElement;
use crate::error::{CeError, CeResult};
use crate::in_process::InProcessCe;

/// Type tag accepted for [`InProcessCe`].
pub const CE_TYPE_IN_PROCESS: &str = "in-process";

#[derive(Debug, Clone, Copy, Default)]
pub struct CeFactory;

impl CeFactory {
    pub fn new() -> Self {
        Self
    }

    /// Build the backend for one endpoint.
    ///
    /// An unknown type or a failed build is reported as an error; there is
    /// no fallback backend.
    pub fn build(&self, endpoint: &CeEndpoint) -> CeResult<Arc<dyn ComputingElement>> {
        let ce: Arc<dyn ComputingElement> = match endpoint.ce_type.as_str() {
            CE_TYPE_IN_PROCESS => Arc::new(InProcessCe::new(&endpoint.id)?),
            other => return Err(CeError::UnknownType(other.to_string())),
        };
        info!(ce = %endpoint.id, ce_type = %endpoint.ce_type, "computing element built");
        Ok(ce)
    }
}
