//! Task-queue and pilot-requirement types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One logical queue of equivalent pending work, as handed over by the
/// external task-queue store. Read-only for the Director; immutable for the
/// duration of one submission call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskQueueDescriptor {
    /// Unique id of the task queue.
    pub task_queue_id: u64,
    /// Distinguished name of the owner the pilots will run for.
    pub owner_dn: String,
    /// Owner group, resolved to an authorization attribute at delegation
    /// time.
    pub owner_group: String,
    /// CPU-time requirement in seconds.
    pub cpu_time_secs: u64,
    /// Further requirement attributes forwarded from the job-description
    /// layer (already validated there).
    #[serde(default)]
    pub extra_requirements: BTreeMap<String, String>,
}

/// Canonical form of a descriptor's resource requirements.
///
/// Two descriptors with identical requirements produce identical
/// [`cache_key`](Self::cache_key)s, so list-match results can be shared
/// between them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PilotRequirements {
    pub cpu_time_secs: u64,
    /// Extra attributes, keyed deterministically (sorted by name).
    pub attributes: BTreeMap<String, String>,
}

impl PilotRequirements {
    pub fn from_descriptor(descriptor: &TaskQueueDescriptor) -> Self {
        Self {
            cpu_time_secs: descriptor.cpu_time_secs,
            attributes: descriptor.extra_requirements.clone(),
        }
    }

    /// Deterministic rendering used as the list-match cache key.
    pub fn cache_key(&self) -> String {
        let mut key = format!("CPUTime={}", self.cpu_time_secs);
        for (name, value) in &self.attributes {
            key.push(';');
            key.push_str(name);
            key.push('=');
            key.push_str(value);
        }
        key
    }
}
