//! gridpilot-core — shared types and site configuration.
//!
//! Home of the task-queue descriptor consumed from the external queue
//! store, the canonical pilot-requirement key derived from it, and the
//! resolved per-site configuration the Director reads.

pub mod config;
pub mod types;

pub use config::{CeEndpoint, ConfigError, SiteConfig};
pub use types::{PilotRequirements, TaskQueueDescriptor};
