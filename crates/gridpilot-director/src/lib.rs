//! gridpilot-director — the pilot submission control loop.
//!
//! One [`PilotDirector`] serves one class of computing resources: given a
//! task-queue descriptor, it decides whether, where, and how many pilots
//! to submit, under the site's resource ceilings and against unreliable
//! remote endpoints.
//!
//! # Architecture
//!
//! ```text
//! PilotDirector
//!   ├── CE registry        (id → instance, one per configuration epoch)
//!   ├── FailingCE cache    (cool-down exclusions, populated externally)
//!   ├── list-match cache   (requirement key → matched queues)
//!   ├── CredentialDelegator (limited proxy per submission call)
//!   └── throttle policy    (pure occupancy/ceiling decision)
//! ```
//!
//! Directors never share caches; several may run concurrently in one
//! process, each owning its own instance.

pub mod director;
pub mod error;
pub mod policy;

pub use director::PilotDirector;
pub use error::{DirectorError, DirectorResult};
pub use policy::{ThrottleLimits, should_submit};
