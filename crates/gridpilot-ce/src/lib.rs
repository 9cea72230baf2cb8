//! gridpilot-ce — uniform computing-element abstraction.
//!
//! A [`ComputingElement`] hides whatever remote batch system actually
//! accepts pilots behind three operations: occupancy query, requirement
//! matching, and submission. The [`CeFactory`] resolves a configured
//! endpoint to one backend instance; the Director owns the resulting
//! registry, one instance per identifier per configuration epoch.
//!
//! The only backend shipped here is [`InProcessCe`], which executes
//! bundles as local child processes — the wire protocols of real remote
//! batch systems live outside this repository.

pub mod element;
pub mod error;
pub mod factory;
pub mod in_process;

pub use element::{CeOccupancy, ComputingElement, MatchedQueue, SubmissionReceipt};
pub use error::{CeError, CeResult};
pub use factory::CeFactory;
pub use in_process::InProcessCe;
