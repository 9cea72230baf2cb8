//! gridpilot-bundle — secure pilot payload assembly.
//!
//! Two halves of producing a runnable pilot:
//!
//! - [`proxy`]: delegation of a short-lived, reduced-privilege credential
//!   scoped to the owner group's authorization attribute
//! - [`bundle`]: packaging credential + agent + installer into one
//!   self-contained bootstrap artifact
//!
//! Both are local-only operations; nothing here talks to a remote
//! computing element.

pub mod bundle;
pub mod error;
pub mod proxy;

pub use bundle::{
    BundleFile, PilotBundle, build_bundle, decode_payload, OUTBOUND_PROXY_ENV_VAR, PROXY_ENV_VAR,
};
pub use error::{DelegationError, PackagingError};
pub use proxy::{CredentialDelegator, DelegatedProxy, ProxyRequest, ProxyStore};
