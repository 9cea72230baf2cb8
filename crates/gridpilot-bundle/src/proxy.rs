//! Credential delegation.
//!
//! A pilot must authenticate on the worker without carrying the owner's
//! full credential. The delegator resolves the owner group to its
//! configured authorization attribute and asks the issuing store for a
//! *limited*, time-boxed proxy scoped to that attribute. The limitation is
//! part of the request the store enforces, never an assumption made here.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretBox};
use tracing::debug;

use crate::error::DelegationError;

/// A short-lived, reduced-privilege credential.
///
/// Owned by exactly one submission call: the type is deliberately not
/// `Clone`, so a proxy cannot be cached or shared across calls. The secret
/// bytes are zeroed on drop and never printed.
pub struct DelegatedProxy {
    pem: SecretBox<Vec<u8>>,
    time_left: Duration,
}

impl DelegatedProxy {
    pub fn new(pem: Vec<u8>, time_left: Duration) -> Self {
        Self {
            pem: SecretBox::new(Box::new(pem)),
            time_left,
        }
    }

    /// The raw credential bytes. Callers embed them into a bundle and must
    /// not retain them elsewhere.
    pub fn pem(&self) -> &[u8] {
        self.pem.expose_secret().as_slice()
    }

    /// Remaining validity at issue time.
    pub fn time_left(&self) -> Duration {
        self.time_left
    }
}

impl fmt::Debug for DelegatedProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegatedProxy")
            .field("pem", &"[REDACTED]")
            .field("time_left", &self.time_left)
            .finish()
    }
}

/// What the delegator asks the issuing store for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRequest {
    pub owner_dn: String,
    pub owner_group: String,
    /// Authorization attribute the proxy must carry.
    pub required_attribute: String,
    /// Minimum validity the issued proxy must still have.
    pub required_time_left: Duration,
    /// Reduced-privilege issuance. Always set by the delegator; the store
    /// is the party that enforces it.
    pub limited: bool,
}

/// The external credential store that issues delegated proxies.
///
/// Implementations are remote clients; a background renewal process keeps
/// the stored credentials alive (out of scope here). Must be safe to call
/// from concurrently running Directors.
#[async_trait]
pub trait ProxyStore: Send + Sync {
    async fn issue(&self, request: &ProxyRequest) -> Result<DelegatedProxy, DelegationError>;
}

/// Resolves owner groups to authorization attributes and requests limited
/// proxies from the store.
pub struct CredentialDelegator {
    store: Arc<dyn ProxyStore>,
    group_attributes: BTreeMap<String, String>,
}

impl CredentialDelegator {
    pub fn new(store: Arc<dyn ProxyStore>, group_attributes: BTreeMap<String, String>) -> Self {
        Self {
            store,
            group_attributes,
        }
    }

    /// Obtain a limited proxy for `owner_dn`/`owner_group` with at least
    /// `required_time_left` validity.
    pub async fn get_proxy(
        &self,
        owner_dn: &str,
        owner_group: &str,
        required_time_left: Duration,
    ) -> Result<DelegatedProxy, DelegationError> {
        let attribute = self.group_attributes.get(owner_group).ok_or_else(|| {
            DelegationError::NoCredential {
                owner: format!("{owner_dn}@{owner_group}"),
                reason: format!("no authorization attribute configured for group {owner_group}"),
            }
        })?;

        let request = ProxyRequest {
            owner_dn: owner_dn.to_string(),
            owner_group: owner_group.to_string(),
            required_attribute: attribute.clone(),
            required_time_left,
            limited: true,
        };

        debug!(
            owner_dn,
            owner_group,
            attribute = %request.required_attribute,
            time_left_secs = required_time_left.as_secs(),
            "requesting limited proxy"
        );
        self.store.issue(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records the last request and hands out a canned proxy.
    struct RecordingStore {
        last_request: Mutex<Option<ProxyRequest>>,
    }

    #[async_trait]
    impl ProxyStore for RecordingStore {
        async fn issue(&self, request: &ProxyRequest) -> Result<DelegatedProxy, DelegationError> {
            *self.last_request.lock().unwrap() = Some(request.clone());
            Ok(DelegatedProxy::new(
                b"-----BEGIN CERTIFICATE-----\nfake\n".to_vec(),
                request.required_time_left,
            ))
        }
    }

    fn delegator_with(groups: &[(&str, &str)]) -> (Arc<RecordingStore>, CredentialDelegator) {
        let store = Arc::new(RecordingStore {
            last_request: Mutex::new(None),
        });
        let attributes = groups
            .iter()
            .map(|(g, a)| (g.to_string(), a.to_string()))
            .collect();
        let delegator = CredentialDelegator::new(store.clone(), attributes);
        (store, delegator)
    }

    #[tokio::test]
    async fn unconfigured_group_fails_without_reaching_store() {
        let (store, delegator) = delegator_with(&[("prod", "/vo.example/Role=pilot")]);

        let result = delegator
            .get_proxy("/DC=org/CN=alice", "staging", Duration::from_secs(3600))
            .await;

        assert!(matches!(result, Err(DelegationError::NoCredential { .. })));
        assert!(store.last_request.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn request_is_limited_and_carries_resolved_attribute() {
        let (store, delegator) = delegator_with(&[("prod", "/vo.example/Role=pilot")]);

        let proxy = delegator
            .get_proxy("/DC=org/CN=alice", "prod", Duration::from_secs(7200))
            .await
            .unwrap();

        let request = store.last_request.lock().unwrap().clone().unwrap();
        assert!(request.limited);
        assert_eq!(request.required_attribute, "/vo.example/Role=pilot");
        assert_eq!(request.required_time_left, Duration::from_secs(7200));
        assert_eq!(proxy.time_left(), Duration::from_secs(7200));
    }

    #[tokio::test]
    async fn debug_never_prints_secret_bytes() {
        let proxy = DelegatedProxy::new(b"SECRET-PEM-BYTES".to_vec(), Duration::from_secs(60));
        let rendered = format!("{proxy:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("SECRET-PEM-BYTES"));
    }
}
