//! The Pilot Director.
//!
//! Drives one task-queue submission call to completion: resolve a usable
//! computing element, match queues (cache-first), package one pilot bundle,
//! then submit pilot by pilot against fresh occupancy until the throttle
//! policy or the resource says stop.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use gridpilot_bundle::{CredentialDelegator, PackagingError, ProxyStore, build_bundle};
use gridpilot_cache::TtlCache;
use gridpilot_ce::{CeFactory, ComputingElement, MatchedQueue};
use gridpilot_core::{CeEndpoint, PilotRequirements, SiteConfig, TaskQueueDescriptor};

use crate::error::{DirectorError, DirectorResult};
use crate::policy::{ThrottleLimits, should_submit};

/// Per-resource-class pilot director.
///
/// Owns its caches and its CE registry outright; nothing here is shared
/// with other Directors running in the same process.
pub struct PilotDirector {
    config: SiteConfig,
    factory: CeFactory,
    store: Arc<dyn ProxyStore>,
    delegator: CredentialDelegator,
    /// CE identifier → live instance, lazily built, valid for one
    /// configuration epoch.
    registry: HashMap<String, Arc<dyn ComputingElement>>,
    /// CEs excluded during cool-down. Populated by an external layer via
    /// [`mark_failing`](Self::mark_failing); the Director only reads it.
    failing_ces: TtlCache<String, String>,
    /// Requirement key → matched queues, refreshed every
    /// `list_match_delay_secs`.
    list_match: TtlCache<String, Vec<MatchedQueue>>,
}

impl PilotDirector {
    pub fn new(config: SiteConfig, factory: CeFactory, store: Arc<dyn ProxyStore>) -> Self {
        let delegator = CredentialDelegator::new(store.clone(), config.group_attributes.clone());
        Self {
            config,
            factory,
            store,
            delegator,
            registry: HashMap::new(),
            failing_ces: TtlCache::new(),
            list_match: TtlCache::new(),
        }
    }

    /// Replace the site configuration and start a new configuration epoch:
    /// every CE instance is dropped and lazily rebuilt on next use.
    pub fn reconfigure(&mut self, config: SiteConfig) {
        self.registry.clear();
        self.delegator = CredentialDelegator::new(self.store.clone(), config.group_attributes.clone());
        info!(site = %config.site_name, "director reconfigured, CE registry dropped");
        self.config = config;
    }

    /// Exclude a CE from the active set for `cooldown`.
    ///
    /// Insertion point for the external circuit-breaker layer; the Director
    /// itself never marks CEs from its own failures.
    pub fn mark_failing(&self, ce_id: &str, cooldown: Duration, reason: &str) {
        warn!(ce = %ce_id, cooldown_secs = cooldown.as_secs(), reason, "CE put in cool-down");
        self.failing_ces
            .add(ce_id.to_string(), cooldown, reason.to_string());
    }

    /// Pre-seed the registry with a ready-made backend instance.
    ///
    /// Lets embedders plug custom backends for configured endpoints the
    /// factory does not know. The instance lives until the next
    /// reconfiguration, like any factory-built one.
    pub fn install_ce(&mut self, ce: Arc<dyn ComputingElement>) {
        self.registry.insert(ce.id().to_string(), ce);
    }

    /// Submit up to `pilots_requested` pilots for one task queue.
    ///
    /// Returns the number actually submitted; stopping early on throttle
    /// refusal or a resource failure is normal, so 0 is a legitimate
    /// result. Only a call that could produce no pilots at all fails.
    pub async fn submit_pilots(
        &mut self,
        work_dir: &Path,
        descriptor: &TaskQueueDescriptor,
        pilot_options: &[String],
        pilots_requested: u32,
    ) -> DirectorResult<u32> {
        let tq = descriptor.task_queue_id;

        self.failing_ces.purge_expired();
        let active = self.active_ces();
        if active.is_empty() {
            return Err(DirectorError::NoResource(
                "no usable computing element in the active set".to_string(),
            ));
        }

        let ce = self.select_ce(&active).ok_or_else(|| {
            DirectorError::NoResource("no computing element instance could be built".to_string())
        })?;

        let requirements = PilotRequirements::from_descriptor(descriptor);
        let queues = self.matched_queues(&ce, &requirements).await?;
        if queues.is_empty() {
            return Err(DirectorError::NoResource(format!(
                "no queue matches task queue {tq}"
            )));
        }

        // Scratch for this call only. The guard removes it on every exit
        // path below, early failures included.
        let scratch = tempfile::Builder::new()
            .prefix(&format!("tq-{tq}-"))
            .tempdir_in(work_dir)
            .map_err(PackagingError::Write)?;

        let options = self.mandatory_options(pilot_options);
        debug!(tq, ?options, "pilot options resolved");

        let proxy = self
            .delegator
            .get_proxy(
                &descriptor.owner_dn,
                &descriptor.owner_group,
                Duration::from_secs(self.config.proxy_time_left_secs),
            )
            .await?;

        let bundle = build_bundle(
            &options,
            &proxy,
            &self.config.pilot_agent,
            &self.config.pilot_installer,
            self.config.outbound_proxy.as_deref(),
        )?;
        // The bundle carries the encoded copy; the plaintext credential is
        // discarded before anything leaves this call.
        drop(proxy);

        let artifact = bundle.write_to(scratch.path())?;

        let limits = ThrottleLimits {
            max_waiting_jobs: self.config.max_waiting_jobs,
            max_number_jobs: self.config.max_number_jobs,
            waiting_to_running_ratio: self.config.waiting_to_running_ratio,
        };

        let mut submitted = 0u32;
        for _ in 0..pilots_requested {
            // Occupancy is re-read fresh before every pilot: each accepted
            // submission perturbs it, so the list-match cache is useless
            // here.
            let occupancy = match ce.dynamic_info().await {
                Ok(occupancy) => occupancy,
                Err(e) => {
                    error!(ce = %ce.id(), error = %e, "occupancy query failed, stopping submission loop");
                    break;
                }
            };

            if !should_submit(occupancy, &limits) {
                debug!(
                    ce = %ce.id(),
                    waiting = occupancy.waiting_jobs,
                    running = occupancy.running_jobs,
                    "throttle policy refused further pilots"
                );
                break;
            }

            match ce.submit_job(&artifact).await {
                Ok(receipt) => {
                    submitted += 1;
                    debug!(ce = %ce.id(), receipt = %receipt.0, "pilot submitted");
                }
                Err(e) => {
                    error!(ce = %ce.id(), error = %e, "pilot submission failed, keeping partial count");
                    break;
                }
            }
        }

        info!(
            tq,
            ce = %ce.id(),
            submitted,
            requested = pilots_requested,
            "pilot submission finished"
        );
        Ok(submitted)
    }

    /// Configured CEs minus those in cool-down.
    fn active_ces(&self) -> Vec<CeEndpoint> {
        self.config
            .computing_elements
            .iter()
            .filter(|endpoint| self.failing_ces.get(&endpoint.id).is_none())
            .cloned()
            .collect()
    }

    /// First active CE with a live instance, building lazily through the
    /// factory. Build failures are reported and the endpoint skipped, never
    /// silently defaulted.
    fn select_ce(&mut self, active: &[CeEndpoint]) -> Option<Arc<dyn ComputingElement>> {
        for endpoint in active {
            if let Some(ce) = self.registry.get(&endpoint.id) {
                return Some(ce.clone());
            }
            match self.factory.build(endpoint) {
                Ok(ce) => {
                    self.registry.insert(endpoint.id.clone(), ce.clone());
                    return Some(ce);
                }
                Err(e) => {
                    error!(ce = %endpoint.id, error = %e, "could not build computing element");
                }
            }
        }
        None
    }

    /// Cache-first queue matching. Successful results (empty ones included)
    /// are cached for the configured delay; failures are surfaced and never
    /// cached.
    async fn matched_queues(
        &self,
        ce: &Arc<dyn ComputingElement>,
        requirements: &PilotRequirements,
    ) -> DirectorResult<Vec<MatchedQueue>> {
        let key = requirements.cache_key();
        if let Some(queues) = self.list_match.get(&key) {
            debug!(%key, queues = queues.len(), "list-match cache hit");
            return Ok(queues);
        }

        match ce.available(requirements).await {
            Ok(queues) => {
                self.list_match.add(
                    key,
                    Duration::from_secs(self.config.list_match_delay_secs),
                    queues.clone(),
                );
                Ok(queues)
            }
            Err(e) => Err(DirectorError::NoResource(format!(
                "queue match failed on {}: {e}",
                ce.id()
            ))),
        }
    }

    /// Caller options plus the site-mandated ones.
    fn mandatory_options(&self, caller_options: &[String]) -> Vec<String> {
        let mut options = caller_options.to_vec();
        options.push("--site".to_string());
        options.push(self.config.site_name.clone());
        if let Some(platform) = &self.config.platform {
            options.push("--platform".to_string());
            options.push(platform.clone());
        }
        if let Some(shared_area) = &self.config.shared_area {
            options.push("--shared-area".to_string());
            options.push(shared_area.clone());
        }
        options
    }
}
