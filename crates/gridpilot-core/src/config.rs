//! Site configuration.
//!
//! Resolved values only: loading and layering live with the external
//! configuration collaborator, this module just parses one TOML document
//! into a validated [`SiteConfig`] the Director can read.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Occupancy ratio above which no further pilots are sent.
pub const DEFAULT_WAITING_TO_RUNNING_RATIO: f64 = 0.5;
/// Waiting-job ceiling applied while a resource runs nothing.
pub const DEFAULT_MAX_WAITING_JOBS: u64 = 50;
/// Hard ceiling on waiting + running jobs per resource.
pub const DEFAULT_MAX_NUMBER_JOBS: u64 = 10_000;
/// How long a successful list-match result stays cached, in seconds.
pub const DEFAULT_LIST_MATCH_DELAY_SECS: u64 = 300;
/// Minimum validity requested for a delegated pilot credential, in seconds.
pub const DEFAULT_PROXY_TIME_LEFT_SECS: u64 = 86_400;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("site name must not be empty")]
    MissingSiteName,

    #[error("no computing elements configured")]
    NoComputingElements,

    #[error("waiting-to-running ratio must be positive, got {0}")]
    InvalidRatio(f64),
}

/// One configured computing element: a stable identifier plus the backend
/// type the factory resolves it with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CeEndpoint {
    pub id: String,
    pub ce_type: String,
}

/// Per-site runtime configuration consumed by a Director.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site name, stamped into every pilot's options. Required.
    pub site_name: String,
    /// Client platform, forwarded to pilots when known.
    #[serde(default)]
    pub platform: Option<String>,
    /// Shared software area advertised to pilots, if the site has one.
    #[serde(default)]
    pub shared_area: Option<String>,
    /// Outbound HTTP proxy pilots must use, if the site requires one.
    #[serde(default)]
    pub outbound_proxy: Option<String>,
    /// Computing elements this Director may submit to.
    pub computing_elements: Vec<CeEndpoint>,
    #[serde(default = "default_max_waiting_jobs")]
    pub max_waiting_jobs: u64,
    #[serde(default = "default_max_number_jobs")]
    pub max_number_jobs: u64,
    #[serde(default = "default_waiting_to_running_ratio")]
    pub waiting_to_running_ratio: f64,
    #[serde(default = "default_list_match_delay_secs")]
    pub list_match_delay_secs: u64,
    #[serde(default = "default_proxy_time_left_secs")]
    pub proxy_time_left_secs: u64,
    /// Pilot agent script embedded into every bundle.
    pub pilot_agent: PathBuf,
    /// Installer script materialized next to the agent on the worker.
    pub pilot_installer: PathBuf,
    /// Owner-group → authorization-attribute map used at delegation time.
    #[serde(default)]
    pub group_attributes: BTreeMap<String, String>,
}

fn default_max_waiting_jobs() -> u64 {
    DEFAULT_MAX_WAITING_JOBS
}

fn default_max_number_jobs() -> u64 {
    DEFAULT_MAX_NUMBER_JOBS
}

fn default_waiting_to_running_ratio() -> f64 {
    DEFAULT_WAITING_TO_RUNNING_RATIO
}

fn default_list_match_delay_secs() -> u64 {
    DEFAULT_LIST_MATCH_DELAY_SECS
}

fn default_proxy_time_left_secs() -> u64 {
    DEFAULT_PROXY_TIME_LEFT_SECS
}

impl SiteConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SiteConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// A Director cannot run without a site name or submission targets.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.site_name.trim().is_empty() {
            return Err(ConfigError::MissingSiteName);
        }
        if self.computing_elements.is_empty() {
            return Err(ConfigError::NoComputingElements);
        }
        if self.waiting_to_running_ratio <= 0.0 {
            return Err(ConfigError::InvalidRatio(self.waiting_to_running_ratio));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
site_name = "GRID.Example.org"
pilot_agent = "/opt/gridpilot/pilot-agent"
pilot_installer = "/opt/gridpilot/pilot-install"

[[computing_elements]]
id = "ce01.example.org"
ce_type = "in-process"
"#;

    #[test]
    fn parse_minimal_applies_defaults() {
        let config: SiteConfig = toml::from_str(MINIMAL).unwrap();
        config.validate().unwrap();

        assert_eq!(config.site_name, "GRID.Example.org");
        assert_eq!(config.max_waiting_jobs, DEFAULT_MAX_WAITING_JOBS);
        assert_eq!(config.max_number_jobs, DEFAULT_MAX_NUMBER_JOBS);
        assert_eq!(
            config.waiting_to_running_ratio,
            DEFAULT_WAITING_TO_RUNNING_RATIO
        );
        assert_eq!(config.list_match_delay_secs, DEFAULT_LIST_MATCH_DELAY_SECS);
        assert!(config.platform.is_none());
        assert!(config.group_attributes.is_empty());
    }

    #[test]
    fn empty_site_name_is_rejected() {
        let mut config: SiteConfig = toml::from_str(MINIMAL).unwrap();
        config.site_name = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingSiteName)
        ));
    }

    #[test]
    fn no_computing_elements_is_rejected() {
        let mut config: SiteConfig = toml::from_str(MINIMAL).unwrap();
        config.computing_elements.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NoComputingElements)
        ));
    }

    #[test]
    fn non_positive_ratio_is_rejected() {
        let mut config: SiteConfig = toml::from_str(MINIMAL).unwrap();
        config.waiting_to_running_ratio = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRatio(_))
        ));
    }

    #[test]
    fn from_file_reads_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.toml");
        std::fs::write(&path, MINIMAL).unwrap();

        let config = SiteConfig::from_file(&path).unwrap();
        assert_eq!(config.computing_elements.len(), 1);
        assert_eq!(config.computing_elements[0].ce_type, "in-process");
    }
}
