//! Harness configuration.
//!
//! Defaults describe a plain local cluster with the CHPA controller already
//! installed. A JSON file can replace any field, and a handful of
//! `CHPA_E2E_*` environment variables win over both:
//!
//! - `CHPA_E2E_KUBECTL`: control tool binary
//! - `CHPA_E2E_KUBECONFIG`: kubeconfig passed as `--kubeconfig`
//! - `CHPA_E2E_NAMESPACE`: namespace passed as `-n`
//! - `CHPA_E2E_MANAGER`: controller binary to run for the suite
//! - `CHPA_E2E_DEFAULT_TIMEOUT` / `CHPA_E2E_LONG_TIMEOUT`: seconds

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const KUBECTL_ENV: &str = "CHPA_E2E_KUBECTL";
const KUBECONFIG_ENV: &str = "CHPA_E2E_KUBECONFIG";
const NAMESPACE_ENV: &str = "CHPA_E2E_NAMESPACE";
const MANAGER_ENV: &str = "CHPA_E2E_MANAGER";
const DEFAULT_TIMEOUT_ENV: &str = "CHPA_E2E_DEFAULT_TIMEOUT";
const LONG_TIMEOUT_ENV: &str = "CHPA_E2E_LONG_TIMEOUT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HarnessConfig {
    /// Control tool binary
    pub kubectl: String,
    pub kubeconfig: Option<String>,
    pub namespace: Option<String>,
    /// Prefix of every fixture name
    pub name_prefix: String,
    /// Label attached to everything the harness creates
    pub label_key: String,
    pub label_value: String,
    /// Image serving CPU-heavy requests behind the fixture service
    pub workload_image: String,
    pub workload_cpu_request: String,
    pub workload_port: i32,
    /// Image running the traffic loop
    pub load_image: String,
    /// Timeout for scenarios expected to converge within one controller cycle
    pub default_timeout_secs: u64,
    /// Timeout for scenarios that wait on real load and cooldowns
    pub long_timeout_secs: u64,
    pub poll_interval_millis: u64,
    /// Upper bound on any single control tool invocation
    pub command_timeout_secs: u64,
    /// Where descriptor files are written; the OS temp dir when unset
    pub fixture_dir: Option<PathBuf>,
    /// Controller binary started before the suite, if any
    pub manager_binary: Option<PathBuf>,
    pub manager_args: Vec<String>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            kubectl: "kubectl".to_string(),
            kubeconfig: None,
            namespace: None,
            name_prefix: "chpa-test".to_string(),
            label_key: "app".to_string(),
            label_value: "chpa-test".to_string(),
            workload_image: "registry.k8s.io/hpa-example".to_string(),
            workload_cpu_request: "10m".to_string(),
            workload_port: 80,
            load_image: "busybox".to_string(),
            default_timeout_secs: 10,
            long_timeout_secs: 600,
            poll_interval_millis: 1000,
            command_timeout_secs: 60,
            fixture_dir: None,
            manager_binary: None,
            manager_args: Vec::new(),
        }
    }
}

impl HarnessConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file, then apply environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("failed to read {}: {}", path.display(), e)))?;
        let mut config: Self = serde_json::from_str(&data)
            .map_err(|e| Error::config(format!("failed to parse {}: {}", path.display(), e)))?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make the harness spin or never wait
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_millis == 0 {
            return Err(Error::config("pollIntervalMillis must be at least 1"));
        }
        Ok(())
    }

    fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(kubectl) = get(KUBECTL_ENV) {
            self.kubectl = kubectl;
        }
        if let Some(kubeconfig) = get(KUBECONFIG_ENV) {
            self.kubeconfig = Some(kubeconfig);
        }
        if let Some(namespace) = get(NAMESPACE_ENV) {
            self.namespace = Some(namespace);
        }
        if let Some(manager) = get(MANAGER_ENV) {
            self.manager_binary = Some(PathBuf::from(manager));
        }
        if let Some(secs) = get(DEFAULT_TIMEOUT_ENV) {
            self.default_timeout_secs = parse_secs(DEFAULT_TIMEOUT_ENV, &secs)?;
        }
        if let Some(secs) = get(LONG_TIMEOUT_ENV) {
            self.long_timeout_secs = parse_secs(LONG_TIMEOUT_ENV, &secs)?;
        }
        Ok(())
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    pub fn long_timeout(&self) -> Duration {
        Duration::from_secs(self.long_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_millis)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Label selector shared by every resource the harness creates
    pub fn label_selector(&self) -> String {
        format!("{}={}", self.label_key, self.label_value)
    }

    /// Fixture name for a scenario: `{prefix}-{scenario}`, lower-cased
    pub fn fixture_name(&self, scenario: &str) -> String {
        format!("{}-{}", self.name_prefix, scenario).to_lowercase()
    }
}

fn parse_secs(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::config(format!("{} must be a whole number of seconds, got '{}'", key, value)))
}
