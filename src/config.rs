//! Run configuration.
//!
//! Endpoints, the flow list, and timing knobs live in a JSON file loaded once
//! at startup and passed into the stager and applier, instead of module-level
//! constants.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_SCHEMA_VERSION: u32 = 1;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_MAX_WAIT_SECS: u64 = 120;
const DEFAULT_PROPAGATION_DELAY_SECS: u64 = 5;

/// Base URLs for one environment's management and registry APIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentEndpoints {
    /// NiFi REST API base, e.g. `http://localhost:9000/nifi-api`.
    pub nifi_api_url: String,
    /// NiFi Registry REST API base, e.g. `http://localhost:18080/nifi-registry-api`.
    pub registry_api_url: String,
}

/// Full configuration for one migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationConfig {
    pub schema_version: u32,
    pub source: EnvironmentEndpoints,
    pub target: EnvironmentEndpoints,
    /// Flows to promote, processed sequentially in this order.
    pub flows: Vec<String>,
    /// Delay between connectivity probes.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Total budget for an environment to become reachable.
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
    /// Pause after each registry write before dependent canvas operations,
    /// to accommodate asynchronous propagation in the target platform.
    #[serde(default = "default_propagation_delay_secs")]
    pub propagation_delay_secs: u64,
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_max_wait_secs() -> u64 {
    DEFAULT_MAX_WAIT_SECS
}

fn default_propagation_delay_secs() -> u64 {
    DEFAULT_PROPAGATION_DELAY_SECS
}

impl MigrationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }

    pub fn propagation_delay(&self) -> Duration {
        Duration::from_secs(self.propagation_delay_secs)
    }
}

/// Load and validate a config file.
pub fn load_config(path: &Path) -> Result<MigrationConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: MigrationConfig =
        serde_json::from_slice(&bytes).context("parse migration config JSON")?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate schema version, endpoints, flow list, and timings.
pub fn validate_config(config: &MigrationConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {}",
            config.schema_version
        ));
    }
    for (label, url) in [
        ("source.nifi_api_url", &config.source.nifi_api_url),
        ("source.registry_api_url", &config.source.registry_api_url),
        ("target.nifi_api_url", &config.target.nifi_api_url),
        ("target.registry_api_url", &config.target.registry_api_url),
    ] {
        if url.trim().is_empty() {
            return Err(anyhow!("{label} must be non-empty"));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(anyhow!("{label} must be an http(s) URL (got {url:?})"));
        }
    }
    if config.flows.is_empty() {
        return Err(anyhow!("flows must list at least one process group"));
    }
    let mut seen = BTreeSet::new();
    for name in &config.flows {
        if name.trim().is_empty() {
            return Err(anyhow!("flow names must be non-empty"));
        }
        if !seen.insert(name.as_str()) {
            return Err(anyhow!("duplicate flow name {name:?}"));
        }
    }
    if config.poll_interval_secs == 0 {
        return Err(anyhow!("poll_interval_secs must be non-zero"));
    }
    Ok(())
}

/// Build the default config written by `flowlift init`.
pub fn default_config() -> MigrationConfig {
    MigrationConfig {
        schema_version: CONFIG_SCHEMA_VERSION,
        source: EnvironmentEndpoints {
            nifi_api_url: "http://localhost:9000/nifi-api".to_string(),
            registry_api_url: "http://localhost:18080/nifi-registry-api".to_string(),
        },
        target: EnvironmentEndpoints {
            nifi_api_url: "http://localhost:9001/nifi-api".to_string(),
            registry_api_url: "http://localhost:18081/nifi-registry-api".to_string(),
        },
        flows: vec!["SampleProcessGroup".to_string()],
        poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        max_wait_secs: DEFAULT_MAX_WAIT_SECS,
        propagation_delay_secs: DEFAULT_PROPAGATION_DELAY_SECS,
    }
}

/// Render a pretty JSON config stub for new setups.
pub fn config_stub() -> String {
    serde_json::to_string_pretty(&default_config()).expect("serialize config stub")
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
