//! Snapshotter configuration file
//!
//! ```yaml
//! database: .grcsnap/store.db
//! rules: .grcsnap/rules.yaml
//! batch_size: 200
//! stale_policy: refresh
//! log_profile: development
//! ```
//!
//! Every key is optional. A missing file yields the defaults.

use crate::errors::{config_error, io_error, Result};
use crate::sql::{DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE};
use grcsnap_core::logging_facility::Profile;
use grcsnap_core::policy::StaleDisposition;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SnapshotterConfig {
    pub database: PathBuf,
    pub rules: PathBuf,
    pub batch_size: usize,
    pub stale_policy: StaleDisposition,
    pub log_profile: Profile,
}

impl Default for SnapshotterConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from(".grcsnap/store.db"),
            rules: PathBuf::from(".grcsnap/rules.yaml"),
            batch_size: DEFAULT_BATCH_SIZE,
            stale_policy: StaleDisposition::default(),
            log_profile: Profile::default(),
        }
    }
}

/// Load configuration from a YAML file; a missing file yields the defaults
pub fn load_config(path: &Path) -> Result<SnapshotterConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No config file, using defaults");
        return Ok(SnapshotterConfig::default());
    }
    let content = std::fs::read_to_string(path).map_err(|e| io_error("load_config", e))?;
    parse_config_str(&content)
}

/// Parse configuration from a YAML string
pub fn parse_config_str(content: &str) -> Result<SnapshotterConfig> {
    if content.trim().is_empty() {
        return Ok(SnapshotterConfig::default());
    }
    let config: SnapshotterConfig = serde_yaml::from_str(content)
        .map_err(|e| config_error(&format!("YAML parse error: {}", e)))?;
    validate_config(&config)?;
    Ok(config)
}

/// Check a configuration, including one assembled from command-line overrides
pub fn validate_config(config: &SnapshotterConfig) -> Result<()> {
    if config.batch_size == 0 || config.batch_size > MAX_BATCH_SIZE {
        return Err(config_error(&format!(
            "batch_size must be between 1 and {}, got {}",
            MAX_BATCH_SIZE, config.batch_size
        )));
    }
    if config.database.as_os_str().is_empty() {
        return Err(config_error("database path must not be empty"));
    }
    Ok(())
}
