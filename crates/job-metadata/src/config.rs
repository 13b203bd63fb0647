use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MetadataError, Result};

pub const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";
pub const DEFAULT_JOB_ID_ATTRIBUTE: &str = "job_id";
pub(crate) const DEFAULT_TTL_SECS: u64 = 5 * 60;
pub(crate) const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Overrides the metadata server address (same variable the Google client
/// libraries honour).
pub const ENV_METADATA_HOST: &str = "GCE_METADATA_HOST";
pub const ENV_TTL_SECS: &str = "JOB_METADATA_TTL_SECS";
pub const ENV_TIMEOUT_MS: &str = "JOB_METADATA_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Host (and optional port) of the metadata server.
    pub metadata_host: String,
    /// Instance attribute holding the job ID.
    pub attribute: String,
    /// How long a looked-up job ID is served before the next lookup.
    pub ttl_secs: u64,
    /// Timeout for a single metadata request.
    pub timeout_ms: u64,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            metadata_host: DEFAULT_METADATA_HOST.to_string(),
            attribute: DEFAULT_JOB_ID_ATTRIBUTE.to_string(),
            ttl_secs: DEFAULT_TTL_SECS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl MetadataConfig {
    /// Load and validate a config from a YAML file. Missing keys take defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MetadataError::Config(format!("read {}: {e}", path.display())))?;
        let config: Self = serde_yaml_ng::from_str(&content)
            .map_err(|e| MetadataError::Config(format!("parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Build a config from the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(host) = lookup(ENV_METADATA_HOST) {
            config.metadata_host = host.trim().to_string();
        }
        if let Some(ttl) = lookup(ENV_TTL_SECS) {
            config.ttl_secs = parse_u64(ENV_TTL_SECS, &ttl)?;
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT_MS) {
            config.timeout_ms = parse_u64(ENV_TIMEOUT_MS, &timeout)?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.metadata_host.is_empty() {
            return Err(MetadataError::Config("metadata_host must not be empty".into()));
        }
        if self.attribute.is_empty() {
            return Err(MetadataError::Config("attribute must not be empty".into()));
        }
        if self.ttl_secs == 0 {
            return Err(MetadataError::Config("ttl_secs must be positive".into()));
        }
        if self.timeout_ms == 0 {
            return Err(MetadataError::Config("timeout_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn parse_u64(key: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|e| MetadataError::Config(format!("{key}={raw:?}: {e}")))
}
