//! Reconciler configuration.
//!
//! Loaded from a YAML document or from the environment. Every field has a
//! default, so an empty document is a valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{IpamError, IpamResult};
use crate::fingerprint::FingerprintOrder;

/// Environment variable selecting the fingerprint ordering policy.
pub const ENV_FINGERPRINT_ORDER: &str = "IPAM_FINGERPRINT_ORDER";

/// Settings shared by every reconciler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcileConfig {
    /// Ordering applied to member ids before fingerprinting list results.
    pub fingerprint_order: FingerprintOrder,
}

impl ReconcileConfig {
    /// Parses a YAML configuration document.
    pub fn from_yaml_str(yaml: &str) -> IpamResult<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| IpamError::invalid_config("reconcile", e.to_string()))
    }

    /// Reads and parses a YAML configuration file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> IpamResult<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            IpamError::invalid_config(path.display().to_string(), e.to_string())
        })?;
        debug!("Loaded reconcile config from {}", path.display());
        Self::from_yaml_str(&yaml)
    }

    /// Builds a configuration from environment variables, falling back to defaults.
    pub fn from_env() -> IpamResult<Self> {
        let mut config = Self::default();
        if let Ok(value) = std::env::var(ENV_FINGERPRINT_ORDER) {
            config.fingerprint_order = parse_fingerprint_order(&value)?;
        }
        Ok(config)
    }
}

fn parse_fingerprint_order(value: &str) -> IpamResult<FingerprintOrder> {
    match value.trim() {
        "as_returned" => Ok(FingerprintOrder::AsReturned),
        "sorted" => Ok(FingerprintOrder::Sorted),
        other => Err(IpamError::invalid_config(
            ENV_FINGERPRINT_ORDER,
            format!("unknown fingerprint order '{}'", other),
        )),
    }
}
