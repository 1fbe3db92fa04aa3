//! Service configuration with TOML file support.

use fairdraw_types::HashFunction;
use fairdraw_utils::LogFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::ServiceError;

/// Configuration for a draw service.
///
/// Can be loaded from a TOML file via [`ServiceConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Missing keys take their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Upper bound for every transport request, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Hash function used for this peer's commits.
    #[serde(default)]
    pub default_hash_function: HashFunction,

    /// Page size used when listing draws.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log filter, e.g. "info" or "debug,fairdraw_service=trace".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_page_size() -> usize {
    25
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ServiceConfig {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ServiceError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ServiceError> {
        toml::from_str(s).map_err(|e| ServiceError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, ServiceError> {
        toml::to_string_pretty(self).map_err(|e| ServiceError::Config(e.to_string()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            default_hash_function: HashFunction::default(),
            page_size: default_page_size(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}
