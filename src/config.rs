//! Bridge configuration.
//!
//! Values come from the built-in defaults, then an optional TOML file, then
//! command-line overrides. [`BridgeConfig::validate`] runs before anything is
//! constructed from the result.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::registers::{WordOrder, DEFAULT_REGISTER_COUNT};

/// Runtime configuration of the bridge.
///
/// ```toml
/// base_url = "http://localhost:5000"
/// register_count = 10
/// tick_interval_secs = 2
/// http_timeout_secs = 5
/// source = "rust"
/// word_order = "high-first"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Base URL of the remote service.
    pub base_url: String,
    /// Number of simulated registers, including the sentinel pair.
    pub register_count: usize,
    /// Seconds between simulation ticks.
    pub tick_interval_secs: u64,
    /// Per-request timeout in seconds.
    pub http_timeout_secs: u64,
    /// Label prefixed to the storage key (`<source>_message`).
    pub source: String,
    /// Word order of the sentinel register pair.
    pub word_order: WordOrder,
    /// Fixed seed for the register generator; entropy when absent.
    pub seed: Option<u64>,
    /// Read each stored report back and log whether it round-tripped.
    pub verify_store: bool,
    /// Stop after this many ticks; `0` runs until interrupted.
    pub max_cycles: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            register_count: DEFAULT_REGISTER_COUNT,
            tick_interval_secs: 2,
            http_timeout_secs: 5,
            source: "rust".to_string(),
            word_order: WordOrder::HighFirst,
            seed: None,
            verify_store: false,
            max_cycles: 0,
        }
    }
}

impl BridgeConfig {
    /// Parse a configuration from TOML text. Missing fields take defaults.
    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self> {
        toml::from_str(text).map_err(|source| BridgeError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| BridgeError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    /// Check every field; the first violation is returned.
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| BridgeError::invalid("base_url", format!("{e}: {}", self.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(BridgeError::invalid(
                "base_url",
                format!("scheme must be http or https, got {}", url.scheme()),
            ));
        }
        if self.register_count < 2 {
            return Err(BridgeError::invalid(
                "register_count",
                format!("must be at least 2, got {}", self.register_count),
            ));
        }
        if self.tick_interval_secs == 0 {
            return Err(BridgeError::invalid("tick_interval_secs", "must be positive"));
        }
        if self.http_timeout_secs == 0 {
            return Err(BridgeError::invalid("http_timeout_secs", "must be positive"));
        }
        if !is_path_token(&self.source) {
            return Err(BridgeError::invalid(
                "source",
                format!("must be a non-empty [A-Za-z0-9_-] token, got {:?}", self.source),
            ));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Storage key every report is written under.
    pub fn storage_key(&self) -> String {
        format!("{}_message", self.source)
    }
}

fn is_path_token(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
