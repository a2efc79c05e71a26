//! Runtime configuration.
//!
//! ```toml
//! [registry]
//! duplicate_policy = "reject"
//! event_capacity = 64
//!
//! [bridge]
//! invoke_timeout_ms = 5000
//! announce_on_start = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// What the registry does when a host declares an id another live host owns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Refuse the whole registration; the first owner keeps its commands.
    #[default]
    Reject,
    /// The newer host takes the id over.
    Replace,
}

/// Registry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Collision handling.
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
    /// Buffered lifecycle events per subscriber.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::default(),
            event_capacity: default_event_capacity(),
        }
    }
}

fn default_event_capacity() -> usize {
    64
}

/// Bridge settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Upper bound on a single invocation; unbounded when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoke_timeout_ms: Option<u64>,
    /// Whether the transport sends the full command list on connect.
    #[serde(default = "default_announce")]
    pub announce_on_start: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self { invoke_timeout_ms: None, announce_on_start: default_announce() }
    }
}

fn default_announce() -> bool {
    true
}

impl BridgeConfig {
    /// Invocation timeout as a `Duration`.
    pub fn invoke_timeout(&self) -> Option<Duration> {
        self.invoke_timeout_ms.map(Duration::from_millis)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TetherConfig {
    /// Registry settings.
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Bridge settings.
    #[serde(default)]
    pub bridge: BridgeConfig,
}

impl TetherConfig {
    /// Load and validate configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse and validate configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Invalid(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check values that parse but cannot be used.
    pub fn validate(&self) -> Result<()> {
        if self.registry.event_capacity == 0 {
            return Err(ConfigError::Invalid(
                "registry.event_capacity must be greater than zero".to_string(),
            ));
        }

        if self.bridge.invoke_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "bridge.invoke_timeout_ms must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
