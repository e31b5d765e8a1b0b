//! Tenure Configuration System
//!
//! TOML-based configuration with environment variable override support.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tn_elector::{hash_key, ElectorConfig};

mod loader;

pub use loader::ConfigLoader;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub redis: RedisConfig,
    pub election: ElectionConfig,
}

/// Redis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub url: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
        }
    }
}

/// Leader election configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectionConfig {
    /// Lock name
    pub name: String,
    /// Derive the lock key as `leader:<sha256(name)>` instead of using the name as is
    pub hash_name: bool,
    pub lease_duration_ms: u64,
    pub retry_interval_ms: u64,
    /// Step down after this many consecutive renewal failures (0 = never)
    pub max_renewal_failures: u32,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            hash_name: true,
            lease_duration_ms: 10_000,
            retry_interval_ms: 1_000,
            max_renewal_failures: 0,
        }
    }
}

impl ElectionConfig {
    /// Lock key as stored
    pub fn lock_key(&self) -> String {
        if self.hash_name {
            hash_key(&self.name)
        } else {
            self.name.clone()
        }
    }

    /// Convert to tn-elector's ElectorConfig
    pub fn to_elector_config(&self) -> ElectorConfig {
        let config = ElectorConfig::new(self.lock_key())
            .with_lease_duration(Duration::from_millis(self.lease_duration_ms))
            .with_retry_interval(Duration::from_millis(self.retry_interval_ms));

        if self.max_renewal_failures > 0 {
            config.with_max_renewal_failures(self.max_renewal_failures)
        } else {
            config
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration with environment variable override
    pub fn load() -> Result<Self, ConfigError> {
        let loader = ConfigLoader::new();
        loader.load()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.redis.url.is_empty() {
            return Err(ConfigError::ValidationError("redis.url must be set".to_string()));
        }
        if self.election.name.is_empty() {
            return Err(ConfigError::ValidationError("election.name must be set".to_string()));
        }
        if self.election.lease_duration_ms == 0 {
            return Err(ConfigError::ValidationError(
                "election.lease_duration_ms must be positive".to_string(),
            ));
        }
        if self.election.retry_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "election.retry_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Generate an example TOML configuration
    pub fn example_toml() -> String {
        r#"# Tenure Configuration
# Environment variables override these settings

[redis]
url = "redis://localhost:6379"

[election]
name = "default"
hash_name = true           # key becomes leader:<sha256(name)>
lease_duration_ms = 10000  # lock TTL; renewed every half lease
retry_interval_ms = 1000   # wait between attempts while another instance leads
max_renewal_failures = 0   # 0 = keep leading through renewal errors
"#
        .to_string()
    }
}
