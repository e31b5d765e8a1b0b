//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "tenure.toml",
    "config.toml",
    "./config/tenure.toml",
    "/etc/tenure/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        self.load_with(|name| env::var(name).ok())
    }

    /// Load using `lookup` in place of the process environment
    pub fn load_with<F>(&self, lookup: F) -> Result<AppConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();

        if let Some(path) = self.find_config_file(&lookup) {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        apply_overrides(&mut config, &lookup);
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file<F>(&self, lookup: &F) -> Option<PathBuf>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
            warn!(?path, "Configured file not found, searching default locations");
        }

        if let Some(path) = lookup("TENURE_CONFIG").map(PathBuf::from) {
            if path.exists() {
                return Some(path);
            }
        }

        CONFIG_PATHS
            .iter()
            .map(|path| PathBuf::from(*path))
            .find(|path| path.exists())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parsed<T: FromStr, F: Fn(&str) -> Option<String>>(lookup: &F, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "Ignoring unparseable override");
            None
        }
    }
}

fn apply_overrides<F>(config: &mut AppConfig, lookup: &F)
where
    F: Fn(&str) -> Option<String>,
{
    // Redis
    if let Some(val) = lookup("TENURE_REDIS_URL") {
        config.redis.url = val;
    }

    // Election
    if let Some(val) = lookup("TENURE_ELECTION_NAME") {
        config.election.name = val;
    }
    if let Some(val) = parsed(lookup, "TENURE_ELECTION_HASH_NAME") {
        config.election.hash_name = val;
    }
    if let Some(val) = parsed(lookup, "TENURE_LEASE_DURATION_MS") {
        config.election.lease_duration_ms = val;
    }
    if let Some(val) = parsed(lookup, "TENURE_RETRY_INTERVAL_MS") {
        config.election.retry_interval_ms = val;
    }
    if let Some(val) = parsed(lookup, "TENURE_MAX_RENEWAL_FAILURES") {
        config.election.max_renewal_failures = val;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_loads_file_then_applies_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[redis]\nurl = \"redis://cache:6379\"\n\n[election]\nname = \"job-x\"\nlease_duration_ms = 4000"
        )
        .unwrap();

        let loader = ConfigLoader::with_path(file.path());
        let config = loader
            .load_with(vars(&[("TENURE_RETRY_INTERVAL_MS", "250")]))
            .unwrap();

        assert_eq!(config.redis.url, "redis://cache:6379");
        assert_eq!(config.election.name, "job-x");
        assert_eq!(config.election.lease_duration_ms, 4000);
        assert_eq!(config.election.retry_interval_ms, 250);
    }

    #[test]
    fn test_config_path_from_environment() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[election]\nname = \"from-env-path\"").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let config = ConfigLoader::with_path("/nonexistent/tenure.toml")
            .load_with(vars(&[("TENURE_CONFIG", path.as_str())]))
            .unwrap();

        assert_eq!(config.election.name, "from-env-path");
    }

    #[test]
    fn test_unparseable_override_is_ignored() {
        let config = ConfigLoader::with_path("/nonexistent/tenure.toml")
            .load_with(vars(&[
                ("TENURE_LEASE_DURATION_MS", "ten seconds"),
                ("TENURE_ELECTION_HASH_NAME", "false"),
                ("TENURE_MAX_RENEWAL_FAILURES", "3"),
            ]))
            .unwrap();

        assert_eq!(config.election.lease_duration_ms, 10_000);
        assert!(!config.election.hash_name);
        assert_eq!(config.election.max_renewal_failures, 3);
    }

    #[test]
    fn test_invalid_override_fails_validation() {
        let result = ConfigLoader::with_path("/nonexistent/tenure.toml")
            .load_with(vars(&[("TENURE_RETRY_INTERVAL_MS", "0")]));

        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}
