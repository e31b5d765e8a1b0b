//! Elector configuration

use std::time::Duration;
use sha2::{Digest, Sha256};

use crate::error::{ElectorError, Result};

/// Default lease duration (lock TTL)
pub const DEFAULT_LEASE_DURATION: Duration = Duration::from_millis(10_000);

/// Default wait between election attempts while another instance holds the lock
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(1_000);

/// Derive a namespaced lock key from a human readable name.
///
/// `hash_key("default")` is the key used by [`ElectorConfig::default`].
pub fn hash_key(name: &str) -> String {
    let digest = Sha256::digest(name.as_bytes());
    format!("leader:{}", hex::encode(digest))
}

/// Configuration for a [`LeaderElector`](crate::LeaderElector)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElectorConfig {
    /// Lock key in the store, used as given
    pub key: String,

    /// Lock TTL. The leader renews every `lease_duration / 2`.
    pub lease_duration: Duration,

    /// Wait between election attempts (should be less than the lease)
    pub retry_interval: Duration,

    /// Consecutive renewal failures after which the leader steps down.
    /// `None` keeps leading until the store says otherwise.
    pub max_renewal_failures: Option<u32>,
}

impl Default for ElectorConfig {
    fn default() -> Self {
        Self {
            key: hash_key("default"),
            lease_duration: DEFAULT_LEASE_DURATION,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            max_renewal_failures: None,
        }
    }
}

impl ElectorConfig {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn with_lease_duration(mut self, lease_duration: Duration) -> Self {
        self.lease_duration = lease_duration;
        self
    }

    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    pub fn with_max_renewal_failures(mut self, failures: u32) -> Self {
        self.max_renewal_failures = Some(failures);
        self
    }

    /// Period of the renewal schedule
    pub fn renewal_interval(&self) -> Duration {
        self.lease_duration / 2
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(ElectorError::Config("lock key must not be empty".to_string()));
        }
        // TTLs are expressed in whole milliseconds on the wire
        if self.lease_duration.as_millis() == 0 {
            return Err(ElectorError::Config(format!(
                "lease duration {:?} is shorter than 1ms",
                self.lease_duration
            )));
        }
        if self.retry_interval.is_zero() {
            return Err(ElectorError::Config("retry interval must be positive".to_string()));
        }
        if self.max_renewal_failures == Some(0) {
            return Err(ElectorError::Config("max renewal failures must be at least 1".to_string()));
        }
        Ok(())
    }
}
