//! Key-value store contract consumed by the elector

use std::time::Duration;
use async_trait::async_trait;

use crate::error::Result;

/// Shared map with atomic conditional create and key expiry.
///
/// The elector relies on `create_if_absent` being atomic across every
/// process that competes for the same key. All other operations are plain
/// reads and writes; the elector re-reads the holder before mutating.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Create `key` with `value` expiring after `ttl`, only if the key is absent.
    ///
    /// Returns `true` if this call created the key.
    async fn create_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool>;

    /// Current value, or `None` if expired or never set
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Reset the TTL of an existing key. Absent keys are left absent.
    async fn extend_expiry(&self, key: &str, ttl: Duration) -> Result<()>;

    /// Remove the key unconditionally
    async fn delete(&self, key: &str) -> Result<()>;
}

/// TTL as whole milliseconds, never rounding a positive duration down to zero
pub(crate) fn ttl_millis(ttl: Duration) -> u64 {
    (ttl.as_millis() as u64).max(1)
}
