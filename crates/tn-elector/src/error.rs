//! Error types for the elector

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ElectorError {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Redis operation error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Redis connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ElectorError {
    /// Whether this error came from a call against the key-value store.
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            ElectorError::StoreUnavailable(_) | ElectorError::Redis(_) | ElectorError::Connection(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ElectorError>;
