//! Tenure Leader Election
//!
//! Single-leader election among processes sharing a key-value store with
//! atomic conditional writes and key expiry.
//!
//! # Features
//!
//! - **Leader Election**: conditional create of a lock key holding the instance identity
//! - **Lease Renewal**: the leader re-reads and extends its lock every half lease
//! - **Automatic Failover**: a crashed leader's lock expires and a competitor takes over
//! - **Clean Release**: `stop()` deletes the lock only if this instance holds it
//! - **Leader Guard**: helper to gate operations on leadership
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tn_elector::{ElectorConfig, LeaderElector, LeaderEvent, RedisStore};
//!
//! async fn example() -> tn_elector::Result<()> {
//!     let store = Arc::new(RedisStore::connect("redis://localhost:6379").await?);
//!     let config = ElectorConfig::new("my-service:leader")
//!         .with_lease_duration(Duration::from_secs(10))
//!         .with_retry_interval(Duration::from_secs(1));
//!
//!     let elector = LeaderElector::new(store, config)?;
//!     let mut events = elector.subscribe();
//!     elector.elect();
//!
//!     while let Ok(event) = events.recv().await {
//!         match event {
//!             LeaderEvent::Elected => println!("leading"),
//!             LeaderEvent::Revoked => println!("no longer leading"),
//!             LeaderEvent::Error(e) => eprintln!("store error: {e}"),
//!         }
//!     }
//!
//!     elector.stop().await;
//!     Ok(())
//! }
//! ```

mod config;
mod elector;
mod error;
mod guard;
mod memory;
mod redis_store;
mod store;

pub use config::{hash_key, ElectorConfig, DEFAULT_LEASE_DURATION, DEFAULT_RETRY_INTERVAL};
pub use elector::{ElectorState, LeaderElector, LeaderEvent};
pub use error::{ElectorError, Result};
pub use guard::LeaderGuard;
pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use store::KeyValueStore;
