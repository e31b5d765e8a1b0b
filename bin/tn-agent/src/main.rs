//! Tenure Agent
//!
//! Competes for leadership of a named lock in Redis and logs every
//! leadership change until shut down.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `TENURE_CONFIG` | - | Path to a TOML config file |
//! | `TENURE_REDIS_URL` | `redis://localhost:6379` | Redis connection URL |
//! | `TENURE_ELECTION_NAME` | `default` | Lock name |
//! | `TENURE_ELECTION_HASH_NAME` | `true` | Hash the name into `leader:<sha256>` |
//! | `TENURE_LEASE_DURATION_MS` | `10000` | Lock TTL |
//! | `TENURE_RETRY_INTERVAL_MS` | `1000` | Wait between attempts |
//! | `TENURE_MAX_RENEWAL_FAILURES` | `0` | Step down after N failed renewals (0 = never) |
//! | `RUST_LOG` | `info` | Log level |

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;
use tracing::{error, info, warn};

use tn_config::ConfigLoader;
use tn_elector::{ElectorState, LeaderElector, LeaderEvent, RedisStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for local development)
    let _ = dotenvy::dotenv();

    tn_common::logging::init_logging("tn-agent");

    let loader = match std::env::args().nth(1) {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    let config = loader.load()?;
    let elector_config = config.election.to_elector_config();
    let retry_interval = elector_config.retry_interval;

    info!(redis_url = %config.redis.url, "Connecting to Redis");
    let store = Arc::new(RedisStore::connect(&config.redis.url).await?);
    let elector = LeaderElector::new(store, elector_config)?;

    info!(
        identity = %elector.identity(),
        key = %elector.key(),
        lease_ms = elector.config().lease_duration.as_millis() as u64,
        "Starting Tenure agent"
    );

    supervise(&elector, retry_interval, shutdown_signal()).await;

    elector.stop().await;
    info!("Tenure agent shutdown complete");

    Ok(())
}

/// Log leadership changes and re-enter the election after failed
/// acquisitions until `shutdown` completes
async fn supervise<F>(elector: &LeaderElector, retry_interval: Duration, shutdown: F)
where
    F: Future<Output = ()>,
{
    let mut events = elector.subscribe();
    elector.elect();

    tokio::pin!(shutdown);

    // Armed after a failed acquisition; the elector does not retry those itself
    let reelect = tokio::time::sleep(retry_interval);
    tokio::pin!(reelect);
    let mut reelect_armed = false;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(LeaderEvent::Elected) => {
                    info!(identity = %elector.identity(), "This instance is now the LEADER");
                }
                Ok(LeaderEvent::Revoked) => {
                    warn!(identity = %elector.identity(), "This instance is no longer the leader");
                }
                Ok(LeaderEvent::Error(e)) => {
                    error!(error = %e, "Leader election store error");

                    if elector.state() == ElectorState::Idle {
                        reelect.as_mut().reset(Instant::now() + retry_interval);
                        reelect_armed = true;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Leader events dropped");
                }
                Err(RecvError::Closed) => return,
            },
            () = &mut reelect, if reelect_armed => {
                reelect_armed = false;
                info!("Re-entering election");
                elector.elect();
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received...");
                return;
            }
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
