//! Lease-based leader election
//!
//! One driver task per election run:
//! - conditional create of the lock key with the lease as TTL
//! - on contention, wait `retry_interval` and try again, unless the stored
//!   holder is this instance, in which case the lease is extended and adopted
//! - once elected, renew every `lease_duration / 2` after confirming the
//!   stored holder is still this instance
//! - on a lost lease, emit `Revoked` and go back to electing
//!
//! Every state change and event is applied under the schedule lock and only
//! if the run's generation is still current, so completions that land after
//! `stop()` are dropped.

use std::sync::Arc;
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::ElectorConfig;
use crate::error::{ElectorError, Result};
use crate::store::KeyValueStore;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Leadership notifications
#[derive(Debug, Clone)]
pub enum LeaderEvent {
    /// This instance created the lock and is now the leader
    Elected,
    /// This instance lost or released the lock
    Revoked,
    /// A store call failed
    Error(Arc<ElectorError>),
}

/// In-process election state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectorState {
    /// Not competing
    Idle,
    /// Competing for the lock; a retry may be scheduled
    Electing,
    /// Holding the lock; renewal is scheduled
    Leading,
}

/// The single schedule slot: either the retry loop or the renewal loop
struct Schedule {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

struct Inner {
    store: Arc<dyn KeyValueStore>,
    config: ElectorConfig,
    identity: String,
    schedule: Mutex<Schedule>,
    events: broadcast::Sender<LeaderEvent>,
    state: watch::Sender<ElectorState>,
}

/// Competes for a lock key and keeps it alive while leading.
///
/// Cloning yields another handle to the same elector.
#[derive(Clone)]
pub struct LeaderElector {
    inner: Arc<Inner>,
}

impl LeaderElector {
    /// Create an idle elector with a fresh identity
    pub fn new(store: Arc<dyn KeyValueStore>, config: ElectorConfig) -> Result<Self> {
        config.validate()?;

        if config.retry_interval >= config.lease_duration {
            warn!(
                key = %config.key,
                retry_interval_ms = config.retry_interval.as_millis() as u64,
                lease_duration_ms = config.lease_duration.as_millis() as u64,
                "Retry interval is not shorter than the lease; failover will lag behind expiry"
            );
        }

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (state, _) = watch::channel(ElectorState::Idle);

        Ok(Self {
            inner: Arc::new(Inner {
                store,
                config,
                identity: Uuid::new_v4().to_string(),
                schedule: Mutex::new(Schedule {
                    generation: 0,
                    task: None,
                }),
                events,
                state,
            }),
        })
    }

    /// Value written to the lock while this instance holds it
    pub fn identity(&self) -> &str {
        &self.inner.identity
    }

    /// Lock key
    pub fn key(&self) -> &str {
        &self.inner.config.key
    }

    pub fn config(&self) -> &ElectorConfig {
        &self.inner.config
    }

    /// Current in-process state
    pub fn state(&self) -> ElectorState {
        *self.inner.state.borrow()
    }

    /// Subscribe to state changes
    pub fn subscribe_state(&self) -> watch::Receiver<ElectorState> {
        self.inner.state.subscribe()
    }

    /// Subscribe to leadership events
    pub fn subscribe(&self) -> broadcast::Receiver<LeaderEvent> {
        self.inner.events.subscribe()
    }

    /// Start competing for the lock.
    ///
    /// Returns immediately; the outcome arrives as a [`LeaderEvent`]. Does
    /// nothing while already electing or leading. Must be called from within
    /// a tokio runtime.
    pub fn elect(&self) {
        let inner = &self.inner;
        let mut schedule = inner.schedule.lock();

        let state = *inner.state.borrow();
        if state != ElectorState::Idle {
            debug!(identity = %inner.identity, key = %inner.config.key, ?state, "Election already running");
            return;
        }

        schedule.generation += 1;
        let generation = schedule.generation;
        inner.state.send_replace(ElectorState::Electing);

        if let Some(task) = schedule.task.take() {
            task.abort();
        }

        let span = info_span!(
            "leader_election",
            identity = %inner.identity,
            key = %inner.config.key,
            generation,
        );
        schedule.task = Some(tokio::spawn(inner.clone().run(generation).instrument(span)));
    }

    /// Whether the store currently names this instance as the holder.
    ///
    /// Always reads the store; the lease may have expired since the last renewal.
    pub async fn is_leader(&self) -> Result<bool> {
        self.inner.holds_lock().await
    }

    /// Stop competing and release the lock if this instance holds it.
    ///
    /// Pending retries and renewals are cancelled before anything else, so no
    /// further store calls or events originate from the cancelled run.
    /// Failures are reported as [`LeaderEvent::Error`].
    ///
    /// An `elect()` that lands while `stop()` is still releasing starts a new
    /// run; the release then leaves the lock in place for that run to adopt.
    pub async fn stop(&self) {
        let generation = self.inner.cancel();
        self.inner.release(generation).await;
    }
}

impl Inner {
    async fn run(self: Arc<Self>, generation: u64) {
        info!("Starting leader election");

        loop {
            match self
                .store
                .create_if_absent(&self.config.key, &self.identity, self.config.lease_duration)
                .await
            {
                Ok(true) => {
                    if !self.transition(generation, ElectorState::Leading, Some(LeaderEvent::Elected)) {
                        return;
                    }
                    info!("Acquired leadership");

                    if !self.hold_lease(generation).await {
                        return;
                    }
                }
                Ok(false) => match self.renew().await {
                    Ok(true) => {
                        // Our own record outlived a previous run
                        if !self.transition(generation, ElectorState::Leading, Some(LeaderEvent::Elected)) {
                            return;
                        }
                        info!("Adopted existing lease");

                        if !self.hold_lease(generation).await {
                            return;
                        }
                    }
                    Ok(false) => {
                        debug!("Leadership held by another instance");
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to check lock holder");
                        self.transition(generation, ElectorState::Idle, Some(LeaderEvent::Error(Arc::new(e))));
                        return;
                    }
                },
                Err(e) => {
                    error!(error = %e, "Failed to acquire leadership");
                    self.transition(generation, ElectorState::Idle, Some(LeaderEvent::Error(Arc::new(e))));
                    return;
                }
            }

            tokio::time::sleep(self.config.retry_interval).await;
            if !self.is_current(generation) {
                return;
            }
        }
    }

    /// Renew the lease until it is lost (`true`) or the run is cancelled (`false`)
    async fn hold_lease(&self, generation: u64) -> bool {
        let period = self.config.renewal_interval();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut consecutive_failures: u32 = 0;

        loop {
            ticker.tick().await;
            if !self.is_current(generation) {
                return false;
            }

            match self.renew().await {
                Ok(true) => {
                    consecutive_failures = 0;
                    debug!("Extended leadership lease");
                }
                Ok(false) => {
                    warn!("Lost leadership");
                    return self.transition(generation, ElectorState::Electing, Some(LeaderEvent::Revoked));
                }
                Err(e) => {
                    consecutive_failures += 1;
                    error!(error = %e, consecutive_failures, "Failed to renew lease");

                    // Still leading as far as we know; the next tick re-checks
                    if !self.transition(generation, ElectorState::Leading, Some(LeaderEvent::Error(Arc::new(e)))) {
                        return false;
                    }

                    if self
                        .config
                        .max_renewal_failures
                        .is_some_and(|max| consecutive_failures >= max)
                    {
                        warn!(consecutive_failures, "Stepping down after repeated renewal failures");

                        // Nobody should see this instance as leader after Revoked
                        if let Err(e) = self.release_lock(generation).await {
                            error!(error = %e, "Failed to release lease on step-down");
                            if !self.transition(generation, ElectorState::Leading, Some(LeaderEvent::Error(Arc::new(e)))) {
                                return false;
                            }
                        }
                        return self.transition(generation, ElectorState::Electing, Some(LeaderEvent::Revoked));
                    }
                }
            }
        }
    }

    /// Extend the lease if this instance still holds it
    async fn renew(&self) -> Result<bool> {
        if !self.holds_lock().await? {
            return Ok(false);
        }

        self.store
            .extend_expiry(&self.config.key, self.config.lease_duration)
            .await?;

        Ok(true)
    }

    async fn holds_lock(&self) -> Result<bool> {
        let holder = self.store.get(&self.config.key).await?;
        Ok(holder.as_deref() == Some(self.identity.as_str()))
    }

    /// Delete the lock if this instance holds it and `generation` is still
    /// current. Returns whether the key was deleted.
    async fn release_lock(&self, generation: u64) -> Result<bool> {
        if !self.holds_lock().await? {
            return Ok(false);
        }

        // A newer run may already be relying on this record
        if !self.is_current(generation) {
            return Ok(false);
        }

        self.store.delete(&self.config.key).await?;
        Ok(true)
    }

    async fn release(&self, generation: u64) {
        match self.release_lock(generation).await {
            Ok(true) => {
                info!(identity = %self.identity, key = %self.config.key, "Released leadership");
                self.emit(LeaderEvent::Revoked);
            }
            Ok(false) => {
                debug!(identity = %self.identity, key = %self.config.key, "Not the leader, nothing to release");
            }
            Err(e) => {
                error!(identity = %self.identity, key = %self.config.key, error = %e, "Failed to release leadership");
                self.emit(LeaderEvent::Error(Arc::new(e)));
            }
        }
    }

    /// Invalidate the current run and abort its task, returning the new generation
    fn cancel(&self) -> u64 {
        let mut schedule = self.schedule.lock();
        schedule.generation += 1;
        let generation = schedule.generation;

        if let Some(task) = schedule.task.take() {
            task.abort();
        }

        if self.state.send_replace(ElectorState::Idle) != ElectorState::Idle {
            info!(identity = %self.identity, key = %self.config.key, "Stopped leader election");
        }

        generation
    }

    /// Apply a state change and event if `generation` is still current
    fn transition(&self, generation: u64, state: ElectorState, event: Option<LeaderEvent>) -> bool {
        let schedule = self.schedule.lock();
        if schedule.generation != generation {
            debug!(current = schedule.generation, "Discarding stale election result");
            return false;
        }

        self.state.send_replace(state);
        if let Some(event) = event {
            let _ = self.events.send(event);
        }
        true
    }

    fn is_current(&self, generation: u64) -> bool {
        self.schedule.lock().generation == generation
    }

    fn emit(&self, event: LeaderEvent) {
        // Serialized with transitions so events stay in causal order
        let _schedule = self.schedule.lock();
        let _ = self.events.send(event);
    }
}
