//! Gate work on leadership

use std::future::Future;

use crate::elector::{ElectorState, LeaderElector};
use crate::error::Result;

/// Leadership-aware wrapper around a [`LeaderElector`]
pub struct LeaderGuard {
    elector: LeaderElector,
}

impl LeaderGuard {
    pub fn new(elector: LeaderElector) -> Self {
        Self { elector }
    }

    /// Run `f` only if the store confirms this instance holds the lock
    pub async fn run_if_leader<F, Fut, T>(&self, f: F) -> Result<Option<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if self.elector.is_leader().await? {
            Ok(Some(f().await))
        } else {
            Ok(None)
        }
    }

    /// Cheap check against the in-process state, without a store round trip
    pub fn should_process(&self) -> bool {
        self.elector.state() == ElectorState::Leading
    }

    /// Wait until this instance becomes leader
    pub async fn wait_for_leadership(&self) {
        let mut rx = self.elector.subscribe_state();

        while *rx.borrow_and_update() != ElectorState::Leading {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }

    pub fn elector(&self) -> &LeaderElector {
        &self.elector
    }
}
