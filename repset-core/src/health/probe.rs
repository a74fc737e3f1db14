//! Periodic liveness probe against the coach API
//!
//! One spawned task alternates between two cadences: the primary loop probes
//! every interval until the failure threshold trips the shared flag, then a
//! recovery loop keeps probing at the same interval until a single success
//! clears it.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use super::BackendHealth;
use crate::api::CoachApi;
use crate::config::HealthConfig;

/// Handle for the spawned probe loop.
///
/// The interval timers live inside the task; shutting the handle down (or
/// dropping it) aborts the task and releases them.
pub struct HealthProbe {
    task: JoinHandle<()>,
}

impl HealthProbe {
    /// Spawn the probe loop on the current runtime.
    pub fn spawn(
        api: Arc<dyn CoachApi>,
        health: Arc<BackendHealth>,
        config: &HealthConfig,
    ) -> Self {
        let period = config.probe_interval();
        let task = tokio::spawn(async move {
            run(api, health, period).await;
        });
        Self { task }
    }

    /// Stop probing.
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for HealthProbe {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(api: Arc<dyn CoachApi>, health: Arc<BackendHealth>, period: Duration) {
    loop {
        watch_backend(api.as_ref(), &health, period).await;
        recover_backend(api.as_ref(), &health, period).await;
    }
}

/// Primary cadence: probe immediately, then every period, until the flag
/// trips.
async fn watch_backend(api: &dyn CoachApi, health: &BackendHealth, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match api.health().await {
            Ok(()) => health.record_probe_success(),
            Err(e) => {
                tracing::debug!(error = %e, "Liveness probe failed");
                health.record_probe_failure();
            }
        }
        if health.is_down() {
            return;
        }
    }
}

/// Recovery cadence: keep probing while down until one success clears the
/// flag.
async fn recover_backend(api: &dyn CoachApi, health: &BackendHealth, period: Duration) {
    if !health.is_down() {
        return;
    }

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of a fresh interval resolves immediately; consume it so
    // recovery waits a full period after the probe that tripped the flag.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        match api.health().await {
            Ok(()) => {
                health.record_probe_success();
                return;
            }
            Err(e) => {
                tracing::debug!(error = %e, "Recovery probe failed");
                health.record_probe_failure();
            }
        }
    }
}
