//! Backend availability tracking
//!
//! Two independent heuristics write one shared `down` flag:
//!
//! - the periodic liveness probe ([`HealthProbe`]) counts consecutive failed
//!   probes and trips after `probe_failure_threshold` of them;
//! - every ordinary API call feeds the ambient streak: a transport failure
//!   within `failure_window` of the previous one continues the streak, and
//!   `failure_threshold` in one streak trips the flag.
//!
//! The two triggers are deliberately kept separate rather than merged into a
//! single breaker state machine; they guard different call sites and recover
//! differently. A frontend reads the flag (or subscribes to its watch
//! channel) to decide when to swap the whole UI for a maintenance state.

mod probe;

pub use probe::HealthProbe;

use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::config::HealthConfig;
use crate::error::Result;

#[derive(Debug, Default)]
struct Counters {
    /// Consecutive failed liveness probes
    probe_failures: u32,
    /// Current ambient failure streak
    streak: u32,
    /// When the streak last grew
    last_failure_at: Option<Instant>,
    /// The shared flag both heuristics write
    down: bool,
}

/// Shared backend availability state.
///
/// Application-scoped singleton; constructed once and handed to the stores
/// and the probe via `Arc`. All updates go through the record methods below.
pub struct BackendHealth {
    probe_failure_threshold: u32,
    failure_threshold: u32,
    failure_window: Duration,
    counters: Mutex<Counters>,
    down_tx: watch::Sender<bool>,
}

impl BackendHealth {
    pub fn new(config: &HealthConfig) -> Self {
        let (down_tx, _) = watch::channel(false);
        Self {
            probe_failure_threshold: config.probe_failure_threshold,
            failure_threshold: config.failure_threshold,
            failure_window: config.failure_window(),
            counters: Mutex::new(Counters::default()),
            down_tx,
        }
    }

    /// Whether the backend is currently considered down.
    pub fn is_down(&self) -> bool {
        self.counters.lock().unwrap().down
    }

    /// Consecutive failed liveness probes so far.
    pub fn probe_failures(&self) -> u32 {
        self.counters.lock().unwrap().probe_failures
    }

    /// Receiver that observes flips of the shared flag.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.down_tx.subscribe()
    }

    /// Record one failed liveness probe.
    pub fn record_probe_failure(&self) {
        let mut counters = self.counters.lock().unwrap();
        counters.probe_failures += 1;
        if counters.probe_failures >= self.probe_failure_threshold && !counters.down {
            tracing::warn!(
                failures = counters.probe_failures,
                "Probe failure threshold reached, marking backend down"
            );
            counters.down = true;
            let _ = self.down_tx.send(true);
        }
    }

    /// Record one successful liveness probe; clears the flag.
    pub fn record_probe_success(&self) {
        let mut counters = self.counters.lock().unwrap();
        counters.probe_failures = 0;
        if counters.down {
            tracing::info!("Probe succeeded, clearing down flag");
            counters.down = false;
            let _ = self.down_tx.send(false);
        }
    }

    /// Record one failed API call (ambient heuristic).
    ///
    /// A failure landing more than the window after the previous one starts
    /// a fresh streak of 1 instead of continuing the old one.
    pub fn record_failure(&self) {
        let now = Instant::now();
        let mut counters = self.counters.lock().unwrap();

        let within_window = counters
            .last_failure_at
            .map_or(false, |at| now.duration_since(at) <= self.failure_window);
        counters.streak = if within_window { counters.streak + 1 } else { 1 };
        counters.last_failure_at = Some(now);

        if counters.streak >= self.failure_threshold && !counters.down {
            tracing::warn!(
                streak = counters.streak,
                "Request failure streak reached threshold, marking backend down"
            );
            counters.down = true;
            let _ = self.down_tx.send(true);
        }
    }

    /// Record one successful API call; resets the ambient streak only.
    pub fn record_success(&self) {
        let mut counters = self.counters.lock().unwrap();
        counters.streak = 0;
        counters.last_failure_at = None;
    }

    /// Manual "try again": optimistically clear the flag and both counters
    /// without confirming connectivity. If the backend is still failing, the
    /// heuristics flip the flag back.
    pub fn reset(&self) {
        let mut counters = self.counters.lock().unwrap();
        counters.probe_failures = 0;
        counters.streak = 0;
        counters.last_failure_at = None;
        if counters.down {
            counters.down = false;
            let _ = self.down_tx.send(false);
        }
    }

    /// Feed one API call outcome into the ambient heuristic.
    ///
    /// Successes reset the streak. Only transport-level failures count
    /// toward unavailability; API-level errors are the caller's problem.
    pub fn observe<T>(&self, result: &Result<T>) {
        match result {
            Ok(_) => self.record_success(),
            Err(e) if e.is_transport() => self.record_failure(),
            Err(_) => {}
        }
    }
}
