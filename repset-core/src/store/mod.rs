//! In-memory entity stores
//!
//! Each store caches one slice of server data plus its load lifecycle, and is
//! the only writer of that state. Stores are application-scoped: construct
//! one of each at startup with the API handle and the shared
//! [`BackendHealth`](crate::health::BackendHealth), share via `Arc`, reset
//! only on logout.
//!
//! Mutations happen in short synchronous critical sections; network calls are
//! the only suspension points and always run outside the lock, so a reader
//! never observes a partial update.

mod session;
mod today;

pub use session::{SessionSnapshot, SessionStore};
pub use today::{TodaySnapshot, TodayStore};

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Load lifecycle of a store: `Idle -> Loading -> {Ready, Error}`, with
/// `Loading` reentrant. There is no terminal state; any operation may run
/// again from any phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadPhase {
    #[default]
    Idle,
    Loading,
    Ready,
    Error,
}

/// Generator for client-side placeholder ids.
///
/// Pending items get negative ids derived from the wall clock in
/// milliseconds; the atomic keeps rapid calls strictly decreasing, so two
/// sends inside the same millisecond still get distinct ids. Server ids are
/// positive, so the ranges cannot collide.
#[derive(Debug, Default)]
pub struct TempIds {
    last: AtomicI64,
}

impl TempIds {
    pub fn new() -> Self {
        Self {
            last: AtomicI64::new(0),
        }
    }

    /// Next temporary id, strictly smaller than any previously issued.
    pub fn next(&self) -> i64 {
        let candidate = -Utc::now().timestamp_millis();
        self.last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(candidate.min(last - 1))
            })
            .map(|last| candidate.min(last - 1))
            .unwrap_or(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_ids_are_negative_and_strictly_decreasing() {
        let ids = TempIds::new();
        let mut previous = 0;
        for _ in 0..100 {
            let id = ids.next();
            assert!(id < 0);
            assert!(id < previous);
            previous = id;
        }
    }
}
