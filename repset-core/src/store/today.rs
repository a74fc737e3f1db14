//! Today store: cached copy of the derived "today" training status.
//!
//! Second instance of the entity-store pattern, read-only: there is nothing
//! to mutate optimistically about a server-computed readiness verdict.

use std::sync::{Arc, Mutex};

use crate::api::CoachApi;
use crate::error::Result;
use crate::health::BackendHealth;
use crate::types::TodayStatus;

use super::LoadPhase;

/// Cloned view of the today store for rendering.
#[derive(Debug, Clone, Default)]
pub struct TodaySnapshot {
    /// Last successfully fetched status
    pub status: Option<TodayStatus>,
    /// Load lifecycle
    pub phase: LoadPhase,
    /// Last operation error, for display
    pub error: Option<String>,
}

/// Application-scoped store for today's training status.
pub struct TodayStore {
    api: Arc<dyn CoachApi>,
    health: Arc<BackendHealth>,
    state: Mutex<TodaySnapshot>,
}

impl TodayStore {
    pub fn new(api: Arc<dyn CoachApi>, health: Arc<BackendHealth>) -> Self {
        Self {
            api,
            health,
            state: Mutex::new(TodaySnapshot::default()),
        }
    }

    /// Current state, cloned.
    pub fn snapshot(&self) -> TodaySnapshot {
        self.state.lock().unwrap().clone()
    }

    /// Refresh today's status from the server.
    ///
    /// Failure keeps the previously cached status and records the error.
    pub async fn refresh(&self) -> Result<TodayStatus> {
        {
            let mut state = self.state.lock().unwrap();
            state.phase = LoadPhase::Loading;
            state.error = None;
        }

        let result = self.api.today().await;
        self.health.observe(&result);
        match result {
            Ok(status) => {
                let mut state = self.state.lock().unwrap();
                state.status = Some(status.clone());
                state.phase = LoadPhase::Ready;
                Ok(status)
            }
            Err(e) => {
                let mut state = self.state.lock().unwrap();
                state.phase = LoadPhase::Error;
                state.error = Some(e.to_string());
                Err(e)
            }
        }
    }
}
