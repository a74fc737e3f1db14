//! Session store: the cached session collection, the active session, and the
//! optimistic send path.
//!
//! The append-and-send contract: a just-submitted message becomes visible in
//! the active session synchronously, before any network I/O. On success the
//! coach reply is appended next to it; on failure the pending item is removed
//! and the error is recorded. The submitted text is not restored anywhere on
//! failure — that matches the shipped behavior (see DESIGN.md) even though it
//! drops user input.

use std::sync::{Arc, Mutex};

use crate::api::CoachApi;
use crate::error::{Error, Result};
use crate::health::BackendHealth;
use crate::types::{ChatMessage, Session, SessionSummary};

use super::{LoadPhase, TempIds};

/// Cloned view of the session store for rendering.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    /// Cached list, newest first as served
    pub sessions: Vec<SessionSummary>,
    /// The session currently open in the UI, with full message history
    pub active: Option<Session>,
    /// Load lifecycle
    pub phase: LoadPhase,
    /// Coarse flag: a send is in flight (not per-message)
    pub sending: bool,
    /// Last operation error, for display
    pub error: Option<String>,
}

/// Application-scoped store for coaching chat sessions.
pub struct SessionStore {
    api: Arc<dyn CoachApi>,
    health: Arc<BackendHealth>,
    temp_ids: TempIds,
    state: Mutex<SessionSnapshot>,
}

impl SessionStore {
    pub fn new(api: Arc<dyn CoachApi>, health: Arc<BackendHealth>) -> Self {
        Self {
            api,
            health,
            temp_ids: TempIds::new(),
            state: Mutex::new(SessionSnapshot::default()),
        }
    }

    /// Current state, cloned.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.lock().unwrap().clone()
    }

    fn begin_loading(&self) {
        let mut state = self.state.lock().unwrap();
        state.phase = LoadPhase::Loading;
        state.error = None;
    }

    /// Record a failed operation without touching cached data.
    fn note_error(&self, error: &Error) {
        let mut state = self.state.lock().unwrap();
        state.phase = LoadPhase::Error;
        state.error = Some(error.to_string());
    }

    /// Replace the cached list with server truth, following `next` cursors
    /// until the collection is complete.
    ///
    /// Failure leaves the previously cached list untouched.
    pub async fn fetch_list(&self) -> Result<Vec<SessionSummary>> {
        self.begin_loading();

        let result = self.fetch_all_pages().await;
        self.health.observe(&result);
        match result {
            Ok(sessions) => {
                let mut state = self.state.lock().unwrap();
                state.sessions = sessions.clone();
                state.phase = LoadPhase::Ready;
                Ok(sessions)
            }
            Err(e) => {
                self.note_error(&e);
                Err(e)
            }
        }
    }

    async fn fetch_all_pages(&self) -> Result<Vec<SessionSummary>> {
        let mut sessions = Vec::new();
        let mut page: Option<u32> = None;

        loop {
            let batch = self.api.list_sessions(page).await?;
            let next = batch.next_page();
            sessions.extend(batch.items);

            // Stop when the cursor is exhausted or fails to advance.
            if next.is_none() || next == page {
                break;
            }
            page = next;
        }

        Ok(sessions)
    }

    /// Load one session in full and make it active.
    ///
    /// On failure the active session is cleared and the error retained for
    /// display.
    pub async fn fetch_one(&self, id: i64) -> Result<Session> {
        self.begin_loading();

        let result = self.api.get_session(id).await;
        self.health.observe(&result);
        match result {
            Ok(session) => {
                let mut state = self.state.lock().unwrap();
                state.active = Some(session.clone());
                state.phase = LoadPhase::Ready;
                Ok(session)
            }
            Err(e) => {
                let mut state = self.state.lock().unwrap();
                state.active = None;
                state.phase = LoadPhase::Error;
                state.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Create a session on the server, prepend it to the cached list, and
    /// make it active.
    ///
    /// Creation is not optimistic: the list is only touched once the server
    /// has confirmed.
    pub async fn create(&self, title: Option<&str>) -> Result<Session> {
        self.begin_loading();

        let result = self.api.create_session(title).await;
        self.health.observe(&result);
        match result {
            Ok(session) => {
                let mut state = self.state.lock().unwrap();
                state.sessions.insert(0, SessionSummary::from(&session));
                state.active = Some(session.clone());
                state.phase = LoadPhase::Ready;
                Ok(session)
            }
            Err(e) => {
                self.note_error(&e);
                Err(e)
            }
        }
    }

    /// Optimistically drop the session from the cache, then issue the delete.
    ///
    /// No snapshot is kept for rollback: if the delete fails, the store
    /// re-synchronizes with server truth via a full [`fetch_list`].
    ///
    /// [`fetch_list`]: SessionStore::fetch_list
    pub async fn remove(&self, id: i64) -> Result<()> {
        {
            let mut state = self.state.lock().unwrap();
            state.sessions.retain(|s| s.id != id);
            if state.active.as_ref().map_or(false, |s| s.id == id) {
                state.active = None;
            }
        }

        let result = self.api.delete_session(id).await;
        self.health.observe(&result);
        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!(
                    session_id = id,
                    error = %e,
                    "Delete failed, refetching session list"
                );
                self.note_error(&e);
                let _ = self.fetch_list().await;
                Err(e)
            }
        }
    }

    /// Optimistically append a user message to the active session, then send
    /// it.
    ///
    /// No-op when `session_id` is not the active session: the engine never
    /// speculatively creates entities. Not idempotent — two calls with the
    /// same content produce two pending items with distinct temporary ids.
    pub async fn send_message(&self, session_id: i64, content: &str) -> Result<()> {
        let temp_id = {
            let mut guard = self.state.lock().unwrap();
            let state = &mut *guard;
            let active = match state.active.as_mut() {
                Some(s) if s.id == session_id => s,
                _ => {
                    tracing::debug!(session_id, "send_message ignored: session is not active");
                    return Ok(());
                }
            };

            let temp_id = self.temp_ids.next();
            active.messages.push(ChatMessage::pending(temp_id, content));
            state.sending = true;
            state.error = None;
            temp_id
        };

        let result = self.api.send_message(session_id, content).await;
        self.health.observe(&result);
        match result {
            Ok(reply) => {
                let mut state = self.state.lock().unwrap();
                // Append the reply; the pending user item stays as-is. The
                // server echoes the user message on the next full fetch.
                if let Some(active) = state.active.as_mut() {
                    if active.id == session_id {
                        active.messages.push(reply);
                    }
                }
                state.sending = false;
                Ok(())
            }
            Err(e) => {
                let mut state = self.state.lock().unwrap();
                if let Some(active) = state.active.as_mut() {
                    active.messages.retain(|m| m.id != temp_id);
                }
                state.sending = false;
                state.error = Some(e.to_string());
                drop(state);

                tracing::warn!(
                    session_id,
                    error = %e,
                    "Send failed, rolled back pending message"
                );
                Err(e)
            }
        }
    }
}
