//! Coach API boundary
//!
//! The stores depend on [`CoachApi`] rather than on the HTTP client directly,
//! so tests can substitute an in-memory fake and no store ever needs a live
//! backend. [`CoachClient`] is the production implementation.
//!
//! Failure semantics: nothing here panics. Connection-level problems come
//! back as [`Error::Transport`], non-2xx responses as [`Error::Api`] with the
//! most useful message the body offers.
//!
//! [`Error::Transport`]: crate::error::Error::Transport
//! [`Error::Api`]: crate::error::Error::Api

mod client;
mod page;

pub use client::CoachClient;
pub use page::Page;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChatMessage, Session, SessionSummary, TodayStatus};

/// The remote coach API as consumed by the stores.
#[async_trait]
pub trait CoachApi: Send + Sync {
    /// List session summaries, optionally a specific page.
    async fn list_sessions(&self, page: Option<u32>) -> Result<Page<SessionSummary>>;

    /// Create a new session.
    async fn create_session(&self, title: Option<&str>) -> Result<Session>;

    /// Fetch one session with its full message history.
    async fn get_session(&self, id: i64) -> Result<Session>;

    /// Delete a session.
    async fn delete_session(&self, id: i64) -> Result<()>;

    /// Send one user message; returns the coach's reply.
    async fn send_message(&self, session_id: i64, content: &str) -> Result<ChatMessage>;

    /// Fetch the derived "today" status.
    async fn today(&self) -> Result<TodayStatus>;

    /// Liveness check; Ok only when the backend reports itself healthy.
    async fn health(&self) -> Result<()>;
}
