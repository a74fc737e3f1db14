//! Core domain types for repset
//!
//! Everything here mirrors what the coach API serves; the only client-side
//! addition is [`Delivery`], which tags messages that exist locally but have
//! not been confirmed by the server yet.
//!
//! Identifiers are server-issued positive integers. Optimistically inserted
//! messages carry negative placeholder ids (see `store::TempIds`), so the two
//! ranges can never collide.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Chat sessions
// ============================================

/// One row of the session list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Server-issued identifier
    pub id: i64,
    /// Optional user-visible title
    pub title: Option<String>,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// Most recent message timestamp, if any
    pub last_activity_at: Option<DateTime<Utc>>,
    /// Total messages in the session
    pub message_count: i64,
}

/// A full coaching chat session with its message history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Server-issued identifier
    pub id: i64,
    /// Optional user-visible title
    pub title: Option<String>,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// Messages in insertion order; append-only from the client's
    /// perspective except for optimistic rollback removal
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id,
            title: session.title.clone(),
            created_at: session.created_at,
            last_activity_at: session.messages.last().map(|m| m.created_at),
            message_count: session.messages.len() as i64,
        }
    }
}

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The athlete using the app
    User,
    /// The coaching backend
    Coach,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Coach => "coach",
        }
    }
}

/// Client-side confirmation state of a message.
///
/// Anything deserialized from the server is `Confirmed`. A `Pending` message
/// exists only locally; on send failure it is removed outright, so there is
/// no retained failed state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Delivery {
    /// Optimistic local insert awaiting the server's reply
    Pending,
    /// Server-issued message
    #[default]
    Confirmed,
}

/// One message in a coaching session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Server id (positive) or local placeholder (negative)
    pub id: i64,
    /// Message author
    pub role: MessageRole,
    /// Message text
    pub content: String,
    /// When the message was created
    pub created_at: DateTime<Utc>,
    /// Client-side confirmation state; never sent over the wire
    #[serde(skip, default)]
    pub delivery: Delivery,
}

impl ChatMessage {
    /// Build the optimistic local placeholder for a just-submitted message.
    pub fn pending(id: i64, content: impl Into<String>) -> Self {
        Self {
            id,
            role: MessageRole::User,
            content: content.into(),
            created_at: Utc::now(),
            delivery: Delivery::Pending,
        }
    }

    /// True while the message awaits server confirmation.
    pub fn is_pending(&self) -> bool {
        self.delivery == Delivery::Pending
    }
}

// ============================================
// Today status
// ============================================

/// Training readiness as computed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Readiness {
    /// Recovered, full session recommended
    Ready,
    /// Elevated fatigue, reduced load recommended
    Strained,
    /// Rest day
    Rest,
}

impl Readiness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Readiness::Ready => "ready",
            Readiness::Strained => "strained",
            Readiness::Rest => "rest",
        }
    }
}

/// The derived "today" record: readiness plus the planned workout.
///
/// Computed entirely server-side; the client only caches it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodayStatus {
    /// Which day this status describes
    pub date: NaiveDate,
    /// Readiness verdict
    pub readiness: Readiness,
    /// Name of the planned workout, if one is scheduled
    pub planned_workout: Option<String>,
    /// Whether today's planned workout has been logged
    pub completed: bool,
}
