//! # repset-core
//!
//! Client-side core for the RepSet coaching service. The backend owns all
//! business logic — workout computation, recovery status, coach replies —
//! and this library owns what a client needs around it:
//!
//! - an API boundary (trait + `reqwest` implementation)
//! - in-memory entity stores with optimistic updates and failure rollback
//! - backend availability heuristics gating a maintenance UI state
//! - configuration and logging
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use repset_core::{BackendHealth, CoachApi, CoachClient, Config, SessionStore};
//!
//! # async fn demo() -> repset_core::Result<()> {
//! let config = Config::load()?;
//! let api: Arc<dyn CoachApi> = Arc::new(CoachClient::new(config.api.clone())?);
//! let health = Arc::new(BackendHealth::new(&config.health));
//!
//! let sessions = SessionStore::new(api, health);
//! sessions.fetch_list().await?;
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use api::{CoachApi, CoachClient};
pub use config::Config;
pub use error::{Error, Result};
pub use health::{BackendHealth, HealthProbe};
pub use store::{SessionStore, TodayStore};
pub use types::*;

// Public modules
pub mod api;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod store;
pub mod types;
