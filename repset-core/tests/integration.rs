//! Integration tests for the repset stores and backend-health heuristics.
//!
//! A scriptable in-memory `FakeCoach` stands in for the remote API so store
//! behavior can be driven deterministically; time-sensitive probe tests run
//! on tokio's paused clock.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use tokio::sync::Notify;

use repset_core::api::{CoachApi, Page};
use repset_core::config::HealthConfig;
use repset_core::store::{LoadPhase, SessionStore, TodayStore};
use repset_core::types::{
    ChatMessage, Delivery, MessageRole, Readiness, Session, SessionSummary, TodayStatus,
};
use repset_core::{BackendHealth, Error, HealthProbe, Result};

// ============================================
// Fake backend
// ============================================

/// Scriptable in-memory coach backend.
///
/// Each endpoint pops its next scripted outcome; unscripted calls fall back
/// to a benign default so tests only script what they care about.
#[derive(Default)]
struct FakeCoach {
    lists: Mutex<VecDeque<Result<Page<SessionSummary>>>>,
    gets: Mutex<VecDeque<Result<Session>>>,
    creates: Mutex<VecDeque<Result<Session>>>,
    deletes: Mutex<VecDeque<Result<()>>>,
    sends: Mutex<VecDeque<Result<ChatMessage>>>,
    todays: Mutex<VecDeque<Result<TodayStatus>>>,
    probes: Mutex<VecDeque<Result<()>>>,
    /// When the probe queue runs dry: true = healthy, false = keep failing.
    probes_healthy_when_dry: AtomicBool,
    /// Optional gate holding `send_message` open until notified.
    send_gate: Option<Arc<Notify>>,
}

#[async_trait]
impl CoachApi for FakeCoach {
    async fn list_sessions(&self, _page: Option<u32>) -> Result<Page<SessionSummary>> {
        self.lists.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(Page {
                items: Vec::new(),
                next: None,
            })
        })
    }

    async fn create_session(&self, title: Option<&str>) -> Result<Session> {
        self.creates
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(session(99, title.unwrap_or("untitled"))))
    }

    async fn get_session(&self, _id: i64) -> Result<Session> {
        self.gets
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(transport()))
    }

    async fn delete_session(&self, _id: i64) -> Result<()> {
        self.deletes.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }

    async fn send_message(&self, _session_id: i64, _content: &str) -> Result<ChatMessage> {
        if let Some(gate) = &self.send_gate {
            gate.notified().await;
        }
        self.sends
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(coach_reply(900, "noted")))
    }

    async fn today(&self) -> Result<TodayStatus> {
        self.todays
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(transport()))
    }

    async fn health(&self) -> Result<()> {
        if let Some(outcome) = self.probes.lock().unwrap().pop_front() {
            return outcome;
        }
        if self.probes_healthy_when_dry.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(transport())
        }
    }
}

// ============================================
// Fixtures
// ============================================

fn transport() -> Error {
    Error::Transport("connection refused".to_string())
}

fn stamp() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 1, 7, 0, 0).unwrap()
}

fn summary(id: i64, title: &str) -> SessionSummary {
    SessionSummary {
        id,
        title: Some(title.to_string()),
        created_at: stamp(),
        last_activity_at: None,
        message_count: 0,
    }
}

fn session(id: i64, title: &str) -> Session {
    Session {
        id,
        title: Some(title.to_string()),
        created_at: stamp(),
        messages: Vec::new(),
    }
}

fn coach_reply(id: i64, content: &str) -> ChatMessage {
    ChatMessage {
        id,
        role: MessageRole::Coach,
        content: content.to_string(),
        created_at: stamp(),
        delivery: Delivery::Confirmed,
    }
}

fn today_status(readiness: Readiness) -> TodayStatus {
    TodayStatus {
        date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
        readiness,
        planned_workout: Some("tempo run".to_string()),
        completed: false,
    }
}

fn session_store(api: Arc<FakeCoach>) -> SessionStore {
    let health = Arc::new(BackendHealth::new(&HealthConfig::default()));
    SessionStore::new(api, health)
}

// ============================================
// Optimistic send path
// ============================================

#[tokio::test]
async fn optimistic_append_is_visible_before_resolution() {
    let gate = Arc::new(Notify::new());
    let api = Arc::new(FakeCoach {
        send_gate: Some(gate.clone()),
        ..FakeCoach::default()
    });
    api.gets.lock().unwrap().push_back(Ok(session(1, "intervals")));

    let store = Arc::new(session_store(api));
    store.fetch_one(1).await.expect("fetch_one");

    let task = {
        let store = store.clone();
        tokio::spawn(async move { store.send_message(1, "how hard today?").await })
    };
    // Let the send task run up to its suspension point inside the fake.
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;

    let snap = store.snapshot();
    let active = snap.active.expect("active session");
    assert!(snap.sending);
    assert_eq!(active.messages.len(), 1);
    let pending = &active.messages[0];
    assert!(pending.id < 0);
    assert!(pending.is_pending());
    assert_eq!(pending.role, MessageRole::User);
    assert_eq!(pending.content, "how hard today?");

    gate.notify_one();
    task.await.expect("join").expect("send");
    assert!(!store.snapshot().sending);
}

#[tokio::test]
async fn successful_send_keeps_pending_item_and_appends_reply() {
    let api = Arc::new(FakeCoach::default());
    api.gets.lock().unwrap().push_back(Ok(session(1, "intervals")));
    api.sends
        .lock()
        .unwrap()
        .push_back(Ok(coach_reply(42, "ease into it")));

    let store = session_store(api);
    store.fetch_one(1).await.expect("fetch_one");
    store.send_message(1, "legs are heavy").await.expect("send");

    let snap = store.snapshot();
    let active = snap.active.expect("active session");
    assert_eq!(active.messages.len(), 2);

    // The optimistic user item stays, unchanged.
    assert!(active.messages[0].is_pending());
    assert!(active.messages[0].id < 0);
    assert_eq!(active.messages[0].content, "legs are heavy");

    // The coach reply is appended after it.
    assert_eq!(active.messages[1].id, 42);
    assert_eq!(active.messages[1].role, MessageRole::Coach);
    assert_eq!(active.messages[1].delivery, Delivery::Confirmed);

    assert!(!snap.sending);
    assert!(snap.error.is_none());
}

#[tokio::test]
async fn failed_send_rolls_back_the_pending_item() {
    let api = Arc::new(FakeCoach::default());
    api.gets.lock().unwrap().push_back(Ok(session(1, "intervals")));
    api.sends.lock().unwrap().push_back(Err(transport()));

    let store = session_store(api);
    store.fetch_one(1).await.expect("fetch_one");
    let result = store.send_message(1, "lost message").await;
    assert!(result.is_err());

    let snap = store.snapshot();
    let active = snap.active.expect("active session");
    assert!(active.messages.is_empty());
    assert!(!snap.sending);
    assert!(snap.error.is_some());
}

#[tokio::test]
async fn send_to_inactive_session_is_a_no_op() {
    let api = Arc::new(FakeCoach::default());
    api.gets.lock().unwrap().push_back(Ok(session(1, "intervals")));

    let store = session_store(api);
    store.fetch_one(1).await.expect("fetch_one");
    store.send_message(2, "wrong session").await.expect("no-op");

    let snap = store.snapshot();
    assert!(snap.active.expect("active session").messages.is_empty());
    assert!(!snap.sending);
}

#[tokio::test]
async fn two_rapid_sends_get_distinct_temporary_ids() {
    let gate = Arc::new(Notify::new());
    let api = Arc::new(FakeCoach {
        send_gate: Some(gate.clone()),
        ..FakeCoach::default()
    });
    api.gets.lock().unwrap().push_back(Ok(session(1, "intervals")));

    let store = Arc::new(session_store(api));
    store.fetch_one(1).await.expect("fetch_one");

    let first = {
        let store = store.clone();
        tokio::spawn(async move { store.send_message(1, "one").await })
    };
    let second = {
        let store = store.clone();
        tokio::spawn(async move { store.send_message(1, "two").await })
    };
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;

    let snap = store.snapshot();
    let messages = snap.active.expect("active session").messages;
    assert_eq!(messages.len(), 2);
    assert_ne!(messages[0].id, messages[1].id);
    assert!(messages[0].id < 0 && messages[1].id < 0);

    gate.notify_one();
    gate.notify_one();
    first.await.expect("join").expect("send");
    second.await.expect("join").expect("send");
}

// ============================================
// Store lifecycle
// ============================================

#[tokio::test]
async fn fetch_list_is_idempotent() {
    let api = Arc::new(FakeCoach::default());
    let page = || {
        Ok(Page {
            items: vec![summary(1, "monday"), summary(2, "thursday")],
            next: None,
        })
    };
    api.lists.lock().unwrap().push_back(page());
    api.lists.lock().unwrap().push_back(page());

    let store = session_store(api);
    let first = store.fetch_list().await.expect("first fetch");
    let second = store.fetch_list().await.expect("second fetch");

    assert_eq!(first, second);
    let snap = store.snapshot();
    assert_eq!(snap.sessions.len(), 2);
    assert_eq!(snap.phase, LoadPhase::Ready);
}

#[tokio::test]
async fn fetch_list_follows_next_cursors() {
    let api = Arc::new(FakeCoach::default());
    api.lists.lock().unwrap().push_back(Ok(Page {
        items: vec![summary(1, "monday")],
        next: Some("https://api.repset.app/sessions?page=2".to_string()),
    }));
    api.lists.lock().unwrap().push_back(Ok(Page {
        items: vec![summary(2, "thursday")],
        next: None,
    }));

    let store = session_store(api);
    let sessions = store.fetch_list().await.expect("fetch");
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].id, 1);
    assert_eq!(sessions[1].id, 2);
}

#[tokio::test]
async fn both_pagination_shapes_cache_identically() {
    let raw = r#"[{"id": 1, "title": "monday", "created_at": "2026-08-01T07:00:00Z",
                   "last_activity_at": null, "message_count": 0}]"#;
    let wrapped = r#"{"results": [{"id": 1, "title": "monday",
                      "created_at": "2026-08-01T07:00:00Z",
                      "last_activity_at": null, "message_count": 0}],
                      "next": null}"#;

    let bare: Page<SessionSummary> = Page::from_json(raw).expect("bare shape");
    let paged: Page<SessionSummary> = Page::from_json(wrapped).expect("paged shape");

    let api_a = Arc::new(FakeCoach::default());
    api_a.lists.lock().unwrap().push_back(Ok(bare));
    let api_b = Arc::new(FakeCoach::default());
    api_b.lists.lock().unwrap().push_back(Ok(paged));

    let store_a = session_store(api_a);
    let store_b = session_store(api_b);
    store_a.fetch_list().await.expect("bare fetch");
    store_b.fetch_list().await.expect("paged fetch");

    assert_eq!(store_a.snapshot().sessions, store_b.snapshot().sessions);
}

#[tokio::test]
async fn failed_fetch_list_keeps_the_cached_list() {
    let api = Arc::new(FakeCoach::default());
    api.lists.lock().unwrap().push_back(Ok(Page {
        items: vec![summary(1, "monday")],
        next: None,
    }));
    api.lists.lock().unwrap().push_back(Err(transport()));

    let store = session_store(api);
    store.fetch_list().await.expect("first fetch");
    assert!(store.fetch_list().await.is_err());

    let snap = store.snapshot();
    assert_eq!(snap.sessions.len(), 1);
    assert_eq!(snap.phase, LoadPhase::Error);
    assert!(snap.error.is_some());
}

#[tokio::test]
async fn failed_fetch_one_clears_the_active_session() {
    let api = Arc::new(FakeCoach::default());
    api.gets.lock().unwrap().push_back(Ok(session(1, "intervals")));
    api.gets.lock().unwrap().push_back(Err(transport()));

    let store = session_store(api);
    store.fetch_one(1).await.expect("fetch_one");
    assert!(store.fetch_one(2).await.is_err());

    let snap = store.snapshot();
    assert!(snap.active.is_none());
    assert!(snap.error.is_some());
}

#[tokio::test]
async fn create_prepends_and_activates() {
    let api = Arc::new(FakeCoach::default());
    api.lists.lock().unwrap().push_back(Ok(Page {
        items: vec![summary(1, "monday")],
        next: None,
    }));
    api.creates
        .lock()
        .unwrap()
        .push_back(Ok(session(7, "deload week")));

    let store = session_store(api);
    store.fetch_list().await.expect("fetch_list");
    let created = store.create(Some("deload week")).await.expect("create");
    assert_eq!(created.id, 7);

    let snap = store.snapshot();
    assert_eq!(snap.sessions.len(), 2);
    assert_eq!(snap.sessions[0].id, 7);
    assert_eq!(snap.active.expect("active session").id, 7);
}

#[tokio::test]
async fn failed_remove_resynchronizes_from_the_server() {
    let api = Arc::new(FakeCoach::default());
    api.lists.lock().unwrap().push_back(Ok(Page {
        items: vec![summary(1, "monday"), summary(2, "thursday")],
        next: None,
    }));
    api.deletes.lock().unwrap().push_back(Err(transport()));
    // Server truth after the failed delete: both sessions still exist.
    api.lists.lock().unwrap().push_back(Ok(Page {
        items: vec![summary(1, "monday"), summary(2, "thursday")],
        next: None,
    }));

    let store = session_store(api);
    store.fetch_list().await.expect("fetch_list");
    assert!(store.remove(1).await.is_err());

    // No in-memory rollback; the refetch restored the full list.
    let snap = store.snapshot();
    assert_eq!(snap.sessions.len(), 2);
}

#[tokio::test]
async fn successful_remove_drops_session_and_clears_active() {
    let api = Arc::new(FakeCoach::default());
    api.lists.lock().unwrap().push_back(Ok(Page {
        items: vec![summary(1, "monday"), summary(2, "thursday")],
        next: None,
    }));
    api.gets.lock().unwrap().push_back(Ok(session(1, "monday")));

    let store = session_store(api);
    store.fetch_list().await.expect("fetch_list");
    store.fetch_one(1).await.expect("fetch_one");
    store.remove(1).await.expect("remove");

    let snap = store.snapshot();
    assert_eq!(snap.sessions.len(), 1);
    assert_eq!(snap.sessions[0].id, 2);
    assert!(snap.active.is_none());
}

// ============================================
// Today store
// ============================================

#[tokio::test]
async fn today_refresh_caches_and_keeps_prior_on_failure() {
    let api = Arc::new(FakeCoach::default());
    api.todays
        .lock()
        .unwrap()
        .push_back(Ok(today_status(Readiness::Ready)));
    api.todays.lock().unwrap().push_back(Err(transport()));

    let health = Arc::new(BackendHealth::new(&HealthConfig::default()));
    let store = TodayStore::new(api, health);

    let status = store.refresh().await.expect("first refresh");
    assert_eq!(status.readiness, Readiness::Ready);

    assert!(store.refresh().await.is_err());
    let snap = store.snapshot();
    assert_eq!(
        snap.status.expect("cached status").readiness,
        Readiness::Ready
    );
    assert_eq!(snap.phase, LoadPhase::Error);
    assert!(snap.error.is_some());
}

// ============================================
// Liveness probe
// ============================================

#[tokio::test(start_paused = true)]
async fn probe_needs_two_consecutive_failures_to_trip() {
    // Probe queue empty and dry-default unhealthy: every probe fails.
    let api = Arc::new(FakeCoach::default());
    let health = Arc::new(BackendHealth::new(&HealthConfig::default()));
    let probe = HealthProbe::spawn(api, health.clone(), &HealthConfig::default());

    // First probe fires immediately at t=0.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(health.probe_failures(), 1);
    assert!(!health.is_down());

    // Second probe at t=10.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(health.is_down());

    probe.shutdown();
}

#[tokio::test(start_paused = true)]
async fn one_successful_probe_recovers_the_backend() {
    let api = Arc::new(FakeCoach::default());
    api.probes.lock().unwrap().push_back(Err(transport()));
    api.probes.lock().unwrap().push_back(Err(transport()));
    api.probes_healthy_when_dry.store(true, Ordering::SeqCst);

    let health = Arc::new(BackendHealth::new(&HealthConfig::default()));
    let probe = HealthProbe::spawn(api, health.clone(), &HealthConfig::default());

    // Failures at t=0 and t=10 trip the flag.
    tokio::time::sleep(Duration::from_secs(11)).await;
    assert!(health.is_down());

    // The recovery cadence probes at t=20 and succeeds.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(!health.is_down());
    assert_eq!(health.probe_failures(), 0);

    probe.shutdown();
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_probing() {
    let api = Arc::new(FakeCoach::default());
    let health = Arc::new(BackendHealth::new(&HealthConfig::default()));
    let probe = HealthProbe::spawn(api, health.clone(), &HealthConfig::default());

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(health.probe_failures(), 1);
    probe.shutdown();

    // No further probes accumulate after shutdown.
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(health.probe_failures(), 1);
}
