//! repset - terminal client for the RepSet coaching service
//!
//! Exercises the client core end-to-end against a live backend: session
//! management, coach chat, today's training status, and backend health.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Config: $XDG_CONFIG_HOME/repset/config.toml (~/.config/repset/config.toml)
//! - Logs: $XDG_STATE_HOME/repset/repset.log (~/.local/state/repset/repset.log)

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};

use repset_core::{
    BackendHealth, ChatMessage, CoachApi, CoachClient, Config, HealthProbe, MessageRole,
    SessionStore, TodayStore,
};

#[derive(Parser)]
#[command(name = "repset")]
#[command(about = "Talk to the RepSet coaching backend")]
#[command(version)]
struct Args {
    /// Override the API base URL from configuration
    #[arg(long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage coach chat sessions
    Sessions {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Send one message to a session and print the coach's reply
    Chat {
        /// Session id
        id: i64,
        /// Message text
        message: String,
    },
    /// Show today's training status
    Today,
    /// Check backend health once
    Health,
    /// Run the periodic liveness probe until interrupted
    Watch,
}

#[derive(Subcommand)]
enum SessionAction {
    /// List sessions
    List,
    /// Show one session with its messages
    Show {
        /// Session id
        id: i64,
    },
    /// Create a session
    New {
        /// Optional session title
        #[arg(long)]
        title: Option<String>,
    },
    /// Delete a session
    Delete {
        /// Session id
        id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load().context("failed to load configuration")?;
    if let Some(base_url) = args.base_url {
        config.api.base_url = Some(base_url);
    }
    config.validate().context("invalid configuration")?;

    // Initialize logging
    let _log_guard =
        repset_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!("repset CLI starting");

    let api: Arc<dyn CoachApi> = Arc::new(
        CoachClient::new(config.api.clone()).context("failed to build the API client")?,
    );
    let health = Arc::new(BackendHealth::new(&config.health));

    match args.command {
        Command::Sessions { action } => {
            let store = SessionStore::new(api, health);
            run_session_action(&store, action).await
        }
        Command::Chat { id, message } => {
            let store = SessionStore::new(api, health);
            chat(&store, id, &message).await
        }
        Command::Today => {
            let store = TodayStore::new(api, health);
            let status = store.refresh().await.context("failed to fetch today")?;
            println!("{}: {}", status.date, status.readiness.as_str());
            match status.planned_workout {
                Some(workout) if status.completed => println!("  {} (done)", workout),
                Some(workout) => println!("  planned: {}", workout),
                None => println!("  nothing planned"),
            }
            Ok(())
        }
        Command::Health => match api.health().await {
            Ok(()) => {
                println!("backend healthy");
                Ok(())
            }
            Err(e) => Err(e).context("backend health check failed"),
        },
        Command::Watch => watch(api, health, &config).await,
    }
}

async fn run_session_action(store: &SessionStore, action: SessionAction) -> Result<()> {
    match action {
        SessionAction::List => {
            let sessions = store.fetch_list().await.context("failed to list sessions")?;
            if sessions.is_empty() {
                println!("no sessions");
                return Ok(());
            }
            for session in sessions {
                println!(
                    "{:>6}  {}  ({} messages)",
                    session.id,
                    session.title.as_deref().unwrap_or("(untitled)"),
                    session.message_count
                );
            }
            Ok(())
        }
        SessionAction::Show { id } => {
            let session = store.fetch_one(id).await.context("failed to fetch session")?;
            println!(
                "#{} {}",
                session.id,
                session.title.as_deref().unwrap_or("(untitled)")
            );
            for message in &session.messages {
                print_message(message);
            }
            Ok(())
        }
        SessionAction::New { title } => {
            let session = store
                .create(title.as_deref())
                .await
                .context("failed to create session")?;
            println!("created session {}", session.id);
            Ok(())
        }
        SessionAction::Delete { id } => {
            store.remove(id).await.context("failed to delete session")?;
            println!("deleted session {}", id);
            Ok(())
        }
    }
}

/// Open the session, send one message, print the coach's reply.
async fn chat(store: &SessionStore, id: i64, message: &str) -> Result<()> {
    store.fetch_one(id).await.context("failed to open session")?;
    store
        .send_message(id, message)
        .await
        .context("failed to send message")?;

    let snapshot = store.snapshot();
    let reply = snapshot
        .active
        .as_ref()
        .and_then(|s| s.messages.iter().rev().find(|m| m.role == MessageRole::Coach));
    match reply {
        Some(reply) => print_message(reply),
        None => println!("(no reply)"),
    }
    Ok(())
}

/// Subscribe to the shared down flag and report transitions while the probe
/// runs.
async fn watch(api: Arc<dyn CoachApi>, health: Arc<BackendHealth>, config: &Config) -> Result<()> {
    let probe = HealthProbe::spawn(api, health.clone(), &config.health);
    let mut down = health.subscribe();

    println!(
        "probing every {}s, Ctrl-C to stop",
        config.health.probe_interval_secs
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = down.changed() => {
                if changed.is_err() {
                    break;
                }
                if *down.borrow_and_update() {
                    println!(
                        "backend DOWN ({} consecutive probe failures)",
                        health.probe_failures()
                    );
                } else {
                    println!("backend recovered");
                }
            }
        }
    }

    probe.shutdown();
    tracing::info!("repset watch shutting down");
    Ok(())
}

fn print_message(message: &ChatMessage) {
    let when = message.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M");
    println!("[{}] {:>5}: {}", when, message.role.as_str(), message.content);
}
