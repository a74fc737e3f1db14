//! HTTP client for the RepSet coach API
//!
//! Thin request/response wrapper: every trait method maps to one endpoint,
//! bodies are JSON, and non-2xx responses are converted into typed errors at
//! this boundary so nothing above it ever sees a raw HTTP failure.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::types::{ChatMessage, Session, SessionSummary, TodayStatus};

use super::page::Page;
use super::CoachApi;

/// Body for `POST /sessions`
#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
}

/// Body for `POST /sessions/{id}/messages`
#[derive(Serialize)]
struct SendMessageRequest<'a> {
    message: &'a str,
}

/// Response from `GET /health`
#[derive(Deserialize)]
struct HealthReply {
    status: String,
}

/// HTTP implementation of [`CoachApi`].
pub struct CoachClient {
    http: reqwest::Client,
    base_url: String,
    max_retries: usize,
}

impl CoachClient {
    /// Create a new client from configuration
    ///
    /// Returns an error if the configuration is invalid or missing the base
    /// URL.
    pub fn new(config: ApiConfig) -> Result<Self> {
        config.validate()?;

        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| Error::Config("api.base_url is required".to_string()))?
            .trim_end_matches('/')
            .to_string();

        // Build default headers
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = &config.api_token {
            let auth_value = format!("Bearer {}", token);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| Error::Config(format!("invalid api_token: {}", e)))?,
            );
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            max_retries: config.max_retries,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Issue one GET and return the raw body on 2xx.
    async fn get_text(&self, path: &str) -> Result<String> {
        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| Error::Transport(format!("HTTP request failed: {}", e)))?;
        read_body(response).await
    }

    /// GET with retry for transient failures
    ///
    /// Retries with exponential backoff; only used for idempotent reads.
    /// Mutations and the liveness probe are strictly single-shot.
    async fn get_text_with_retry(&self, path: &str) -> Result<String> {
        let mut last_error = None;
        let mut delay = Duration::from_millis(500);

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tracing::debug!(
                    "Retrying GET {} (attempt {}/{}), waiting {:?}",
                    path,
                    attempt + 1,
                    self.max_retries + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * 2, Duration::from_secs(30));
            }

            match self.get_text(path).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    if is_retryable(&e) {
                        tracing::warn!("Transient error on GET {}: {}", path, e);
                        last_error = Some(e);
                        continue;
                    } else {
                        return Err(e);
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Transport("max retries exceeded".to_string())))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let body = self.get_text_with_retry(path).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("HTTP request failed: {}", e)))?;
        let text = read_body(response).await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl CoachApi for CoachClient {
    async fn list_sessions(&self, page: Option<u32>) -> Result<Page<SessionSummary>> {
        let path = match page {
            Some(p) => format!("/sessions?page={}", p),
            None => "/sessions".to_string(),
        };
        let body = self.get_text_with_retry(&path).await?;
        Ok(Page::from_json(&body)?)
    }

    async fn create_session(&self, title: Option<&str>) -> Result<Session> {
        self.post_json("/sessions", &CreateSessionRequest { title })
            .await
    }

    async fn get_session(&self, id: i64) -> Result<Session> {
        self.get_json(&format!("/sessions/{}", id)).await
    }

    async fn delete_session(&self, id: i64) -> Result<()> {
        let response = self
            .http
            .delete(self.url(&format!("/sessions/{}", id)))
            .send()
            .await
            .map_err(|e| Error::Transport(format!("HTTP request failed: {}", e)))?;
        read_body(response).await?;
        Ok(())
    }

    async fn send_message(&self, session_id: i64, content: &str) -> Result<ChatMessage> {
        self.post_json(
            &format!("/sessions/{}/messages", session_id),
            &SendMessageRequest { message: content },
        )
        .await
    }

    async fn today(&self) -> Result<TodayStatus> {
        self.get_json("/today").await
    }

    async fn health(&self) -> Result<()> {
        let body = self.get_text("/health").await?;
        let reply: HealthReply = serde_json::from_str(&body)?;
        if reply.status == "healthy" {
            Ok(())
        } else {
            Err(Error::Unhealthy(reply.status))
        }
    }
}

/// Read the body, mapping non-2xx statuses to [`Error::Api`].
async fn read_body(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| Error::Transport(format!("failed to read response body: {}", e)))?;

    if status.is_success() {
        Ok(text)
    } else {
        Err(Error::Api {
            status: status.as_u16(),
            message: extract_message(&text),
        })
    }
}

/// Pull a human-readable message out of an error body.
///
/// The API uses `detail` for validation errors and `message` elsewhere; fall
/// back to the raw body, then to a generic string.
fn extract_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "message"] {
            if let Some(message) = value.get(key).and_then(|v| v.as_str()) {
                return message.to_string();
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "request failed".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Transient failures worth retrying: transport errors and 5xx responses.
fn is_retryable(error: &Error) -> bool {
    match error {
        Error::Transport(_) => true,
        Error::Api { status, .. } => *status >= 500,
        _ => false,
    }
}
