//! Telegram Bot API integration.
//!
//! `sendMessage` posts to the configured channel; `getMe` is a
//! connectivity check before each run and feeds the status endpoint.
//!
//! API docs: https://core.telegram.org/bots/api
//! Auth: bot token embedded in the URL path, `/bot{token}/{method}`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::types::TipsterError;

const BASE_URL: &str = "https://api.telegram.org";

/// Every message is sent with legacy Markdown parsing.
pub const PARSE_MODE: &str = "Markdown";

// ---------------------------------------------------------------------------
// Sink abstraction
// ---------------------------------------------------------------------------

/// Identity reported by `getMe`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotIdentity {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: String,
}

/// Destination for rendered messages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Post one message; returns the platform's message id.
    async fn send(&self, text: &str) -> Result<i64>;

    /// Who we are posting as.
    async fn identity(&self) -> Result<BotIdentity>;

    /// Channel identifier, for logs.
    fn channel(&self) -> String;
}

// ---------------------------------------------------------------------------
// API types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct TelegramClient {
    http: Client,
    token: Secret<String>,
    channel_id: String,
    base_url: String,
}

impl TelegramClient {
    pub fn new(token: Secret<String>, channel_id: String, timeout: Duration) -> Result<Self> {
        Self::with_base_url(token, channel_id, timeout, BASE_URL)
    }

    /// Point the client at a different API host (a local Bot API server, a test double).
    pub fn with_base_url(
        token: Secret<String>,
        channel_id: String,
        timeout: Duration,
        base_url: &str,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Telegram HTTP client")?;

        Ok(Self {
            http,
            token,
            channel_id,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.base_url, self.token.expose_secret())
    }

    fn dispatch_error(&self, message: impl Into<String>) -> anyhow::Error {
        TipsterError::Dispatch {
            channel: self.channel_id.clone(),
            message: message.into(),
        }
        .into()
    }

    /// Unwrap the `{ok, result}` envelope. Errors never carry the URL,
    /// which embeds the token.
    async fn read_envelope<T: DeserializeOwned + Send>(
        &self,
        method: &str,
        response: reqwest::Result<reqwest::Response>,
    ) -> Result<T> {
        let response = response.map_err(|e| {
            self.dispatch_error(format!("{method} request failed: {}", e.without_url()))
        })?;

        let status = response.status();
        let envelope: ApiResponse<T> = response.json().await.map_err(|e| {
            self.dispatch_error(format!(
                "{method} returned HTTP {status} with unreadable body: {}",
                e.without_url()
            ))
        })?;

        match envelope {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse {
                description,
                error_code,
                ..
            } => Err(self.dispatch_error(format!(
                "{method} failed ({}): {}",
                error_code.unwrap_or_else(|| i64::from(status.as_u16())),
                description.unwrap_or_else(|| "no description".to_string())
            ))),
        }
    }
}

#[async_trait]
impl MessageSink for TelegramClient {
    async fn send(&self, text: &str) -> Result<i64> {
        let request = SendMessageRequest {
            chat_id: &self.channel_id,
            text,
            parse_mode: PARSE_MODE,
        };

        let response = self
            .http
            .post(self.method_url("sendMessage"))
            .json(&request)
            .send()
            .await;

        let sent: SentMessage = self.read_envelope("sendMessage", response).await?;
        debug!(
            channel = %self.channel_id,
            message_id = sent.message_id,
            chars = text.chars().count(),
            "Message sent"
        );
        Ok(sent.message_id)
    }

    async fn identity(&self) -> Result<BotIdentity> {
        let response = self.http.get(self.method_url("getMe")).send().await;
        self.read_envelope("getMe", response).await
    }

    fn channel(&self) -> String {
        self.channel_id.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(base: &str) -> TelegramClient {
        TelegramClient::with_base_url(
            Secret::new("TEST".into()),
            "@tips".into(),
            Duration::from_secs(5),
            base,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_send_message() {
        let app = Router::new().route(
            "/botTEST/sendMessage",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["chat_id"], "@tips");
                assert_eq!(body["parse_mode"], "Markdown");
                assert_eq!(body["text"], "*привет*");
                Json(json!({ "ok": true, "result": { "message_id": 42, "chat": {} } }))
            }),
        );
        let base = serve(app).await;

        assert_eq!(client(&base).send("*привет*").await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_send_error_description() {
        let app = Router::new().route(
            "/botTEST/sendMessage",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "ok": false,
                        "error_code": 400,
                        "description": "Bad Request: chat not found"
                    })),
                )
            }),
        );
        let base = serve(app).await;

        let err = client(&base).send("x").await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("chat not found"), "{msg}");
        assert!(msg.contains("@tips"), "{msg}");
        assert!(matches!(
            err.downcast_ref::<TipsterError>(),
            Some(TipsterError::Dispatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_me() {
        let app = Router::new().route(
            "/botTEST/getMe",
            get(|| async {
                Json(json!({
                    "ok": true,
                    "result": { "id": 7, "is_bot": true, "first_name": "Tipster", "username": "tipster_bot" }
                }))
            }),
        );
        let base = serve(app).await;

        let me = client(&base).identity().await.unwrap();
        assert_eq!(me.id, 7);
        assert_eq!(me.username.as_deref(), Some("tipster_bot"));
    }

    #[tokio::test]
    async fn test_unreachable_host_hides_token() {
        // Nothing listens on port 9 locally.
        let c = TelegramClient::with_base_url(
            Secret::new("SECRET-TOKEN".into()),
            "@tips".into(),
            Duration::from_secs(2),
            "http://127.0.0.1:9",
        )
        .unwrap();

        let err = c.send("x").await.unwrap_err();
        assert!(!format!("{err:#}").contains("SECRET-TOKEN"));
    }

    #[test]
    fn test_method_url() {
        let c = client("http://host/");
        assert_eq!(c.method_url("getMe"), "http://host/botTEST/getMe");
        assert_eq!(c.channel(), "@tips");
    }
}
