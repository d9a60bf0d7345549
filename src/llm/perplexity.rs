//! Perplexity chat completions client.
//!
//! Any OpenAI-compatible `/chat/completions` endpoint works; the base URL
//! comes from the `[llm]` config section. One attempt per call, bounded by
//! the configured timeout.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use super::TextGenerator;
use crate::config::LlmConfig;
use crate::types::TipsterError;

const SYSTEM_PROMPT: &str =
    "Ты спортивный аналитик. Отвечай по-русски, точно и по делу, без лишних вступлений.";

// ---------------------------------------------------------------------------
// API types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChatMessage>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct PerplexityClient {
    http: Client,
    api_key: Secret<String>,
    endpoint: String,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    total_calls: AtomicU64,
    failed_calls: AtomicU64,
}

impl PerplexityClient {
    pub fn new(api_key: Secret<String>, cfg: &LlmConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("Failed to build Perplexity HTTP client")?;

        Ok(Self {
            http,
            api_key,
            endpoint: format!("{}/chat/completions", cfg.base_url.trim_end_matches('/')),
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
            top_p: cfg.top_p,
            total_calls: AtomicU64::new(0),
            failed_calls: AtomicU64::new(0),
        })
    }

    fn build_request(&self, model: &str, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
        }
    }

    async fn call(&self, model: &str, prompt: &str) -> Result<String> {
        let request = self.build_request(model, prompt);

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Perplexity request failed (model={model})"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TipsterError::TextGeneration {
                model: model.to_string(),
                message: format!("HTTP {status}: {body}"),
            }
            .into());
        }

        let body: ChatResponse = response
            .json()
            .await
            .context("Failed to parse Perplexity response")?;

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .map(|m| m.content)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(TipsterError::TextGeneration {
                model: model.to_string(),
                message: "response carried no content".to_string(),
            }
            .into());
        }

        Ok(text)
    }

    /// Total number of API calls made.
    pub fn total_calls(&self) -> u64 {
        self.total_calls.load(Ordering::Relaxed)
    }

    /// Calls that ended in an error of any kind.
    pub fn failed_calls(&self) -> u64 {
        self.failed_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TextGenerator for PerplexityClient {
    async fn complete(&self, model: &str, prompt: &str) -> Result<String> {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        debug!(model, prompt_chars = prompt.chars().count(), "Requesting completion");

        match self.call(model, prompt).await {
            Ok(text) => {
                debug!(model, response_chars = text.chars().count(), "Completion received");
                Ok(text)
            }
            Err(e) => {
                self.failed_calls.fetch_add(1, Ordering::Relaxed);
                warn!(model, error = %e, "Text generation failed");
                Err(e)
            }
        }
    }

    fn name(&self) -> String {
        "perplexity".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionMode;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    fn config(base_url: &str) -> LlmConfig {
        LlmConfig {
            enabled: true,
            api_key_env: "UNUSED".into(),
            base_url: base_url.into(),
            search_model: "sonar".into(),
            reasoning_model: "sonar-reasoning".into(),
            max_tokens: 500,
            temperature: 0.2,
            top_p: 0.9,
            timeout_secs: 5,
            mode: ExtractionMode::Strict,
        }
    }

    /// Serve `app` on an ephemeral port and return its base URL.
    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_request_shape() {
        let client = PerplexityClient::new(Secret::new("k".into()), &config("http://x/")).unwrap();
        assert_eq!(client.endpoint, "http://x/chat/completions");

        let value = serde_json::to_value(client.build_request("sonar", "привет")).unwrap();
        assert_eq!(value["model"], "sonar");
        assert_eq!(value["max_tokens"], 500);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "привет");
        assert!(value.get("top_p").is_some());
        assert!(value.get("temperature").is_some());
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let app = Router::new().route(
            "/chat/completions",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["model"], "sonar");
                Json(json!({
                    "choices": [
                        { "message": { "role": "assistant", "content": "СПОРТ: Футбол" } },
                        { "message": { "role": "assistant", "content": "ignored" } }
                    ]
                }))
            }),
        );
        let base = serve(app).await;
        let client = PerplexityClient::new(Secret::new("k".into()), &config(&base)).unwrap();

        let text = client.complete("sonar", "prompt").await.unwrap();
        assert_eq!(text, "СПОРТ: Футбол");
        assert_eq!(client.total_calls(), 1);
        assert_eq!(client.failed_calls(), 0);
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let app = Router::new().route(
            "/chat/completions",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let base = serve(app).await;
        let client = PerplexityClient::new(Secret::new("k".into()), &config(&base)).unwrap();

        let err = client.complete("sonar", "prompt").await.unwrap_err();
        assert!(err.to_string().contains("429"), "{err}");
        assert_eq!(client.failed_calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_choices_is_error() {
        let app = Router::new().route(
            "/chat/completions",
            post(|| async { Json(json!({ "choices": [] })) }),
        );
        let base = serve(app).await;
        let client = PerplexityClient::new(Secret::new("k".into()), &config(&base)).unwrap();

        assert!(client.complete("sonar", "prompt").await.is_err());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_error() {
        let app = Router::new().route("/chat/completions", post(|| async { "not json" }));
        let base = serve(app).await;
        let client = PerplexityClient::new(Secret::new("k".into()), &config(&base)).unwrap();

        assert!(client.complete("sonar", "prompt").await.is_err());
    }

    #[test]
    fn test_name() {
        let client = PerplexityClient::new(Secret::new("k".into()), &config("http://x")).unwrap();
        assert_eq!(client.name(), "perplexity");
    }
}
