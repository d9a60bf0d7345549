//! Text-generation integration.
//!
//! Defines the `TextGenerator` trait and the Perplexity-compatible chat
//! completions client. Callers see a single opaque string per request;
//! turning it into prediction fields is the job of `crate::extract`.

pub mod perplexity;

use anyhow::Result;
use async_trait::async_trait;

/// Abstraction over a remote text-generation API.
///
/// One call, one answer. Implementors do not retry: a failure is reported
/// to the caller, which falls back to synthetic data.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send `prompt` to `model` and return the raw answer text.
    async fn complete(&self, model: &str, prompt: &str) -> Result<String>;

    /// Provider name for logs and the status endpoint.
    fn name(&self) -> String;
}
