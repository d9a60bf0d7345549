//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` (or the file named by `TIPSTER_CONFIG`) and
//! deserializes into strongly-typed structs. Secrets (bot token, API key)
//! are referenced by env-var name in the config and resolved at runtime.

use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use secrecy::Secret;
use serde::Deserialize;
use std::fs;

use crate::extract::KeywordTables;

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub bot: BotConfig,
    pub schedule: ScheduleConfig,
    pub llm: LlmConfig,
    pub dispatch: DispatchConfig,
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub keywords: KeywordTables,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BotConfig {
    pub name: String,
    pub telegram_token_env: String,
    pub channel_id_env: String,
    /// Env var holding the live-only flag ("true"/"1"/"yes").
    #[serde(default)]
    pub live_only_env: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleConfig {
    /// IANA timezone name, e.g. "Europe/Moscow".
    pub timezone: String,
    pub times: Vec<ScheduleTime>,
    /// Publish once immediately after startup.
    #[serde(default)]
    pub send_on_startup: bool,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleTime {
    pub hour: u32,
    pub minute: u32,
}

/// How live answers are turned into predictions.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// One prompt asking for literal `LABEL: value` lines.
    #[default]
    Strict,
    /// Matches, analysis and insights prompts scraped heuristically.
    Loose,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub enabled: bool,
    pub api_key_env: String,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    pub search_model: String,
    /// Model used for head-to-head analysis in loose mode.
    pub reasoning_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub mode: ExtractionMode,
}

/// Message layout for one publish run.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Header, one message per prediction, footer.
    #[default]
    Separate,
    /// Everything in a single message.
    Digest,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DispatchConfig {
    pub predictions_per_run: usize,
    #[serde(default)]
    pub mode: DispatchMode,
    /// Pause between messages in separate mode.
    #[serde(default = "default_pause_secs")]
    pub pause_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SupervisorConfig {
    pub max_restarts: u32,
    pub initial_backoff_secs: u64,
    pub max_backoff_secs: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_restarts: 5,
            initial_backoff_secs: 60,
            max_backoff_secs: 900,
        }
    }
}

fn default_llm_base_url() -> String {
    "https://api.perplexity.ai".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_pause_secs() -> u64 {
    2
}

/// Secrets and flags read from the environment at startup.
pub struct Secrets {
    pub telegram_token: Secret<String>,
    pub channel_id: String,
    /// `None` disables the text-generation integration.
    pub llm_api_key: Option<Secret<String>>,
    pub live_only: bool,
}

impl AppConfig {
    /// Path of the config file: `TIPSTER_CONFIG` if set, else `config.toml`.
    pub fn path() -> String {
        std::env::var("TIPSTER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config = Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would only fail later, at trigger time.
    pub fn validate(&self) -> Result<()> {
        self.timezone()?;

        if self.schedule.times.is_empty() {
            bail!("schedule.times must contain at least one entry");
        }
        for t in &self.schedule.times {
            if t.hour > 23 || t.minute > 59 {
                bail!("Invalid schedule time {:02}:{:02}", t.hour, t.minute);
            }
        }

        if self.dispatch.predictions_per_run == 0 {
            bail!("dispatch.predictions_per_run must be positive");
        }
        if self.llm.timeout_secs == 0 || self.dispatch.timeout_secs == 0 {
            bail!("Request timeouts must be positive");
        }
        if self.supervisor.initial_backoff_secs > self.supervisor.max_backoff_secs {
            bail!("supervisor.initial_backoff_secs exceeds max_backoff_secs");
        }

        self.keywords.validate().context("Invalid [keywords] section")?;
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.schedule
            .timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("Unknown timezone '{}': {e}", self.schedule.timezone))
    }

    /// Dashboard port, overridden by `PORT` when set and valid.
    pub fn dashboard_port(&self) -> u16 {
        std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(self.dashboard.port)
    }

    /// Resolve every secret referenced by the config.
    pub fn resolve_secrets(&self) -> Result<Secrets> {
        let telegram_token = Self::resolve_env(&self.bot.telegram_token_env)?;
        let channel_id = Self::resolve_env(&self.bot.channel_id_env)?;

        let llm_api_key = if self.llm.enabled {
            std::env::var(&self.llm.api_key_env)
                .ok()
                .filter(|k| !k.trim().is_empty())
                .map(Secret::new)
        } else {
            None
        };

        let live_only = self
            .bot
            .live_only_env
            .as_deref()
            .and_then(|env| std::env::var(env).ok())
            .map(|v| parse_flag(&v))
            .unwrap_or(false);

        Ok(Secrets {
            telegram_token: Secret::new(telegram_token),
            channel_id,
            llm_api_key,
            live_only,
        })
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
