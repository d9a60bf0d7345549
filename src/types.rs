//! Shared types for the TIPSTER bot.
//!
//! `Prediction` is the single record produced by both generators and
//! consumed by the composer. It is built fresh on every schedule tick,
//! never mutated after construction, and dropped once rendered.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Confidence bounds
// ---------------------------------------------------------------------------

/// Lower clamp applied to every prediction's confidence.
pub const MIN_CONFIDENCE: u8 = 45;

/// Upper clamp applied to every prediction's confidence.
pub const MAX_CONFIDENCE: u8 = 95;

/// Clamp a raw confidence score into `[MIN_CONFIDENCE, MAX_CONFIDENCE]`.
pub fn clamp_confidence(raw: i64) -> u8 {
    raw.clamp(MIN_CONFIDENCE as i64, MAX_CONFIDENCE as i64) as u8
}

// ---------------------------------------------------------------------------
// Sport
// ---------------------------------------------------------------------------

/// The closed set of sports the bot covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    Football,
    Basketball,
    Tennis,
    Hockey,
}

impl Sport {
    pub const ALL: [Sport; 4] = [
        Sport::Football,
        Sport::Basketball,
        Sport::Tennis,
        Sport::Hockey,
    ];

    /// Order in which the live path is tried when composing a batch.
    pub const PRIORITY: [Sport; 4] = [
        Sport::Football,
        Sport::Basketball,
        Sport::Tennis,
        Sport::Hockey,
    ];

    /// Stable lowercase key, used in config and logs.
    pub fn key(&self) -> &'static str {
        match self {
            Sport::Football => "football",
            Sport::Basketball => "basketball",
            Sport::Tennis => "tennis",
            Sport::Hockey => "hockey",
        }
    }

    /// Localized name shown in channel messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Sport::Football => "Футбол",
            Sport::Basketball => "Баскетбол",
            Sport::Tennis => "Теннис",
            Sport::Hockey => "Хоккей",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Sport::Football => "⚽",
            Sport::Basketball => "🏀",
            Sport::Tennis => "🎾",
            Sport::Hockey => "🏒",
        }
    }

    /// Tennis is played between two players rather than two teams.
    pub fn is_individual(&self) -> bool {
        matches!(self, Sport::Tennis)
    }

    /// Resolve a free-text label (key or localized name, any case).
    pub fn from_label(label: &str) -> Option<Sport> {
        let needle = label.trim().to_lowercase();
        Sport::ALL.into_iter().find(|s| {
            needle == s.key() || needle == s.display_name().to_lowercase()
        })
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ---------------------------------------------------------------------------
// Prediction
// ---------------------------------------------------------------------------

/// Where a prediction's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionSource {
    /// Built entirely from local tables.
    Synthetic,
    /// Scraped from a text-generation response.
    Extracted,
}

impl fmt::Display for PredictionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictionSource::Synthetic => write!(f, "synthetic"),
            PredictionSource::Extracted => write!(f, "extracted"),
        }
    }
}

/// One betting recommendation, ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub sport: Sport,
    pub league: String,
    pub match_description: String,
    /// `None` when the time is unknown; the renderer fills in a display value.
    pub scheduled_time: Option<String>,
    pub bet_selection: String,
    pub odds: Decimal,
    /// Always within `[MIN_CONFIDENCE, MAX_CONFIDENCE]`.
    pub confidence: u8,
    pub analysis: String,
    pub key_factors: Vec<String>,
    pub source: PredictionSource,
}

/// Field values used to build a [`Prediction`].
#[derive(Debug, Clone)]
pub struct PredictionDraft {
    pub sport: Sport,
    pub league: String,
    pub match_description: String,
    pub scheduled_time: Option<String>,
    pub bet_selection: String,
    pub odds: Decimal,
    pub confidence: i64,
    pub analysis: String,
    pub key_factors: Vec<String>,
    pub source: PredictionSource,
}

impl Prediction {
    /// Build a prediction, clamping the confidence and rejecting an empty
    /// match description.
    pub fn new(draft: PredictionDraft) -> Result<Self, TipsterError> {
        let match_description = draft.match_description.trim().to_string();
        if match_description.is_empty() {
            return Err(TipsterError::InvalidPrediction(format!(
                "{} prediction has no match description",
                draft.sport.key()
            )));
        }

        Ok(Self {
            sport: draft.sport,
            league: draft.league,
            match_description,
            scheduled_time: draft.scheduled_time,
            bet_selection: draft.bet_selection,
            odds: draft.odds,
            confidence: clamp_confidence(draft.confidence),
            analysis: draft.analysis,
            key_factors: draft.key_factors,
            source: draft.source,
        })
    }

    /// Helper to build a test/sample prediction with sensible defaults.
    #[cfg(test)]
    pub fn sample() -> Self {
        use rust_decimal_macros::dec;

        Prediction {
            sport: Sport::Football,
            league: "Премьер-лига".to_string(),
            match_description: "Арсенал - Челси".to_string(),
            scheduled_time: Some("20:00 МСК".to_string()),
            bet_selection: "Победа хозяев".to_string(),
            odds: dec!(1.85),
            confidence: 82,
            analysis: "Хозяева в отличной форме.".to_string(),
            key_factors: vec![
                "Домашнее преимущество".to_string(),
                "Текущая форма команды".to_string(),
                "Турнирная мотивация".to_string(),
            ],
            source: PredictionSource::Synthetic,
        }
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} | {} @ {} ({}%, {})",
            self.sport.key(),
            self.match_description,
            self.bet_selection,
            self.odds,
            self.confidence,
            self.source,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for TIPSTER.
#[derive(Debug, thiserror::Error)]
pub enum TipsterError {
    #[error("Invalid prediction: {0}")]
    InvalidPrediction(String),

    #[error("Text generation error ({model}): {message}")]
    TextGeneration { model: String, message: String },

    #[error("Dispatch error ({channel}): {message}")]
    Dispatch { channel: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
