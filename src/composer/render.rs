//! Telegram message rendering.
//!
//! Produces legacy-Markdown text for the header, per-prediction, footer,
//! digest, unavailability and error messages. Gaps in a prediction are
//! filled here, at render time: a missing time gets a display slot, short
//! factor lists are topped up from the shared pool and a placeholder
//! analysis is replaced by a generated sentence. Text that came from
//! outside is escaped.

use chrono::DateTime;
use chrono_tz::Tz;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fmt::Write as _;
use std::sync::Arc;

use crate::generator::catalog::Catalog;
use crate::generator::synthetic::compose_analysis;
use crate::types::Prediction;

/// Factor lists shorter than this are topped up.
pub const MIN_FACTORS: usize = 3;

/// Longest error text quoted in an error notification.
pub const ERROR_CODE_MAX_CHARS: usize = 100;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━";
const SEPARATOR: &str = "───────────────────";

/// Escape the characters legacy Telegram Markdown treats as markup.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Star rating shown under each prediction.
pub fn rating(confidence: u8) -> &'static str {
    match confidence {
        90.. => "🌟🌟🌟 ТОПОВЫЙ",
        80..=89 => "🌟🌟 СИЛЬНЫЙ",
        _ => "🌟 СРЕДНИЙ",
    }
}

pub fn confidence_emoji(confidence: u8) -> &'static str {
    match confidence {
        95.. => "🔥",
        85..=94 => "🎯",
        75..=84 => "📈",
        _ => "⚡",
    }
}

/// An analysis with nothing worth showing.
fn is_placeholder(analysis: &str) -> bool {
    let trimmed = analysis.trim();
    !trimmed.chars().any(char::is_alphanumeric) || trimmed.to_lowercase().contains("недоступен")
}

/// Display values for one prediction after render-time fallbacks.
struct Filled {
    time: String,
    analysis: String,
    factors: Vec<String>,
}

pub struct Renderer {
    catalog: Arc<Catalog>,
    rng: StdRng,
    live_enabled: bool,
}

impl Renderer {
    pub fn new(catalog: Arc<Catalog>, live_enabled: bool) -> Self {
        Self {
            catalog,
            rng: StdRng::from_entropy(),
            live_enabled,
        }
    }

    pub fn with_seed(catalog: Arc<Catalog>, live_enabled: bool, seed: u64) -> Self {
        Self {
            catalog,
            rng: StdRng::seed_from_u64(seed),
            live_enabled,
        }
    }

    fn fill(&mut self, p: &Prediction) -> Filled {
        let time = match &p.scheduled_time {
            Some(t) if !t.trim().is_empty() => t.clone(),
            _ => self
                .catalog
                .display_times
                .choose(&mut self.rng)
                .copied()
                .unwrap_or("уточняется")
                .to_string(),
        };

        let analysis = if is_placeholder(&p.analysis) {
            compose_analysis(&self.catalog, p.sport, &mut self.rng)
        } else {
            p.analysis.clone()
        };

        let mut factors: Vec<String> = p
            .key_factors
            .iter()
            .filter(|f| !f.trim().is_empty())
            .cloned()
            .collect();
        if factors.len() < MIN_FACTORS {
            let pool = &self.catalog.factor_pool;
            for extra in pool.choose_multiple(&mut self.rng, pool.len()) {
                if factors.len() >= MIN_FACTORS {
                    break;
                }
                if !factors.iter().any(|f| f == extra) {
                    factors.push(extra.to_string());
                }
            }
        }

        Filled {
            time,
            analysis,
            factors,
        }
    }

    /// Body shared by single and digest messages.
    fn prediction_block(&mut self, p: &Prediction, index: usize) -> String {
        let filled = self.fill(p);
        let conf_emoji = confidence_emoji(p.confidence);
        let mut out = String::new();

        let _ = writeln!(out, "*{} ПРОГНОЗ #{index}* {conf_emoji}", p.sport.emoji());
        let _ = writeln!(
            out,
            "🏟️ *{}* • {}",
            p.sport.display_name(),
            escape_markdown(&p.league)
        );
        let _ = writeln!(out, "⚔️ *Матч:* {}", escape_markdown(&p.match_description));
        let _ = writeln!(out, "🕐 Время: {}", escape_markdown(&filled.time));
        let _ = writeln!(out, "📈 *Прогноз:* {}", escape_markdown(&p.bet_selection));
        let _ = writeln!(out, "💰 *Коэффициент:* {}", p.odds);
        let _ = writeln!(out, "{conf_emoji} *Уверенность:* {}%", p.confidence);
        let _ = writeln!(out, "⭐ *Рейтинг:* {}", rating(p.confidence));
        out.push('\n');

        let _ = writeln!(out, "📋 *Экспертный анализ:*");
        let _ = writeln!(out, "{}", escape_markdown(&filled.analysis));
        out.push('\n');

        let _ = writeln!(out, "🔑 *Ключевые факторы:*");
        for (i, factor) in filled.factors.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, escape_markdown(factor));
        }

        out.trim_end().to_string()
    }

    fn source_line(&self) -> &'static str {
        if self.live_enabled {
            "🤖 *Источник:* Perplexity AI + экспертный анализ"
        } else {
            "🤖 *Источник:* Алгоритмический анализ"
        }
    }

    /// One prediction as a standalone message.
    pub fn render_single(&mut self, p: &Prediction, index: usize, now: &DateTime<Tz>) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", date_line(now));
        let _ = writeln!(out, "{RULE}\n");
        out.push_str(&self.prediction_block(p, index));
        let _ = write!(out, "\n\n{RULE}\n{}\n", self.source_line());
        out.push_str("⚠️ _Помните: ставки связаны с рисками_");
        out
    }

    /// Every prediction in one message.
    pub fn render_digest(&mut self, predictions: &[Prediction], now: &DateTime<Tz>) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "🏆 *ЭКСПЕРТНЫЕ СПОРТИВНЫЕ ПРОГНОЗЫ* 🏆");
        let _ = writeln!(out, "{}\n", date_line(now));
        let _ = writeln!(out, "{RULE}\n");

        for (i, p) in predictions.iter().enumerate() {
            out.push_str(&self.prediction_block(p, i + 1));
            if i + 1 < predictions.len() {
                let _ = write!(out, "\n\n{SEPARATOR}\n\n");
            }
        }

        let _ = write!(out, "\n\n{RULE}\n");
        let _ = writeln!(out, "{}", self.source_line());
        let _ = writeln!(out, "⚠️ *Важно:* Ставки связаны с рисками. Играйте ответственно!");
        out.push_str("🍀 *Удачных ставок!*");
        out
    }

    /// Opening message of a separate-mode run.
    pub fn render_header(&self, count: usize, now: &DateTime<Tz>) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "🔥 *ЭКСПЕРТНЫЕ СПОРТИВНЫЕ ПРОГНОЗЫ* 🔥");
        let _ = writeln!(out, "{}\n", date_line(now));
        let _ = writeln!(out, "🎯 *Прогнозов сегодня:* {count}");
        let _ = writeln!(out, "{}", self.source_line());
        let _ = writeln!(out, "{RULE}\n");
        out.push_str("💡 _Каждый прогноз придёт отдельным сообщением_");
        out
    }

    /// Closing message of a separate-mode run.
    pub fn render_footer(&self, predictions: &[Prediction]) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "🎉 *ВСЕ ПРОГНОЗЫ ОТПРАВЛЕНЫ!* 🎉\n");
        let _ = writeln!(out, "📊 *Итого:* {}", predictions.len());
        let _ = writeln!(out, "🎯 *Средняя уверенность:* {}%", average_confidence(predictions));
        let _ = writeln!(out, "{}\n", self.source_line());
        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(out, "⚠️ *Важно:* Играйте ответственно!");
        out.push_str("🍀 *Удачных ставок!*");
        out
    }

    /// Sent in live-only mode when no live data could be produced.
    pub fn render_unavailable(&self, now: &DateTime<Tz>) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "📭 *ПРОГНОЗЫ ВРЕМЕННО НЕДОСТУПНЫ*\n");
        let _ = writeln!(out, "Актуальные данные о матчах сейчас недоступны.");
        let _ = writeln!(out, "Следующая попытка будет по расписанию.\n");
        out.push_str(&date_line(now));
        out
    }

    /// Best-effort notice after a failed run.
    pub fn render_error(&self, error: &str, now: &DateTime<Tz>) -> String {
        let code: String = error.chars().take(ERROR_CODE_MAX_CHARS).collect();
        let mut out = String::new();
        let _ = writeln!(out, "🚨 *ТЕХНИЧЕСКИЕ ПРОБЛЕМЫ*\n");
        let _ = writeln!(out, "К сожалению, произошла ошибка при генерации прогнозов.");
        let _ = writeln!(out, "Мы работаем над устранением проблемы.\n");
        let _ = writeln!(out, "⏰ {}", date_line(now));
        let _ = write!(out, "🔧 *Код ошибки:* {}", escape_markdown(&code));
        out
    }
}

fn date_line(now: &DateTime<Tz>) -> String {
    format!("📅 {} | 🕘 {}", now.format("%d.%m.%Y"), now.format("%H:%M %Z"))
}

/// Integer mean confidence; 0 for an empty list.
pub fn average_confidence(predictions: &[Prediction]) -> u32 {
    if predictions.is_empty() {
        return 0;
    }
    let total: u32 = predictions.iter().map(|p| u32::from(p.confidence)).sum();
    total / predictions.len() as u32
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
