//! Live prediction generator backed by a text-generation API.
//!
//! Strict mode asks for one answer in `LABEL: value` form and parses it
//! with [`parse_strict`]. Loose mode runs three prompts (today's matches,
//! a head-to-head analysis, betting insights) and scrapes each answer with
//! the keyword heuristics in [`crate::extract::loose`]. Any failure is
//! returned to the caller, which decides on the fallback.

use anyhow::{Context, Result};
use chrono::Utc;
use chrono_tz::Tz;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Arc;
use tracing::{debug, info};

use super::catalog::Catalog;
use crate::config::ExtractionMode;
use crate::extract::loose::{
    extract_key_factors, matching_bets, parse_matches, recommended_bets, score_confidence,
    truncate_chars,
};
use crate::extract::{parse_strict, ExtractionError, KeywordTables};
use crate::llm::TextGenerator;
use crate::types::{Prediction, PredictionDraft, PredictionSource, Sport};

/// Longest analysis kept from a loose-mode answer.
pub const ANALYSIS_MAX_CHARS: usize = 300;

/// League shown when a loose-mode answer names none we know.
pub const UNKNOWN_LEAGUE: &str = "Лига уточняется";

/// Models and mode for a [`LiveGenerator`].
#[derive(Debug, Clone)]
pub struct LiveSettings {
    pub mode: ExtractionMode,
    pub search_model: String,
    pub reasoning_model: String,
    /// Timezone used for "today" in prompts.
    pub timezone: Tz,
}

pub struct LiveGenerator {
    llm: Arc<dyn TextGenerator>,
    catalog: Arc<Catalog>,
    tables: Arc<KeywordTables>,
    settings: LiveSettings,
    rng: StdRng,
}

impl LiveGenerator {
    pub fn new(
        llm: Arc<dyn TextGenerator>,
        catalog: Arc<Catalog>,
        tables: Arc<KeywordTables>,
        settings: LiveSettings,
    ) -> Self {
        Self::with_rng(llm, catalog, tables, settings, StdRng::from_entropy())
    }

    pub fn with_seed(
        llm: Arc<dyn TextGenerator>,
        catalog: Arc<Catalog>,
        tables: Arc<KeywordTables>,
        settings: LiveSettings,
        seed: u64,
    ) -> Self {
        Self::with_rng(llm, catalog, tables, settings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        llm: Arc<dyn TextGenerator>,
        catalog: Arc<Catalog>,
        tables: Arc<KeywordTables>,
        settings: LiveSettings,
        rng: StdRng,
    ) -> Self {
        Self {
            llm,
            catalog,
            tables,
            settings,
            rng,
        }
    }

    pub fn mode(&self) -> ExtractionMode {
        self.settings.mode
    }

    pub fn provider(&self) -> String {
        self.llm.name()
    }

    /// One extracted prediction for `sport`.
    pub async fn generate(&mut self, sport: Sport) -> Result<Prediction> {
        let today = Utc::now()
            .with_timezone(&self.settings.timezone)
            .format("%Y-%m-%d")
            .to_string();

        let prediction = match self.settings.mode {
            ExtractionMode::Strict => self.generate_strict(sport, &today).await?,
            ExtractionMode::Loose => self.generate_loose(sport, &today).await?,
        };

        info!(
            sport = sport.key(),
            mode = ?self.settings.mode,
            prediction = %prediction,
            "Live prediction extracted"
        );
        Ok(prediction)
    }

    async fn generate_strict(&mut self, sport: Sport, today: &str) -> Result<Prediction> {
        let prompt = strict_prompt(sport, today);
        let response = self
            .llm
            .complete(&self.settings.search_model, &prompt)
            .await
            .context("Strict prediction request failed")?;

        let fields = parse_strict(&response)?;

        let parsed_sport = Sport::from_label(&fields.sport).unwrap_or(sport);
        if parsed_sport != sport {
            debug!(requested = sport.key(), answered = parsed_sport.key(), "Sport differs from request");
        }

        let odds = match fields.odds {
            Some(odds) => odds,
            None => self.random_odds(),
        };
        let confidence = fields
            .confidence
            .unwrap_or_else(|| i64::from(score_confidence(&fields.analysis, &self.tables)));
        let key_factors = if fields.key_factors.is_empty() {
            extract_key_factors(&response, &self.tables)
        } else {
            fields.key_factors
        };

        let prediction = Prediction::new(PredictionDraft {
            sport: parsed_sport,
            league: fields.league,
            match_description: fields.match_description,
            scheduled_time: fields.scheduled_time,
            bet_selection: fields.bet_selection,
            odds,
            confidence,
            analysis: fields.analysis,
            key_factors,
            source: PredictionSource::Extracted,
        })?;
        Ok(prediction)
    }

    async fn generate_loose(&mut self, sport: Sport, today: &str) -> Result<Prediction> {
        // 1. Today's matches.
        let matches_text = self
            .llm
            .complete(&self.settings.search_model, &matches_prompt(sport, today))
            .await
            .context("Match listing request failed")?;

        let candidates = parse_matches(&matches_text, &self.tables);
        debug!(sport = sport.key(), candidates = candidates.len(), "Match candidates parsed");
        let Some(candidate) = candidates.into_iter().next() else {
            return Err(ExtractionError::NoMatches.into());
        };

        // 2. Head-to-head analysis.
        let analysis_text = self
            .llm
            .complete(
                &self.settings.reasoning_model,
                &analysis_prompt(&candidate.home, &candidate.away),
            )
            .await
            .context("Match analysis request failed")?;

        let confidence = score_confidence(&analysis_text, &self.tables);
        let key_factors = extract_key_factors(&analysis_text, &self.tables);
        let analysis = truncate_chars(&analysis_text, ANALYSIS_MAX_CHARS);

        // 3. Betting insights.
        let match_description = candidate.description();
        let insights = self
            .llm
            .complete(&self.settings.reasoning_model, &insights_prompt(&match_description))
            .await
            .context("Betting insights request failed")?;

        let bet_selection = self.choose_bet(sport, &insights);
        let league = self
            .catalog
            .find_league(sport, &matches_text)
            .unwrap_or(UNKNOWN_LEAGUE)
            .to_string();
        let odds = self.random_odds();

        let prediction = Prediction::new(PredictionDraft {
            sport,
            league,
            match_description,
            scheduled_time: candidate.time,
            bet_selection,
            odds,
            confidence: i64::from(confidence),
            analysis,
            key_factors,
            source: PredictionSource::Extracted,
        })?;
        Ok(prediction)
    }

    /// Rule table first, then the first recommended market the sport offers,
    /// then the sport's first bet type.
    fn choose_bet(&self, sport: Sport, insights: &str) -> String {
        // Rule selections are sport-agnostic; keep only markets this sport offers.
        let offered = matching_bets(insights, &self.tables)
            .iter()
            .find_map(|bet| self.catalog.find_bet_type(sport, bet));
        if let Some(bet) = offered {
            return bet.to_string();
        }

        let markets = recommended_bets(insights, &self.tables);
        debug!(sport = sport.key(), markets = ?markets, "No bet rule matched");

        markets
            .iter()
            .find_map(|kw| self.catalog.find_bet_type(sport, kw))
            .or_else(|| self.catalog.table(sport).bet_types.first().copied())
            .unwrap_or_default()
            .to_string()
    }

    fn random_odds(&mut self) -> rust_decimal::Decimal {
        self.catalog
            .odds
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(rust_decimal::Decimal::TWO)
    }
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

fn strict_prompt(sport: Sport, today: &str) -> String {
    format!(
        "Найди один интересный матч ({sport}) на сегодня, {today}, и дай прогноз.\n\
         Ответь строго в формате, каждое поле с новой строки:\n\
         СПОРТ: {sport}\n\
         ЛИГА: <лига или турнир>\n\
         МАТЧ: <сторона 1> - <сторона 2>\n\
         ВРЕМЯ: <время начала по МСК>\n\
         ПРОГНОЗ: <ставка>\n\
         КОЭФФИЦИЕНТ: <десятичный коэффициент>\n\
         УВЕРЕННОСТЬ: <число от 45 до 95>%\n\
         АНАЛИЗ: <2-3 предложения в одну строку>\n\
         ФАКТОРЫ: <фактор 1>, <фактор 2>, <фактор 3>",
        sport = sport.display_name(),
    )
}

fn matches_prompt(sport: Sport, today: &str) -> String {
    match sport {
        Sport::Football => format!(
            "Какие футбольные матчи проходят сегодня {today}? Включи топ лиги: Премьер-лига, \
             Ла Лига, Серия А, Бундеслига, Лига Чемпионов. Укажи время матчей и коэффициенты \
             букмекеров если доступны."
        ),
        Sport::Basketball => format!(
            "Какие баскетбольные матчи НБА и Евролиги проходят сегодня {today}? \
             Укажи время и прогнозы экспертов."
        ),
        Sport::Tennis => format!(
            "Какие теннисные матчи ATP и WTA проходят сегодня {today}? Включи турниры и прогнозы."
        ),
        Sport::Hockey => format!(
            "Какие хоккейные матчи НХЛ и КХЛ проходят сегодня {today}? \
             Укажи время и статистику команд."
        ),
    }
}

fn analysis_prompt(home: &str, away: &str) -> String {
    format!(
        "Проанализируй противостояние между {home} и {away}:\n\
         1. Текущая форма (последние 5 матчей)\n\
         2. Статистика личных встреч\n\
         3. Ключевые игроки и травмы\n\
         4. Тактические особенности\n\
         5. Прогноз на матч с обоснованием\n\n\
         Дай профессиональный анализ как спортивный эксперт."
    )
}

fn insights_prompt(match_description: &str) -> String {
    format!(
        "Дай экспертный анализ для ставок на матч {match_description}:\n\
         1. Наиболее вероятные исходы с коэффициентами\n\
         2. Статистика голов/очков (тотал)\n\
         3. Специальные ставки (угловые, карточки)\n\
         4. Риски и рекомендации\n\n\
         Отвечай как профессиональный аналитик ставок."
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
