//! Keyword tables driving the loose extractor.
//!
//! The tables are plain data so scoring policy can be tuned from the
//! `[keywords]` config section without touching the line-scanning code.
//! Defaults target Russian-language sports commentary.

use serde::{Deserialize, Serialize};

/// A phrase that, when present, proposes a confidence value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPhrase {
    pub phrase: String,
    pub score: i64,
}

/// A named group of scored phrases (very high / high / medium / low).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBand {
    pub label: String,
    pub phrases: Vec<ScoredPhrase>,
}

/// Maps insight phrases to a bet selection label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetRule {
    pub phrases: Vec<String>,
    pub selection: String,
}

/// All tunable tables used by [`crate::extract::loose`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordTables {
    pub confidence_bands: Vec<ConfidenceBand>,
    /// Base value when no band phrase matches.
    pub default_confidence: i64,
    /// Phrases indicating substantive analysis; each one present adds a bonus.
    pub domain_keywords: Vec<String>,
    pub domain_bonus: i64,
    /// Whole-word hedges; every occurrence subtracts a penalty.
    pub hedging_keywords: Vec<String>,
    pub hedging_penalty: i64,
    /// Lines containing any of these are taken as a match time.
    pub time_keywords: Vec<String>,
    /// Separators between the two sides of a match, tried in order.
    pub match_separators: Vec<String>,
    pub max_matches: usize,
    /// Longest accepted side name; longer segments are prose, not teams.
    pub max_side_len: usize,
    pub max_factors: usize,
    pub max_factor_len: usize,
    pub fallback_factors: Vec<String>,
    pub bet_rules: Vec<BetRule>,
    pub bet_market_keywords: Vec<String>,
    pub fallback_bets: Vec<String>,
}

fn band(label: &str, phrases: &[(&str, i64)]) -> ConfidenceBand {
    ConfidenceBand {
        label: label.to_string(),
        phrases: phrases
            .iter()
            .map(|(p, s)| ScoredPhrase {
                phrase: p.to_string(),
                score: *s,
            })
            .collect(),
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for KeywordTables {
    fn default() -> Self {
        Self {
            confidence_bands: vec![
                band(
                    "very_high",
                    &[
                        ("без сомнений", 95),
                        ("очевидн", 90),
                        ("явный фаворит", 88),
                        ("уверенн", 86),
                    ],
                ),
                band(
                    "high",
                    &[
                        ("высокая вероятность", 84),
                        ("явный", 82),
                        ("скорее всего", 80),
                        ("фаворит", 78),
                        ("вероятно", 75),
                    ],
                ),
                band(
                    "medium",
                    &[
                        ("хорошие шансы", 72),
                        ("возможно", 65),
                        ("может быть", 62),
                        ("равные шансы", 60),
                    ],
                ),
                band(
                    "low",
                    &[
                        ("темная лошадка", 58),
                        ("непредсказуем", 52),
                        ("сложно предсказать", 50),
                        ("лотерея", 45),
                    ],
                ),
            ],
            default_confidence: 75,
            domain_keywords: strings(&[
                "статистик",
                "форм",
                "личных встреч",
                "травм",
                "мотивац",
                "тактик",
                "коэффициент",
                "букмекер",
                "эксперт",
                "анализ",
            ]),
            domain_bonus: 2,
            hedging_keywords: strings(&["но", "однако", "возможно", "может быть", "неясно"]),
            hedging_penalty: 3,
            time_keywords: strings(&["время", "начало", "мск", "kick-off"]),
            match_separators: strings(&[" - ", " vs ", " против "]),
            max_matches: 5,
            max_side_len: 60,
            max_factors: 4,
            max_factor_len: 100,
            fallback_factors: strings(&[
                "Статистический анализ показателей",
                "Анализ текущей формы команд",
                "Мотивационные факторы",
                "Тактические особенности игры",
            ]),
            bet_rules: vec![
                BetRule {
                    phrases: strings(&["победа хозяев", "домашняя команда"]),
                    selection: "Победа хозяев".to_string(),
                },
                BetRule {
                    phrases: strings(&["гости", "выездная"]),
                    selection: "Победа гостей".to_string(),
                },
                BetRule {
                    phrases: strings(&["тотал больше", "много голов"]),
                    selection: "Тотал больше 2.5".to_string(),
                },
                BetRule {
                    phrases: strings(&["тотал меньше", "мало голов"]),
                    selection: "Тотал меньше 2.5".to_string(),
                },
            ],
            bet_market_keywords: strings(&[
                "победа", "ничья", "тотал", "фора", "голы", "очки", "угловые", "карточки",
                "пенальти", "автоголы",
            ]),
            fallback_bets: strings(&["Основной исход", "Тотал"]),
        }
    }
}

impl KeywordTables {
    /// Sanity-check tunables that would make the scanners degenerate.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.match_separators.is_empty() {
            anyhow::bail!("keywords.match_separators must not be empty");
        }
        if self.match_separators.iter().any(|s| s.trim().is_empty()) {
            anyhow::bail!("keywords.match_separators must contain visible characters");
        }
        if self.max_factors == 0 || self.max_matches == 0 {
            anyhow::bail!("keywords.max_factors and keywords.max_matches must be positive");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
