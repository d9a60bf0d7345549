//! Strict `LABEL: value` extraction.
//!
//! Used when the prompt asked the model to answer with literal field
//! labels. One line-oriented pass: each line with a colon is split at the
//! first colon, the left side names the field, the right side is the value.
//! Values never span lines and later duplicates overwrite earlier ones.

use rust_decimal::Decimal;
use std::str::FromStr;

use super::ExtractionError;

/// Field labels recognised in strict mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Sport,
    League,
    Match,
    Time,
    Prediction,
    Odds,
    Confidence,
    Analysis,
    Factors,
}

impl Field {
    fn from_label(label: &str) -> Option<Field> {
        match label {
            "СПОРТ" | "SPORT" => Some(Field::Sport),
            "ЛИГА" | "ТУРНИР" | "LEAGUE" => Some(Field::League),
            "МАТЧ" | "MATCH" => Some(Field::Match),
            "ВРЕМЯ" | "TIME" => Some(Field::Time),
            "ПРОГНОЗ" | "PREDICTION" => Some(Field::Prediction),
            "КОЭФФИЦИЕНТ" | "ODDS" => Some(Field::Odds),
            "УВЕРЕННОСТЬ" | "CONFIDENCE" => Some(Field::Confidence),
            "АНАЛИЗ" | "ANALYSIS" => Some(Field::Analysis),
            "ФАКТОРЫ" | "FACTORS" => Some(Field::Factors),
            _ => None,
        }
    }
}

/// Fields scraped from a strict-format response.
///
/// The five required fields are always non-empty; the rest are optional and
/// filled in by the caller when absent.
#[derive(Debug, Clone, PartialEq)]
pub struct StrictFields {
    pub sport: String,
    pub league: String,
    pub match_description: String,
    pub scheduled_time: Option<String>,
    pub bet_selection: String,
    pub odds: Option<Decimal>,
    pub confidence: Option<i64>,
    pub analysis: String,
    pub key_factors: Vec<String>,
}

#[derive(Default)]
struct Collected {
    sport: Option<String>,
    league: Option<String>,
    match_description: Option<String>,
    scheduled_time: Option<String>,
    bet_selection: Option<String>,
    odds: Option<Decimal>,
    confidence: Option<i64>,
    analysis: Option<String>,
    key_factors: Vec<String>,
}

/// Parse a strict-format response.
///
/// Fails with [`ExtractionError::MissingFields`] unless sport, league,
/// match, prediction and analysis were all present and non-empty.
pub fn parse_strict(text: &str) -> Result<StrictFields, ExtractionError> {
    if text.trim().is_empty() {
        return Err(ExtractionError::EmptyResponse);
    }

    let mut c = Collected::default();

    for line in text.lines() {
        let Some((raw_label, raw_value)) = line.split_once(':') else {
            continue;
        };

        let label = clean_label(raw_label);
        let Some(field) = Field::from_label(&label) else {
            continue;
        };

        let value = clean_value(raw_value);
        if value.is_empty() {
            continue;
        }

        match field {
            Field::Sport => c.sport = Some(value),
            Field::League => c.league = Some(value),
            Field::Match => c.match_description = Some(value),
            Field::Time => c.scheduled_time = Some(value),
            Field::Prediction => c.bet_selection = Some(value),
            Field::Odds => c.odds = parse_odds(&value),
            Field::Confidence => c.confidence = parse_confidence(&value),
            Field::Analysis => c.analysis = Some(value),
            Field::Factors => {
                c.key_factors = value
                    .split(',')
                    .map(|f| f.trim().to_string())
                    .filter(|f| !f.is_empty())
                    .collect();
            }
        }
    }

    let mut missing = Vec::new();
    if c.sport.is_none() {
        missing.push("sport");
    }
    if c.league.is_none() {
        missing.push("league");
    }
    if c.match_description.is_none() {
        missing.push("match");
    }
    if c.bet_selection.is_none() {
        missing.push("prediction");
    }
    if c.analysis.is_none() {
        missing.push("analysis");
    }

    match (c.sport, c.league, c.match_description, c.bet_selection, c.analysis) {
        (Some(sport), Some(league), Some(match_description), Some(bet_selection), Some(analysis)) => {
            Ok(StrictFields {
                sport,
                league,
                match_description,
                scheduled_time: c.scheduled_time,
                bet_selection,
                odds: c.odds,
                confidence: c.confidence,
                analysis,
                key_factors: c.key_factors,
            })
        }
        _ => Err(ExtractionError::MissingFields(missing)),
    }
}

/// Upper-case and strip markdown decoration from a label.
fn clean_label(raw: &str) -> String {
    raw.trim()
        .trim_matches(|ch: char| ch == '*' || ch == '#' || ch == '_' || ch.is_whitespace())
        .to_uppercase()
}

fn clean_value(raw: &str) -> String {
    raw.trim()
        .trim_matches(|ch: char| ch == '*' || ch == '_' || ch.is_whitespace())
        .to_string()
}

/// "1,85" and "1.85" both parse; anything else is dropped.
fn parse_odds(value: &str) -> Option<Decimal> {
    let normalised = value.replace(',', ".");
    let token = normalised.split_whitespace().next()?;
    Decimal::from_str(token).ok().filter(|d| *d > Decimal::ONE)
}

/// Strip a trailing `%` and parse as an integer.
fn parse_confidence(value: &str) -> Option<i64> {
    value.trim().trim_end_matches('%').trim().parse::<i64>().ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const COMPLETE: &str = "СПОРТ: Футбол\nЛИГА: Премьер-лига\nМАТЧ: A - B\nПРОГНОЗ: Победа хозяев\nАНАЛИЗ: текст";

    #[test]
    fn test_parse_complete_record() {
        let f = parse_strict(COMPLETE).unwrap();
        assert_eq!(f.sport, "Футбол");
        assert_eq!(f.league, "Премьер-лига");
        assert_eq!(f.match_description, "A - B");
        assert_eq!(f.bet_selection, "Победа хозяев");
        assert_eq!(f.analysis, "текст");
        assert_eq!(f.scheduled_time, None);
        assert_eq!(f.odds, None);
        assert_eq!(f.confidence, None);
        assert!(f.key_factors.is_empty());
    }

    #[test]
    fn test_missing_analysis_fails() {
        let text = "СПОРТ: Футбол\nЛИГА: Премьер-лига\nМАТЧ: A - B\nПРОГНОЗ: Победа хозяев";
        match parse_strict(text) {
            Err(ExtractionError::MissingFields(fields)) => assert_eq!(fields, vec!["analysis"]),
            other => panic!("expected MissingFields, got {other:?}"),
        }
    }

    #[test]
    fn test_each_required_field_is_required() {
        let lines: Vec<&str> = COMPLETE.lines().collect();
        for skip in 0..lines.len() {
            let text: Vec<&str> = lines
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != skip)
                .map(|(_, l)| *l)
                .collect();
            assert!(
                parse_strict(&text.join("\n")).is_err(),
                "dropping line {skip} should fail"
            );
        }
    }

    #[test]
    fn test_optional_fields() {
        let text = format!(
            "{COMPLETE}\nВРЕМЯ: 20:00 МСК\nКОЭФФИЦИЕНТ: 1,85\nУВЕРЕННОСТЬ: 87%\nФАКТОРЫ: Форма, Травмы , , Мотивация"
        );
        let f = parse_strict(&text).unwrap();
        // Only the first colon splits, so the clock survives intact.
        assert_eq!(f.scheduled_time.as_deref(), Some("20:00 МСК"));
        assert_eq!(f.odds, Some(dec!(1.85)));
        assert_eq!(f.confidence, Some(87));
        assert_eq!(f.key_factors, vec!["Форма", "Травмы", "Мотивация"]);
    }

    #[test]
    fn test_english_labels_and_case() {
        let text = "sport: Tennis\nLeague: ATP\nmatch: X vs Y\nPrediction: Player 1\nanalysis: good serve\nodds: 2.35";
        let f = parse_strict(text).unwrap();
        assert_eq!(f.sport, "Tennis");
        assert_eq!(f.match_description, "X vs Y");
        assert_eq!(f.odds, Some(dec!(2.35)));
    }

    #[test]
    fn test_markdown_bold_labels() {
        let text = "**СПОРТ:** Хоккей\n**ЛИГА:** КХЛ\n**МАТЧ:** СКА - ЦСКА\n**ПРОГНОЗ:** Тотал больше 5.5\n**АНАЛИЗ:** Атакующий хоккей";
        let f = parse_strict(text).unwrap();
        assert_eq!(f.sport, "Хоккей");
        assert_eq!(f.bet_selection, "Тотал больше 5.5");
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let text = COMPLETE.replace("ЛИГА: Премьер-лига", "ЛИГА:   ");
        assert!(matches!(
            parse_strict(&text),
            Err(ExtractionError::MissingFields(f)) if f == vec!["league"]
        ));
    }

    #[test]
    fn test_unparseable_optionals_are_dropped() {
        let text = format!("{COMPLETE}\nКОЭФФИЦИЕНТ: высокий\nУВЕРЕННОСТЬ: много");
        let f = parse_strict(&text).unwrap();
        assert_eq!(f.odds, None);
        assert_eq!(f.confidence, None);
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(parse_strict("  \n "), Err(ExtractionError::EmptyResponse)));
    }

    #[test]
    fn test_later_duplicate_overwrites() {
        let text = format!("{COMPLETE}\nАНАЛИЗ: второй");
        assert_eq!(parse_strict(&text).unwrap().analysis, "второй");
    }
}
