//! Loose heuristic extraction over unconstrained prose.
//!
//! Nothing here understands the text. Matches come from separator search,
//! times from keyword hits, confidence from a keyword-to-score table and
//! factors from list markers. Every routine is best-effort and total: odd
//! input yields empty or fallback output, never an error.

use super::keywords::KeywordTables;
use crate::types::clamp_confidence;

// ---------------------------------------------------------------------------
// Match candidates
// ---------------------------------------------------------------------------

/// Two competing sides found on one line, plus an optional time line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCandidate {
    pub home: String,
    pub away: String,
    pub time: Option<String>,
}

impl MatchCandidate {
    /// "Home - Away", the form used in rendered messages.
    pub fn description(&self) -> String {
        format!("{} - {}", self.home, self.away)
    }
}

/// Scan lines for "A - B" style pairs and attach time lines to them.
///
/// Separators are tried in table order; the first one present on a line
/// must split it into exactly two non-empty sides. Only the first
/// `max_matches` candidates are kept. A line mentioning a time keyword or a
/// clock value becomes the time of the most recently opened candidate,
/// overwriting any earlier value.
pub fn parse_matches(text: &str, tables: &KeywordTables) -> Vec<MatchCandidate> {
    let mut matches: Vec<MatchCandidate> = Vec::new();
    // Index of the open candidate; None once the cap discards new ones.
    let mut current: Option<usize> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some((home, away)) = split_pair(line, tables) {
            if matches.len() < tables.max_matches {
                matches.push(MatchCandidate {
                    home,
                    away,
                    time: None,
                });
                current = Some(matches.len() - 1);
            } else {
                current = None;
            }
        }

        if is_time_line(line, tables) {
            if let Some(idx) = current {
                matches[idx].time = Some(line.to_string());
            }
        }
    }

    matches
}

fn split_pair(line: &str, tables: &KeywordTables) -> Option<(String, String)> {
    let body = strip_list_marker(line).unwrap_or(line);
    let sep = tables
        .match_separators
        .iter()
        .find(|sep| body.contains(sep.as_str()))?;

    let parts: Vec<&str> = body.split(sep.as_str()).collect();
    if parts.len() != 2 {
        return None;
    }

    let home = clean_side(parts[0]);
    let away = clean_side(parts[1]);
    if home.is_empty() || away.is_empty() {
        return None;
    }
    if home.chars().count() > tables.max_side_len || away.chars().count() > tables.max_side_len {
        return None;
    }
    Some((home, away))
}

fn clean_side(side: &str) -> String {
    side.trim()
        .trim_matches(|ch: char| ch == '*' || ch == '_' || ch.is_whitespace())
        .to_string()
}

fn is_time_line(line: &str, tables: &KeywordTables) -> bool {
    let lower = line.to_lowercase();
    tables
        .time_keywords
        .iter()
        .any(|kw| lower.contains(kw.as_str()))
        || contains_clock_time(line)
}

/// True if the line holds something shaped like `H:MM` or `HH:MM`.
fn contains_clock_time(line: &str) -> bool {
    let chars: Vec<char> = line.chars().collect();
    chars.iter().enumerate().any(|(i, ch)| {
        *ch == ':'
            && i > 0
            && chars[i - 1].is_ascii_digit()
            && chars.get(i + 1).is_some_and(|c| c.is_ascii_digit())
            && chars.get(i + 2).is_some_and(|c| c.is_ascii_digit())
    })
}

// ---------------------------------------------------------------------------
// Confidence scoring
// ---------------------------------------------------------------------------

/// Coarse sentiment-to-confidence proxy.
///
/// Base is the highest band score among phrases present (or the table
/// default). Each domain keyword present adds the bonus once; each
/// occurrence of a hedge word subtracts the penalty. Result is clamped to
/// the global confidence range.
pub fn score_confidence(text: &str, tables: &KeywordTables) -> u8 {
    let lower = text.to_lowercase();

    let base = tables
        .confidence_bands
        .iter()
        .flat_map(|band| band.phrases.iter())
        .filter(|p| lower.contains(p.phrase.as_str()))
        .map(|p| p.score)
        .max()
        .unwrap_or(tables.default_confidence);

    let bonus = tables
        .domain_keywords
        .iter()
        .filter(|kw| lower.contains(kw.as_str()))
        .count() as i64
        * tables.domain_bonus;

    let penalty = tables
        .hedging_keywords
        .iter()
        .map(|kw| count_word_occurrences(&lower, kw))
        .sum::<usize>() as i64
        * tables.hedging_penalty;

    clamp_confidence(base + bonus - penalty)
}

/// Count occurrences of `needle` bounded by non-alphanumeric characters.
fn count_word_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack
        .match_indices(needle)
        .filter(|(idx, _)| {
            let before = haystack[..*idx].chars().next_back();
            let after = haystack[idx + needle.len()..].chars().next();
            !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
        })
        .count()
}

// ---------------------------------------------------------------------------
// Key factors
// ---------------------------------------------------------------------------

/// Collect short list items as key factors, falling back to generic ones.
pub fn extract_key_factors(text: &str, tables: &KeywordTables) -> Vec<String> {
    let mut factors = Vec::new();

    for raw in text.lines() {
        let Some(body) = strip_list_marker(raw.trim()) else {
            continue;
        };
        let factor = body
            .trim_matches(|ch: char| ch == '*' || ch == '_' || ch.is_whitespace())
            .to_string();

        if !factor.is_empty() && factor.chars().count() < tables.max_factor_len {
            factors.push(factor);
        }
        if factors.len() >= tables.max_factors {
            break;
        }
    }

    if factors.is_empty() {
        return tables
            .fallback_factors
            .iter()
            .take(tables.max_factors)
            .cloned()
            .collect();
    }
    factors
}

/// If the line starts with a list marker, return the text after it.
///
/// Markers: `1.` style numbering, `•`, and `-` or `*` followed by
/// whitespace (so `**bold**` is not a bullet).
fn strip_list_marker(line: &str) -> Option<&str> {
    if let Some(rest) = line.strip_prefix('•') {
        return Some(rest.trim_start());
    }
    for marker in ['-', '*'] {
        if let Some(rest) = line.strip_prefix(marker) {
            if rest.starts_with(char::is_whitespace) {
                return Some(rest.trim_start());
            }
        }
    }

    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        // Digits are ASCII so the char count equals the byte offset.
        let rest = &line[digits..];
        if let Some(after) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return Some(after.trim_start());
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Bet selection
// ---------------------------------------------------------------------------

/// Map insight prose to a bet selection via the ordered rule table.
pub fn select_bet(text: &str, tables: &KeywordTables) -> Option<String> {
    matching_bets(text, tables).into_iter().next()
}

/// Selections of every rule the text triggers, in rule order.
pub fn matching_bets(text: &str, tables: &KeywordTables) -> Vec<String> {
    let lower = text.to_lowercase();
    tables
        .bet_rules
        .iter()
        .filter(|rule| rule.phrases.iter().any(|p| lower.contains(p.as_str())))
        .map(|rule| rule.selection.clone())
        .collect()
}

/// Bet-market keywords mentioned in the text, capitalised, at most three.
pub fn recommended_bets(text: &str, tables: &KeywordTables) -> Vec<String> {
    let lower = text.to_lowercase();
    let found: Vec<String> = tables
        .bet_market_keywords
        .iter()
        .filter(|kw| lower.contains(kw.as_str()))
        .map(|kw| capitalise(kw))
        .take(3)
        .collect();

    if found.is_empty() {
        tables.fallback_bets.clone()
    } else {
        found
    }
}

fn capitalise(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Cut text to `max` characters, appending "..." when shortened.
pub fn truncate_chars(text: &str, max: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(max).collect();
    format!("{}...", cut.trim_end())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
