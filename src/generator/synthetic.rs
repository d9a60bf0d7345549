//! Synthetic prediction generator.
//!
//! Builds complete predictions from the catalog with uniform random
//! choice. No I/O, never fails; this is the fallback of last resort.
//! Seed it with [`SyntheticGenerator::with_seed`] for reproducible output.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use super::catalog::Catalog;
use crate::types::{clamp_confidence, Prediction, PredictionSource, Sport};

/// Confidence range drawn for synthetic records (a sub-range of the global clamp).
pub const SYNTHETIC_CONFIDENCE: std::ops::RangeInclusive<i64> = 75..=95;

/// Number of distinct key factors attached to a synthetic record.
pub const SYNTHETIC_FACTORS: usize = 3;

pub struct SyntheticGenerator {
    catalog: Arc<Catalog>,
    rng: StdRng,
}

impl SyntheticGenerator {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic generator: equal seeds yield equal sequences.
    pub fn with_seed(catalog: Arc<Catalog>, seed: u64) -> Self {
        Self {
            catalog,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// A prediction for a uniformly chosen sport.
    pub fn generate(&mut self) -> Prediction {
        let sport = *Sport::ALL.choose(&mut self.rng).unwrap_or(&Sport::Football);
        self.generate_for(sport)
    }

    /// A prediction for the given sport.
    pub fn generate_for(&mut self, sport: Sport) -> Prediction {
        let catalog = Arc::clone(&self.catalog);
        let table = catalog.table(sport);
        let rng = &mut self.rng;

        let league = table.leagues.choose(rng).copied().unwrap_or_default();
        let bet_type = table.bet_types.choose(rng).copied().unwrap_or_default();

        // Two distinct sides, drawn without replacement.
        let sides: Vec<&str> = table.roster.choose_multiple(rng, 2).copied().collect();
        let match_description = match sides.as_slice() {
            [home, away] => format!("{home} - {away}"),
            _ => "Команда А - Команда Б".to_string(),
        };

        let odds = catalog.odds.choose(rng).copied().unwrap_or_default();
        let confidence = rng.gen_range(SYNTHETIC_CONFIDENCE);
        let analysis = compose_analysis(&catalog, sport, rng);
        let key_factors = catalog
            .factor_pool
            .choose_multiple(rng, SYNTHETIC_FACTORS)
            .map(|f| f.to_string())
            .collect();

        let prediction = Prediction {
            sport,
            league: league.to_string(),
            match_description,
            scheduled_time: None,
            bet_selection: bet_type.to_string(),
            odds,
            confidence: clamp_confidence(confidence),
            analysis,
            key_factors,
            source: PredictionSource::Synthetic,
        };

        debug!(prediction = %prediction, "Synthetic prediction generated");
        prediction
    }

    /// `count` predictions, avoiding repeated sports until all are used.
    pub fn generate_batch(&mut self, count: usize) -> Vec<Prediction> {
        let mut used: HashSet<Sport> = HashSet::new();
        let mut out = Vec::with_capacity(count);

        for _ in 0..count {
            let unused: Vec<Sport> = Sport::ALL
                .into_iter()
                .filter(|s| !used.contains(s))
                .collect();
            let pool: &[Sport] = if unused.is_empty() { &Sport::ALL } else { &unused };
            let sport = *pool.choose(&mut self.rng).unwrap_or(&Sport::Football);

            used.insert(sport);
            out.push(self.generate_for(sport));
        }

        out
    }
}

/// Opener + sport-specific body, followed by an independently chosen
/// closing sentence.
pub fn compose_analysis<R: Rng + ?Sized>(catalog: &Catalog, sport: Sport, rng: &mut R) -> String {
    let opener = catalog.analysis_openers.choose(rng).copied().unwrap_or_default();
    let body = catalog
        .table(sport)
        .analysis_bodies
        .choose(rng)
        .copied()
        .unwrap_or("высокую вероятность данного исхода.");
    let closing = catalog.closing_sentences.choose(rng).copied().unwrap_or_default();

    format!("{opener} {body} {closing}").trim().to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
