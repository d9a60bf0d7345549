//! Prediction composition.
//!
//! Merges the live and synthetic generators into the list one publish run
//! sends. Live records are preferred; a failed live item is replaced by a
//! synthetic record for the same sport, and the list is padded to the
//! requested size. In live-only mode nothing synthetic is ever added.

pub mod render;

pub use render::Renderer;

use tracing::{info, warn};

use crate::generator::{LiveGenerator, SyntheticGenerator};
use crate::types::{Prediction, PredictionSource, Sport};

/// Outcome of one composition.
#[derive(Debug, Clone, PartialEq)]
pub enum Digest {
    Predictions(Vec<Prediction>),
    /// Live-only mode and no live record could be produced.
    Unavailable,
}

impl Digest {
    pub fn len(&self) -> usize {
        match self {
            Digest::Predictions(p) => p.len(),
            Digest::Unavailable => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct Composer {
    live: Option<LiveGenerator>,
    synthetic: SyntheticGenerator,
    live_only: bool,
}

impl Composer {
    /// Live-only without a live generator degrades to synthetic-only.
    pub fn new(live: Option<LiveGenerator>, synthetic: SyntheticGenerator, live_only: bool) -> Self {
        let live_only = if live_only && live.is_none() {
            warn!("Live-only mode requested without a text-generation key; using synthetic data");
            false
        } else {
            live_only
        };

        Self {
            live,
            synthetic,
            live_only,
        }
    }

    pub fn live_enabled(&self) -> bool {
        self.live.is_some()
    }

    pub fn live_only(&self) -> bool {
        self.live_only
    }

    /// Provider name of the live generator, if any.
    pub fn provider(&self) -> Option<String> {
        self.live.as_ref().map(|l| l.provider())
    }

    /// Produce up to `n` predictions (exactly `n` unless live-only).
    pub async fn compose(&mut self, n: usize) -> Digest {
        let Some(live) = self.live.as_mut() else {
            let batch = self.synthetic.generate_batch(n);
            info!(count = batch.len(), "Composed synthetic predictions");
            return Digest::Predictions(batch);
        };

        let mut predictions = Vec::with_capacity(n);
        for sport in sports_for(n) {
            match live.generate(sport).await {
                Ok(p) => predictions.push(p),
                Err(e) => {
                    warn!(sport = sport.key(), error = %e, "Live prediction failed");
                    if !self.live_only {
                        predictions.push(self.synthetic.generate_for(sport));
                    }
                }
            }
        }

        if self.live_only {
            if predictions.is_empty() {
                warn!("No live predictions available");
                return Digest::Unavailable;
            }
        } else if predictions.len() < n {
            let needed = n - predictions.len();
            predictions.extend(self.synthetic.generate_batch(needed));
        }

        let extracted = predictions
            .iter()
            .filter(|p| p.source == PredictionSource::Extracted)
            .count();
        info!(
            count = predictions.len(),
            extracted,
            synthetic = predictions.len() - extracted,
            "Composed predictions"
        );
        Digest::Predictions(predictions)
    }
}

/// Sports asked of the live generator, in priority order.
pub fn sports_for(n: usize) -> Vec<Sport> {
    Sport::PRIORITY.into_iter().take(n).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
