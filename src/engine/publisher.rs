//! One publish run: connectivity check, composition, rendering, dispatch.
//!
//! At most one run is in flight. A trigger that arrives while a run holds
//! the pipeline lock is skipped, not queued. A run that fails after the
//! connectivity check sends one best-effort error notice.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::composer::render::average_confidence;
use crate::composer::{Composer, Digest, Renderer};
use crate::config::{AppConfig, DispatchMode};
use crate::telegram::MessageSink;
use crate::types::{Prediction, PredictionSource};

// ---------------------------------------------------------------------------
// Settings and reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PublisherSettings {
    pub predictions_per_run: usize,
    pub mode: DispatchMode,
    /// Pause between consecutive messages in separate mode.
    pub pause: Duration,
    pub timezone: Tz,
}

impl PublisherSettings {
    pub fn from_config(cfg: &AppConfig, timezone: Tz) -> Self {
        Self {
            predictions_per_run: cfg.dispatch.predictions_per_run,
            mode: cfg.dispatch.mode,
            pause: Duration::from_secs(cfg.dispatch.pause_secs),
            timezone,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Predictions were delivered.
    Published,
    /// Live-only run with nothing to publish; the notice was sent.
    Unavailable,
    Failed,
    /// Another run was in progress.
    Skipped,
}

/// Summary of one publish run, kept for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub trigger: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: RunOutcome,
    pub predictions: usize,
    pub extracted: usize,
    pub messages_sent: usize,
    pub messages_failed: usize,
    pub average_confidence: u32,
    pub error: Option<String>,
}

impl RunReport {
    fn begin(run_id: String, trigger: &str) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            trigger: trigger.to_string(),
            started_at: now,
            finished_at: now,
            outcome: RunOutcome::Failed,
            predictions: 0,
            extracted: 0,
            messages_sent: 0,
            messages_failed: 0,
            average_confidence: 0,
            error: None,
        }
    }

    fn record_predictions(&mut self, predictions: &[Prediction]) {
        self.predictions = predictions.len();
        self.extracted = predictions
            .iter()
            .filter(|p| p.source == PredictionSource::Extracted)
            .count();
        self.average_confidence = average_confidence(predictions);
    }
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

struct Pipeline {
    composer: Composer,
    renderer: Renderer,
}

pub struct Publisher {
    pipeline: Mutex<Pipeline>,
    sink: Arc<dyn MessageSink>,
    settings: PublisherSettings,
    live_enabled: bool,
    live_only: bool,
    provider: Option<String>,
    running: AtomicBool,
    runs_started: AtomicU64,
    last_run: RwLock<Option<RunReport>>,
}

impl Publisher {
    pub fn new(
        composer: Composer,
        renderer: Renderer,
        sink: Arc<dyn MessageSink>,
        settings: PublisherSettings,
    ) -> Self {
        Self {
            live_enabled: composer.live_enabled(),
            live_only: composer.live_only(),
            provider: composer.provider(),
            pipeline: Mutex::new(Pipeline { composer, renderer }),
            sink,
            settings,
            running: AtomicBool::new(false),
            runs_started: AtomicU64::new(0),
            last_run: RwLock::new(None),
        }
    }

    pub fn sink(&self) -> Arc<dyn MessageSink> {
        Arc::clone(&self.sink)
    }

    pub fn settings(&self) -> &PublisherSettings {
        &self.settings
    }

    pub fn live_enabled(&self) -> bool {
        self.live_enabled
    }

    pub fn live_only(&self) -> bool {
        self.live_only
    }

    pub fn provider(&self) -> Option<String> {
        self.provider.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn runs_started(&self) -> u64 {
        self.runs_started.load(Ordering::SeqCst)
    }

    /// Report of the most recent run that was not skipped.
    pub async fn last_run(&self) -> Option<RunReport> {
        self.last_run.read().await.clone()
    }

    /// Execute one publish run. Never fails: the outcome is in the report.
    pub async fn publish(&self, trigger: &str) -> RunReport {
        let run_id = Uuid::new_v4().to_string();

        let Ok(mut pipeline) = self.pipeline.try_lock() else {
            warn!(run_id = %run_id, trigger, "Publish run already in progress, skipping trigger");
            let mut report = RunReport::begin(run_id, trigger);
            report.outcome = RunOutcome::Skipped;
            return report;
        };

        self.runs_started.fetch_add(1, Ordering::SeqCst);

        let span = info_span!("publish", run_id = %run_id, trigger);
        let mut report = RunReport::begin(run_id, trigger);
        let mut guard = RunGuard::start(self, &report);

        self.execute(&mut pipeline, &mut report)
            .instrument(span)
            .await;

        report.finished_at = Utc::now();
        *self.last_run.write().await = Some(report.clone());
        guard.finish();
        report
    }

    async fn execute(&self, pipeline: &mut Pipeline, report: &mut RunReport) {
        info!(
            channel = %self.sink.channel(),
            count = self.settings.predictions_per_run,
            mode = ?self.settings.mode,
            "Publish run starting"
        );

        // Without a working bot there is nobody to send an error notice.
        match self.sink.identity().await {
            Ok(me) => info!(
                bot_id = me.id,
                username = me.username.as_deref().unwrap_or("-"),
                "Bot connectivity confirmed"
            ),
            Err(e) => {
                error!(error = %e, "Bot connectivity check failed, abandoning run");
                report.error = Some(e.to_string());
                return;
            }
        }

        match self.deliver(pipeline, report).await {
            Ok(outcome) => {
                report.outcome = outcome;
                info!(
                    outcome = ?outcome,
                    predictions = report.predictions,
                    extracted = report.extracted,
                    sent = report.messages_sent,
                    failed = report.messages_failed,
                    avg_confidence = report.average_confidence,
                    "Publish run complete"
                );
            }
            Err(e) => {
                error!(error = %e, sent = report.messages_sent, "Publish run failed");
                report.outcome = RunOutcome::Failed;
                report.error = Some(e.to_string());
                self.notify_failure(&pipeline.renderer, &e.to_string()).await;
            }
        }
    }

    async fn deliver(&self, pipeline: &mut Pipeline, report: &mut RunReport) -> Result<RunOutcome> {
        let digest = pipeline
            .composer
            .compose(self.settings.predictions_per_run)
            .await;
        let now = Utc::now().with_timezone(&self.settings.timezone);

        let predictions = match digest {
            Digest::Unavailable => {
                let text = pipeline.renderer.render_unavailable(&now);
                self.sink
                    .send(&text)
                    .await
                    .context("Failed to send unavailability notice")?;
                report.messages_sent += 1;
                return Ok(RunOutcome::Unavailable);
            }
            Digest::Predictions(p) => p,
        };
        report.record_predictions(&predictions);

        match self.settings.mode {
            DispatchMode::Digest => {
                let text = pipeline.renderer.render_digest(&predictions, &now);
                self.sink.send(&text).await.context("Failed to send digest")?;
                report.messages_sent += 1;
            }
            DispatchMode::Separate => {
                let header = pipeline.renderer.render_header(predictions.len(), &now);
                self.sink.send(&header).await.context("Failed to send header")?;
                report.messages_sent += 1;

                for (i, p) in predictions.iter().enumerate() {
                    self.pause().await;
                    let text = pipeline.renderer.render_single(p, i + 1, &now);
                    match self.sink.send(&text).await {
                        Ok(message_id) => {
                            report.messages_sent += 1;
                            info!(index = i + 1, sport = p.sport.key(), message_id, "Prediction sent");
                        }
                        Err(e) => {
                            report.messages_failed += 1;
                            warn!(index = i + 1, sport = p.sport.key(), error = %e, "Prediction send failed");
                        }
                    }
                }

                if !predictions.is_empty() && report.messages_failed == predictions.len() {
                    bail!("none of {} predictions could be delivered", predictions.len());
                }

                self.pause().await;
                let footer = pipeline.renderer.render_footer(&predictions);
                self.sink.send(&footer).await.context("Failed to send footer")?;
                report.messages_sent += 1;
            }
        }

        Ok(RunOutcome::Published)
    }

    async fn notify_failure(&self, renderer: &Renderer, error: &str) {
        let now = Utc::now().with_timezone(&self.settings.timezone);
        let text = renderer.render_error(error, &now);
        if let Err(e) = self.sink.send(&text).await {
            warn!(error = %e, "Error notice could not be sent");
        }
    }

    async fn pause(&self) {
        if !self.settings.pause.is_zero() {
            tokio::time::sleep(self.settings.pause).await;
        }
    }
}

/// Holds the in-progress flag for one run.
///
/// Dropping the guard clears the flag. If the run future is dropped before
/// `finish`, the run is recorded as cancelled.
struct RunGuard<'a> {
    publisher: &'a Publisher,
    pending: Option<RunReport>,
}

impl<'a> RunGuard<'a> {
    fn start(publisher: &'a Publisher, report: &RunReport) -> Self {
        publisher.running.store(true, Ordering::SeqCst);
        Self {
            publisher,
            pending: Some(report.clone()),
        }
    }

    fn finish(&mut self) {
        self.pending = None;
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if let Some(mut report) = self.pending.take() {
            warn!(run_id = %report.run_id, trigger = %report.trigger, "Publish run cancelled before completion");
            report.finished_at = Utc::now();
            report.outcome = RunOutcome::Failed;
            report.error = Some("publish run cancelled".to_string());
            if let Ok(mut last) = self.publisher.last_run.try_write() {
                *last = Some(report);
            }
        }
        self.publisher.running.store(false, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
