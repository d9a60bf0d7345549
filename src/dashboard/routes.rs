//! Diagnostic API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::engine::publisher::{Publisher, RunOutcome, RunReport};
use crate::engine::scheduler::ScheduleStatus;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

pub struct DashboardState {
    pub service: String,
    pub publisher: Arc<Publisher>,
    pub schedule: Arc<ScheduleStatus>,
    pub started_at: DateTime<Utc>,
}

impl DashboardState {
    pub fn new(service: String, publisher: Arc<Publisher>, schedule: Arc<ScheduleStatus>) -> Self {
        Self {
            service,
            publisher,
            schedule,
            started_at: Utc::now(),
        }
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
    pub version: &'static str,
    pub timestamp: String,
    pub uptime_secs: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub bot_status: &'static str,
    pub bot_username: Option<String>,
    pub bot_name: Option<String>,
    pub error: Option<String>,
    pub scheduler_running: bool,
    pub jobs_count: usize,
    pub schedule_times: Vec<String>,
    pub timezone: String,
    pub text_generation_enabled: bool,
    pub text_generation_provider: Option<String>,
    pub live_only: bool,
    pub run_in_progress: bool,
    pub runs_started: u64,
    pub last_run: Option<RunReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestRunResponse {
    pub status: &'static str,
    pub message: String,
    /// Absent when the run task itself died.
    pub report: Option<RunReport>,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET / and GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let now = Utc::now();
    Json(HealthResponse {
        status: "ok",
        service: state.service.clone(),
        version: env!("CARGO_PKG_VERSION"),
        timestamp: now.with_timezone(&state.publisher.settings().timezone).to_rfc3339(),
        uptime_secs: (now - state.started_at).num_seconds(),
    })
}

/// GET /status
///
/// 500 when the bot cannot reach Telegram; the rest of the body is still filled.
pub async fn get_status(State(state): State<AppState>) -> (StatusCode, Json<StatusResponse>) {
    let publisher = &state.publisher;
    let identity = publisher.sink().identity().await;

    let (code, bot_status, username, name, error) = match identity {
        Ok(me) => (StatusCode::OK, "active", me.username, Some(me.first_name), None),
        Err(e) => {
            tracing::error!(error = %e, "Bot status check failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "error", None, None, Some(e.to_string()))
        }
    };

    let body = StatusResponse {
        bot_status,
        bot_username: username,
        bot_name: name,
        error,
        scheduler_running: state.schedule.is_running(),
        jobs_count: state.schedule.job_count(),
        schedule_times: state.schedule.times.clone(),
        timezone: state.schedule.timezone.clone(),
        text_generation_enabled: publisher.live_enabled(),
        text_generation_provider: publisher.provider(),
        live_only: publisher.live_only(),
        run_in_progress: publisher.is_running(),
        runs_started: publisher.runs_started(),
        last_run: publisher.last_run().await,
    };

    (code, Json(body))
}

/// POST /test
///
/// Runs one publish immediately and waits for it. The run executes in its
/// own task, so a client that disconnects does not cancel it.
pub async fn trigger_test(State(state): State<AppState>) -> (StatusCode, Json<TestRunResponse>) {
    let publisher = Arc::clone(&state.publisher);
    let report = match tokio::spawn(async move { publisher.publish("manual").await }).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(error = %e, "Manual publish task failed");
            let body = TestRunResponse {
                status: "error",
                message: format!("publish task failed: {e}"),
                report: None,
            };
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(body));
        }
    };

    let (code, status, message) = match report.outcome {
        RunOutcome::Published => (StatusCode::OK, "success", "Test predictions sent successfully".to_string()),
        RunOutcome::Unavailable => (StatusCode::OK, "success", "No live data, unavailability notice sent".to_string()),
        RunOutcome::Skipped => (StatusCode::CONFLICT, "skipped", "A publish run is already in progress".to_string()),
        RunOutcome::Failed => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "error",
            report.error.clone().unwrap_or_else(|| "publish run failed".to_string()),
        ),
    };

    (code, Json(TestRunResponse { status, message, report: Some(report) }))
}
