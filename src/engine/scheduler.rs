//! Cron triggers for the configured daily publish times.
//!
//! One job per `[[schedule.times]]` entry, evaluated in the configured
//! timezone. Each job calls `Publisher::publish`; the publisher itself
//! skips a trigger that overlaps a run in progress.

use anyhow::{Context, Result};
use chrono_tz::Tz;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::info;

use crate::config::ScheduleTime;
use crate::engine::publisher::Publisher;

/// Six-field cron expression (sec min hour dom mon dow) firing daily.
pub fn cron_expression(time: ScheduleTime) -> String {
    format!("0 {} {} * * *", time.minute, time.hour)
}

pub fn trigger_label(time: ScheduleTime) -> String {
    format!("scheduled {:02}:{:02}", time.hour, time.minute)
}

/// Scheduler facts reported by the status endpoint.
#[derive(Debug)]
pub struct ScheduleStatus {
    pub timezone: String,
    pub times: Vec<String>,
    running: AtomicBool,
}

impl ScheduleStatus {
    pub fn new(timezone: Tz, times: &[ScheduleTime]) -> Self {
        Self {
            timezone: timezone.name().to_string(),
            times: times
                .iter()
                .map(|t| format!("{:02}:{:02}", t.hour, t.minute))
                .collect(),
            running: AtomicBool::new(false),
        }
    }

    pub fn job_count(&self) -> usize {
        self.times.len()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }
}

/// Register one job per publish time and start the scheduler.
pub async fn start_scheduler(
    publisher: Arc<Publisher>,
    times: &[ScheduleTime],
    timezone: Tz,
    status: &ScheduleStatus,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new()
        .await
        .context("Failed to create job scheduler")?;

    for &time in times {
        let expression = cron_expression(time);
        let label = trigger_label(time);
        let publisher = Arc::clone(&publisher);

        let job = Job::new_async_tz(expression.as_str(), timezone, move |_uuid, _lock| {
            let publisher = Arc::clone(&publisher);
            let label = label.clone();
            Box::pin(async move {
                publisher.publish(&label).await;
            })
        })
        .with_context(|| format!("Invalid publish schedule '{expression}'"))?;

        scheduler
            .add(job)
            .await
            .context("Failed to register publish job")?;
        info!(cron = %expression, timezone = %timezone, "Publish job registered");
    }

    scheduler
        .start()
        .await
        .context("Failed to start job scheduler")?;
    status.set_running(true);
    info!(jobs = times.len(), timezone = %timezone, "Scheduler started");

    Ok(scheduler)
}

/// Stop the scheduler; a run already in flight finishes on its own.
pub async fn stop_scheduler(scheduler: &mut JobScheduler, status: &ScheduleStatus) -> Result<()> {
    status.set_running(false);
    scheduler
        .shutdown()
        .await
        .context("Failed to shut down job scheduler")?;
    info!("Scheduler stopped");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
