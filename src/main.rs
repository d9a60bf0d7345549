//! TIPSTER: scheduled sports prediction bot for Telegram channels
//!
//! Entry point. Loads configuration, initialises structured logging and
//! runs the bot under the restart supervisor: clients, scheduler and
//! dashboard are built per attempt and torn down on shutdown.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use tipster::composer::{Composer, Renderer};
use tipster::config::AppConfig;
use tipster::dashboard::{spawn_dashboard, DashboardState};
use tipster::engine::publisher::{Publisher, PublisherSettings, RunOutcome};
use tipster::engine::scheduler::{start_scheduler, stop_scheduler, ScheduleStatus};
use tipster::engine::supervisor::{supervise, RestartPolicy};
use tipster::generator::{Catalog, LiveGenerator, LiveSettings, SyntheticGenerator};
use tipster::llm::perplexity::PerplexityClient;
use tipster::telegram::{MessageSink, TelegramClient};

const BANNER: &str = r#"
 _____ ___ ____  ____ _____ _____ ____
|_   _|_ _|  _ \/ ___|_   _| ____|  _ \
  | |  | || |_) \___ \ | | |  _| | |_) |
  | |  | ||  __/ ___) || | | |___|  _ <
  |_| |___|_|   |____/ |_| |_____|_| \_\

  Scheduled sports predictions for Telegram
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let config_path = AppConfig::path();
    let cfg = AppConfig::load(&config_path)?;

    println!("{BANNER}");
    info!(
        bot_name = %cfg.bot.name,
        config = %config_path,
        timezone = %cfg.schedule.timezone,
        publish_times = cfg.schedule.times.len(),
        predictions_per_run = cfg.dispatch.predictions_per_run,
        mode = ?cfg.dispatch.mode,
        "TIPSTER starting up"
    );

    let policy = RestartPolicy::from_config(&cfg.supervisor);
    supervise(&policy, |attempt| run_bot(cfg.clone(), attempt)).await
}

/// Build every component, serve until Ctrl+C, then tear down.
///
/// Returns `Err` for anything the supervisor should restart on.
async fn run_bot(cfg: AppConfig, attempt: u32) -> Result<()> {
    let secrets = cfg.resolve_secrets()?;
    let timezone = cfg.timezone()?;
    let catalog = Arc::new(Catalog::default());

    // -- Text generation -------------------------------------------------

    let live = match secrets.llm_api_key {
        Some(key) => {
            let client = PerplexityClient::new(key, &cfg.llm)?;
            info!(
                search_model = %cfg.llm.search_model,
                reasoning_model = %cfg.llm.reasoning_model,
                mode = ?cfg.llm.mode,
                "Text generation enabled"
            );
            Some(LiveGenerator::new(
                Arc::new(client),
                catalog.clone(),
                Arc::new(cfg.keywords.clone()),
                LiveSettings {
                    mode: cfg.llm.mode,
                    search_model: cfg.llm.search_model.clone(),
                    reasoning_model: cfg.llm.reasoning_model.clone(),
                    timezone,
                },
            ))
        }
        None => {
            warn!("No text-generation API key configured, publishing synthetic predictions only");
            None
        }
    };

    // -- Publishing pipeline ---------------------------------------------

    let sink: Arc<dyn MessageSink> = Arc::new(TelegramClient::new(
        secrets.telegram_token,
        secrets.channel_id,
        Duration::from_secs(cfg.dispatch.timeout_secs),
    )?);

    let composer = Composer::new(live, SyntheticGenerator::new(catalog.clone()), secrets.live_only);
    let renderer = Renderer::new(catalog, composer.live_enabled());
    info!(
        channel = %sink.channel(),
        live = composer.live_enabled(),
        live_only = composer.live_only(),
        "Publisher ready"
    );
    let publisher = Arc::new(Publisher::new(
        composer,
        renderer,
        sink,
        PublisherSettings::from_config(&cfg, timezone),
    ));

    // -- Dashboard and scheduler -----------------------------------------

    let schedule = Arc::new(ScheduleStatus::new(timezone, &cfg.schedule.times));

    let mut dashboard = if cfg.dashboard.enabled {
        let state = Arc::new(DashboardState::new(
            cfg.bot.name.clone(),
            publisher.clone(),
            schedule.clone(),
        ));
        Some(spawn_dashboard(state, cfg.dashboard_port()).await?)
    } else {
        None
    };

    let mut scheduler =
        match start_scheduler(publisher.clone(), &cfg.schedule.times, timezone, &schedule).await {
            Ok(s) => s,
            Err(e) => {
                abort_dashboard(dashboard);
                return Err(e);
            }
        };

    if cfg.schedule.send_on_startup && attempt == 0 {
        let report = publisher.publish("startup").await;
        match report.outcome {
            RunOutcome::Published | RunOutcome::Unavailable => info!("Startup publish sent"),
            _ => warn!(error = ?report.error, "Startup publish did not complete"),
        }
    }

    // -- Wait for shutdown -----------------------------------------------

    info!(times = ?schedule.times, "Waiting for scheduled runs. Press Ctrl+C to stop.");

    let outcome = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal
                .context("Failed to listen for shutdown signal")
                .map(|()| info!("Shutdown signal received."))
        }
        _ = dashboard_stopped(&mut dashboard) => {
            Err(anyhow::anyhow!("Dashboard server stopped unexpectedly"))
        }
    };

    abort_dashboard(dashboard);
    stop_scheduler(&mut scheduler, &schedule).await?;

    if outcome.is_ok() {
        info!(runs = publisher.runs_started(), "TIPSTER shut down cleanly.");
    }
    outcome
}

/// Resolves when the dashboard task ends; never resolves when there is none.
async fn dashboard_stopped(dashboard: &mut Option<JoinHandle<()>>) {
    match dashboard.as_mut() {
        Some(handle) => {
            let _ = handle.await;
        }
        None => std::future::pending().await,
    }
}

fn abort_dashboard(dashboard: Option<JoinHandle<()>>) {
    if let Some(handle) = dashboard {
        handle.abort();
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tipster=info"));

    let json_logging = std::env::var("TIPSTER_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
