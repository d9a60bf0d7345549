//! Restart loop around the long-running bot task.
//!
//! A task that returns `Ok` has shut down cleanly and is not restarted.
//! A task that fails is restarted after an exponentially growing pause,
//! up to a fixed number of restarts.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info};

use crate::config::SupervisorConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartPolicy {
    pub max_restarts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RestartPolicy {
    pub fn from_config(cfg: &SupervisorConfig) -> Self {
        Self {
            max_restarts: cfg.max_restarts,
            initial_backoff: Duration::from_secs(cfg.initial_backoff_secs),
            max_backoff: Duration::from_secs(cfg.max_backoff_secs),
        }
    }

    /// Pause before restart number `attempt` (1-based): doubles each time,
    /// capped at `max_backoff`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial_backoff
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// Run `task` until it succeeds or the restart budget is spent.
///
/// `task` receives the number of restarts so far (0 on the first run).
pub async fn supervise<F, Fut>(policy: &RestartPolicy, mut task: F) -> Result<()>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut restarts = 0u32;

    loop {
        match task(restarts).await {
            Ok(()) => {
                info!(restarts, "Bot task finished");
                return Ok(());
            }
            Err(e) if restarts >= policy.max_restarts => {
                error!(error = %e, restarts, "Restart budget exhausted, giving up");
                return Err(e.context(format!("bot failed after {restarts} restarts")));
            }
            Err(e) => {
                restarts += 1;
                let delay = policy.backoff(restarts);
                error!(
                    error = %e,
                    restart = restarts,
                    max_restarts = policy.max_restarts,
                    delay_secs = delay.as_secs(),
                    "Bot task failed, restarting"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy(max_restarts: u32) -> RestartPolicy {
        RestartPolicy {
            max_restarts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RestartPolicy::from_config(&SupervisorConfig::default());
        assert_eq!(policy.backoff(1), Duration::from_secs(60));
        assert_eq!(policy.backoff(2), Duration::from_secs(120));
        assert_eq!(policy.backoff(4), Duration::from_secs(480));
        assert_eq!(policy.backoff(5), Duration::from_secs(900));
        assert_eq!(policy.backoff(40), Duration::from_secs(900));
    }

    #[tokio::test]
    async fn test_clean_exit_not_restarted() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        supervise(&fast_policy(3), |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), anyhow::Error>(())
            }
        })
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_failures() {
        let result = supervise(&fast_policy(3), |attempt| async move {
            if attempt < 2 {
                return Err(anyhow::anyhow!("network down"));
            }
            Ok::<(), anyhow::Error>(())
        })
        .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let err = supervise(&fast_policy(2), |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(anyhow::anyhow!("boom"))
            }
        })
        .await
        .unwrap_err();

        // First run plus two restarts.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(format!("{err:#}").contains("boom"));
        assert!(err.to_string().contains("2 restarts"));
    }
}
