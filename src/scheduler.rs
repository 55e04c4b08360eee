//! Periodic background synchronization.
//!
//! The scheduler runs one synchronization with the short startup horizon,
//! then keeps the long horizon materialized on a fixed interval until it is
//! shut down. A failed run is logged and the next tick tries again.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{error, info};

use crate::config::SyncConfig;
use crate::roster::{SyncReport, Synchronizer};

/// Counters for the scheduler's runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub runs: u64,
    pub failures: u64,
    pub last_report: Option<SyncReport>,
}

pub struct SyncScheduler {
    synchronizer: Synchronizer,
    initial_weeks_ahead: u32,
    weeks_ahead: u32,
    interval: Duration,
    run_on_startup: bool,
}

impl SyncScheduler {
    pub fn new(synchronizer: Synchronizer, config: &SyncConfig) -> Self {
        Self {
            synchronizer,
            initial_weeks_ahead: config.initial_weeks_ahead,
            weeks_ahead: config.weeks_ahead,
            interval: config.interval(),
            run_on_startup: config.run_on_startup,
        }
    }

    /// Override the configured period.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Spawn the background task.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let stats = Arc::new(RwLock::new(SchedulerStats::default()));
        let task_stats = stats.clone();

        let handle = tokio::spawn(async move {
            info!(
                initial_weeks_ahead = self.initial_weeks_ahead,
                weeks_ahead = self.weeks_ahead,
                interval_secs = self.interval.as_secs(),
                "Sync scheduler started"
            );

            if self.run_on_startup {
                self.run_once(self.initial_weeks_ahead, &task_stats).await;
            }

            let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.run_once(self.weeks_ahead, &task_stats).await;
                    }
                    _ = shutdown_rx.changed() => {
                        break;
                    }
                }
            }

            info!("Sync scheduler stopped");
        });

        SchedulerHandle {
            shutdown: shutdown_tx,
            handle,
            stats,
        }
    }

    async fn run_once(&self, weeks_ahead: u32, stats: &RwLock<SchedulerStats>) {
        let result = self.synchronizer.synchronize(weeks_ahead).await;

        let mut stats = stats.write().await;
        stats.runs += 1;
        match result {
            Ok(report) => stats.last_report = Some(report),
            Err(e) => {
                stats.failures += 1;
                error!(weeks_ahead, "Scheduled synchronization failed: {}", e);
            }
        }
    }
}

/// Handle to a running [`SyncScheduler`].
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
    stats: Arc<RwLock<SchedulerStats>>,
}

impl SchedulerHandle {
    pub async fn stats(&self) -> SchedulerStats {
        self.stats.read().await.clone()
    }

    /// Stop the task and wait for an in-flight run to finish.
    pub async fn shutdown(self) -> SchedulerStats {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            error!("Sync scheduler task failed: {}", e);
        }
        self.stats.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EmbeddedGraphStore, GraphStore};

    fn create_scheduler(run_on_startup: bool) -> SyncScheduler {
        let store: Arc<dyn GraphStore> = Arc::new(EmbeddedGraphStore::new());
        let config = SyncConfig {
            initial_weeks_ahead: 1,
            weeks_ahead: 2,
            interval_hours: 1,
            run_on_startup,
        };
        SyncScheduler::new(Synchronizer::new(store), &config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_on_startup_and_every_interval() {
        let handle = create_scheduler(true).start();

        tokio::time::sleep(Duration::from_secs(150 * 60)).await;
        let stats = handle.shutdown().await;

        assert_eq!(stats.runs, 3);
        assert_eq!(stats.failures, 0);
        assert_eq!(stats.last_report.map(|r| r.weeks_ahead), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_skips_startup_run() {
        let handle = create_scheduler(false).with_interval(Duration::from_secs(60)).start();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(handle.stats().await.runs, 0);

        tokio::time::sleep(Duration::from_secs(45)).await;
        let stats = handle.shutdown().await;
        assert_eq!(stats.runs, 1);
    }
}
