//! Periodic driver for the refresh engine.

use super::engine::update_pending_rates;
use crate::cache::RateUpdateCache;
use crate::db::repo::RateUpdateRepository;
use crate::ratesapi::RateClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};
use uuid::Uuid;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

struct DriverHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Owns the periodic refresh job.
///
/// The job runs singleton per process: each tick is awaited inline in the
/// driver loop, and a tick that fires during a run is rescheduled
/// (`MissedTickBehavior::Delay`) rather than run concurrently.
pub struct RefreshScheduler {
    update_repo: Arc<RateUpdateRepository>,
    client: Arc<dyn RateClient>,
    cache: Arc<dyn RateUpdateCache>,
    interval: Duration,
    driver: Mutex<Option<DriverHandle>>,
}

impl RefreshScheduler {
    /// A zero interval falls back to the 30 s default.
    pub fn new(
        update_repo: Arc<RateUpdateRepository>,
        client: Arc<dyn RateClient>,
        cache: Arc<dyn RateUpdateCache>,
        interval: Duration,
    ) -> Self {
        let interval = if interval.is_zero() {
            DEFAULT_INTERVAL
        } else {
            interval
        };

        RefreshScheduler {
            update_repo,
            client,
            cache,
            interval,
            driver: Mutex::new(None),
        }
    }

    /// Starts the driver and a watcher that shuts it down when the root
    /// signal fires.
    pub async fn start(self: Arc<Self>, mut root_shutdown: watch::Receiver<bool>) {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(Self::run_driver(Arc::clone(&self), stop_rx));

        *self.driver.lock().await = Some(DriverHandle { stop_tx, task });

        tokio::spawn(async move {
            // Err means the sender is gone; treat it as shutdown too.
            let _ = root_shutdown.changed().await;
            self.shutdown().await;
        });
    }

    async fn run_driver(self: Arc<Self>, mut stop_rx: watch::Receiver<bool>) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = stop_rx.changed() => return,
                _ = ticker.tick() => {
                    let exec_id = Uuid::new_v4();
                    let result = update_pending_rates(
                        stop_rx.clone(),
                        exec_id,
                        &self.update_repo,
                        Arc::clone(&self.client),
                        self.cache.as_ref(),
                    )
                    .await;

                    if let Err(err) = result {
                        error!(%exec_id, error = %err, "update pending rates job failed");
                    }
                }
            }
        }
    }

    /// Stops the driver. Idempotent: shutting down an already-stopped
    /// scheduler does nothing.
    pub async fn shutdown(&self) {
        let Some(handle) = self.driver.lock().await.take() else {
            return;
        };

        let _ = handle.stop_tx.send(true);
        let _ = handle.task.await;
        info!("refresh scheduler stopped");
    }
}
