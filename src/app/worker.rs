//! Background worker that re-runs the reconciliation cycle on a fixed interval.
//!
//! The first cycle starts immediately. Each following cycle starts `interval`
//! after the previous one finished, whatever its outcome. A shutdown signal is
//! only observed between cycles, so a running cycle always completes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::service::ReconciliationService;

/// Six hours, the cadence of the original deployment
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

/// Configuration for the reconciliation worker
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Delay between the end of one cycle and the start of the next
    pub interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
        }
    }
}

pub struct ReconciliationWorker {
    service: Arc<ReconciliationService>,
    config: WorkerConfig,
    shutdown_rx: watch::Receiver<bool>,
}

impl ReconciliationWorker {
    #[must_use]
    pub fn new(
        service: Arc<ReconciliationService>,
        config: WorkerConfig,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            service,
            config,
            shutdown_rx,
        }
    }

    /// Run until shutdown is signalled. Returns the number of completed cycles.
    pub async fn run(mut self) -> u64 {
        let mut cycles = 0u64;
        info!(interval_secs = self.config.interval.as_secs(), "Reconciliation worker started");

        loop {
            if *self.shutdown_rx.borrow() {
                break;
            }

            let summary = self.service.run_cycle().await;
            cycles += 1;
            if summary.is_aborted() {
                warn!(cycle_id = %summary.cycle_id, "Cycle aborted, will retry after interval");
            }
            info!(
                interval_secs = self.config.interval.as_secs(),
                "Task will run again after interval"
            );

            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {}
                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        info!(cycles = cycles, "Reconciliation worker stopped");
        cycles
    }
}

/// Spawn the worker on the runtime.
///
/// Send `true` on the returned channel to stop it after the current cycle.
pub fn spawn_worker(
    service: Arc<ReconciliationService>,
    config: WorkerConfig,
) -> (JoinHandle<u64>, watch::Sender<bool>) {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = ReconciliationWorker::new(service, config, shutdown_rx);
    let handle = tokio::spawn(worker.run());
    (handle, shutdown_tx)
}
