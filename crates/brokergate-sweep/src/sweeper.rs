//! Background sweeper task and its handle.

use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::{SweepConfig, SweepScheduler};

/// Counters for one sweeper, published after every run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepMetrics {
    /// Sweeps attempted (including ones that panicked).
    pub total_runs: u64,
    /// Entries removed across all runs.
    pub total_removed: u64,
    /// Entries removed by the most recent successful run.
    pub last_removed: usize,
    /// Runs that panicked and were skipped.
    pub panics: u64,
    /// Longest observed sweep duration.
    pub max_sweep_time: Duration,
}

/// Handle to a running sweeper task.
///
/// The task lives until [`shutdown`](Self::shutdown) is awaited or the
/// handle is dropped; dropping aborts the task so a sweeper can never
/// outlive its owner.
pub struct SweeperHandle {
    name: &'static str,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    metrics: watch::Receiver<SweepMetrics>,
}

impl SweeperHandle {
    /// The name the sweeper was spawned with (used in log fields).
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Snapshot of the latest published metrics.
    pub fn metrics(&self) -> SweepMetrics {
        self.metrics.borrow().clone()
    }

    /// Whether the background task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stops the sweeper and waits for the task to exit.
    ///
    /// A sweep already in progress runs to completion first. Returns the
    /// final metrics.
    pub async fn shutdown(mut self) -> SweepMetrics {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(sweeper = self.name, error = %e, "sweeper task ended abnormally");
            }
        }
        debug!(sweeper = self.name, "sweeper stopped");
        self.metrics.borrow().clone()
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Spawns a background task that calls `sweep` on every tick of a
/// [`SweepScheduler`] built from `config`.
///
/// `sweep` returns how many entries it removed. Must be called from
/// inside a tokio runtime.
pub fn spawn_sweeper<F>(name: &'static str, config: SweepConfig, sweep: F) -> SweeperHandle
where
    F: FnMut() -> usize + Send + 'static,
{
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let (metrics_tx, metrics_rx) = watch::channel(SweepMetrics::default());
    let scheduler = SweepScheduler::new(config);

    info!(
        sweeper = name,
        interval_secs = scheduler.interval().as_secs_f64(),
        "sweeper started"
    );

    let task = tokio::spawn(run_sweeper(name, scheduler, sweep, shutdown_rx, metrics_tx));

    SweeperHandle {
        name,
        shutdown: Some(shutdown_tx),
        task: Some(task),
        metrics: metrics_rx,
    }
}

async fn run_sweeper<F>(
    name: &'static str,
    mut scheduler: SweepScheduler,
    mut sweep: F,
    mut shutdown: oneshot::Receiver<()>,
    metrics: watch::Sender<SweepMetrics>,
) where
    F: FnMut() -> usize + Send + 'static,
{
    loop {
        tokio::select! {
            biased;
            // Fires on an explicit shutdown AND when the handle is dropped.
            _ = &mut shutdown => break,
            run = scheduler.wait_for_sweep() => {
                let start = Instant::now();
                let removed = panic::catch_unwind(AssertUnwindSafe(&mut sweep)).ok();
                let elapsed = start.elapsed();

                metrics.send_modify(|m| {
                    m.total_runs += 1;
                    m.max_sweep_time = m.max_sweep_time.max(elapsed);
                    match removed {
                        Some(n) => {
                            m.last_removed = n;
                            m.total_removed += n as u64;
                        }
                        None => m.panics += 1,
                    }
                });

                match removed {
                    Some(0) => trace!(sweeper = name, run, "sweep found nothing to remove"),
                    Some(n) => debug!(sweeper = name, run, removed = n, "sweep finished"),
                    None => warn!(sweeper = name, run, "sweep panicked, retrying next cycle"),
                }
            }
        }
    }
}
