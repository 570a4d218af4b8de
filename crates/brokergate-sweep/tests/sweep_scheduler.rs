//! Integration tests for the sweep scheduler and spawned sweepers.
//!
//! Every async test runs with `start_paused = true`: tokio's clock only
//! moves when all tasks are idle, and then jumps straight to the next
//! timer. Hour-long intervals therefore complete instantly and in a
//! deterministic order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use brokergate_sweep::{spawn_sweeper, MissedSweepPolicy, SweepConfig, SweepScheduler};
use tokio::time::Instant;

// =========================================================================
// Helpers
// =========================================================================

const MINUTE: Duration = Duration::from_secs(60);

/// A sweep closure that counts its calls and reports `removed` each time.
fn counting_sweep(removed: usize) -> (Arc<AtomicUsize>, impl FnMut() -> usize + Send + 'static) {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    (calls, move || {
        c.fetch_add(1, Ordering::SeqCst);
        removed
    })
}

// =========================================================================
// SweepConfig
// =========================================================================

#[test]
fn test_default_config() {
    let cfg = SweepConfig::default();
    assert_eq!(cfg.interval, MINUTE);
    assert_eq!(cfg.missed, MissedSweepPolicy::Skip);
    assert_eq!(cfg.initial_jitter, Duration::ZERO);
    assert!(!cfg.run_immediately);
}

#[test]
fn test_every_sets_interval() {
    let cfg = SweepConfig::every(Duration::from_secs(3600));
    assert_eq!(cfg.interval, Duration::from_secs(3600));
}

#[test]
fn test_validated_clamps_zero_interval() {
    let cfg = SweepConfig::every(Duration::ZERO).validated();
    assert_eq!(cfg.interval, SweepConfig::MIN_INTERVAL);
}

// =========================================================================
// SweepScheduler
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_first_sweep_waits_one_interval() {
    let start = Instant::now();
    let mut s = SweepScheduler::every(MINUTE);

    // Nothing fires before the interval has elapsed.
    let early = tokio::time::timeout(Duration::from_secs(59), s.wait_for_sweep()).await;
    assert!(early.is_err(), "sweep fired before its interval");

    let run = s.wait_for_sweep().await;
    assert_eq!(run, 1);
    assert_eq!(Instant::now() - start, MINUTE);
}

#[tokio::test(start_paused = true)]
async fn test_run_immediately_fires_at_start() {
    let start = Instant::now();
    let mut s = SweepScheduler::new(SweepConfig {
        run_immediately: true,
        ..SweepConfig::every(MINUTE)
    });

    assert_eq!(s.wait_for_sweep().await, 1);
    assert_eq!(Instant::now() - start, Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_runs_increment_monotonically() {
    let mut s = SweepScheduler::every(MINUTE);

    for expected in 1..=4 {
        assert_eq!(s.wait_for_sweep().await, expected);
    }
    assert_eq!(s.run_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_jitter_delays_first_sweep_within_bound() {
    let start = Instant::now();
    let mut s = SweepScheduler::new(SweepConfig {
        initial_jitter: Duration::from_secs(10),
        ..SweepConfig::every(MINUTE)
    });

    s.wait_for_sweep().await;
    let waited = Instant::now() - start;
    assert!(waited >= MINUTE && waited < MINUTE + Duration::from_secs(10));
}

// =========================================================================
// spawn_sweeper
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_sweeper_runs_on_schedule_and_publishes_metrics() {
    let (calls, sweep) = counting_sweep(2);
    let handle = spawn_sweeper("test", SweepConfig::every(MINUTE), sweep);

    tokio::time::sleep(Duration::from_secs(185)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    let metrics = handle.metrics();
    assert_eq!(metrics.total_runs, 3);
    assert_eq!(metrics.total_removed, 6);
    assert_eq!(metrics.last_removed, 2);
    assert_eq!(metrics.panics, 0);
    assert_eq!(handle.name(), "test");
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_survives_panicking_sweep() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let handle = spawn_sweeper("flaky", SweepConfig::every(MINUTE), move || {
        if c.fetch_add(1, Ordering::SeqCst) == 0 {
            panic!("first sweep blows up");
        }
        5
    });

    tokio::time::sleep(Duration::from_secs(125)).await;

    let metrics = handle.metrics();
    assert_eq!(metrics.total_runs, 2);
    assert_eq!(metrics.panics, 1);
    assert_eq!(metrics.total_removed, 5);
    assert!(!handle.is_finished(), "task must keep running after a panic");
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_sweeper_and_returns_metrics() {
    let (calls, sweep) = counting_sweep(1);
    let handle = spawn_sweeper("stoppable", SweepConfig::every(MINUTE), sweep);

    tokio::time::sleep(Duration::from_secs(65)).await;
    let metrics = handle.shutdown().await;
    assert_eq!(metrics.total_runs, 1);

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1, "no sweeps after shutdown");
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handle_cancels_sweeper() {
    let (calls, sweep) = counting_sweep(0);
    let handle = spawn_sweeper("dropped", SweepConfig::every(MINUTE), sweep);

    drop(handle);
    tokio::time::sleep(Duration::from_secs(600)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

// =========================================================================
// Integration: select! loop pattern
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_select_loop_pattern() {
    let mut s = SweepScheduler::every(MINUTE);
    let (tx, mut rx) = tokio::sync::mpsc::channel::<&str>(1);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(190)).await;
        tx.send("stop").await.ok();
    });

    let mut runs = 0u64;
    loop {
        tokio::select! {
            Some(cmd) = rx.recv() => {
                assert_eq!(cmd, "stop");
                break;
            }
            run = s.wait_for_sweep() => {
                runs += 1;
                assert_eq!(run, runs);
            }
        }
    }

    assert_eq!(runs, 3);
}
