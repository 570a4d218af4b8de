//! Fixed-interval sweep scheduler for Brokergate.
//!
//! Session and token stores expire entries lazily on access, but entries
//! nobody asks about again would sit in memory forever. This crate runs
//! the periodic "sweep" that removes them:
//!
//! - [`SweepScheduler`]: a `tokio::time::Interval` wrapper with jitter,
//!   a missed-tick policy and a run counter. Usable directly inside any
//!   `tokio::select!` loop.
//! - [`spawn_sweeper`]: spawns a background task that calls a sweep
//!   closure on every tick and returns a [`SweeperHandle`] that cancels
//!   the task on [`SweeperHandle::shutdown`] or on drop.
//!
//! # Failure isolation
//!
//! A sweep is maintenance, never a foreground operation. If the sweep
//! closure panics, the panic is caught, logged and counted, and the task
//! waits for the next tick as usual.
//!
//! ```ignore
//! let handle = spawn_sweeper("sessions", SweepConfig::every(Duration::from_secs(3600)), move || {
//!     store.sweep_expired()
//! });
//! // ... at shutdown:
//! let metrics = handle.shutdown().await;
//! ```

mod sweeper;

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant as TokioInstant, Interval, MissedTickBehavior};
use tracing::{debug, warn};

pub use sweeper::{spawn_sweeper, SweepMetrics, SweeperHandle};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when the runtime falls behind and one or more sweeps are
/// missed (e.g. the process was suspended, or the runtime was saturated).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissedSweepPolicy {
    /// Drop the missed sweeps and resume on the original cadence.
    /// A sweep is idempotent, so running it once late covers every
    /// missed run.
    #[default]
    Skip,
    /// Fire all missed sweeps back to back until caught up.
    Burst,
    /// Fire once now, then restart the cadence from this moment.
    Delay,
}

impl MissedSweepPolicy {
    fn as_tokio(self) -> MissedTickBehavior {
        match self {
            Self::Skip => MissedTickBehavior::Skip,
            Self::Burst => MissedTickBehavior::Burst,
            Self::Delay => MissedTickBehavior::Delay,
        }
    }
}

/// Full configuration for one sweep schedule.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Time between sweeps.
    pub interval: Duration,
    /// Missed-tick handling.
    pub missed: MissedSweepPolicy,
    /// Random delay (0..max) added before the first sweep so that several
    /// sweepers started together don't all fire on the same instant.
    pub initial_jitter: Duration,
    /// Run the first sweep right away instead of after one interval.
    pub run_immediately: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            missed: MissedSweepPolicy::default(),
            initial_jitter: Duration::ZERO,
            run_immediately: false,
        }
    }
}

impl SweepConfig {
    /// Shortest interval accepted. `tokio::time::interval` panics on zero.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

    /// A config that sweeps every `interval` with default settings.
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`SweepScheduler::new`].
    pub fn validated(mut self) -> Self {
        if self.interval < Self::MIN_INTERVAL {
            warn!(
                interval_ms = self.interval.as_secs_f64() * 1000.0,
                "sweep interval below minimum, clamping"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-interval sweep scheduler.
///
/// One scheduler per sweep loop. It owns a tokio [`Interval`], so it
/// follows the paused clock under `tokio::time::pause()` in tests.
pub struct SweepScheduler {
    config: SweepConfig,
    interval: Interval,
    run_count: u64,
}

impl SweepScheduler {
    /// Create a scheduler from config.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn new(config: SweepConfig) -> Self {
        let config = config.validated();

        let jitter = if config.initial_jitter > Duration::ZERO {
            let max_us = config.initial_jitter.as_micros().min(u128::from(u64::MAX)) as u64;
            Duration::from_micros(rand::rng().random_range(0..max_us.max(1)))
        } else {
            Duration::ZERO
        };
        let first_delay = if config.run_immediately {
            jitter
        } else {
            config.interval + jitter
        };

        let mut interval = time::interval_at(TokioInstant::now() + first_delay, config.interval);
        interval.set_missed_tick_behavior(config.missed.as_tokio());

        debug!(
            interval_ms = config.interval.as_secs_f64() * 1000.0,
            first_delay_ms = first_delay.as_secs_f64() * 1000.0,
            policy = ?config.missed,
            "sweep scheduler created"
        );

        Self {
            config,
            interval,
            run_count: 0,
        }
    }

    /// Create a scheduler that fires every `interval` with default settings.
    pub fn every(interval: Duration) -> Self {
        Self::new(SweepConfig::every(interval))
    }

    /// Wait until the next sweep is due. Returns the 1-based run number.
    ///
    /// Cancel-safe: dropping the future (e.g. when another `select!`
    /// branch wins) does not lose or double a tick.
    pub async fn wait_for_sweep(&mut self) -> u64 {
        self.interval.tick().await;
        self.run_count += 1;
        self.run_count
    }

    /// Number of sweeps fired so far.
    pub fn run_count(&self) -> u64 {
        self.run_count
    }

    /// The configured interval (after validation).
    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    /// The effective configuration.
    pub fn config(&self) -> &SweepConfig {
        &self.config
    }
}
