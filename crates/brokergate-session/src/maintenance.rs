//! Background sweeps for a [`SessionManager`].

use std::sync::Arc;

use brokergate_sweep::{spawn_sweeper, SweepConfig, SweepMetrics, SweeperHandle};

use crate::SessionManager;

/// The two periodic sweeps of a session manager: sessions and token
/// mappings, each on its own task and cadence.
///
/// Dropping a `Maintenance` aborts both tasks. Call
/// [`shutdown`](Self::shutdown) to stop them cleanly instead.
pub struct Maintenance {
    sessions: SweeperHandle,
    token_mappings: SweeperHandle,
}

impl Maintenance {
    /// Latest metrics of the session sweeper.
    pub fn session_metrics(&self) -> SweepMetrics {
        self.sessions.metrics()
    }

    /// Latest metrics of the token-mapping sweeper.
    pub fn token_metrics(&self) -> SweepMetrics {
        self.token_mappings.metrics()
    }

    /// Stops both sweepers and returns their final metrics as
    /// `(sessions, token_mappings)`.
    pub async fn shutdown(self) -> (SweepMetrics, SweepMetrics) {
        let sessions = self.sessions.shutdown().await;
        let token_mappings = self.token_mappings.shutdown().await;
        (sessions, token_mappings)
    }
}

impl SessionManager {
    /// Starts the background sweeps using the intervals from
    /// [`SessionConfig`](crate::SessionConfig).
    ///
    /// Must be called from inside a tokio runtime.
    pub fn spawn_maintenance(self: &Arc<Self>) -> Maintenance {
        let session_sweep = SweepConfig::every(self.config().session_sweep_interval);
        let token_sweep = SweepConfig::every(self.config().token_sweep_interval);
        self.spawn_maintenance_with(session_sweep, token_sweep)
    }

    /// Starts the background sweeps with explicit schedules.
    pub fn spawn_maintenance_with(
        self: &Arc<Self>,
        session_sweep: SweepConfig,
        token_sweep: SweepConfig,
    ) -> Maintenance {
        let manager = Arc::clone(self);
        let sessions = spawn_sweeper("sessions", session_sweep, move || manager.sweep_sessions());

        let manager = Arc::clone(self);
        let token_mappings = spawn_sweeper("token_mappings", token_sweep, move || {
            manager.sweep_token_mappings()
        });

        Maintenance {
            sessions,
            token_mappings,
        }
    }
}
