//! Tracing setup for binaries built on Brokergate.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Level used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Installs a global `fmt` subscriber filtered by `RUST_LOG`, falling
/// back to `default_level`.
///
/// Returns `false` if a global subscriber was already installed (e.g. by
/// an earlier call or a test harness); the existing one stays in place.
pub fn init_tracing(default_level: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true).compact())
        .try_init()
        .is_ok()
}
