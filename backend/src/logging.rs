//! Diagnostic logging
//!
//! The engine reports through `tracing` macros:
//! - **INFO**: run start and end
//! - **DEBUG**: gate and failure transitions, timers dropped at the horizon
//! - **TRACE**: per-job transitions (arrival, rejection, preemption, completion)
//!
//! Nothing here feeds the event log. The log is built directly by the
//! engine; these helpers only install a subscriber for terminal output.
//!
//! ```bash
//! RUST_LOG=queue_simulator_core_rs=trace cargo test -p queue-simulator-core-rs
//! RUST_LOG=queue_simulator_core_rs::gating=debug cargo test -p queue-simulator-core-rs
//! ```

use tracing::info;
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install a subscriber at `info`, unless `RUST_LOG` says otherwise
pub fn init_simulation_logging() -> bool {
    init_simulation_logging_with_level("info")
}

/// Install a subscriber for this crate at `level` ("trace" … "error").
/// `RUST_LOG` takes precedence when set.
///
/// Returns false if a global subscriber was already installed, which makes
/// it safe to call from several tests.
///
/// # Example
/// ```rust
/// use queue_simulator_core_rs::logging::init_simulation_logging_with_level;
///
/// init_simulation_logging_with_level("debug");
/// ```
pub fn init_simulation_logging_with_level(level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("queue_simulator_core_rs={}", level)));

    let installed = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_line_number(true),
        )
        .with(filter)
        .try_init()
        .is_ok();

    if installed {
        info!(level, "simulation logging initialized");
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        let _ = init_simulation_logging_with_level("warn");
        assert!(!init_simulation_logging());
    }
}
