//! Queue Simulator Core - Rust Engine
//!
//! Discrete-event simulation of a job-submission pipeline (an automated
//! grading infrastructure) modelled as a network of finite-capacity queues.
//!
//! # Architecture
//!
//! - **core**: Clock and event queue
//! - **models**: Domain types (Job, Resource, EventLog)
//! - **policy**: Scheduling policies (FIFO, SJF, PRIORITY)
//! - **arrivals**: Poisson or recorded arrival streams per population
//! - **backup**: Backup strategies and durations
//! - **gating**: Temporal admission gate
//! - **failure**: Failure and repair timers
//! - **orchestrator**: Configuration, event loop, report
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. `in_service <= c` and `queued <= k` at every dispatched event
//! 2. All randomness is deterministic (seeded RNG streams)
//! 3. Events at equal times dispatch in insertion order
//! 4. FFI boundary is minimal and safe

// Module declarations
pub mod arrivals;
pub mod backup;
pub mod core;
pub mod failure;
pub mod gating;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod policy;
pub mod rng;

// Re-exports for convenience
pub use arrivals::{ArrivalGenerator, ArrivalSource};
pub use backup::{BackupConfig, BackupMode, BackupStrategy, DurationDistribution, LoadMetric};
pub use crate::core::{EventQueue, SchedulerError, SimClock};
pub use failure::FailureConfig;
pub use gating::GatingConfig;
pub use models::{
    event::{EventKind, EventLog, EventRecord, RejectionCause},
    job::{Job, JobError, JobId, JobPhase},
    resource::{Resource, ResourceStats},
};
pub use orchestrator::{
    ConfigError, Engine, PopulationConfig, ResourceConfig, SimulationConfig, SimulationError,
    SimulationReport,
};
pub use policy::SchedulingPolicy;
pub use rng::RngManager;

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn queue_simulator_core_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::simulation::PySimulation>()?;
    Ok(())
}
