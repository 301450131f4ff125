//! Orchestrator - configuration, event loop and reporting
//!
//! See `engine.rs` for the dispatch loop.

pub mod config;
pub mod engine;
pub mod report;

// Re-export main types for convenience
pub use config::{ConfigError, PopulationConfig, ResourceConfig, SimulationConfig};
pub use engine::{Continuation, Engine, SimulationError};
pub use report::{PopulationReport, ResourceReport, SimulationReport};
