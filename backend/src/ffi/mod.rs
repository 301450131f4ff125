//! Python bindings
//!
//! The analysis side lives in Python and only consumes the event log, so
//! the boundary is small: a JSON configuration in, a JSON report and the
//! log out.

pub mod simulation;
