//! Deterministic random number generation
//!
//! Uses xorshift64* algorithm for fast, deterministic random number generation.
//! CRITICAL: All randomness in the simulator MUST go through this module.
//!
//! # Streams
//!
//! Each consumer owns one [`RngManager`] derived from the master seed:
//!
//! | stream id | consumer |
//! |---|---|
//! | `ARRIVAL_STREAM_BASE + i` | population `i` (inter-arrival and service draws) |
//! | `BACKUP_STREAM_BASE + r` | backup strategy of resource `r` |
//! | `FAILURE_STREAM_BASE + r` | failure controller of resource `r` |

mod xorshift;

pub use xorshift::RngManager;

/// Stream id offset for population generators
pub const ARRIVAL_STREAM_BASE: u64 = 0x1000;

/// Stream id offset for backup strategies
pub const BACKUP_STREAM_BASE: u64 = 0x2000;

/// Stream id offset for failure controllers
pub const FAILURE_STREAM_BASE: u64 = 0x3000;
