//! Clock and event ordering

pub mod scheduler;
pub mod time;

pub use scheduler::{EventQueue, Scheduled, SchedulerError};
pub use time::SimClock;
