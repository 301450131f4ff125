//! Scheduling Policy Module
//!
//! Decides which waiting job a resource serves next when a server slot
//! frees up.
//!
//! # Overview
//!
//! Every policy works over the *current waiting set* at selection time and
//! returns the index of the winner. The set of policies is closed and fixed
//! when the resource is built:
//!
//! 1. **Fifo**: earliest arrival wins, ties broken by enqueue order
//! 2. **Sjf**: smallest pre-drawn service time wins, ties by arrival order
//! 3. **Priority**: fixed order over population classes, FIFO within a class
//!
//! Because service times are drawn at arrival, all three policies see the
//! same jobs for the same event sequence and differ only in selection order.
//!
//! # Example
//!
//! ```rust
//! use queue_simulator_core_rs::policy::{SchedulingPolicy, WaitingEntry};
//!
//! let waiting = vec![
//!     WaitingEntry { job_id: 0, arrival_time: 1.0, service_time: 4.0, class_rank: 0, enqueue_seq: 0 },
//!     WaitingEntry { job_id: 1, arrival_time: 2.0, service_time: 0.5, class_rank: 0, enqueue_seq: 1 },
//! ];
//!
//! assert_eq!(SchedulingPolicy::Fifo.select(&waiting), Some(0));
//! assert_eq!(SchedulingPolicy::Sjf.select(&waiting), Some(1));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::orchestrator::config::ConfigError;

mod fifo;
mod priority;
mod sjf;

pub use fifo::select_fifo;
pub use priority::select_priority;
pub use sjf::select_sjf;

/// What a policy needs to know about a waiting job
#[derive(Debug, Clone, PartialEq)]
pub struct WaitingEntry {
    pub job_id: u64,
    pub arrival_time: f64,
    /// Pre-drawn service time
    pub service_time: f64,
    /// Position of the job's population in the priority order
    /// (0 = most urgent); unused by FIFO and SJF
    pub class_rank: usize,
    /// Monotone counter assigned at enqueue
    pub enqueue_seq: u64,
}

/// Closed set of scheduling policies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchedulingPolicy {
    #[default]
    Fifo,
    Sjf,
    Priority {
        /// Population names, most urgent first. Populations not listed
        /// rank after every listed one.
        order: Vec<String>,
    },
}

impl SchedulingPolicy {
    /// Pick the next job to serve; `None` if nothing is waiting
    pub fn select(&self, waiting: &[WaitingEntry]) -> Option<usize> {
        match self {
            SchedulingPolicy::Fifo => select_fifo(waiting),
            SchedulingPolicy::Sjf => select_sjf(waiting),
            SchedulingPolicy::Priority { .. } => select_priority(waiting),
        }
    }

    /// Rank of a population under this policy (lower is served first)
    pub fn class_rank(&self, population: &str) -> usize {
        match self {
            SchedulingPolicy::Priority { order } => order
                .iter()
                .position(|p| p == population)
                .unwrap_or(order.len()),
            _ => 0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SchedulingPolicy::Fifo => "fifo",
            SchedulingPolicy::Sjf => "sjf",
            SchedulingPolicy::Priority { .. } => "priority",
        }
    }
}

impl fmt::Display for SchedulingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulingPolicy::Priority { order } => write!(f, "priority({})", order.join(",")),
            other => f.write_str(other.name()),
        }
    }
}

/// Parses `fifo`, `sjf`, `priority` or `priority(A,B,...)`, case-insensitive
/// on the policy name.
impl FromStr for SchedulingPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();
        match lower.as_str() {
            "fifo" => return Ok(SchedulingPolicy::Fifo),
            "sjf" => return Ok(SchedulingPolicy::Sjf),
            "priority" => return Ok(SchedulingPolicy::Priority { order: Vec::new() }),
            _ => {}
        }

        if lower.starts_with("priority(") && lower.ends_with(')') {
            let inner = &trimmed["priority(".len()..trimmed.len() - 1];
            let order: Vec<String> = inner
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
            return Ok(SchedulingPolicy::Priority { order });
        }

        Err(ConfigError::UnknownPolicy(s.to_string()))
    }
}
