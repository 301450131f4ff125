//! Temporal admission gating
//!
//! A gate sits in front of a resource and alternates between CLOSED (for
//! `tb`) and OPEN (for `tb / 2` unless configured otherwise). While CLOSED,
//! arrivals are held in a FIFO buffer and never reach the resource. On
//! opening, the whole buffer is released in arrival order and each job goes
//! through the resource's normal admission, which can produce a burst of
//! rejections. The gate never changes a job, only when the resource sees it.
//!
//! Instead of the periodic cycle, a gate can follow an explicit list of
//! closed `(start, end)` windows. It is OPEN outside them and stays OPEN
//! after the last one.
//!
//! # Example
//!
//! ```rust
//! use queue_simulator_core_rs::gating::{GateDecision, GateTransition, GatingConfig, GatingController};
//!
//! let mut gate = GatingController::new(GatingConfig::new(10.0));
//! assert_eq!(gate.on_arrival(0), GateDecision::Buffered);
//! assert_eq!(gate.on_arrival(1), GateDecision::Buffered);
//!
//! let transition = gate.toggle(10.0);
//! assert_eq!(transition, GateTransition::Opened { released: vec![0, 1] });
//! assert_eq!(gate.next_transition(), 15.0);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

use crate::models::job::JobId;
use crate::orchestrator::config::ConfigError;

/// Gate configuration for one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatingConfig {
    /// CLOSED interval `tb` of the periodic cycle
    #[serde(default)]
    pub closed_duration: f64,
    /// OPEN interval, `tb / 2` when absent
    #[serde(default)]
    pub open_duration: Option<f64>,
    /// Explicit closed windows `[start, end)`. Replaces the periodic cycle
    /// when present.
    #[serde(default)]
    pub windows: Option<Vec<(f64, f64)>>,
    /// Buffer bound while CLOSED, unbounded when absent
    #[serde(default)]
    pub buffer_capacity: Option<usize>,
    /// Start the periodic cycle in the OPEN state
    #[serde(default)]
    pub start_open: bool,
}

impl GatingConfig {
    pub fn new(closed_duration: f64) -> Self {
        Self {
            closed_duration,
            open_duration: None,
            windows: None,
            buffer_capacity: None,
            start_open: false,
        }
    }

    /// Gate closed exactly during `windows`, sorted and disjoint
    pub fn with_windows(windows: Vec<(f64, f64)>) -> Self {
        Self {
            closed_duration: 0.0,
            open_duration: None,
            windows: Some(windows),
            buffer_capacity: None,
            start_open: false,
        }
    }

    pub fn with_open_duration(mut self, open_duration: f64) -> Self {
        self.open_duration = Some(open_duration);
        self
    }

    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = Some(capacity);
        self
    }

    pub fn starting_open(mut self) -> Self {
        self.start_open = true;
        self
    }

    pub fn effective_open_duration(&self) -> f64 {
        self.open_duration.unwrap_or(self.closed_duration / 2.0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(windows) = &self.windows {
            return validate_windows(windows);
        }
        if !self.closed_duration.is_finite() || self.closed_duration <= 0.0 {
            return Err(ConfigError::InvalidGate(format!(
                "closed duration must be > 0, got {}",
                self.closed_duration
            )));
        }
        let open = self.effective_open_duration();
        if !open.is_finite() || open <= 0.0 {
            return Err(ConfigError::InvalidGate(format!(
                "open duration must be > 0, got {}",
                open
            )));
        }
        Ok(())
    }
}

fn validate_windows(windows: &[(f64, f64)]) -> Result<(), ConfigError> {
    for &(start, end) in windows {
        if !start.is_finite() || !end.is_finite() || start < 0.0 || end <= start {
            return Err(ConfigError::InvalidGate(format!(
                "closed window [{}, {}) must satisfy 0 <= start < end",
                start, end
            )));
        }
    }
    for pair in windows.windows(2) {
        if pair[1].0 < pair[0].1 {
            return Err(ConfigError::InvalidGate(format!(
                "closed windows [{}, {}) and [{}, {}) overlap or are out of order",
                pair[0].0, pair[0].1, pair[1].0, pair[1].1
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    Closed,
    Open,
}

/// What the gate does with an arriving job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Gate open, job goes straight to admission
    Pass,
    /// Gate closed, job held in the buffer
    Buffered,
    /// Gate closed and the bounded buffer is full
    Overflow,
}

/// Result of a state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateTransition {
    /// Buffered jobs in arrival order, to be submitted to admission
    Opened { released: Vec<JobId> },
    Closed,
}

/// Where the next transition comes from
#[derive(Debug, Clone)]
enum Schedule {
    Periodic,
    /// `cursor` is the window whose start or end is the next transition
    Windows { windows: Vec<(f64, f64)>, cursor: usize },
}

/// Two-state timer with an arrival buffer
#[derive(Debug, Clone)]
pub struct GatingController {
    config: GatingConfig,
    schedule: Schedule,
    state: GateState,
    next_transition: f64,
    buffer: VecDeque<JobId>,
}

impl GatingController {
    pub fn new(config: GatingConfig) -> Self {
        let (schedule, state, first) = match config.windows.clone() {
            Some(windows) => {
                let (state, first) = match windows.first() {
                    Some(&(start, end)) if start <= 0.0 => (GateState::Closed, end),
                    Some(&(start, _)) => (GateState::Open, start),
                    None => (GateState::Open, f64::INFINITY),
                };
                (Schedule::Windows { windows, cursor: 0 }, state, first)
            }
            None if config.start_open => (
                Schedule::Periodic,
                GateState::Open,
                config.effective_open_duration(),
            ),
            None => (Schedule::Periodic, GateState::Closed, config.closed_duration),
        };
        Self {
            config,
            schedule,
            state,
            next_transition: first,
            buffer: VecDeque::new(),
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == GateState::Open
    }

    /// Time of the next scheduled state change, infinite once a windowed
    /// gate has passed its last window
    pub fn next_transition(&self) -> f64 {
        self.next_transition
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn buffered_jobs(&self) -> impl Iterator<Item = JobId> + '_ {
        self.buffer.iter().copied()
    }

    pub fn on_arrival(&mut self, job_id: JobId) -> GateDecision {
        match self.state {
            GateState::Open => GateDecision::Pass,
            GateState::Closed => match self.config.buffer_capacity {
                Some(cap) if self.buffer.len() >= cap => GateDecision::Overflow,
                _ => {
                    self.buffer.push_back(job_id);
                    GateDecision::Buffered
                }
            },
        }
    }

    /// Flip the state at `now` and arm the next transition
    pub fn toggle(&mut self, now: f64) -> GateTransition {
        match self.state {
            GateState::Closed => {
                self.state = GateState::Open;
                self.next_transition = match &mut self.schedule {
                    Schedule::Periodic => now + self.config.effective_open_duration(),
                    Schedule::Windows { windows, cursor } => {
                        *cursor += 1;
                        windows.get(*cursor).map_or(f64::INFINITY, |w| w.0)
                    }
                };
                let released: Vec<JobId> = self.buffer.drain(..).collect();
                debug!(time = now, released = released.len(), "gate opened");
                GateTransition::Opened { released }
            }
            GateState::Open => {
                self.state = GateState::Closed;
                self.next_transition = match &self.schedule {
                    Schedule::Periodic => now + self.config.closed_duration,
                    Schedule::Windows { windows, cursor } => {
                        windows.get(*cursor).map_or(f64::INFINITY, |w| w.1)
                    }
                };
                debug!(time = now, "gate closed");
                GateTransition::Closed
            }
        }
    }
}
