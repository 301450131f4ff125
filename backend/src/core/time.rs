//! Time management for the simulation
//!
//! The simulation operates in continuous time. The clock only moves
//! forward, and only when the event queue hands out the next event.

use serde::{Deserialize, Serialize};

/// Simulated clock with an optional run horizon
///
/// # Example
/// ```
/// use queue_simulator_core_rs::SimClock;
///
/// let mut clock = SimClock::new(100.0);
/// assert_eq!(clock.now(), 0.0);
///
/// clock.advance_to(2.5);
/// assert_eq!(clock.now(), 2.5);
/// assert!(!clock.horizon_reached());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimClock {
    /// Current simulated time
    now: f64,
    /// Time at which the run stops
    horizon: f64,
}

impl SimClock {
    /// Create a new clock at time zero
    ///
    /// # Panics
    /// Panics if `horizon` is not strictly positive. The configuration layer
    /// validates the horizon before a clock is ever built.
    pub fn new(horizon: f64) -> Self {
        assert!(horizon > 0.0, "horizon must be positive");
        Self { now: 0.0, horizon }
    }

    /// Move the clock forward to `time`
    ///
    /// # Panics
    /// Panics if `time` is earlier than the current time. The event queue
    /// refuses such events at scheduling time, so reaching this is a bug.
    pub fn advance_to(&mut self, time: f64) {
        assert!(
            time >= self.now,
            "clock cannot move backwards ({} -> {})",
            self.now,
            time
        );
        self.now = time;
    }

    /// Current simulated time
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Run horizon
    pub fn horizon(&self) -> f64 {
        self.horizon
    }

    /// True once the clock sits at (or past) the horizon
    pub fn horizon_reached(&self) -> bool {
        self.now >= self.horizon
    }

    /// True if an event at `time` falls inside the run
    pub fn within_horizon(&self, time: f64) -> bool {
        time < self.horizon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "horizon must be positive")]
    fn test_zero_horizon_panics() {
        SimClock::new(0.0);
    }

    #[test]
    #[should_panic(expected = "clock cannot move backwards")]
    fn test_backwards_advance_panics() {
        let mut clock = SimClock::new(10.0);
        clock.advance_to(5.0);
        clock.advance_to(4.0);
    }

    #[test]
    fn test_same_time_advance_is_allowed() {
        let mut clock = SimClock::new(10.0);
        clock.advance_to(3.0);
        clock.advance_to(3.0);
        assert_eq!(clock.now(), 3.0);
    }

    #[test]
    fn test_horizon_boundary() {
        let mut clock = SimClock::new(10.0);
        assert!(clock.within_horizon(9.999));
        assert!(!clock.within_horizon(10.0));
        clock.advance_to(10.0);
        assert!(clock.horizon_reached());
    }
}
