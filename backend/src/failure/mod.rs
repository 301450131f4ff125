//! Failure and recovery timers
//!
//! Each resource with a [`FailureConfig`] alternates between UP and DOWN.
//! UP periods are exponential with mean MTBF and DOWN periods exponential
//! with mean MTTR, drawn from the resource's own failure stream. The
//! controller only keeps time. Preemption and resumption are carried out
//! by the engine on the resource.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::resource::ResourceStatus;
use crate::orchestrator::config::ConfigError;
use crate::rng::RngManager;

/// Mean up and down durations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FailureConfig {
    /// Mean time between failures
    pub mtbf: f64,
    /// Mean time to repair
    pub mttr: f64,
}

impl FailureConfig {
    pub fn new(mtbf: f64, mttr: f64) -> Self {
        Self { mtbf, mttr }
    }

    /// Long-run fraction of time UP
    pub fn availability(&self) -> f64 {
        self.mtbf / (self.mtbf + self.mttr)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("mtbf", self.mtbf), ("mttr", self.mttr)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NonPositiveRate {
                    name: name.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FailureController {
    config: FailureConfig,
    rng: RngManager,
    status: ResourceStatus,
    next_transition: f64,
}

impl FailureController {
    /// Starts UP, first failure drawn from `now = 0`
    pub fn new(config: FailureConfig, mut rng: RngManager) -> Self {
        let first = rng.exponential(1.0 / config.mtbf);
        Self {
            config,
            rng,
            status: ResourceStatus::Up,
            next_transition: first,
        }
    }

    pub fn status(&self) -> ResourceStatus {
        self.status
    }

    pub fn next_transition(&self) -> f64 {
        self.next_transition
    }

    pub fn config(&self) -> &FailureConfig {
        &self.config
    }

    /// Flip UP/DOWN at `now`, draw the holding time of the new state and
    /// return the new status
    pub fn toggle(&mut self, now: f64) -> ResourceStatus {
        let (status, mean) = match self.status {
            ResourceStatus::Up => (ResourceStatus::Down, self.config.mttr),
            ResourceStatus::Down => (ResourceStatus::Up, self.config.mtbf),
        };
        self.status = status;
        self.next_transition = now + self.rng.exponential(1.0 / mean);
        debug!(time = now, ?status, next = self.next_transition, "resource availability changed");
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alternates_states() {
        let mut ctl = FailureController::new(FailureConfig::new(10.0, 1.0), RngManager::new(4));
        assert_eq!(ctl.status(), ResourceStatus::Up);
        let t1 = ctl.next_transition();
        assert!(t1 > 0.0);
        assert_eq!(ctl.toggle(t1), ResourceStatus::Down);
        assert!(ctl.next_transition() >= t1);
        let t2 = ctl.next_transition();
        assert_eq!(ctl.toggle(t2), ResourceStatus::Up);
    }

    #[test]
    fn test_long_run_availability() {
        let config = FailureConfig::new(9.0, 1.0);
        let mut ctl = FailureController::new(config, RngManager::new(31));
        let mut up_time = ctl.next_transition();
        let mut now = up_time;
        let mut down_time = 0.0;
        for _ in 0..20_000 {
            let status = ctl.toggle(now);
            let next = ctl.next_transition();
            match status {
                ResourceStatus::Down => down_time += next - now,
                ResourceStatus::Up => up_time += next - now,
            }
            now = next;
        }
        let availability = up_time / (up_time + down_time);
        assert!((availability - config.availability()).abs() < 0.01);
    }

    #[test]
    fn test_validation() {
        assert!(FailureConfig::new(0.0, 1.0).validate().is_err());
        assert!(FailureConfig::new(5.0, f64::NAN).validate().is_err());
        assert!(FailureConfig::new(5.0, 1.0).validate().is_ok());
    }
}
