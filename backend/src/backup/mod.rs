//! Backup strategies
//!
//! A backup is an extra bounded delay applied to a job, modelling a
//! durability safeguard taken while (or right after) the server processes it.
//! The strategy decides per job whether the backup happens; the duration
//! distribution decides how long it takes.
//!
//! # Variants
//!
//! - **Systematic**: every job is backed up
//! - **Random(p)**: independent Bernoulli trial per job
//! - **Conditional**: backup iff the instantaneous load metric exceeds a
//!   threshold at the decision instant
//!
//! The decision is taken when the job is granted a server slot. Draws come
//! from the resource's own backup stream, so the arrival and service draw
//! sequence is identical whatever the backup configuration.
//!
//! # Example
//!
//! ```rust
//! use queue_simulator_core_rs::backup::{
//!     BackupConfig, BackupPolicy, BackupStrategy, DurationDistribution, LoadSnapshot,
//! };
//! use queue_simulator_core_rs::RngManager;
//!
//! let config = BackupConfig::new(
//!     BackupStrategy::Systematic,
//!     DurationDistribution::Fixed { value: 0.2 },
//! );
//! let mut policy = BackupPolicy::new(config, RngManager::new(1));
//! let load = LoadSnapshot { queue_length: 0, in_service: 1, servers: 2 };
//!
//! assert_eq!(policy.decide(&load), Some(0.2));
//! ```

use serde::{Deserialize, Serialize};

use crate::orchestrator::config::ConfigError;
use crate::rng::RngManager;

/// Load metric consulted by [`BackupStrategy::Conditional`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMetric {
    /// Jobs in the waiting area
    QueueLength,
    /// Busy slots over total slots
    Utilization,
}

/// Which jobs get backed up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackupStrategy {
    Systematic,
    Random { probability: f64 },
    Conditional { metric: LoadMetric, threshold: f64 },
}

/// Backup duration distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DurationDistribution {
    Fixed { value: f64 },
    Exponential { rate: f64 },
    Uniform { min: f64, max: f64 },
}

impl DurationDistribution {
    pub fn sample(&self, rng: &mut RngManager) -> f64 {
        match self {
            DurationDistribution::Fixed { value } => *value,
            DurationDistribution::Exponential { rate } => rng.exponential(*rate),
            DurationDistribution::Uniform { min, max } => rng.uniform(*min, *max),
        }
    }

    /// Expected duration
    pub fn mean(&self) -> f64 {
        match self {
            DurationDistribution::Fixed { value } => *value,
            DurationDistribution::Exponential { rate } => 1.0 / rate,
            DurationDistribution::Uniform { min, max } => (min + max) / 2.0,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            DurationDistribution::Fixed { value } => {
                if !value.is_finite() || *value < 0.0 {
                    return Err(ConfigError::InvalidParameter(format!(
                        "fixed backup duration must be finite and >= 0, got {}",
                        value
                    )));
                }
            }
            DurationDistribution::Exponential { rate } => {
                if !rate.is_finite() || *rate <= 0.0 {
                    return Err(ConfigError::NonPositiveRate {
                        name: "backup duration rate".to_string(),
                        value: *rate,
                    });
                }
            }
            DurationDistribution::Uniform { min, max } => {
                if !min.is_finite() || !max.is_finite() || *min < 0.0 || min > max {
                    return Err(ConfigError::InvalidParameter(format!(
                        "uniform backup duration needs 0 <= min <= max, got [{}, {}]",
                        min, max
                    )));
                }
            }
        }
        Ok(())
    }
}

/// When the backup runs relative to primary service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupMode {
    /// Same slot, backup first
    #[default]
    BeforeService,
    /// Same slot, backup after service
    AfterService,
    /// Slot released at the end of service, backup runs off-slot
    Detached,
}

impl BackupMode {
    /// Backup occupies the server slot
    pub fn holds_slot(&self) -> bool {
        !matches!(self, BackupMode::Detached)
    }
}

/// Per-resource backup configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupConfig {
    pub strategy: BackupStrategy,
    pub duration: DurationDistribution,
    #[serde(default)]
    pub mode: BackupMode,
}

impl BackupConfig {
    pub fn new(strategy: BackupStrategy, duration: DurationDistribution) -> Self {
        Self {
            strategy,
            duration,
            mode: BackupMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: BackupMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.strategy {
            BackupStrategy::Systematic => {}
            BackupStrategy::Random { probability } => {
                if !(0.0..=1.0).contains(probability) {
                    return Err(ConfigError::InvalidProbability(*probability));
                }
            }
            BackupStrategy::Conditional { threshold, .. } => {
                if !threshold.is_finite() {
                    return Err(ConfigError::InvalidParameter(format!(
                        "conditional backup threshold must be finite, got {}",
                        threshold
                    )));
                }
            }
        }
        self.duration.validate()
    }
}

/// Resource occupancy at a decision instant
///
/// Excludes the job being decided: `queue_length` counts the jobs still
/// waiting and `in_service` the other slots held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSnapshot {
    pub queue_length: usize,
    pub in_service: usize,
    pub servers: usize,
}

impl LoadSnapshot {
    pub fn utilization(&self) -> f64 {
        if self.servers == 0 {
            return 0.0;
        }
        self.in_service as f64 / self.servers as f64
    }

    pub fn metric(&self, metric: LoadMetric) -> f64 {
        match metric {
            LoadMetric::QueueLength => self.queue_length as f64,
            LoadMetric::Utilization => self.utilization(),
        }
    }
}

/// A backup configuration bound to its random stream
#[derive(Debug, Clone)]
pub struct BackupPolicy {
    config: BackupConfig,
    rng: RngManager,
}

impl BackupPolicy {
    pub fn new(config: BackupConfig, rng: RngManager) -> Self {
        Self { config, rng }
    }

    pub fn mode(&self) -> BackupMode {
        self.config.mode
    }

    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// Whether the job being granted a slot gets backed up
    ///
    /// `Random` consumes exactly one draw per call.
    pub fn should_backup(&mut self, load: &LoadSnapshot) -> bool {
        match &self.config.strategy {
            BackupStrategy::Systematic => true,
            BackupStrategy::Random { probability } => self.rng.bernoulli(*probability),
            BackupStrategy::Conditional { metric, threshold } => load.metric(*metric) > *threshold,
        }
    }

    pub fn backup_duration(&mut self) -> f64 {
        self.config.duration.sample(&mut self.rng)
    }

    /// Decision and duration in one call; `None` means no backup
    pub fn decide(&mut self, load: &LoadSnapshot) -> Option<f64> {
        if self.should_backup(load) {
            Some(self.backup_duration())
        } else {
            None
        }
    }
}
