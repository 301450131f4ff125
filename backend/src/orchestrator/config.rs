//! Simulation configuration
//!
//! The whole run is described by one [`SimulationConfig`]: a seed, a
//! horizon, the resources and the populations feeding them. It can be
//! built in code or loaded from JSON, and it is validated in full before
//! the engine schedules anything.
//!
//! # Example
//!
//! ```rust
//! use queue_simulator_core_rs::orchestrator::config::{
//!     PopulationConfig, ResourceConfig, SimulationConfig,
//! };
//!
//! let config = SimulationConfig::new(42, 1000.0)
//!     .with_resource(ResourceConfig::new("grader", 2).with_queue_capacity(5))
//!     .with_population(PopulationConfig::poisson("ING", "grader", 3.0, 2.5));
//!
//! assert!(config.validate().is_ok());
//! ```
//!
//! The same configuration as JSON:
//!
//! ```json
//! {
//!   "rng_seed": 42,
//!   "horizon": 1000.0,
//!   "resources": [{ "id": "grader", "servers": 2, "queue_capacity": 5 }],
//!   "populations": [
//!     { "name": "ING", "resource": "grader", "arrival_rate": 3.0, "service_rate": 2.5 }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use thiserror::Error;

use crate::arrivals::ArrivalSource;
use crate::backup::BackupConfig;
use crate::failure::FailureConfig;
use crate::gating::GatingConfig;
use crate::policy::SchedulingPolicy;

/// Construction-time configuration failures
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("horizon must be finite and > 0, got {0}")]
    InvalidHorizon(f64),

    #[error("at least one resource is required")]
    NoResources,

    #[error("at least one population is required")]
    NoPopulations,

    #[error("resource {0} must have at least one server")]
    ZeroServers(String),

    #[error("duplicate resource id: {0}")]
    DuplicateResource(String),

    #[error("duplicate population name: {0}")]
    DuplicatePopulation(String),

    #[error("population {population} targets unknown resource {resource}")]
    UnknownResource { population: String, resource: String },

    #[error("{name} must be finite and > 0, got {value}")]
    NonPositiveRate { name: String, value: f64 },

    #[error("probability must be in [0, 1], got {0}")]
    InvalidProbability(f64),

    #[error("unknown scheduling policy: {0}")]
    UnknownPolicy(String),

    #[error("trace for population {0} must be finite, >= 0 and non-decreasing")]
    InvalidTrace(String),

    #[error("invalid gate: {0}")]
    InvalidGate(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("invalid configuration JSON: {0}")]
    Json(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Json(err.to_string())
    }
}

/// Complete run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Master seed, every random stream derives from it
    pub rng_seed: u64,

    /// Run end time; nothing is dispatched at or after it
    pub horizon: f64,

    pub resources: Vec<ResourceConfig>,

    pub populations: Vec<PopulationConfig>,
}

/// One server pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub id: String,

    /// Concurrent services `c`
    pub servers: usize,

    /// Waiting-area bound `k`. `None` is unbounded, `Some(0)` a loss system.
    #[serde(default)]
    pub queue_capacity: Option<usize>,

    #[serde(default)]
    pub scheduling: SchedulingPolicy,

    #[serde(default)]
    pub backup: Option<BackupConfig>,

    #[serde(default)]
    pub gating: Option<GatingConfig>,

    #[serde(default)]
    pub failure: Option<FailureConfig>,
}

impl ResourceConfig {
    /// `servers` slots, unbounded FIFO queue, no backup, gate or failures
    pub fn new(id: impl Into<String>, servers: usize) -> Self {
        Self {
            id: id.into(),
            servers,
            queue_capacity: None,
            scheduling: SchedulingPolicy::Fifo,
            backup: None,
            gating: None,
            failure: None,
        }
    }

    pub fn with_queue_capacity(mut self, k: usize) -> Self {
        self.queue_capacity = Some(k);
        self
    }

    pub fn with_policy(mut self, policy: SchedulingPolicy) -> Self {
        self.scheduling = policy;
        self
    }

    /// Parse and set the policy from its textual form (`"sjf"`, `"priority(A,B)"`)
    pub fn with_policy_name(mut self, name: &str) -> Result<Self, ConfigError> {
        self.scheduling = name.parse()?;
        Ok(self)
    }

    pub fn with_backup(mut self, backup: BackupConfig) -> Self {
        self.backup = Some(backup);
        self
    }

    pub fn with_gating(mut self, gating: GatingConfig) -> Self {
        self.gating = Some(gating);
        self
    }

    pub fn with_failure(mut self, failure: FailureConfig) -> Self {
        self.failure = Some(failure);
        self
    }
}

/// One class of submissions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationConfig {
    pub name: String,

    /// Id of the resource this population submits to
    pub resource: String,

    /// λ, used by Poisson sources
    pub arrival_rate: f64,

    /// μ, service draws are exponential with this rate
    pub service_rate: f64,

    #[serde(default)]
    pub source: ArrivalSource,
}

impl PopulationConfig {
    pub fn poisson(
        name: impl Into<String>,
        resource: impl Into<String>,
        arrival_rate: f64,
        service_rate: f64,
    ) -> Self {
        Self {
            name: name.into(),
            resource: resource.into(),
            arrival_rate,
            service_rate,
            source: ArrivalSource::Poisson,
        }
    }

    /// Replay recorded arrival instants. `arrival_rate` is informational
    /// and set to the empirical rate of the trace.
    pub fn trace(
        name: impl Into<String>,
        resource: impl Into<String>,
        timestamps: Vec<f64>,
        service_rate: f64,
    ) -> Self {
        let arrival_rate = match timestamps.last() {
            Some(&last) if last > 0.0 => timestamps.len() as f64 / last,
            _ => 1.0,
        };
        Self {
            name: name.into(),
            resource: resource.into(),
            arrival_rate,
            service_rate,
            source: ArrivalSource::Trace { timestamps },
        }
    }
}

impl SimulationConfig {
    pub fn new(rng_seed: u64, horizon: f64) -> Self {
        Self {
            rng_seed,
            horizon,
            resources: Vec::new(),
            populations: Vec::new(),
        }
    }

    pub fn with_resource(mut self, resource: ResourceConfig) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn with_population(mut self, population: PopulationConfig) -> Self {
        self.populations.push(population);
        self
    }

    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn resource_index(&self, id: &str) -> Option<usize> {
        self.resources.iter().position(|r| r.id == id)
    }

    /// SHA-256 of the canonical JSON form (object keys sorted), hex encoded
    pub fn fingerprint(&self) -> Result<String, ConfigError> {
        let value = serde_json::to_value(self)?;
        let canonical = serde_json::to_string(&value)?;
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Check every parameter. Runs before any event is scheduled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.horizon.is_finite() || self.horizon <= 0.0 {
            return Err(ConfigError::InvalidHorizon(self.horizon));
        }

        if self.resources.is_empty() {
            return Err(ConfigError::NoResources);
        }
        if self.populations.is_empty() {
            return Err(ConfigError::NoPopulations);
        }

        let mut resource_ids = HashSet::new();
        for resource in &self.resources {
            if !resource_ids.insert(resource.id.as_str()) {
                return Err(ConfigError::DuplicateResource(resource.id.clone()));
            }
            if resource.servers == 0 {
                return Err(ConfigError::ZeroServers(resource.id.clone()));
            }
            if let Some(backup) = &resource.backup {
                backup.validate()?;
            }
            if let Some(gating) = &resource.gating {
                gating.validate()?;
            }
            if let Some(failure) = &resource.failure {
                failure.validate()?;
            }
        }

        let mut names = HashSet::new();
        for population in &self.populations {
            if !names.insert(population.name.as_str()) {
                return Err(ConfigError::DuplicatePopulation(population.name.clone()));
            }
            if !resource_ids.contains(population.resource.as_str()) {
                return Err(ConfigError::UnknownResource {
                    population: population.name.clone(),
                    resource: population.resource.clone(),
                });
            }
            check_rate(&format!("{} arrival_rate", population.name), population.arrival_rate)?;
            check_rate(&format!("{} service_rate", population.name), population.service_rate)?;

            if let ArrivalSource::Trace { timestamps } = &population.source {
                let finite = timestamps.iter().all(|t| t.is_finite() && *t >= 0.0);
                let sorted = timestamps.windows(2).all(|w| w[0] <= w[1]);
                if !finite || !sorted {
                    return Err(ConfigError::InvalidTrace(population.name.clone()));
                }
            }
        }

        Ok(())
    }
}

fn check_rate(name: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::NonPositiveRate {
            name: name.to_string(),
            value,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> SimulationConfig {
        SimulationConfig::new(1, 100.0)
            .with_resource(ResourceConfig::new("r", 1))
            .with_population(PopulationConfig::poisson("A", "r", 1.0, 2.0))
    }

    #[test]
    fn test_valid_config() {
        assert_eq!(base().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_non_positive_rates() {
        let mut config = base();
        config.populations[0].arrival_rate = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveRate { .. })
        ));

        let mut config = base();
        config.populations[0].service_rate = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_servers_and_bad_horizon() {
        let mut config = base();
        config.resources[0].servers = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroServers("r".to_string())));

        let mut config = base();
        config.horizon = f64::INFINITY;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidHorizon(_))));
    }

    #[test]
    fn test_rejects_unknown_resource_reference() {
        let config = base().with_population(PopulationConfig::poisson("B", "nope", 1.0, 1.0));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownResource { .. })
        ));
    }

    #[test]
    fn test_rejects_duplicates() {
        let config = base().with_resource(ResourceConfig::new("r", 2));
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateResource("r".to_string()))
        );
        let config = base().with_population(PopulationConfig::poisson("A", "r", 1.0, 1.0));
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicatePopulation("A".to_string()))
        );
    }

    #[test]
    fn test_rejects_unsorted_trace() {
        let config = SimulationConfig::new(1, 10.0)
            .with_resource(ResourceConfig::new("r", 1))
            .with_population(PopulationConfig::trace("A", "r", vec![1.0, 0.5], 1.0));
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidTrace("A".to_string()))
        );
    }

    #[test]
    fn test_policy_name_builder() {
        let r = ResourceConfig::new("r", 1).with_policy_name("sjf").unwrap();
        assert_eq!(r.scheduling, SchedulingPolicy::Sjf);
        assert!(ResourceConfig::new("r", 1).with_policy_name("random").is_err());
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = base().fingerprint().unwrap();
        assert_eq!(a, base().fingerprint().unwrap());
        assert_eq!(a.len(), 64);

        let mut changed = base();
        changed.rng_seed = 2;
        assert_ne!(a, changed.fingerprint().unwrap());
    }

    #[test]
    fn test_json_round_trip_and_defaults() {
        let config = SimulationConfig::from_json(
            r#"{
                "rng_seed": 7,
                "horizon": 50.0,
                "resources": [{"id": "r", "servers": 2}],
                "populations": [{"name": "A", "resource": "r", "arrival_rate": 1.0, "service_rate": 1.5}]
            }"#,
        )
        .unwrap();
        assert_eq!(config.resources[0].queue_capacity, None);
        assert_eq!(config.resources[0].scheduling, SchedulingPolicy::Fifo);
        assert_eq!(config.populations[0].source, ArrivalSource::Poisson);

        let back = SimulationConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            SimulationConfig::from_json("{"),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            SimulationConfig::from_json(
                r#"{"rng_seed":1,"horizon":1.0,"resources":[{"id":"r","servers":1,"scheduling":{"type":"lottery"}}],"populations":[]}"#
            ),
            Err(ConfigError::Json(_))
        ));
    }
}
