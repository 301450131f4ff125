//! Arrival generation for job populations.
//!
//! One [`ArrivalGenerator`] per population produces the stream of arrival
//! instants feeding that population's resource. Each arrival carries its
//! service-time draw, made at arrival so that shortest-job-first comparisons
//! are decidable as soon as the job is queued.
//!
//! # Key Principles
//!
//! 1. **Determinism**: Same seed + same config → same arrivals
//! 2. **Own stream**: Each population draws from its own RNG stream, in the
//!    fixed order inter-arrival gap then service time
//! 3. **Poisson or trace**: Synthetic exponential gaps, or a recorded
//!    sequence of timestamps that is indistinguishable at the resource
//! 4. **Horizon**: Nothing is emitted at or after the horizon
//!
//! # Example
//!
//! ```
//! use queue_simulator_core_rs::arrivals::ArrivalGenerator;
//! use queue_simulator_core_rs::rng::RngManager;
//!
//! let mut gen = ArrivalGenerator::poisson("ING", 0, 3.0, 2.5, RngManager::new(42));
//! let first = gen.next_arrival(100.0).unwrap();
//! assert!(first.time > 0.0 && first.service_time > 0.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::rng::RngManager;

/// Where a population's arrival instants come from
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArrivalSource {
    /// Exponential inter-arrival gaps at the population's arrival rate
    #[default]
    Poisson,
    /// Recorded arrival instants, non-decreasing
    Trace { timestamps: Vec<f64> },
}

/// One generated arrival
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrival {
    pub time: f64,
    pub service_time: f64,
}

#[derive(Debug, Clone)]
enum Process {
    Poisson { rate: f64 },
    Trace { timestamps: Vec<f64>, cursor: usize },
}

/// Arrival stream for a single population
#[derive(Debug, Clone)]
pub struct ArrivalGenerator {
    population: String,
    population_index: usize,
    service_rate: f64,
    process: Process,
    rng: RngManager,
    last_time: f64,
    emitted: usize,
    exhausted: bool,
}

impl ArrivalGenerator {
    /// Poisson stream with rate `arrival_rate`, exponential service at
    /// `service_rate`
    pub fn poisson(
        population: impl Into<String>,
        population_index: usize,
        arrival_rate: f64,
        service_rate: f64,
        rng: RngManager,
    ) -> Self {
        Self::with_process(
            population.into(),
            population_index,
            service_rate,
            Process::Poisson { rate: arrival_rate },
            rng,
        )
    }

    /// Replay recorded arrival instants. Timestamps must be non-decreasing;
    /// configuration validation guarantees it.
    pub fn trace(
        population: impl Into<String>,
        population_index: usize,
        timestamps: Vec<f64>,
        service_rate: f64,
        rng: RngManager,
    ) -> Self {
        Self::with_process(
            population.into(),
            population_index,
            service_rate,
            Process::Trace {
                timestamps,
                cursor: 0,
            },
            rng,
        )
    }

    pub fn from_source(
        population: impl Into<String>,
        population_index: usize,
        source: &ArrivalSource,
        arrival_rate: f64,
        service_rate: f64,
        rng: RngManager,
    ) -> Self {
        match source {
            ArrivalSource::Poisson => {
                Self::poisson(population, population_index, arrival_rate, service_rate, rng)
            }
            ArrivalSource::Trace { timestamps } => Self::trace(
                population,
                population_index,
                timestamps.clone(),
                service_rate,
                rng,
            ),
        }
    }

    fn with_process(
        population: String,
        population_index: usize,
        service_rate: f64,
        process: Process,
        rng: RngManager,
    ) -> Self {
        Self {
            population,
            population_index,
            service_rate,
            process,
            rng,
            last_time: 0.0,
            emitted: 0,
            exhausted: false,
        }
    }

    pub fn population(&self) -> &str {
        &self.population
    }

    pub fn population_index(&self) -> usize {
        self.population_index
    }

    /// Arrivals emitted so far
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Next arrival strictly before `horizon`, or `None` once the stream
    /// has ended. After the first `None` the generator stays exhausted.
    pub fn next_arrival(&mut self, horizon: f64) -> Option<Arrival> {
        if self.exhausted {
            return None;
        }

        let time = match &mut self.process {
            Process::Poisson { rate } => self.last_time + self.rng.exponential(*rate),
            Process::Trace { timestamps, cursor } => match timestamps.get(*cursor) {
                Some(&t) => {
                    *cursor += 1;
                    t
                }
                None => {
                    self.exhausted = true;
                    return None;
                }
            },
        };

        if time >= horizon {
            self.exhausted = true;
            return None;
        }

        let service_time = self.rng.exponential(self.service_rate);
        self.last_time = time;
        self.emitted += 1;
        Some(Arrival { time, service_time })
    }
}
