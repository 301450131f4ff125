//! End-of-run summary
//!
//! Counters and means derived from the resources and the job arena once the
//! clock has settled on the horizon. The event log stays the primary output;
//! the report is a convenience for callers that only need aggregates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::event::RejectionCause;
use crate::models::job::Job;
use crate::models::resource::Resource;

/// Aggregates for one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceReport {
    pub id: String,
    pub servers: usize,
    pub queue_capacity: Option<usize>,
    pub policy: String,
    pub arrivals: usize,
    pub admitted: usize,
    pub completed: usize,
    pub rejected: usize,
    pub rejected_by_cause: BTreeMap<RejectionCause, usize>,
    /// Buffered, queued, in service, preempted or in detached backup at the horizon
    pub open: usize,
    pub preemptions: usize,
    pub failures: usize,
    pub downtime: f64,
    pub backups_applied: usize,
    pub total_backup_time: f64,
    pub busy_time: f64,
    pub peak_in_service: usize,
    pub peak_queued: usize,
    pub gate_batches: Vec<usize>,
    pub mean_waiting_time: Option<f64>,
    pub mean_response_time: Option<f64>,
    pub rejection_rate: f64,
    pub utilization: f64,
}

impl ResourceReport {
    /// `arrivals == completed + rejected + open`
    pub fn is_conserved(&self) -> bool {
        self.arrivals == self.completed + self.rejected + self.open
    }

    pub fn mean_gate_batch(&self) -> Option<f64> {
        if self.gate_batches.is_empty() {
            return None;
        }
        Some(self.gate_batches.iter().sum::<usize>() as f64 / self.gate_batches.len() as f64)
    }
}

/// Aggregates for one population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationReport {
    pub name: String,
    pub resource: String,
    pub arrivals: usize,
    pub completed: usize,
    pub rejected: usize,
    pub open: usize,
    pub mean_waiting_time: Option<f64>,
    pub mean_response_time: Option<f64>,
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// SHA-256 of the canonical configuration
    pub config_fingerprint: String,
    pub rng_seed: u64,
    pub horizon: f64,
    pub events_processed: u64,
    pub total_jobs: usize,
    /// SHA-256 of the event log's JSON-lines form
    pub log_digest: String,
    pub resources: Vec<ResourceReport>,
    pub populations: Vec<PopulationReport>,
}

impl SimulationReport {
    pub fn resource(&self, id: &str) -> Option<&ResourceReport> {
        self.resources.iter().find(|r| r.id == id)
    }

    pub fn population(&self, name: &str) -> Option<&PopulationReport> {
        self.populations.iter().find(|p| p.name == name)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Default)]
struct JobTally {
    arrivals: usize,
    completed: usize,
    rejected: usize,
    open: usize,
    waiting_sum: f64,
    response_sum: f64,
}

impl JobTally {
    fn add(&mut self, job: &Job) {
        self.arrivals += 1;
        if job.is_completed() {
            self.completed += 1;
            self.waiting_sum += job.waiting_time().unwrap_or(0.0);
            self.response_sum += job.response_time().unwrap_or(0.0);
        } else if job.is_rejected() {
            self.rejected += 1;
        } else {
            self.open += 1;
        }
    }

    fn mean_waiting(&self) -> Option<f64> {
        (self.completed > 0).then(|| self.waiting_sum / self.completed as f64)
    }

    fn mean_response(&self) -> Option<f64> {
        (self.completed > 0).then(|| self.response_sum / self.completed as f64)
    }
}

pub(crate) struct ReportInputs<'a> {
    pub config_fingerprint: String,
    pub rng_seed: u64,
    pub horizon: f64,
    /// Time covered by the resource accounting, the horizon once finished
    pub elapsed: f64,
    pub events_processed: u64,
    pub log_digest: String,
    pub resources: Vec<&'a Resource>,
    /// (name, resource id) in configuration order
    pub populations: Vec<(&'a str, &'a str)>,
    pub jobs: &'a [Job],
}

pub(crate) fn build_report(inputs: ReportInputs<'_>) -> SimulationReport {
    let mut by_resource: Vec<JobTally> = inputs.resources.iter().map(|_| JobTally::default()).collect();
    let mut by_population: Vec<JobTally> =
        inputs.populations.iter().map(|_| JobTally::default()).collect();

    for job in inputs.jobs {
        if let Some(tally) = by_resource.get_mut(job.resource_index()) {
            tally.add(job);
        }
        if let Some(tally) = by_population.get_mut(job.population_index()) {
            tally.add(job);
        }
    }

    let resources = inputs
        .resources
        .iter()
        .zip(&by_resource)
        .map(|(resource, tally)| {
            let stats = resource.stats();
            let rejected = stats.total_rejected();
            ResourceReport {
                id: resource.id().to_string(),
                servers: resource.servers(),
                queue_capacity: resource.queue_capacity(),
                policy: resource.policy().to_string(),
                arrivals: stats.arrivals,
                admitted: stats.admitted,
                completed: stats.completed,
                rejected,
                rejected_by_cause: stats.rejected.clone(),
                open: tally.open,
                preemptions: stats.preemptions,
                failures: stats.failures,
                downtime: stats.downtime,
                backups_applied: stats.backups_applied,
                total_backup_time: stats.total_backup_time,
                busy_time: stats.busy_time,
                peak_in_service: stats.peak_in_service,
                peak_queued: stats.peak_queued,
                gate_batches: stats.gate_batches.clone(),
                mean_waiting_time: tally.mean_waiting(),
                mean_response_time: tally.mean_response(),
                rejection_rate: if stats.arrivals > 0 {
                    rejected as f64 / stats.arrivals as f64
                } else {
                    0.0
                },
                utilization: if inputs.elapsed > 0.0 {
                    stats.busy_time / (resource.servers() as f64 * inputs.elapsed)
                } else {
                    0.0
                },
            }
        })
        .collect();

    let populations = inputs
        .populations
        .iter()
        .zip(&by_population)
        .map(|((name, resource), tally)| PopulationReport {
            name: name.to_string(),
            resource: resource.to_string(),
            arrivals: tally.arrivals,
            completed: tally.completed,
            rejected: tally.rejected,
            open: tally.open,
            mean_waiting_time: tally.mean_waiting(),
            mean_response_time: tally.mean_response(),
        })
        .collect();

    SimulationReport {
        config_fingerprint: inputs.config_fingerprint,
        rng_seed: inputs.rng_seed,
        horizon: inputs.horizon,
        events_processed: inputs.events_processed,
        total_jobs: inputs.jobs.len(),
        log_digest: inputs.log_digest,
        resources,
        populations,
    }
}
