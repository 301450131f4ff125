//! Job model
//!
//! Represents one submission travelling through the system.
//! Each job has:
//! - A population tag and the resource it targets
//! - Arrival time and a service-time draw made at arrival
//! - Optional backup time (decided when service is granted)
//! - Start / end times, or a rejection cause
//!
//! A job is terminal once completed or rejected and is never reused.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::event::RejectionCause;

/// Job identifier, unique within a run and assigned in creation order
pub type JobId = u64;

/// Where a job currently is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    /// Emitted by a generator, admission not yet evaluated
    Arrived,
    /// Held in a closed gate's buffer
    Buffered,
    /// Admitted and waiting for a server slot
    Queued,
    /// Holding a slot, running the backup phase
    Backup,
    /// Holding a slot, running primary service
    InService,
    /// Was holding a slot when the resource went down
    Preempted,
    /// Slot released, backup running on the detached channel
    DetachedBackup,
    /// Terminal: served
    Completed,
    /// Terminal: refused at admission
    Rejected,
}

impl JobPhase {
    /// True for phases that hold a server slot
    pub fn holds_slot(&self) -> bool {
        matches!(self, JobPhase::Backup | JobPhase::InService)
    }

    /// True once the job can no longer change
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobPhase::Completed | JobPhase::Rejected)
    }
}

/// Errors raised by illegal lifecycle transitions
#[derive(Debug, Error, PartialEq)]
pub enum JobError {
    #[error("job {id} is already terminal ({phase:?})")]
    AlreadyTerminal { id: JobId, phase: JobPhase },

    #[error("job {id} cannot start service at {time} before arriving at {arrival}")]
    StartBeforeArrival { id: JobId, time: f64, arrival: f64 },

    #[error("job {id} cannot complete without having started")]
    NotStarted { id: JobId },
}

/// One submission
///
/// # Example
/// ```
/// use queue_simulator_core_rs::Job;
///
/// let mut job = Job::new(0, "ING".to_string(), 0, 0, 1.5, 0.4);
/// job.mark_started(2.0).unwrap();
/// job.mark_completed(2.4).unwrap();
/// assert_eq!(job.waiting_time(), Some(0.5));
/// assert!((job.response_time().unwrap() - 0.9).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    id: JobId,

    /// Population (class) name
    population: String,

    /// Index of the population in the configuration
    population_index: usize,

    /// Index of the target resource in the configuration
    resource_index: usize,

    arrival_time: f64,

    /// Service-time draw made at arrival
    service_time: f64,

    /// Backup duration, once the strategy has been consulted
    backup_time: Option<f64>,

    /// First time a server slot was granted
    start_time: Option<f64>,

    end_time: Option<f64>,

    rejection: Option<RejectionCause>,

    phase: JobPhase,
}

impl Job {
    /// Create a job in the `Arrived` phase
    pub fn new(
        id: JobId,
        population: String,
        population_index: usize,
        resource_index: usize,
        arrival_time: f64,
        service_time: f64,
    ) -> Self {
        Self {
            id,
            population,
            population_index,
            resource_index,
            arrival_time,
            service_time,
            backup_time: None,
            start_time: None,
            end_time: None,
            rejection: None,
            phase: JobPhase::Arrived,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn population(&self) -> &str {
        &self.population
    }

    pub fn population_index(&self) -> usize {
        self.population_index
    }

    pub fn resource_index(&self) -> usize {
        self.resource_index
    }

    pub fn arrival_time(&self) -> f64 {
        self.arrival_time
    }

    pub fn service_time(&self) -> f64 {
        self.service_time
    }

    pub fn backup_time(&self) -> Option<f64> {
        self.backup_time
    }

    pub fn start_time(&self) -> Option<f64> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<f64> {
        self.end_time
    }

    pub fn rejection(&self) -> Option<RejectionCause> {
        self.rejection
    }

    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    pub fn is_rejected(&self) -> bool {
        self.phase == JobPhase::Rejected
    }

    pub fn is_completed(&self) -> bool {
        self.phase == JobPhase::Completed
    }

    /// Neither completed nor rejected
    pub fn is_open(&self) -> bool {
        !self.phase.is_terminal()
    }

    /// `start - arrival`, once a slot was granted
    pub fn waiting_time(&self) -> Option<f64> {
        self.start_time.map(|s| s - self.arrival_time)
    }

    /// `end - arrival`, once completed
    pub fn response_time(&self) -> Option<f64> {
        self.end_time.map(|e| e - self.arrival_time)
    }

    /// Service plus backup, the time the job occupies the system once started
    pub fn effective_service_time(&self) -> f64 {
        self.service_time + self.backup_time.unwrap_or(0.0)
    }

    /// Move to a non-terminal phase
    pub fn set_phase(&mut self, phase: JobPhase) -> Result<(), JobError> {
        self.ensure_open()?;
        self.phase = phase;
        Ok(())
    }

    pub fn set_backup_time(&mut self, backup_time: f64) {
        self.backup_time = Some(backup_time);
    }

    /// Record the first slot grant. Later grants (after preemption) keep
    /// the original start time.
    pub fn mark_started(&mut self, time: f64) -> Result<(), JobError> {
        self.ensure_open()?;
        if time < self.arrival_time {
            return Err(JobError::StartBeforeArrival {
                id: self.id,
                time,
                arrival: self.arrival_time,
            });
        }
        if self.start_time.is_none() {
            self.start_time = Some(time);
        }
        Ok(())
    }

    pub fn mark_completed(&mut self, time: f64) -> Result<(), JobError> {
        self.ensure_open()?;
        if self.start_time.is_none() {
            return Err(JobError::NotStarted { id: self.id });
        }
        self.end_time = Some(time);
        self.phase = JobPhase::Completed;
        Ok(())
    }

    pub fn mark_rejected(&mut self, cause: RejectionCause) -> Result<(), JobError> {
        self.ensure_open()?;
        self.rejection = Some(cause);
        self.phase = JobPhase::Rejected;
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), JobError> {
        if self.phase.is_terminal() {
            return Err(JobError::AlreadyTerminal {
                id: self.id,
                phase: self.phase,
            });
        }
        Ok(())
    }
}
