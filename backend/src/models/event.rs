//! Event logging for simulation replay and analysis.
//!
//! The event log is the only data contract between the engine and the
//! analysis/reporting side. One [`EventRecord`] is appended per state
//! transition, in dispatch order, and the log is never rewritten.
//!
//! # Event Kinds
//!
//! - **Job lifecycle**: arrival, buffered, admitted, rejected(cause),
//!   service_start, backup_start, backup_end, service_end, preempted, resumed
//! - **Resource lifecycle**: gate_opened, gate_closed, resource_down, resource_up
//!
//! # Example
//!
//! ```rust
//! use queue_simulator_core_rs::models::event::{EventKind, EventLog, EventRecord};
//!
//! let mut log = EventLog::new();
//! log.log(EventRecord::for_resource(3.0, EventKind::GateOpened, "grader", 12));
//!
//! assert_eq!(log.len(), 1);
//! assert_eq!(log.events()[0].kind.name(), "gate_opened");
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

use super::job::{Job, JobId};

/// Why a job was refused at admission
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionCause {
    /// Waiting area bounded and full
    QueueFull,
    /// Loss system (no waiting area) with every server busy
    ServersFull,
    /// Resource currently failed
    ResourceDown,
    /// Bounded gate buffer full while the gate is closed
    GateBufferFull,
}

impl RejectionCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionCause::QueueFull => "queue_full",
            RejectionCause::ServersFull => "servers_full",
            RejectionCause::ResourceDown => "resource_down",
            RejectionCause::GateBufferFull => "gate_buffer_full",
        }
    }
}

impl fmt::Display for RejectionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_kind", rename_all = "snake_case")]
pub enum EventKind {
    Arrival,
    Buffered,
    Admitted,
    Rejected { cause: RejectionCause },
    ServiceStart,
    BackupStart,
    BackupEnd,
    /// Job completion
    ServiceEnd,
    Preempted,
    Resumed,
    GateOpened,
    GateClosed,
    ResourceDown,
    ResourceUp,
}

impl EventKind {
    /// Short snake_case name, matching the serialized tag
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Arrival => "arrival",
            EventKind::Buffered => "buffered",
            EventKind::Admitted => "admitted",
            EventKind::Rejected { .. } => "rejected",
            EventKind::ServiceStart => "service_start",
            EventKind::BackupStart => "backup_start",
            EventKind::BackupEnd => "backup_end",
            EventKind::ServiceEnd => "service_end",
            EventKind::Preempted => "preempted",
            EventKind::Resumed => "resumed",
            EventKind::GateOpened => "gate_opened",
            EventKind::GateClosed => "gate_closed",
            EventKind::ResourceDown => "resource_down",
            EventKind::ResourceUp => "resource_up",
        }
    }

    /// Rejection cause, if this is a rejection
    pub fn cause(&self) -> Option<RejectionCause> {
        match self {
            EventKind::Rejected { cause } => Some(*cause),
            _ => None,
        }
    }
}

/// One row of the event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub time: f64,

    #[serde(flatten)]
    pub kind: EventKind,

    /// None for resource-level records
    pub job_id: Option<JobId>,

    pub population: Option<String>,

    pub resource_id: String,

    /// Waiting-area length after the transition was applied
    pub queue_length_at_time: usize,

    pub service_time: Option<f64>,

    pub backup_time: Option<f64>,

    pub waiting_time: Option<f64>,

    pub response_time: Option<f64>,
}

impl EventRecord {
    /// Build a record describing `job` at `time`
    ///
    /// Timing fields are taken from the job's current state, so they are
    /// only present once known.
    pub fn for_job(
        time: f64,
        kind: EventKind,
        job: &Job,
        resource_id: &str,
        queue_length_at_time: usize,
    ) -> Self {
        Self {
            time,
            kind,
            job_id: Some(job.id()),
            population: Some(job.population().to_string()),
            resource_id: resource_id.to_string(),
            queue_length_at_time,
            service_time: Some(job.service_time()),
            backup_time: job.backup_time(),
            waiting_time: job.waiting_time(),
            response_time: job.response_time(),
        }
    }

    /// Build a resource-level record (gate or failure transition)
    pub fn for_resource(
        time: f64,
        kind: EventKind,
        resource_id: &str,
        queue_length_at_time: usize,
    ) -> Self {
        Self {
            time,
            kind,
            job_id: None,
            population: None,
            resource_id: resource_id.to_string(),
            queue_length_at_time,
            service_time: None,
            backup_time: None,
            waiting_time: None,
            response_time: None,
        }
    }
}

/// Append-only event log
///
/// This is a simple wrapper around `Vec<EventRecord>` with query helpers.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<EventRecord>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Append a record
    pub fn log(&mut self, event: EventRecord) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// All records in dispatch order
    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    /// Records whose kind name matches (e.g. `"service_end"`)
    pub fn events_of_kind(&self, name: &str) -> Vec<&EventRecord> {
        self.events.iter().filter(|e| e.kind.name() == name).collect()
    }

    /// Records for one job
    pub fn events_for_job(&self, job_id: JobId) -> Vec<&EventRecord> {
        self.events
            .iter()
            .filter(|e| e.job_id == Some(job_id))
            .collect()
    }

    /// Records for one resource
    pub fn events_for_resource(&self, resource_id: &str) -> Vec<&EventRecord> {
        self.events
            .iter()
            .filter(|e| e.resource_id == resource_id)
            .collect()
    }

    /// Rejection histogram keyed by cause
    pub fn rejections_by_cause(&self) -> BTreeMap<RejectionCause, usize> {
        let mut histogram = BTreeMap::new();
        for cause in self.events.iter().filter_map(|e| e.kind.cause()) {
            *histogram.entry(cause).or_insert(0) += 1;
        }
        histogram
    }

    /// One JSON object per line, in log order
    pub fn to_json_lines(&self) -> Result<String, serde_json::Error> {
        let mut out = String::new();
        for event in &self.events {
            out.push_str(&serde_json::to_string(event)?);
            out.push('\n');
        }
        Ok(out)
    }

    /// SHA-256 over the JSON-lines export, hex encoded
    ///
    /// Two runs with identical configuration and seed produce the same digest.
    pub fn digest(&self) -> Result<String, serde_json::Error> {
        let mut hasher = Sha256::new();
        for event in &self.events {
            hasher.update(serde_json::to_vec(event)?);
            hasher.update(b"\n");
        }
        Ok(format!("{:x}", hasher.finalize()))
    }
}
