//! Finite-capacity resource
//!
//! A pool of `c` identical servers in front of an optional bounded waiting
//! area. The resource arbitrates slots only: it never schedules events and
//! never touches a [`Job`](super::job::Job). The engine asks it to admit,
//! release, fail and repair, and it answers with what should happen next.
//!
//! # Invariants
//!
//! - `in_service <= servers` at all times
//! - `waiting <= queue_capacity` when the waiting area is bounded
//! - no slot is held while the resource is down; preempted jobs sit in
//!   their own set and do not count against the waiting bound

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use super::event::RejectionCause;
use super::job::JobId;
use crate::policy::{SchedulingPolicy, WaitingEntry};

/// Availability of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Up,
    Down,
}

/// Outcome of an admission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A slot was free and is now held by the job
    Granted,
    /// Every slot busy, job placed in the waiting area
    Enqueued,
    /// Job refused, terminal
    Rejected(RejectionCause),
}

/// A slot grant produced by [`Resource::next_dispatch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// First grant for a job taken from the waiting area
    Start(JobId),
    /// Grant for a job that was preempted by a failure
    Resume(JobId),
}

/// Counters accumulated over a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceStats {
    pub arrivals: usize,
    pub admitted: usize,
    pub completed: usize,
    pub rejected: BTreeMap<RejectionCause, usize>,
    pub preemptions: usize,
    pub failures: usize,
    pub downtime: f64,
    pub backups_applied: usize,
    pub total_backup_time: f64,
    /// Integral of slots held over time
    pub busy_time: f64,
    pub peak_in_service: usize,
    pub peak_queued: usize,
    /// Size of each burst released by the gate on opening
    pub gate_batches: Vec<usize>,
}

impl ResourceStats {
    pub fn total_rejected(&self) -> usize {
        self.rejected.values().sum()
    }
}

/// Server pool with a waiting area and a scheduling policy
///
/// # Example
/// ```
/// use queue_simulator_core_rs::models::resource::{Admission, Dispatch, Resource};
/// use queue_simulator_core_rs::policy::{SchedulingPolicy, WaitingEntry};
///
/// let mut grader = Resource::new("grader", 1, Some(1), SchedulingPolicy::Fifo);
/// let entry = |id: u64, t: f64| WaitingEntry {
///     job_id: id, arrival_time: t, service_time: 1.0, class_rank: 0, enqueue_seq: 0,
/// };
///
/// assert_eq!(grader.admit(0.0, entry(0, 0.0)), Admission::Granted);
/// assert_eq!(grader.admit(0.5, entry(1, 0.5)), Admission::Enqueued);
///
/// assert!(grader.release(1.0, 0));
/// assert_eq!(grader.next_dispatch(1.0), Some(Dispatch::Start(1)));
/// ```
#[derive(Debug, Clone)]
pub struct Resource {
    id: String,
    servers: usize,
    /// `None` = unbounded, `Some(0)` = loss system
    queue_capacity: Option<usize>,
    policy: SchedulingPolicy,
    status: ResourceStatus,

    in_service: Vec<JobId>,
    waiting: Vec<WaitingEntry>,
    preempted: VecDeque<JobId>,
    next_enqueue_seq: u64,

    last_update: f64,
    down_since: Option<f64>,
    stats: ResourceStats,
}

impl Resource {
    pub fn new(
        id: impl Into<String>,
        servers: usize,
        queue_capacity: Option<usize>,
        policy: SchedulingPolicy,
    ) -> Self {
        Self {
            id: id.into(),
            servers,
            queue_capacity,
            policy,
            status: ResourceStatus::Up,
            in_service: Vec::with_capacity(servers),
            waiting: Vec::new(),
            preempted: VecDeque::new(),
            next_enqueue_seq: 0,
            last_update: 0.0,
            down_since: None,
            stats: ResourceStats::default(),
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn servers(&self) -> usize {
        self.servers
    }

    pub fn queue_capacity(&self) -> Option<usize> {
        self.queue_capacity
    }

    pub fn policy(&self) -> &SchedulingPolicy {
        &self.policy
    }

    pub fn status(&self) -> ResourceStatus {
        self.status
    }

    pub fn is_up(&self) -> bool {
        self.status == ResourceStatus::Up
    }

    pub fn in_service(&self) -> usize {
        self.in_service.len()
    }

    pub fn queued(&self) -> usize {
        self.waiting.len()
    }

    pub fn preempted(&self) -> usize {
        self.preempted.len()
    }

    pub fn is_serving(&self, job_id: JobId) -> bool {
        self.in_service.contains(&job_id)
    }

    pub fn stats(&self) -> &ResourceStats {
        &self.stats
    }

    /// Rank of a population under this resource's policy
    pub fn class_rank(&self, population: &str) -> usize {
        self.policy.class_rank(population)
    }

    // ------------------------------------------------------------------------
    // Arbitration
    // ------------------------------------------------------------------------

    /// Evaluate admission for an arriving job
    ///
    /// A granted job holds a slot on return. The entry's `enqueue_seq` is
    /// overwritten with the resource's own counter.
    pub fn admit(&mut self, now: f64, mut entry: WaitingEntry) -> Admission {
        if !self.is_up() {
            return self.reject(RejectionCause::ResourceDown);
        }

        if self.in_service.len() < self.servers {
            self.occupy(now, entry.job_id);
            self.stats.admitted += 1;
            return Admission::Granted;
        }

        match self.queue_capacity {
            Some(0) => self.reject(RejectionCause::ServersFull),
            Some(k) if self.waiting.len() >= k => self.reject(RejectionCause::QueueFull),
            _ => {
                entry.enqueue_seq = self.next_enqueue_seq;
                self.next_enqueue_seq += 1;
                self.waiting.push(entry);
                self.stats.peak_queued = self.stats.peak_queued.max(self.waiting.len());
                self.stats.admitted += 1;
                Admission::Enqueued
            }
        }
    }

    /// Hand a free slot to the next job, if any
    ///
    /// Preempted jobs are served before the waiting area, in the order they
    /// were preempted. Call repeatedly until `None` to fill every free slot.
    pub fn next_dispatch(&mut self, now: f64) -> Option<Dispatch> {
        if !self.is_up() || self.in_service.len() >= self.servers {
            return None;
        }

        if let Some(job_id) = self.preempted.pop_front() {
            self.occupy(now, job_id);
            return Some(Dispatch::Resume(job_id));
        }

        let idx = self.policy.select(&self.waiting)?;
        let entry = self.waiting.remove(idx);
        self.occupy(now, entry.job_id);
        Some(Dispatch::Start(entry.job_id))
    }

    /// Free the slot held by `job_id`. Returns false if it held none.
    pub fn release(&mut self, now: f64, job_id: JobId) -> bool {
        match self.in_service.iter().position(|&id| id == job_id) {
            Some(pos) => {
                self.accumulate(now);
                self.in_service.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Take the resource down, preempting every job holding a slot
    ///
    /// Returns the preempted jobs in slot order. They resume first on repair.
    pub fn fail(&mut self, now: f64) -> Vec<JobId> {
        self.accumulate(now);
        self.status = ResourceStatus::Down;
        self.down_since = Some(now);
        self.stats.failures += 1;

        let preempted: Vec<JobId> = self.in_service.drain(..).collect();
        self.stats.preemptions += preempted.len();
        self.preempted.extend(preempted.iter().copied());
        preempted
    }

    /// Bring the resource back up. Follow with [`Self::next_dispatch`].
    pub fn repair(&mut self, now: f64) {
        self.accumulate(now);
        if let Some(since) = self.down_since.take() {
            self.stats.downtime += now - since;
        }
        self.status = ResourceStatus::Up;
    }

    // ------------------------------------------------------------------------
    // Bookkeeping
    // ------------------------------------------------------------------------

    pub fn record_arrival(&mut self) {
        self.stats.arrivals += 1;
    }

    /// Count a rejection decided outside admission (gate buffer overflow)
    pub fn record_rejection(&mut self, cause: RejectionCause) {
        *self.stats.rejected.entry(cause).or_insert(0) += 1;
    }

    pub fn record_completion(&mut self) {
        self.stats.completed += 1;
    }

    pub fn record_backup(&mut self, duration: f64) {
        self.stats.backups_applied += 1;
        self.stats.total_backup_time += duration;
    }

    pub fn record_gate_batch(&mut self, size: usize) {
        self.stats.gate_batches.push(size);
    }

    /// Close the books at the end of the run
    pub fn finalize(&mut self, end: f64) {
        self.accumulate(end);
        if let Some(since) = self.down_since {
            self.stats.downtime += end - since;
            self.down_since = Some(end);
        }
    }

    /// Check the capacity invariants, describing the first one broken
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.in_service.len() > self.servers {
            return Err(format!(
                "resource {}: {} in service exceeds {} servers",
                self.id,
                self.in_service.len(),
                self.servers
            ));
        }
        if let Some(k) = self.queue_capacity {
            if self.waiting.len() > k {
                return Err(format!(
                    "resource {}: {} queued exceeds bound {}",
                    self.id,
                    self.waiting.len(),
                    k
                ));
            }
        }
        if !self.is_up() && !self.in_service.is_empty() {
            return Err(format!(
                "resource {}: {} jobs in service while down",
                self.id,
                self.in_service.len()
            ));
        }
        Ok(())
    }

    fn reject(&mut self, cause: RejectionCause) -> Admission {
        self.record_rejection(cause);
        Admission::Rejected(cause)
    }

    fn occupy(&mut self, now: f64, job_id: JobId) {
        self.accumulate(now);
        self.in_service.push(job_id);
        self.stats.peak_in_service = self.stats.peak_in_service.max(self.in_service.len());
    }

    fn accumulate(&mut self, now: f64) {
        if now > self.last_update {
            self.stats.busy_time += self.in_service.len() as f64 * (now - self.last_update);
            self.last_update = now;
        }
    }
}
