//! Event queue ordering pending continuations by `(time, insertion sequence)`
//!
//! Ties on time are broken strictly by the order in which events were
//! scheduled, never by payload content. Replaying the same schedule calls
//! therefore always yields the same dispatch order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use thiserror::Error;

/// Errors raised by the event queue
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchedulerError {
    #[error("causality violation: event requested at {requested} but clock is at {now}")]
    CausalityViolation { requested: f64, now: f64 },

    #[error("invalid event time: {0}")]
    InvalidTime(f64),
}

/// An event popped from the queue
#[derive(Debug, Clone, PartialEq)]
pub struct Scheduled<T> {
    pub time: f64,
    pub seq: u64,
    pub payload: T,
}

struct Entry<T> {
    time: f64,
    seq: u64,
    payload: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap behavior in BinaryHeap
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Pending-event queue with its own clock
///
/// # Example
/// ```
/// use queue_simulator_core_rs::core::scheduler::EventQueue;
///
/// let mut queue = EventQueue::new();
/// queue.schedule(2.0, "b").unwrap();
/// queue.schedule(1.0, "a").unwrap();
/// queue.schedule(2.0, "c").unwrap();
///
/// let order: Vec<_> = std::iter::from_fn(|| queue.advance()).map(|e| e.payload).collect();
/// assert_eq!(order, vec!["a", "b", "c"]);
/// assert_eq!(queue.now(), 2.0);
/// ```
pub struct EventQueue<T> {
    heap: BinaryHeap<Entry<T>>,
    now: f64,
    next_seq: u64,
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventQueue<T> {
    /// Create an empty queue with the clock at zero
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            now: 0.0,
            next_seq: 0,
        }
    }

    /// Schedule `payload` to fire at absolute `time`
    ///
    /// Scheduling at the current time is allowed and fires after every
    /// already-pending event at that time.
    ///
    /// # Errors
    /// - `InvalidTime` for NaN or infinite times
    /// - `CausalityViolation` if `time` is strictly before the clock
    pub fn schedule(&mut self, time: f64, payload: T) -> Result<u64, SchedulerError> {
        if !time.is_finite() {
            return Err(SchedulerError::InvalidTime(time));
        }
        if time < self.now {
            return Err(SchedulerError::CausalityViolation {
                requested: time,
                now: self.now,
            });
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry { time, seq, payload });
        Ok(seq)
    }

    /// Schedule `payload` after a non-negative `delay` from now
    pub fn schedule_in(&mut self, delay: f64, payload: T) -> Result<u64, SchedulerError> {
        self.schedule(self.now + delay, payload)
    }

    /// Pop the earliest event and move the clock to its time
    pub fn advance(&mut self) -> Option<Scheduled<T>> {
        let entry = self.heap.pop()?;
        self.now = entry.time;
        Some(Scheduled {
            time: entry.time,
            seq: entry.seq,
            payload: entry.payload,
        })
    }

    /// Time of the earliest pending event
    pub fn peek_time(&self) -> Option<f64> {
        self.heap.peek().map(|e| e.time)
    }

    /// Current clock value (time of the last dispatched event)
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Number of pending events
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// True if nothing is pending
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Total number of events ever scheduled
    pub fn scheduled_count(&self) -> u64 {
        self.next_seq
    }
}
