//! FIFO (First-In-First-Out) selection
//!
//! Earliest arrival wins. Equal arrival times fall back to enqueue order.

use super::WaitingEntry;

/// Index of the earliest-arrived waiting job
pub fn select_fifo(waiting: &[WaitingEntry]) -> Option<usize> {
    waiting
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            a.arrival_time
                .total_cmp(&b.arrival_time)
                .then_with(|| a.enqueue_seq.cmp(&b.enqueue_seq))
        })
        .map(|(idx, _)| idx)
}
