//! Class-priority selection
//!
//! A fixed total order over population classes (rank 0 first); FIFO within
//! a class. The rank is resolved once, when the job is enqueued.

use super::WaitingEntry;

/// Index of the best-ranked, earliest-arrived waiting job
pub fn select_priority(waiting: &[WaitingEntry]) -> Option<usize> {
    waiting
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            a.class_rank
                .cmp(&b.class_rank)
                .then_with(|| a.arrival_time.total_cmp(&b.arrival_time))
                .then_with(|| a.enqueue_seq.cmp(&b.enqueue_seq))
        })
        .map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(job_id: u64, arrival_time: f64, class_rank: usize) -> WaitingEntry {
        WaitingEntry {
            job_id,
            arrival_time,
            service_time: 1.0,
            class_rank,
            enqueue_seq: job_id,
        }
    }

    #[test]
    fn test_higher_class_jumps_queue() {
        let waiting = vec![entry(0, 1.0, 1), entry(1, 5.0, 0), entry(2, 2.0, 1)];
        assert_eq!(select_priority(&waiting), Some(1));
    }

    #[test]
    fn test_fifo_within_class() {
        let waiting = vec![entry(0, 3.0, 1), entry(1, 2.0, 1)];
        assert_eq!(select_priority(&waiting), Some(1));
    }
}
