//! SJF (Shortest-Job-First) selection
//!
//! Uses the service time drawn at arrival, so the comparison is decidable
//! the moment a job joins the waiting set. Ties fall back to FIFO.

use super::WaitingEntry;

/// Index of the waiting job with the smallest pre-drawn service time
pub fn select_sjf(waiting: &[WaitingEntry]) -> Option<usize> {
    waiting
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            a.service_time
                .total_cmp(&b.service_time)
                .then_with(|| a.arrival_time.total_cmp(&b.arrival_time))
                .then_with(|| a.enqueue_seq.cmp(&b.enqueue_seq))
        })
        .map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(job_id: u64, arrival_time: f64, service_time: f64) -> WaitingEntry {
        WaitingEntry {
            job_id,
            arrival_time,
            service_time,
            class_rank: 0,
            enqueue_seq: job_id,
        }
    }

    #[test]
    fn test_sjf_picks_shortest() {
        let waiting = vec![entry(0, 1.0, 5.0), entry(1, 2.0, 0.3), entry(2, 3.0, 1.0)];
        assert_eq!(select_sjf(&waiting), Some(1));
    }

    #[test]
    fn test_sjf_tie_broken_by_arrival() {
        let waiting = vec![entry(0, 4.0, 1.0), entry(1, 2.0, 1.0)];
        assert_eq!(select_sjf(&waiting), Some(1));
    }
}
