//! Failure and recovery
//!
//! While DOWN, every arrival is rejected with `resource_down` and nothing is
//! served. Jobs in service are preempted, sit at the head of the line and
//! resume first on repair with the remaining part of their original draw.

use queue_simulator_core_rs::models::event::EventRecord;
use queue_simulator_core_rs::{
    Engine, FailureConfig, PopulationConfig, RejectionCause, ResourceConfig, SimulationConfig,
};

fn unreliable(seed: u64) -> Engine {
    let config = SimulationConfig::new(seed, 5_000.0)
        .with_resource(
            ResourceConfig::new("grader", 2)
                .with_queue_capacity(10)
                .with_failure(FailureConfig::new(20.0, 5.0)),
        )
        .with_population(PopulationConfig::poisson("ING", "grader", 1.0, 2.0));
    let mut engine = Engine::new(config).unwrap();
    engine.run().unwrap();
    engine
}

/// `[down, up]` intervals, the last one closed at the horizon
fn down_intervals(engine: &Engine) -> Vec<(f64, f64)> {
    let mut intervals = Vec::new();
    let mut down_since = None;
    for record in engine.event_log().events() {
        match record.kind.name() {
            "resource_down" => down_since = Some(record.time),
            "resource_up" => {
                if let Some(since) = down_since.take() {
                    intervals.push((since, record.time));
                }
            }
            _ => {}
        }
    }
    if let Some(since) = down_since {
        intervals.push((since, engine.horizon()));
    }
    intervals
}

fn kind_times<'a>(engine: &'a Engine, kind: &str) -> Vec<&'a EventRecord> {
    engine.event_log().events_of_kind(kind)
}

#[test]
fn test_failures_happen_and_are_accounted() {
    let engine = unreliable(1);
    let stats = engine.resource("grader").unwrap().stats();
    assert!(stats.failures > 50);
    assert!(stats.downtime > 0.0);

    // long-run availability mtbf / (mtbf + mttr) = 0.8
    let availability = 1.0 - stats.downtime / engine.horizon();
    assert!((availability - 0.8).abs() < 0.05, "availability {}", availability);
}

#[test]
fn test_resource_down_rejections_only_while_down() {
    let engine = unreliable(2);
    let intervals = down_intervals(&engine);
    let rejections: Vec<&EventRecord> = kind_times(&engine, "rejected")
        .into_iter()
        .filter(|e| e.kind.cause() == Some(RejectionCause::ResourceDown))
        .collect();
    assert!(!rejections.is_empty());

    for record in rejections {
        assert!(
            intervals.iter().any(|&(d, u)| record.time >= d && record.time <= u),
            "resource_down rejection at {} while up",
            record.time
        );
    }
}

#[test]
fn test_no_service_granted_while_down() {
    let engine = unreliable(3);
    let intervals = down_intervals(&engine);
    for kind in ["service_start", "resumed"] {
        for record in kind_times(&engine, kind) {
            assert!(
                !intervals.iter().any(|&(d, u)| record.time > d && record.time < u),
                "{} at {} inside a down interval",
                kind,
                record.time
            );
        }
    }
}

#[test]
fn test_preempted_jobs_resume_before_queued_ones() {
    let engine = unreliable(4);
    let events = engine.event_log().events();
    assert!(!kind_times(&engine, "preempted").is_empty());

    for (i, record) in events.iter().enumerate() {
        if record.kind.name() != "resource_up" {
            continue;
        }
        let mut seen_start = false;
        for next in events[i + 1..].iter().take_while(|e| e.time == record.time) {
            match next.kind.name() {
                "service_start" => seen_start = true,
                "resumed" => assert!(!seen_start, "resume after a fresh start at {}", record.time),
                _ => {}
            }
        }
    }
}

#[test]
fn test_resumed_work_equals_original_draw() {
    let engine = unreliable(5);
    let preempted: Vec<u64> = kind_times(&engine, "preempted")
        .iter()
        .filter_map(|e| e.job_id)
        .collect();
    assert!(!preempted.is_empty());

    for id in preempted {
        let job = engine.job(id).unwrap();
        if !job.is_completed() {
            continue;
        }
        let log = engine.event_log().events_for_job(id);
        // sum the served segments: start/resumed .. preempted/service_end
        let mut served = 0.0;
        let mut segment_start = None;
        for record in log {
            match record.kind.name() {
                "service_start" | "resumed" => segment_start = Some(record.time),
                "preempted" | "service_end" => {
                    if let Some(s) = segment_start.take() {
                        served += record.time - s;
                    }
                }
                _ => {}
            }
        }
        assert!(
            (served - job.service_time()).abs() < 1e-6,
            "job {} served {} of {}",
            id,
            served,
            job.service_time()
        );
    }
}

#[test]
fn test_preemptions_match_resumes_and_open_jobs() {
    let engine = unreliable(6);
    let preempted = kind_times(&engine, "preempted").len();
    let resumed = kind_times(&engine, "resumed").len();
    let still_preempted = engine.resource("grader").unwrap().preempted();
    assert_eq!(preempted, resumed + still_preempted);
}

#[test]
fn test_conservation_with_failures() {
    for seed in [7, 8, 9] {
        let mut engine = Engine::new(
            SimulationConfig::new(seed, 2_000.0)
                .with_resource(
                    ResourceConfig::new("grader", 1)
                        .with_queue_capacity(3)
                        .with_failure(FailureConfig::new(10.0, 2.0)),
                )
                .with_population(PopulationConfig::poisson("ING", "grader", 1.5, 2.0)),
        )
        .unwrap();
        let report = engine.run().unwrap();
        assert!(report.resource("grader").unwrap().is_conserved());
    }
}

#[test]
fn test_start_time_is_first_grant() {
    let engine = unreliable(10);
    for record in kind_times(&engine, "resumed") {
        let job = engine.job(record.job_id.unwrap()).unwrap();
        assert!(job.start_time().unwrap() < record.time);
    }
}
