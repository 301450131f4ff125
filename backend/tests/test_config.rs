//! Configuration parsing, validation and fingerprinting

use queue_simulator_core_rs::backup::{BackupMode, BackupStrategy, DurationDistribution, LoadMetric};
use queue_simulator_core_rs::{
    ArrivalSource, ConfigError, Engine, PopulationConfig, ResourceConfig, SchedulingPolicy,
    SimulationConfig, SimulationError,
};

const FULL: &str = r#"{
    "rng_seed": 99,
    "horizon": 500.0,
    "resources": [
        {
            "id": "grader",
            "servers": 3,
            "queue_capacity": 6,
            "scheduling": { "type": "priority", "order": ["EXAM", "ING"] },
            "backup": {
                "strategy": { "type": "conditional", "metric": "queue_length", "threshold": 2 },
                "duration": { "type": "uniform", "min": 0.1, "max": 0.3 },
                "mode": "after_service"
            },
            "gating": { "closed_duration": 8.0, "buffer_capacity": 40 },
            "failure": { "mtbf": 100.0, "mttr": 4.0 }
        },
        { "id": "spare", "servers": 1 }
    ],
    "populations": [
        { "name": "ING", "resource": "grader", "arrival_rate": 1.0, "service_rate": 1.5 },
        { "name": "EXAM", "resource": "grader", "arrival_rate": 1.0, "service_rate": 2.0,
          "source": { "type": "trace", "timestamps": [1.0, 2.0, 3.5] } },
        { "name": "EXT", "resource": "spare", "arrival_rate": 0.5, "service_rate": 1.0 }
    ]
}"#;

#[test]
fn test_full_document_parses() {
    let config = SimulationConfig::from_json(FULL).unwrap();
    assert_eq!(config.rng_seed, 99);
    assert_eq!(config.resources.len(), 2);

    let grader = &config.resources[0];
    assert_eq!(grader.queue_capacity, Some(6));
    assert_eq!(
        grader.scheduling,
        SchedulingPolicy::Priority {
            order: vec!["EXAM".to_string(), "ING".to_string()]
        }
    );
    let backup = grader.backup.as_ref().unwrap();
    assert_eq!(
        backup.strategy,
        BackupStrategy::Conditional {
            metric: LoadMetric::QueueLength,
            threshold: 2.0
        }
    );
    assert_eq!(backup.duration, DurationDistribution::Uniform { min: 0.1, max: 0.3 });
    assert_eq!(backup.mode, BackupMode::AfterService);

    let gating = grader.gating.as_ref().unwrap();
    assert_eq!(gating.effective_open_duration(), 4.0);
    assert_eq!(gating.buffer_capacity, Some(40));
    assert!(!gating.start_open);
    assert_eq!(grader.failure.unwrap().mttr, 4.0);

    let spare = &config.resources[1];
    assert_eq!(spare.queue_capacity, None);
    assert_eq!(spare.scheduling, SchedulingPolicy::Fifo);
    assert!(spare.backup.is_none() && spare.gating.is_none() && spare.failure.is_none());

    assert_eq!(config.populations[0].source, ArrivalSource::Poisson);
    assert!(matches!(config.populations[1].source, ArrivalSource::Trace { .. }));
}

#[test]
fn test_full_document_runs() {
    let config = SimulationConfig::from_json(FULL).unwrap();
    let mut engine = Engine::new(config).unwrap();
    let report = engine.run().unwrap();

    assert_eq!(report.population("EXAM").unwrap().arrivals, 3);
    assert_eq!(report.resource("grader").unwrap().policy, "priority(EXAM,ING)");
    for resource in &report.resources {
        assert!(resource.is_conserved());
    }
}

#[test]
fn test_json_round_trip_keeps_fingerprint() {
    let config = SimulationConfig::from_json(FULL).unwrap();
    let again = SimulationConfig::from_json(&config.to_json().unwrap()).unwrap();
    assert_eq!(again, config);
    assert_eq!(again.fingerprint().unwrap(), config.fingerprint().unwrap());
}

#[test]
fn test_fingerprint_tracks_content() {
    let base = SimulationConfig::new(1, 10.0)
        .with_resource(ResourceConfig::new("r", 1))
        .with_population(PopulationConfig::poisson("p", "r", 1.0, 1.0));
    let reseeded = SimulationConfig { rng_seed: 2, ..base.clone() };

    assert_eq!(base.fingerprint().unwrap(), base.clone().fingerprint().unwrap());
    assert_ne!(base.fingerprint().unwrap(), reseeded.fingerprint().unwrap());
    assert_eq!(base.fingerprint().unwrap().len(), 64);

    let mut engine = Engine::new(base.clone()).unwrap();
    assert_eq!(engine.fingerprint(), base.fingerprint().unwrap());
    let report = engine.run().unwrap();
    assert_eq!(report.config_fingerprint, base.fingerprint().unwrap());
}

#[test]
fn test_unknown_policy_is_a_parse_error() {
    let json = FULL.replace(r#""type": "priority""#, r#""type": "lifo""#);
    assert!(matches!(SimulationConfig::from_json(&json), Err(ConfigError::Json(_))));

    assert!(matches!(
        ResourceConfig::new("r", 1).with_policy_name("lifo"),
        Err(ConfigError::UnknownPolicy(_))
    ));
    let sjf = ResourceConfig::new("r", 1).with_policy_name("sjf").unwrap();
    assert_eq!(sjf.scheduling, SchedulingPolicy::Sjf);
}

fn fails_with(config: SimulationConfig, expected: impl Fn(&ConfigError) -> bool) {
    let err = config.validate().unwrap_err();
    assert!(expected(&err), "unexpected error {:?}", err);
}

#[test]
fn test_validation_errors() {
    let ok = || {
        SimulationConfig::new(1, 10.0)
            .with_resource(ResourceConfig::new("r", 1))
            .with_population(PopulationConfig::poisson("p", "r", 1.0, 1.0))
    };
    assert!(ok().validate().is_ok());

    fails_with(SimulationConfig { horizon: 0.0, ..ok() }, |e| {
        matches!(e, ConfigError::InvalidHorizon(_))
    });
    fails_with(SimulationConfig { resources: vec![], ..ok() }, |e| {
        matches!(e, ConfigError::NoResources)
    });
    fails_with(SimulationConfig { populations: vec![], ..ok() }, |e| {
        matches!(e, ConfigError::NoPopulations)
    });
    fails_with(ok().with_resource(ResourceConfig::new("r", 2)), |e| {
        matches!(e, ConfigError::DuplicateResource(_))
    });
    fails_with(ok().with_resource(ResourceConfig::new("z", 0)), |e| {
        matches!(e, ConfigError::ZeroServers(_))
    });
    fails_with(
        ok().with_population(PopulationConfig::poisson("q", "missing", 1.0, 1.0)),
        |e| matches!(e, ConfigError::UnknownResource { .. }),
    );
    fails_with(ok().with_population(PopulationConfig::poisson("p", "r", 1.0, 1.0)), |e| {
        matches!(e, ConfigError::DuplicatePopulation(_))
    });
    fails_with(ok().with_population(PopulationConfig::poisson("q", "r", -1.0, 1.0)), |e| {
        matches!(e, ConfigError::NonPositiveRate { .. })
    });
    fails_with(
        ok().with_population(PopulationConfig::trace("q", "r", vec![2.0, 1.0], 1.0)),
        |e| matches!(e, ConfigError::InvalidTrace(_)),
    );
}

#[test]
fn test_engine_refuses_invalid_config() {
    let config = SimulationConfig::new(1, 10.0)
        .with_resource(ResourceConfig::new("r", 1))
        .with_population(PopulationConfig::poisson("p", "r", 0.0, 1.0));
    assert!(matches!(
        Engine::new(config),
        Err(SimulationError::Config(ConfigError::NonPositiveRate { .. }))
    ));
}

#[test]
fn test_invalid_probability_rejected_on_parse() {
    let json = FULL.replace(
        r#"{ "type": "conditional", "metric": "queue_length", "threshold": 2 }"#,
        r#"{ "type": "random", "probability": 1.5 }"#,
    );
    assert!(matches!(
        SimulationConfig::from_json(&json),
        Err(ConfigError::InvalidProbability(_))
    ));
}
