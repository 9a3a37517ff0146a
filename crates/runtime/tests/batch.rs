use runtime::{BatchConfig, BatchRunner, RuntimeError, Scenario, iteration_seed};
use sim_content::{MonkSetup, default_rotation};
use sim_core::{SimConfig, SimDuration};

fn scenario() -> Scenario {
    Scenario::with_default_rotation(
        SimConfig::default()
            .with_seed(42)
            .with_duration(SimDuration::from_secs(20)),
        MonkSetup::default(),
    )
}

#[tokio::test]
async fn results_do_not_depend_on_worker_count() {
    let serial = BatchRunner::new(scenario(), BatchConfig::new().with_iterations(5).with_workers(1))
        .run()
        .await
        .unwrap();
    let parallel = BatchRunner::new(scenario(), BatchConfig::new().with_iterations(5).with_workers(3))
        .run()
        .await
        .unwrap();

    assert_eq!(serial, parallel);
    assert_eq!(serial.iterations, 5);
    let seeds: Vec<u64> = serial.runs.iter().map(|run| run.seed).collect();
    let expected: Vec<u64> = (0..5).map(|i| iteration_seed(42, i)).collect();
    assert_eq!(seeds, expected);
    assert_eq!(serial.sample.seed, 42);
    assert!(serial.min_dps <= serial.mean_dps && serial.mean_dps <= serial.max_dps);
}

#[tokio::test]
async fn more_workers_than_iterations_is_fine() {
    let report = BatchRunner::new(scenario(), BatchConfig::new().with_iterations(2).with_workers(8))
        .run()
        .await
        .unwrap();
    assert_eq!(report.runs.len(), 2);
    assert_eq!(report.runs[1].iteration, 1);
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let err = BatchRunner::new(scenario(), BatchConfig::new().with_iterations(0))
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidConfig(_)));
}

#[tokio::test]
async fn failing_iterations_fail_the_batch() {
    let mut bad = scenario();
    bad.config.num_targets = 0;
    let err = BatchRunner::new(bad, BatchConfig::new().with_iterations(3).with_workers(2))
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidConfig(_)));
}
