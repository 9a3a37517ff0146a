//! Independent iterations spread over blocking worker tasks.
//!
//! Each worker takes every `workers`-th iteration, builds its own
//! [`Encounter`] per iteration from the shared read-only [`Scenario`] and
//! hands the reports back. Iteration seeds come from
//! [`crate::scenario::iteration_seed`], so results do not depend on the
//! worker count.
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::encounter::run_encounter;
use crate::error::{Result, RuntimeError};
use crate::report::{BatchReport, EncounterReport};
use crate::scenario::Scenario;

/// Batch size and parallelism.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub iterations: u32,
    pub workers: usize,
}

impl BatchConfig {
    pub const DEFAULT_ITERATIONS: u32 = 1;
    pub const DEFAULT_WORKERS: usize = 4;

    pub fn new() -> Self {
        Self {
            iterations: Self::DEFAULT_ITERATIONS,
            workers: Self::DEFAULT_WORKERS,
        }
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub struct BatchRunner {
    scenario: Arc<Scenario>,
    config: BatchConfig,
}

impl BatchRunner {
    pub fn new(scenario: Scenario, config: BatchConfig) -> Self {
        Self {
            scenario: Arc::new(scenario),
            config,
        }
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Runs every iteration. The first failing iteration's error is
    /// returned; the others still run to completion on their workers.
    pub async fn run(&self) -> Result<BatchReport> {
        let iterations = self.config.iterations;
        if iterations == 0 {
            return Err(RuntimeError::InvalidConfig(
                "a batch needs at least one iteration".into(),
            ));
        }
        let workers = self.config.workers.clamp(1, iterations as usize);
        info!(
            target: "runtime::batch",
            iterations,
            workers,
            seed = self.scenario.config.seed,
            "batch started"
        );

        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let scenario = Arc::clone(&self.scenario);
            let assigned: Vec<u32> = (0..iterations).skip(worker).step_by(workers).collect();
            handles.push(tokio::task::spawn_blocking(move || {
                run_assigned(worker, &scenario, assigned)
            }));
        }

        let mut reports = Vec::with_capacity(iterations as usize);
        let mut first_error = None;
        for handle in handles {
            match handle.await.map_err(RuntimeError::WorkerJoin)? {
                Ok(done) => reports.extend(done),
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }
        reports.sort_by_key(|(iteration, _)| *iteration);

        let report = BatchReport::from_reports(reports).ok_or_else(|| {
            RuntimeError::InvalidConfig("batch produced no iterations".into())
        })?;
        info!(
            target: "runtime::batch",
            iterations = report.iterations,
            mean_dps = report.mean_dps,
            "batch finished"
        );
        Ok(report)
    }
}

fn run_assigned(
    worker: usize,
    scenario: &Scenario,
    assigned: Vec<u32>,
) -> Result<Vec<(u32, EncounterReport)>> {
    assigned
        .into_iter()
        .map(|iteration| {
            let run = scenario.for_iteration(iteration);
            debug!(
                target: "runtime::batch",
                worker,
                iteration,
                seed = run.config.seed,
                "iteration started"
            );
            run_encounter(&run).map(|report| (iteration, report))
        })
        .collect()
}
