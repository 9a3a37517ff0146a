//! Command-line entry point: loads a scenario, runs it and prints a JSON
//! report on stdout. Logs go to stderr, filtered by `RUST_LOG`.
mod config;

use anyhow::{Context, Result};
use config::CliConfig;
use runtime::BatchRunner;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();
    setup_logging();

    let config = CliConfig::from_env();
    let scenario = config.load_scenario()?;
    tracing::info!(
        target: "sim_cli",
        seed = scenario.config.seed,
        iterations = config.batch.iterations,
        workers = config.batch.workers,
        "scenario loaded"
    );

    let report = BatchRunner::new(scenario, config.batch)
        .run()
        .await
        .context("simulation failed")?;
    let json = if report.iterations == 1 {
        report.sample.to_json()
    } else {
        report.to_json()
    }
    .context("failed to serialize report")?;
    println!("{json}");
    Ok(())
}

fn setup_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}
