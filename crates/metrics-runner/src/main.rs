//! metrics-runner: compute `CalculatedMetrics` for one or more raw bundle files.
//!
//! Usage:
//!   cargo run -p metrics-runner -- aapl.json msft.json
//!   cargo run -p metrics-runner -- aapl.json --assumptions conservative.json --pretty
//!   cargo run -p metrics-runner -- data/*.json --parallel
//!
//! Each bundle is printed as one JSON document on stdout, in input order.

mod config;

use std::path::Path;
use std::sync::Arc;

use analysis_core::RawFinancialData;
use analysis_orchestrator::MetricsEngine;
use anyhow::{Context, Result};
use tokio::sync::Semaphore;

use config::{CliArgs, RunnerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "metrics_runner=info,analysis_orchestrator=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match CliArgs::parse(std::env::args().skip(1)) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!();
            eprintln!("Usage:");
            eprintln!("  metrics-runner <bundle.json>... [options]");
            eprintln!();
            eprintln!("Options:");
            eprintln!("  --assumptions FILE  JSON assumptions (missing keys use defaults)");
            eprintln!("  --parallel          Fan the calculators out over the rayon pool");
            eprintln!("  --pretty            Pretty-print the output documents");
            std::process::exit(2);
        }
    };
    let config = RunnerConfig::from_env(cli)?;

    let total = config.inputs.len();
    tracing::info!(
        "metrics-runner: {} bundles, concurrency={}, parallel={}",
        total,
        config.concurrency,
        config.parallel
    );

    let engine = Arc::new(MetricsEngine::with_assumptions(config.assumptions.clone()));
    let semaphore = Arc::new(Semaphore::new(config.concurrency));
    let mut handles = Vec::with_capacity(total);

    for path in config.inputs.iter().cloned() {
        let engine = Arc::clone(&engine);
        let semaphore = Arc::clone(&semaphore);
        let (parallel, pretty) = (config.parallel, config.pretty);

        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.context("runner semaphore closed")?;
            tokio::task::spawn_blocking(move || process_file(&engine, &path, parallel, pretty))
                .await
                .context("calculation task panicked")?
        }));
    }

    let mut failed = 0usize;
    for (path, handle) in config.inputs.iter().zip(handles) {
        let outcome = match handle.await {
            Ok(result) => result,
            Err(e) => Err(anyhow::Error::new(e).context("runner task failed")),
        };
        match outcome {
            Ok(json) => println!("{}", json),
            Err(e) => {
                failed += 1;
                tracing::warn!("{} failed: {:#}", path.display(), e);
            }
        }
    }

    tracing::info!("Done: {} bundles ({} failed)", total, failed);
    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn process_file(engine: &MetricsEngine, path: &Path, parallel: bool, pretty: bool) -> Result<String> {
    let raw = read_bundle(path)?;
    let metrics = if parallel {
        engine.calculate_all_parallel(&raw)
    } else {
        engine.calculate_all(&raw)
    }
    .with_context(|| format!("calculating metrics for {}", path.display()))?;

    tracing::info!("{} => {}", path.display(), metrics.symbol);
    let json = if pretty {
        serde_json::to_string_pretty(&metrics)?
    } else {
        serde_json::to_string(&metrics)?
    };
    Ok(json)
}

fn read_bundle(path: &Path) -> Result<RawFinancialData> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))?;
    RawFinancialData::from_json_value(&value).with_context(|| format!("invalid bundle {}", path.display()))
}
