// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docvet: read document batches, triage them for OCR readiness, write the
// batches back with verdicts.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use docvet_core::error::{DocvetError, Result};
use docvet_core::{AppConfig, CriteriaSet};
use docvet_pipeline::{EvaluationWorker, Pipeline};
use docvet_quality::{CriteriaEngine, EngineSettings};
use docvet_raster::FileRasterProvider;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "docvet", version, about = "OCR-readiness triage for scanned document batches")]
struct Cli {
    /// JSON array of document batches.
    #[arg(long, value_name = "FILE")]
    input: PathBuf,

    /// Where to write the batches with verdicts.
    #[arg(long, value_name = "FILE")]
    output: PathBuf,

    /// Criteria file (overrides `criteria_path` from the app config).
    #[arg(long, value_name = "FILE")]
    criteria: Option<PathBuf>,

    /// Application config (JSON). Defaults apply when omitted.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Documents evaluated at once. Defaults to the number of CPUs.
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    /// Soft per-document time budget.
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Directory for `run_<id>.json` metrics.
    #[arg(long, value_name = "DIR")]
    metrics_dir: Option<PathBuf>,
}

impl Cli {
    /// App config from file (or defaults) with command-line overrides applied.
    fn app_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load(path)?,
            None => AppConfig::default(),
        };
        if let Some(workers) = self.workers {
            config.max_workers = Some(workers);
        }
        if let Some(timeout) = self.timeout {
            config.timeout_seconds = timeout;
        }
        if let Some(dir) = &self.metrics_dir {
            config.metrics_dir = dir.clone();
        }
        if let Some(path) = &self.criteria {
            config.criteria_path = path.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "Run aborted");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let config = cli.app_config()?;
    let criteria = CriteriaSet::load(&config.criteria_path)?;

    let engine = CriteriaEngine::new(Arc::new(FileRasterProvider::new()), EngineSettings::from(&config));
    engine.validate(criteria.as_slice())?;

    let worker = EvaluationWorker::new(engine, criteria.criteria, config.timeout());
    let pipeline = Pipeline::new(Arc::new(worker), config.worker_count())
        .with_metrics_dir(config.metrics_dir.clone());
    info!(
        workers = pipeline.workers(),
        timeout_seconds = config.timeout_seconds,
        input = %cli.input.display(),
        "docvet starting"
    );

    let input = read_input(&cli.input)?;
    let output = pipeline.run(input).await?;
    write_output(&cli.output, &output.batches)?;

    info!(
        total = output.metrics.total,
        accepted = output.metrics.accepted,
        rejected = output.metrics.rejected,
        output = %cli.output.display(),
        "docvet finished"
    );
    Ok(())
}

fn read_input(path: &Path) -> Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path).map_err(|err| {
        DocvetError::Validation(format!("cannot read input {}: {}", path.display(), err))
    })?;
    serde_json::from_str(&raw)
        .map_err(|err| DocvetError::Validation(format!("input is not valid JSON: {}", err)))
}

fn write_output(path: &Path, batches: &[docvet_core::DocumentBatch]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(batches)?)?;
    Ok(())
}
