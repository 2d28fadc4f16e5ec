// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Parallel pipeline: validate batches, fan documents out to a bounded set of
// blocking workers, fold verdicts back in as they finish, export metrics.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use docvet_core::error::{DocvetError, Result, panic_detail};
use docvet_core::{DocumentBatch, Verdict};
use serde_json::Value;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{debug, error, info, instrument, warn};

use crate::report::RunMetrics;
use crate::worker::{DocumentEvaluator, WorkerOutcome};

/// Batches with verdicts filled in, plus the run's metrics.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub batches: Vec<DocumentBatch>,
    pub metrics: RunMetrics,
    /// Where the metrics were written, if exporting was enabled and worked.
    pub metrics_path: Option<PathBuf>,
}

/// Where a document lives in the input, so results merge back by identity.
#[derive(Debug, Clone)]
struct Slot {
    batch: usize,
    document: usize,
    document_id: String,
}

/// Bounded fan-out of documents onto tokio's blocking pool.
///
/// Panics inside a document are contained, but every document shares this
/// process: an abort or allocation failure in a decoder ends the whole run.
/// Hard isolation needs an external supervisor that restarts the process.
pub struct Pipeline {
    evaluator: Arc<dyn DocumentEvaluator>,
    workers: usize,
    metrics_dir: Option<PathBuf>,
}

impl Pipeline {
    /// Pipeline running at most `workers` documents at once (minimum one).
    pub fn new(evaluator: Arc<dyn DocumentEvaluator>, workers: usize) -> Self {
        Self {
            evaluator,
            workers: workers.max(1),
            metrics_dir: None,
        }
    }

    /// Export `run_<id>.json` into `dir` when the run completes.
    pub fn with_metrics_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.metrics_dir = Some(dir.into());
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run over raw JSON input (an array of batches).
    pub async fn run(&self, input: Value) -> Result<RunOutput> {
        let batches = parse_batches(input)?;
        self.run_batches(batches).await
    }

    /// Evaluate every document and return the batches in input order.
    ///
    /// Fails only on invalid input. Any single document's failure becomes a
    /// rejection on that document.
    #[instrument(skip_all, fields(workers = self.workers, batches = batches.len()))]
    pub async fn run_batches(&self, mut batches: Vec<DocumentBatch>) -> Result<RunOutput> {
        validate_batches(&batches)?;

        let mut queue = Vec::new();
        for (b, batch) in batches.iter().enumerate() {
            for (d, document) in batch.documents.iter().enumerate() {
                let slot = Slot {
                    batch: b,
                    document: d,
                    document_id: document.document_id.clone(),
                };
                queue.push((slot, document.clone()));
            }
        }
        // Pop from the back, start from the front.
        queue.reverse();
        info!(documents = queue.len(), "Pipeline run started");

        let mut metrics = RunMetrics::new();
        let mut in_flight: JoinSet<WorkerOutcome> = JoinSet::new();
        let mut slots: HashMap<Id, Slot> = HashMap::new();

        loop {
            while in_flight.len() < self.workers {
                let Some((slot, document)) = queue.pop() else {
                    break;
                };
                let evaluator = Arc::clone(&self.evaluator);
                let handle = in_flight.spawn_blocking(move || evaluator.evaluate(&document));
                debug!(document_id = %slot.document_id, "Document dispatched");
                slots.insert(handle.id(), slot);
            }

            let Some(joined) = in_flight.join_next_with_id().await else {
                break;
            };
            let (slot, verdict, over_budget) = match joined {
                Ok((id, outcome)) => (slots.remove(&id), outcome.verdict, outcome.over_budget),
                Err(err) => {
                    let slot = slots.remove(&err.id());
                    (slot, transport_failure(err), false)
                }
            };
            let Some(slot) = slot else {
                error!("Finished task has no matching document");
                continue;
            };

            log_verdict(&slot.document_id, &verdict);
            metrics.record(&slot.document_id, &verdict, over_budget);
            batches[slot.batch].documents[slot.document].apply_verdict(verdict);
        }

        metrics.finish();
        info!(
            total = metrics.total,
            accepted = metrics.accepted,
            rejected = metrics.rejected,
            elapsed_seconds = metrics.elapsed_seconds,
            "Pipeline run finished"
        );

        let metrics_path = match &self.metrics_dir {
            Some(dir) => match metrics.export(dir) {
                Ok(path) => Some(path),
                Err(err) => {
                    error!(error = %err, "Could not export run metrics");
                    None
                }
            },
            None => None,
        };

        Ok(RunOutput {
            batches,
            metrics,
            metrics_path,
        })
    }
}

/// A task that died outside the evaluator's own error handling.
fn transport_failure(err: JoinError) -> Verdict {
    let detail = if err.is_panic() {
        panic_detail(err.into_panic().as_ref())
    } else {
        err.to_string()
    };
    error!(%detail, "Worker task failed");
    Verdict::rejected(DocvetError::WorkerTransport(detail).to_string())
}

fn log_verdict(document_id: &str, verdict: &Verdict) {
    if !verdict.accepted {
        warn!("Document {} REJECTED: {}", document_id, verdict.reasons.join("; "));
    }
    if !verdict.warnings.is_empty() {
        info!("Document {} WARNING: {}", document_id, verdict.warnings.join("; "));
    }
}

/// Parse raw input into batches. Anything structurally off is a
/// [`DocvetError::Validation`].
pub fn parse_batches(input: Value) -> Result<Vec<DocumentBatch>> {
    if !input.is_array() {
        return Err(DocvetError::Validation(
            "expected a JSON array of document batches".into(),
        ));
    }
    let batches: Vec<DocumentBatch> = serde_json::from_value(input)
        .map_err(|err| DocvetError::Validation(err.to_string()))?;
    validate_batches(&batches)?;
    Ok(batches)
}

/// Every document needs a non-empty ID and path; IDs are unique across the
/// whole run.
pub fn validate_batches(batches: &[DocumentBatch]) -> Result<()> {
    let mut seen = HashSet::new();
    for (b, batch) in batches.iter().enumerate() {
        for (d, document) in batch.documents.iter().enumerate() {
            let at = || format!("batch #{} document #{}", b, d);
            if document.document_id.trim().is_empty() {
                return Err(DocvetError::Validation(format!("{}: empty documentID", at())));
            }
            if document.document_path.trim().is_empty() {
                return Err(DocvetError::Validation(format!(
                    "{} ({}): empty documentPath",
                    at(),
                    document.document_id
                )));
            }
            if !seen.insert(document.document_id.as_str()) {
                return Err(DocvetError::Validation(format!(
                    "{}: duplicate documentID {}",
                    at(),
                    document.document_id
                )));
            }
        }
    }
    Ok(())
}
