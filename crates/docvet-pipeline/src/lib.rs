// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docvet-pipeline: batch evaluation across a bounded pool of blocking
// workers, with per-document fault isolation and run-level metrics.

pub mod pipeline;
pub mod report;
pub mod worker;

pub use pipeline::{Pipeline, RunOutput, parse_batches, validate_batches};
pub use report::{RejectedDocument, RunMetrics};
pub use worker::{DocumentEvaluator, EvaluationWorker, WorkerOutcome};
