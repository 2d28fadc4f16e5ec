// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Evaluation worker: one document in, one verdict out, never a panic.
//
// The time budget is advisory. Evaluation is a single blocking unit, so the
// worker can only notice an overrun after the fact; a hard deadline needs an
// external supervisor that can kill the whole process.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use docvet_core::error::panic_detail;
use docvet_core::{CriteriaConfig, Document, Verdict};
use docvet_quality::CriteriaEngine;
use tracing::{debug, error, instrument, warn};

/// What a worker hands back for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerOutcome {
    pub verdict: Verdict,
    pub elapsed: Duration,
    /// Finished after the soft budget ran out.
    pub over_budget: bool,
}

/// Anything that can turn a document into a verdict on a blocking thread.
pub trait DocumentEvaluator: Send + Sync {
    fn evaluate(&self, document: &Document) -> WorkerOutcome;
}

/// The production evaluator: criteria engine plus a per-document budget.
#[derive(Clone)]
pub struct EvaluationWorker {
    engine: CriteriaEngine,
    criteria: Arc<[CriteriaConfig]>,
    budget: Duration,
}

impl EvaluationWorker {
    pub fn new(engine: CriteriaEngine, criteria: Vec<CriteriaConfig>, budget: Duration) -> Self {
        Self {
            engine,
            criteria: criteria.into(),
            budget,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }
}

impl DocumentEvaluator for EvaluationWorker {
    #[instrument(skip_all, fields(document_id = %document.document_id))]
    fn evaluate(&self, document: &Document) -> WorkerOutcome {
        let started = Instant::now();

        if !document.requires_ocr {
            debug!("OCR not required, accepted without checks");
            return WorkerOutcome {
                verdict: Verdict::accepted(),
                elapsed: started.elapsed(),
                over_budget: false,
            };
        }

        let path = Path::new(&document.document_path);
        let format = document.document_format.as_deref();
        let verdict = catch_unwind(AssertUnwindSafe(|| {
            self.engine.evaluate(path, format, &self.criteria)
        }))
        .unwrap_or_else(|payload| {
            let detail = panic_detail(payload.as_ref());
            error!(%detail, "Evaluation panicked");
            Verdict::rejected(format!("unexpected error: {}", detail))
        });

        let elapsed = started.elapsed();
        let over_budget = elapsed > self.budget;
        if over_budget {
            warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = self.budget.as_millis() as u64,
                "Document exceeded its soft time budget"
            );
        }
        WorkerOutcome {
            verdict,
            elapsed,
            over_budget,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docvet_core::error::{DocvetError, Result};
    use docvet_core::{CriteriaType, CriterionKind, DocumentFormat, Threshold};
    use docvet_quality::EngineSettings;
    use docvet_raster::{RasterPage, RasterProvider, RasterRequest};
    use image::{GrayImage, Luma};

    struct BlankPages;

    impl RasterProvider for BlankPages {
        fn pages(&self, _: &Path, _: &DocumentFormat, _: &RasterRequest) -> Result<Vec<RasterPage>> {
            Ok(vec![RasterPage::new(GrayImage::from_pixel(50, 50, Luma([255])))])
        }
    }

    struct Exploding;

    impl RasterProvider for Exploding {
        fn pages(&self, path: &Path, _: &DocumentFormat, _: &RasterRequest) -> Result<Vec<RasterPage>> {
            if path.ends_with("io.png") {
                return Err(DocvetError::Extraction("unreadable".into()));
            }
            panic!("decoder crashed on {}", path.display());
        }
    }

    fn strict_blur() -> Vec<CriteriaConfig> {
        vec![CriteriaConfig::new(
            CriterionKind::Blur,
            CriteriaType::Required,
            Threshold {
                min_variance: Some(1e6),
                ..Default::default()
            },
        )]
    }

    fn worker(provider: Arc<dyn RasterProvider>, budget: Duration) -> EvaluationWorker {
        EvaluationWorker::new(
            CriteriaEngine::new(provider, EngineSettings::default()),
            strict_blur(),
            budget,
        )
    }

    #[test]
    fn documents_without_ocr_are_accepted_untouched() {
        // The provider would panic if it were ever asked for pages.
        let worker = worker(Arc::new(Exploding), Duration::from_secs(5));
        let outcome = worker.evaluate(&Document::new("d1", "/nowhere/scan.pdf", false));
        assert_eq!(outcome.verdict, Verdict::accepted());
        assert!(!outcome.over_budget);
    }

    #[test]
    fn engine_verdict_is_returned() {
        let worker = worker(Arc::new(BlankPages), Duration::from_secs(5));
        let outcome = worker.evaluate(&Document::new("d1", "scan.png", true));
        assert!(!outcome.verdict.accepted);
        assert!(outcome.verdict.reasons[0].starts_with("Image too blurry"));
    }

    #[test]
    fn panics_become_unexpected_errors() {
        let worker = worker(Arc::new(Exploding), Duration::from_secs(5));
        let outcome = worker.evaluate(&Document::new("d1", "boom.png", true));
        assert!(!outcome.verdict.accepted);
        assert_eq!(outcome.verdict.reasons, vec!["unexpected error: decoder crashed on boom.png".to_string()]);
        assert!(outcome.verdict.warnings.is_empty());
    }

    #[test]
    fn extraction_errors_pass_through() {
        let worker = worker(Arc::new(Exploding), Duration::from_secs(5));
        let outcome = worker.evaluate(&Document::new("d1", "io.png", true));
        assert_eq!(outcome.verdict.reasons, vec!["extraction failed: unreadable".to_string()]);
    }

    #[test]
    fn overrun_is_flagged_but_verdict_kept() {
        let worker = worker(Arc::new(BlankPages), Duration::ZERO);
        let outcome = worker.evaluate(&Document::new("d1", "scan.png", true));
        assert!(outcome.over_budget);
        assert!(outcome.verdict.reasons[0].starts_with("Image too blurry"));
    }
}
