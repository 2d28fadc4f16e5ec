// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criteria evaluation engine: rasterize once, measure in configured order,
// fold outcomes into a verdict with fail-fast on required criteria.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use docvet_core::criteria::find_kind;
use docvet_core::error::{DocvetError, Result, panic_detail};
use docvet_core::{
    AppConfig, CriteriaConfig, CriteriaType, CriterionKind, DocumentFormat, Verdict,
};
use docvet_raster::{RasterProvider, RasterRequest};
use tracing::{debug, error, info, instrument};

use crate::criterion::{CheckOutcome, PageContext};
use crate::metrics;
use crate::registry::CriteriaRegistry;

/// Knobs the engine takes from the application config.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub max_pages: usize,
    /// Raster DPI hint when no resolution criterion is configured.
    pub default_dpi: u32,
    /// Near-blank cut-off when no text_density criterion is configured.
    pub min_content_percent_fallback: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for EngineSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_pages: config.max_pages_per_document,
            default_dpi: config.default_dpi,
            min_content_percent_fallback: config.min_content_percent_fallback,
        }
    }
}

/// Evaluates one document at a time against an ordered criteria list.
///
/// Cheap to share: the provider and registry sit behind `Arc`s and nothing
/// is mutated during evaluation.
#[derive(Clone)]
pub struct CriteriaEngine {
    provider: Arc<dyn RasterProvider>,
    registry: Arc<CriteriaRegistry>,
    settings: EngineSettings,
}

impl CriteriaEngine {
    // -- Construction ---------------------------------------------------------

    /// Engine with the standard criteria.
    pub fn new(provider: Arc<dyn RasterProvider>, settings: EngineSettings) -> Self {
        Self {
            provider,
            registry: Arc::new(CriteriaRegistry::standard()),
            settings,
        }
    }

    /// Replace the criteria registry.
    pub fn with_registry(mut self, registry: CriteriaRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    // -- Accessors ------------------------------------------------------------

    pub fn registry(&self) -> &CriteriaRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Reject criteria this engine cannot measure. Run this once before a
    /// batch; [`evaluate`](Self::evaluate) assumes it passed.
    pub fn validate(&self, criteria: &[CriteriaConfig]) -> Result<()> {
        self.registry.validate(criteria)
    }

    // -- Evaluation -----------------------------------------------------------

    /// Evaluate the document at `path`.
    ///
    /// Never fails: extraction and measurement errors become rejection
    /// reasons on the returned verdict.
    #[instrument(skip(self, path, criteria), fields(path = %path.display(), criteria = criteria.len()))]
    pub fn evaluate(&self, path: &Path, format: Option<&str>, criteria: &[CriteriaConfig]) -> Verdict {
        let started = Instant::now();
        let format = DocumentFormat::resolve(format, path);
        let request = self.raster_request(criteria);

        let pages = match self.provider.pages(path, &format, &request) {
            Ok(pages) if !pages.is_empty() => pages,
            Ok(_) => {
                let err = DocvetError::Extraction("no pages could be extracted".into());
                return Verdict::rejected(err.to_string());
            }
            Err(err) => {
                debug!(error = %err, "Extraction failed");
                return Verdict::rejected(extraction_reason(err));
            }
        };

        let content_ratios: Vec<f64> = pages
            .iter()
            .map(|page| metrics::content_ratio(page.image()))
            .collect();
        let context = PageContext {
            pages: &pages,
            format: &format,
            content_ratios: &content_ratios,
            near_blank_percent: self.near_blank_percent(criteria),
        };

        let mut verdict = Verdict::accepted();
        for config in criteria {
            match self.run_criterion(config, &context) {
                Ok(CheckOutcome::Passed) => {
                    debug!(criterion = %config.name, "Criterion passed");
                }
                Ok(CheckOutcome::Failed(reason)) => {
                    debug!(criterion = %config.name, kind = ?config.kind, %reason, "Criterion failed");
                    match config.kind {
                        CriteriaType::Required => {
                            verdict.accepted = false;
                            verdict.reasons.push(reason);
                            break;
                        }
                        CriteriaType::Recommended => verdict.reasons.push(reason),
                        CriteriaType::Warning => verdict.warnings.push(reason),
                    }
                }
                Err(err) => {
                    error!(criterion = %config.name, error = %err, "Criterion could not be measured");
                    verdict.accepted = false;
                    verdict.reasons.push(err.to_string());
                    break;
                }
            }
        }

        info!(
            accepted = verdict.accepted,
            pages = pages.len(),
            reasons = verdict.reasons.len(),
            warnings = verdict.warnings.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Document evaluated"
        );
        verdict
    }

    /// Page cap plus a DPI hint taken from the resolution criterion, so the
    /// provider never under-samples a page that could pass.
    fn raster_request(&self, criteria: &[CriteriaConfig]) -> RasterRequest {
        let dpi_hint = find_kind(criteria, CriterionKind::Resolution)
            .and_then(|c| c.threshold.min_dpi)
            .map(|dpi| dpi.ceil().max(1.0) as u32)
            .unwrap_or(self.settings.default_dpi);
        RasterRequest {
            max_pages: self.settings.max_pages,
            dpi_hint,
        }
    }

    fn near_blank_percent(&self, criteria: &[CriteriaConfig]) -> f64 {
        find_kind(criteria, CriterionKind::TextDensity)
            .and_then(|c| c.threshold.min_percent)
            .unwrap_or(self.settings.min_content_percent_fallback)
    }

    /// Run one criterion, turning a panic into a metric error.
    fn run_criterion(&self, config: &CriteriaConfig, context: &PageContext<'_>) -> Result<CheckOutcome> {
        let strategy = self
            .registry
            .get(config.name)
            .ok_or_else(|| DocvetError::MetricComputation {
                criterion: config.name.to_string(),
                detail: "no strategy registered".into(),
            })?;

        catch_unwind(AssertUnwindSafe(|| strategy.check(config, context))).unwrap_or_else(|payload| {
            Err(DocvetError::MetricComputation {
                criterion: config.name.to_string(),
                detail: panic_detail(payload.as_ref()),
            })
        })
    }
}

/// Reason text for a provider failure, keeping the `extraction failed:`
/// prefix whatever error kind the provider used.
fn extraction_reason(err: DocvetError) -> String {
    match err {
        DocvetError::Extraction(_) => err.to_string(),
        other => DocvetError::Extraction(other.to_string()).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use docvet_core::{AggregateMode, Threshold};
    use docvet_raster::RasterPage;
    use image::{GrayImage, Luma};

    use crate::criterion::Criterion;

    /// Hands out fixed pages and remembers the requests it saw.
    struct StaticProvider {
        pages: Vec<RasterPage>,
        requests: Mutex<Vec<RasterRequest>>,
    }

    impl StaticProvider {
        fn new(images: Vec<GrayImage>) -> Arc<Self> {
            Arc::new(Self {
                pages: images.into_iter().map(RasterPage::new).collect(),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    impl RasterProvider for StaticProvider {
        fn pages(&self, _: &Path, _: &DocumentFormat, request: &RasterRequest) -> Result<Vec<RasterPage>> {
            self.requests.lock().unwrap().push(*request);
            Ok(self.pages.iter().take(request.max_pages).cloned().collect())
        }
    }

    struct BrokenProvider;

    impl RasterProvider for BrokenProvider {
        fn pages(&self, _: &Path, _: &DocumentFormat, _: &RasterRequest) -> Result<Vec<RasterPage>> {
            Err(DocvetError::Extraction("corrupt xref table".into()))
        }
    }

    /// Counts calls and returns a fixed outcome, or panics.
    struct Tripwire {
        kind: CriterionKind,
        calls: Arc<AtomicUsize>,
        outcome: Option<CheckOutcome>,
    }

    impl Criterion for Tripwire {
        fn kind(&self) -> CriterionKind {
            self.kind
        }

        fn default_aggregate(&self) -> AggregateMode {
            AggregateMode::Min
        }

        fn check(&self, _: &CriteriaConfig, _: &PageContext<'_>) -> Result<CheckOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.outcome {
                Some(outcome) => Ok(outcome.clone()),
                None => panic!("tripwire fired"),
            }
        }
    }

    fn engine(provider: Arc<dyn RasterProvider>) -> CriteriaEngine {
        CriteriaEngine::new(provider, EngineSettings::default())
    }

    fn evaluate(engine: &CriteriaEngine, criteria: &[CriteriaConfig]) -> Verdict {
        engine.evaluate(Path::new("scan.png"), None, criteria)
    }

    fn blank() -> GrayImage {
        GrayImage::from_pixel(100, 100, Luma([255]))
    }

    /// White page with `dark` black pixels laid out row-major from the top.
    fn inked(width: u32, height: u32, dark: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            Luma([if y * width + x < dark { 0 } else { 255 }])
        })
    }

    fn criterion(kind: CriterionKind, severity: CriteriaType, threshold: Threshold) -> CriteriaConfig {
        CriteriaConfig::new(kind, severity, threshold)
    }

    fn brightness(min: f64, max: f64) -> CriteriaConfig {
        criterion(
            CriterionKind::Brightness,
            CriteriaType::Required,
            Threshold {
                min: Some(min),
                max: Some(max),
                ..Default::default()
            },
        )
    }

    fn blur(severity: CriteriaType, min_variance: f64) -> CriteriaConfig {
        criterion(
            CriterionKind::Blur,
            severity,
            Threshold {
                min_variance: Some(min_variance),
                ..Default::default()
            },
        )
    }

    #[test]
    fn blank_page_fails_blur() {
        let verdict = evaluate(&engine(StaticProvider::new(vec![blank()])), &[blur(CriteriaType::Required, 1.0)]);
        assert!(!verdict.accepted);
        assert_eq!(verdict.reasons, vec!["Image too blurry (variance: 0.00)".to_string()]);
    }

    #[test]
    fn brightness_bounds_are_inclusive() {
        let mut dark_block = blank();
        for y in 30..70 {
            for x in 30..70 {
                dark_block.put_pixel(x, y, Luma([50]));
            }
        }
        let at_min = evaluate(&engine(StaticProvider::new(vec![dark_block])), &[brightness(50.0, 220.0)]);
        assert!(at_min.accepted, "{:?}", at_min);

        let light = GrayImage::from_pixel(100, 100, Luma([220]));
        let at_max = evaluate(&engine(StaticProvider::new(vec![light])), &[brightness(50.0, 220.0)]);
        assert!(at_max.accepted, "{:?}", at_max);

        let blank_page = evaluate(&engine(StaticProvider::new(vec![blank()])), &[brightness(50.0, 220.0)]);
        assert!(!blank_page.accepted);
        assert!(blank_page.reasons[0].starts_with("Brightness out of range (255.00"));
    }

    #[test]
    fn first_required_failure_stops_evaluation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = CriteriaRegistry::standard();
        registry.register(Box::new(Tripwire {
            kind: CriterionKind::Skew,
            calls: Arc::clone(&calls),
            outcome: Some(CheckOutcome::Failed("second".into())),
        }));
        let engine = engine(StaticProvider::new(vec![blank()])).with_registry(registry);

        let skew = criterion(
            CriterionKind::Skew,
            CriteriaType::Required,
            Threshold {
                max_deg: Some(1.0),
                ..Default::default()
            },
        );
        let verdict = evaluate(&engine, &[blur(CriteriaType::Required, 1.0), skew]);

        assert!(!verdict.accepted);
        assert_eq!(verdict.reasons.len(), 1);
        assert!(verdict.reasons[0].starts_with("Image too blurry"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn recommended_and_warning_failures_keep_acceptance() {
        let verdict = evaluate(
            &engine(StaticProvider::new(vec![blank()])),
            &[blur(CriteriaType::Recommended, 1.0), blur(CriteriaType::Warning, 2.0)],
        );
        assert!(verdict.accepted);
        assert_eq!(verdict.reasons.len(), 1);
        assert_eq!(verdict.warnings.len(), 1);
    }

    #[test]
    fn sparse_page_fails_text_density() {
        // 200 of 10 000 pixels: 2% ink.
        let density = criterion(
            CriterionKind::TextDensity,
            CriteriaType::Required,
            Threshold {
                min_percent: Some(5.0),
                max_percent: Some(80.0),
                ..Default::default()
            },
        )
        .with_aggregate(AggregateMode::Avg);
        let verdict = evaluate(&engine(StaticProvider::new(vec![inked(100, 100, 200)])), &[density]);
        assert!(!verdict.accepted);
        assert!(verdict.reasons[0].contains("Text density out of range"));
        assert!(verdict.reasons[0].contains("2.00%"));
    }

    #[test]
    fn recommended_missing_page_is_reported_but_accepted() {
        // 100 of 20 000 pixels: 0.5% content.
        let missing = criterion(
            CriterionKind::MissingPages,
            CriteriaType::Recommended,
            Threshold {
                min_content_ratio: Some(1.0),
                ..Default::default()
            },
        );
        let verdict = evaluate(&engine(StaticProvider::new(vec![inked(100, 200, 100)])), &[missing]);
        assert!(verdict.accepted);
        assert_eq!(verdict.reasons.len(), 1);
        assert!(verdict.reasons[0].contains("missing or blank"));
    }

    #[test]
    fn extraction_failure_is_terminal() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = CriteriaRegistry::standard();
        registry.register(Box::new(Tripwire {
            kind: CriterionKind::FileIntegrity,
            calls: Arc::clone(&calls),
            outcome: Some(CheckOutcome::Passed),
        }));
        let engine = engine(Arc::new(BrokenProvider)).with_registry(registry);
        let verdict = evaluate(
            &engine,
            &[criterion(CriterionKind::FileIntegrity, CriteriaType::Required, Threshold::default())],
        );
        assert!(!verdict.accepted);
        assert_eq!(verdict.reasons, vec!["extraction failed: corrupt xref table".to_string()]);
        assert!(verdict.warnings.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_warning_criterion_still_rejects() {
        let mut registry = CriteriaRegistry::standard();
        registry.register(Box::new(Tripwire {
            kind: CriterionKind::Noise,
            calls: Arc::new(AtomicUsize::new(0)),
            outcome: None,
        }));
        let engine = engine(StaticProvider::new(vec![blank()])).with_registry(registry);
        let noise = criterion(
            CriterionKind::Noise,
            CriteriaType::Warning,
            Threshold {
                max_percent: Some(5.0),
                ..Default::default()
            },
        );
        let verdict = evaluate(&engine, &[noise]);
        assert!(!verdict.accepted);
        assert_eq!(verdict.reasons, vec!["noise check failed: tripwire fired".to_string()]);
        assert!(verdict.warnings.is_empty());
    }

    #[test]
    fn repeated_evaluation_is_identical() {
        let page = inked(120, 80, 900);
        let engine = engine(StaticProvider::new(vec![page.clone(), page]));
        let criteria = vec![
            blur(CriteriaType::Recommended, 1e9),
            brightness(0.0, 255.0),
            criterion(
                CriterionKind::Compression,
                CriteriaType::Warning,
                Threshold {
                    min_entropy: Some(7.0),
                    ..Default::default()
                },
            ),
        ];
        let first = evaluate(&engine, &criteria);
        let second = evaluate(&engine, &criteria);
        assert_eq!(first, second);
        assert_eq!(first.reasons.len(), 1);
        assert_eq!(first.warnings.len(), 1);
    }

    #[test]
    fn raising_a_required_threshold_never_accepts() {
        let page = inked(100, 100, 2500);
        let engine = engine(StaticProvider::new(vec![page]));
        let mut rejected = false;
        for step in 0..40 {
            let verdict = evaluate(&engine, &[blur(CriteriaType::Required, step as f64 * 500.0)]);
            if rejected {
                assert!(!verdict.accepted, "accepted again at step {}", step);
            }
            rejected |= !verdict.accepted;
        }
        assert!(rejected);
    }

    #[test]
    fn dpi_hint_follows_resolution_criterion() {
        let provider = StaticProvider::new(vec![blank()]);
        let engine = engine(provider.clone());
        let resolution = criterion(
            CriterionKind::Resolution,
            CriteriaType::Required,
            Threshold {
                min_dpi: Some(299.5),
                ..Default::default()
            },
        );
        evaluate(&engine, &[resolution]);
        evaluate(&engine, &[blur(CriteriaType::Warning, 0.0)]);

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests[0].dpi_hint, 300);
        assert_eq!(requests[1].dpi_hint, 200);
        assert_eq!(requests[0].max_pages, 5);
    }

    #[test]
    fn text_density_minimum_sets_near_blank_cutoff() {
        // 3% content page without any DPI signal. With a 5% near-blank
        // cut-off the resolution check is skipped; at the 1% default it runs
        // and fails.
        let page = inked(100, 100, 300);
        let resolution = criterion(
            CriterionKind::Resolution,
            CriteriaType::Required,
            Threshold {
                min_dpi: Some(150.0),
                ..Default::default()
            },
        );
        let density = criterion(
            CriterionKind::TextDensity,
            CriteriaType::Warning,
            Threshold {
                min_percent: Some(5.0),
                max_percent: Some(90.0),
                ..Default::default()
            },
        );

        let engine = engine(StaticProvider::new(vec![page]));
        let skipped = evaluate(&engine, &[resolution.clone(), density]);
        assert!(skipped.accepted);
        assert_eq!(skipped.warnings.len(), 1);

        let checked = evaluate(&engine, &[resolution]);
        assert!(!checked.accepted);
        assert!(checked.reasons[0].starts_with("Resolution too low"));
    }
}
