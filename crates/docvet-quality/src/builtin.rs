// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The ten built-in criteria. Each one maps its metric over the pages,
// reduces the values, and compares against its own threshold fields.

use docvet_core::error::{DocvetError, Result};
use docvet_core::{AggregateMode, CriteriaConfig, CriterionKind};
use docvet_raster::RasterPage;
use image::GrayImage;
use tracing::debug;

use crate::criterion::{CheckOutcome, Criterion, PageContext, bound, reduce};
use crate::metrics;

fn per_page(context: &PageContext<'_>, metric: fn(&GrayImage) -> f64) -> Vec<f64> {
    context.pages.iter().map(|page| metric(page.image())).collect()
}

fn outcome(passed: bool, reason: impl FnOnce() -> String) -> CheckOutcome {
    if passed {
        CheckOutcome::Passed
    } else {
        CheckOutcome::Failed(reason())
    }
}

// -- File integrity -----------------------------------------------------------

/// Passes once pages exist; extraction failure is reported before any
/// criterion runs.
#[derive(Debug, Default)]
pub struct FileIntegrity;

impl Criterion for FileIntegrity {
    fn kind(&self) -> CriterionKind {
        CriterionKind::FileIntegrity
    }

    fn default_aggregate(&self) -> AggregateMode {
        AggregateMode::Min
    }

    fn check(&self, _config: &CriteriaConfig, _context: &PageContext<'_>) -> Result<CheckOutcome> {
        Ok(CheckOutcome::Passed)
    }
}

// -- Resolution ---------------------------------------------------------------

/// Effective DPI, skipping near-blank pages.
///
/// Metadata DPI and glyph-estimated DPI are aggregated independently of the
/// threshold, so raising `min_dpi` can only turn a pass into a failure.
#[derive(Debug, Default)]
pub struct Resolution;

impl Criterion for Resolution {
    fn kind(&self) -> CriterionKind {
        CriterionKind::Resolution
    }

    fn default_aggregate(&self) -> AggregateMode {
        AggregateMode::Min
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["min_dpi"]
    }

    fn check(&self, config: &CriteriaConfig, context: &PageContext<'_>) -> Result<CheckOutcome> {
        let min_dpi = bound(self.kind(), "min_dpi", config.threshold.min_dpi)?;

        let measured: Vec<&RasterPage> = context
            .pages
            .iter()
            .zip(context.content_ratios)
            .filter(|(_, ratio)| **ratio >= context.near_blank_percent)
            .map(|(page, _)| page)
            .collect();

        if measured.is_empty() {
            debug!(pages = context.pages.len(), "All pages near-blank, resolution skipped");
            return Ok(CheckOutcome::Passed);
        }

        // Metadata and glyph readings are reduced separately; the document
        // passes if either one reaches the minimum.
        let declared: Vec<f64> = measured
            .iter()
            .map(|page| metrics::metadata_dpi(page, context.format).unwrap_or(0.0))
            .collect();
        let metadata_dpi = reduce(self, config, &declared)?;
        if metadata_dpi >= min_dpi {
            debug!(metadata_dpi, min_dpi, "Resolution from metadata");
            return Ok(CheckOutcome::Passed);
        }

        let estimates: Vec<f64> = measured
            .iter()
            .map(|page| metrics::estimate_dpi_from_glyphs(page.image()).unwrap_or(0.0))
            .collect();
        let estimated_dpi = reduce(self, config, &estimates)?;
        debug!(
            metadata_dpi,
            estimated_dpi,
            min_dpi,
            measured_pages = measured.len(),
            "Resolution estimated"
        );
        Ok(outcome(estimated_dpi >= min_dpi, || {
            format!(
                "Resolution too low (metadata_dpi: {:.2}, estimated_dpi: {:.2})",
                metadata_dpi, estimated_dpi
            )
        }))
    }
}

// -- Brightness ---------------------------------------------------------------

#[derive(Debug, Default)]
pub struct Brightness;

impl Criterion for Brightness {
    fn kind(&self) -> CriterionKind {
        CriterionKind::Brightness
    }

    fn default_aggregate(&self) -> AggregateMode {
        AggregateMode::Avg
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["min", "max"]
    }

    fn check(&self, config: &CriteriaConfig, context: &PageContext<'_>) -> Result<CheckOutcome> {
        let min = bound(self.kind(), "min", config.threshold.min)?;
        let max = bound(self.kind(), "max", config.threshold.max)?;
        let brightness = reduce(self, config, &per_page(context, metrics::trimmed_brightness))?;
        debug!(brightness, min, max, "Brightness measured");
        Ok(outcome((min..=max).contains(&brightness), || {
            format!(
                "Brightness out of range ({:.2}, expected {:.2}-{:.2})",
                brightness, min, max
            )
        }))
    }
}

// -- Blur ---------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct Blur;

impl Criterion for Blur {
    fn kind(&self) -> CriterionKind {
        CriterionKind::Blur
    }

    fn default_aggregate(&self) -> AggregateMode {
        AggregateMode::Min
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["min_variance"]
    }

    fn check(&self, config: &CriteriaConfig, context: &PageContext<'_>) -> Result<CheckOutcome> {
        let min_variance = bound(self.kind(), "min_variance", config.threshold.min_variance)?;
        let variance = reduce(self, config, &per_page(context, metrics::laplacian_variance))?;
        debug!(variance, min_variance, "Blur measured");
        Ok(outcome(variance >= min_variance, || {
            format!("Image too blurry (variance: {:.2})", variance)
        }))
    }
}

// -- Skew ---------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct Skew;

impl Criterion for Skew {
    fn kind(&self) -> CriterionKind {
        CriterionKind::Skew
    }

    fn default_aggregate(&self) -> AggregateMode {
        AggregateMode::Max
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["max_deg"]
    }

    fn check(&self, config: &CriteriaConfig, context: &PageContext<'_>) -> Result<CheckOutcome> {
        let max_deg = bound(self.kind(), "max_deg", config.threshold.max_deg)?;
        let angle = reduce(self, config, &per_page(context, metrics::estimate_skew))?;
        debug!(angle, max_deg, "Skew measured");
        Ok(outcome(angle <= max_deg, || {
            format!("Skew angle too large ({:.2} degrees)", angle)
        }))
    }
}

// -- Watermark ----------------------------------------------------------------

#[derive(Debug, Default)]
pub struct Watermark;

impl Criterion for Watermark {
    fn kind(&self) -> CriterionKind {
        CriterionKind::Watermark
    }

    fn default_aggregate(&self) -> AggregateMode {
        AggregateMode::Max
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["max_overlap"]
    }

    fn check(&self, config: &CriteriaConfig, context: &PageContext<'_>) -> Result<CheckOutcome> {
        let max_overlap = bound(self.kind(), "max_overlap", config.threshold.max_overlap)?;
        let score = reduce(self, config, &per_page(context, metrics::watermark_score))?;
        debug!(score, max_overlap, "Watermark measured");
        Ok(outcome(score <= max_overlap, || {
            format!("Watermark interference too high (FFT score: {:.2})", score)
        }))
    }
}

// -- Text density -------------------------------------------------------------

#[derive(Debug, Default)]
pub struct TextDensity;

impl Criterion for TextDensity {
    fn kind(&self) -> CriterionKind {
        CriterionKind::TextDensity
    }

    fn default_aggregate(&self) -> AggregateMode {
        AggregateMode::Avg
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["min_percent", "max_percent"]
    }

    fn check(&self, config: &CriteriaConfig, context: &PageContext<'_>) -> Result<CheckOutcome> {
        let min = bound(self.kind(), "min_percent", config.threshold.min_percent)?;
        let max = bound(self.kind(), "max_percent", config.threshold.max_percent)?;
        let density = reduce(self, config, context.content_ratios)?;
        debug!(density, min, max, "Text density measured");
        Ok(outcome((min..=max).contains(&density), || {
            format!("Text density out of range ({:.2}%)", density)
        }))
    }
}

// -- Noise --------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct Noise;

impl Criterion for Noise {
    fn kind(&self) -> CriterionKind {
        CriterionKind::Noise
    }

    fn default_aggregate(&self) -> AggregateMode {
        AggregateMode::Max
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["max_percent"]
    }

    fn check(&self, config: &CriteriaConfig, context: &PageContext<'_>) -> Result<CheckOutcome> {
        let max = bound(self.kind(), "max_percent", config.threshold.max_percent)?;
        let noise = reduce(self, config, &per_page(context, metrics::noise_percent))?;
        debug!(noise, max, "Noise measured");
        Ok(outcome(noise <= max, || {
            format!("Noise level too high (max: {:.2}%)", noise)
        }))
    }
}

// -- Compression --------------------------------------------------------------

#[derive(Debug, Default)]
pub struct Compression;

impl Criterion for Compression {
    fn kind(&self) -> CriterionKind {
        CriterionKind::Compression
    }

    fn default_aggregate(&self) -> AggregateMode {
        AggregateMode::Min
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["min_entropy"]
    }

    fn check(&self, config: &CriteriaConfig, context: &PageContext<'_>) -> Result<CheckOutcome> {
        let min_entropy = bound(self.kind(), "min_entropy", config.threshold.min_entropy)?;
        let entropy = reduce(self, config, &per_page(context, metrics::histogram_entropy))?;
        debug!(entropy, min_entropy, "Entropy measured");
        Ok(outcome(entropy >= min_entropy, || {
            format!("Compression artifact detected (min_entropy: {:.2})", entropy)
        }))
    }
}

// -- Missing pages ------------------------------------------------------------

/// Worst page governs; `aggregate_mode` is ignored.
#[derive(Debug, Default)]
pub struct MissingPages;

impl Criterion for MissingPages {
    fn kind(&self) -> CriterionKind {
        CriterionKind::MissingPages
    }

    fn default_aggregate(&self) -> AggregateMode {
        AggregateMode::Min
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["min_content_ratio"]
    }

    fn check(&self, config: &CriteriaConfig, context: &PageContext<'_>) -> Result<CheckOutcome> {
        let min_ratio = bound(self.kind(), "min_content_ratio", config.threshold.min_content_ratio)?;
        // Any blank page fails the document, whatever mode is configured.
        let ratio = AggregateMode::Min.apply(context.content_ratios).ok_or_else(|| {
            DocvetError::MetricComputation {
                criterion: self.kind().to_string(),
                detail: "no pages to measure".into(),
            }
        })?;
        debug!(ratio, min_ratio, "Content ratio measured");
        Ok(outcome(ratio >= min_ratio, || {
            format!("Page may be missing or blank (content ratio: {:.2}%)", ratio)
        }))
    }
}
