// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The strategy interface every quality criterion implements.

use docvet_core::error::{DocvetError, Result};
use docvet_core::{AggregateMode, CriteriaConfig, CriterionKind, DocumentFormat, Threshold};
use docvet_raster::RasterPage;

/// Everything a criterion may look at for one document.
///
/// Content ratios are computed once by the engine and shared, since several
/// criteria depend on them.
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    pub pages: &'a [RasterPage],
    pub format: &'a DocumentFormat,
    /// Per-page content percentage, parallel to `pages`.
    pub content_ratios: &'a [f64],
    /// Pages below this content percentage are near-blank.
    pub near_blank_percent: f64,
}

/// Result of a measurement that completed.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    Passed,
    /// The measurement violated the threshold. The reason carries the
    /// observed value.
    Failed(String),
}

/// A measurable quality criterion.
///
/// `check` returns `Ok(CheckOutcome::Failed(..))` for a designed rejection
/// and `Err(..)` only when the measurement itself could not be produced.
pub trait Criterion: Send + Sync {
    fn kind(&self) -> CriterionKind;

    /// Reduction used when the configuration does not name one.
    fn default_aggregate(&self) -> AggregateMode;

    /// Threshold fields this criterion cannot work without.
    fn required_fields(&self) -> &'static [&'static str] {
        &[]
    }

    /// Check that `threshold` carries what this criterion needs.
    fn validate(&self, threshold: &Threshold) -> std::result::Result<(), String> {
        let populated = threshold.populated();
        for field in self.required_fields() {
            if !populated.iter().any(|(name, _)| name == field) {
                return Err(format!("{} requires threshold field {}", self.kind(), field));
            }
        }
        Ok(())
    }

    fn check(&self, config: &CriteriaConfig, context: &PageContext<'_>) -> Result<CheckOutcome>;
}

/// Unwrap a threshold bound that validation guarantees is present.
pub(crate) fn bound(kind: CriterionKind, field: &str, value: Option<f64>) -> Result<f64> {
    value.ok_or_else(|| DocvetError::MetricComputation {
        criterion: kind.to_string(),
        detail: format!("threshold field {} is missing", field),
    })
}

/// Reduce per-page values with the configured or default mode.
pub(crate) fn reduce(
    criterion: &dyn Criterion,
    config: &CriteriaConfig,
    values: &[f64],
) -> Result<f64> {
    config
        .aggregate_or(criterion.default_aggregate())
        .apply(values)
        .ok_or_else(|| DocvetError::MetricComputation {
            criterion: criterion.kind().to_string(),
            detail: "no pages to measure".into(),
        })
}
