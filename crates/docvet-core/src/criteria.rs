// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Quality criteria configuration: severities, aggregation modes, thresholds,
// and the ordered criteria set loaded once per run.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{DocvetError, Result};

/// How a failing criterion affects the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CriteriaType {
    /// Failure rejects the document and stops evaluation.
    Required,
    /// Failure is reported as a reason but the document stays accepted.
    Recommended,
    /// Failure is reported as a warning only.
    Warning,
}

/// Reduction used to combine per-page values into one document-level value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateMode {
    Min,
    Max,
    Avg,
}

impl AggregateMode {
    /// Reduce `values`. Returns `None` for an empty slice.
    pub fn apply(self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let reduced = match self {
            Self::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Avg => values.iter().sum::<f64>() / values.len() as f64,
        };
        Some(reduced)
    }
}

/// The metric families a criterion can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionKind {
    FileIntegrity,
    Resolution,
    Brightness,
    Blur,
    Skew,
    Watermark,
    TextDensity,
    Noise,
    Compression,
    MissingPages,
}

impl CriterionKind {
    /// Every known kind, in a stable order.
    pub const ALL: [CriterionKind; 10] = [
        Self::FileIntegrity,
        Self::Resolution,
        Self::Brightness,
        Self::Blur,
        Self::Skew,
        Self::Watermark,
        Self::TextDensity,
        Self::Noise,
        Self::Compression,
        Self::MissingPages,
    ];

    /// Configuration name of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FileIntegrity => "file_integrity",
            Self::Resolution => "resolution",
            Self::Brightness => "brightness",
            Self::Blur => "blur",
            Self::Skew => "skew",
            Self::Watermark => "watermark",
            Self::TextDensity => "text_density",
            Self::Noise => "noise",
            Self::Compression => "compression",
            Self::MissingPages => "missing_pages",
        }
    }
}

impl std::fmt::Display for CriterionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Sparse set of numeric bounds. Each criterion reads only its own fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Threshold {
    // resolution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_dpi: Option<f64>,
    // brightness
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    // blur
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_variance: Option<f64>,
    // skew
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_deg: Option<f64>,
    // text density (min/max) and noise (max)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_percent: Option<f64>,
    // watermark
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_overlap: Option<f64>,
    // compression
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_entropy: Option<f64>,
    // missing pages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_content_ratio: Option<f64>,
}

impl Threshold {
    /// All populated bounds as `(field, value)` pairs.
    pub fn populated(&self) -> Vec<(&'static str, f64)> {
        [
            ("min_dpi", self.min_dpi),
            ("min", self.min),
            ("max", self.max),
            ("min_variance", self.min_variance),
            ("max_deg", self.max_deg),
            ("min_percent", self.min_percent),
            ("max_percent", self.max_percent),
            ("max_overlap", self.max_overlap),
            ("min_entropy", self.min_entropy),
            ("min_content_ratio", self.min_content_ratio),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect()
    }

    /// Structural checks independent of which criterion owns the threshold:
    /// finite, non-negative, and ordered lower/upper pairs.
    pub fn check_bounds(&self) -> std::result::Result<(), String> {
        for (name, value) in self.populated() {
            if !value.is_finite() {
                return Err(format!("{} is not a finite number", name));
            }
            if value < 0.0 {
                return Err(format!("{} must not be negative (got {})", name, value));
            }
        }
        if let (Some(lo), Some(hi)) = (self.min, self.max) {
            if lo > hi {
                return Err(format!("min ({}) exceeds max ({})", lo, hi));
            }
        }
        if let (Some(lo), Some(hi)) = (self.min_percent, self.max_percent) {
            if lo > hi {
                return Err(format!("min_percent ({}) exceeds max_percent ({})", lo, hi));
            }
        }
        Ok(())
    }
}

/// One configured quality criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriteriaConfig {
    pub name: CriterionKind,
    #[serde(rename = "type")]
    pub kind: CriteriaType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub threshold: Threshold,
    /// Per-criterion default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate_mode: Option<AggregateMode>,
}

impl CriteriaConfig {
    pub fn new(name: CriterionKind, kind: CriteriaType, threshold: Threshold) -> Self {
        Self {
            name,
            kind,
            description: String::new(),
            threshold,
            aggregate_mode: None,
        }
    }

    pub fn with_aggregate(mut self, mode: AggregateMode) -> Self {
        self.aggregate_mode = Some(mode);
        self
    }

    /// Configured aggregation, or `default` when the config leaves it out.
    pub fn aggregate_or(&self, default: AggregateMode) -> AggregateMode {
        self.aggregate_mode.unwrap_or(default)
    }
}

/// The ordered criteria of one run. Order is significant: required criteria
/// fail fast in list order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriteriaSet {
    pub criteria: Vec<CriteriaConfig>,
}

impl CriteriaSet {
    pub fn new(criteria: Vec<CriteriaConfig>) -> Self {
        Self { criteria }
    }

    /// Load and structurally validate a criteria file of the form
    /// `{"criteria": [...]}`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| {
            DocvetError::Configuration(format!("cannot read {}: {}", path.display(), err))
        })?;
        let set = Self::from_json_str(&raw)?;
        info!(criteria = set.len(), "Criteria loaded");
        Ok(set)
    }

    /// Parse and structurally validate criteria JSON.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let set: Self = serde_json::from_str(raw)
            .map_err(|err| DocvetError::Configuration(format!("malformed criteria: {}", err)))?;
        set.check_structure()?;
        Ok(set)
    }

    /// Reject empty sets and malformed bounds.
    pub fn check_structure(&self) -> Result<()> {
        if self.criteria.is_empty() {
            return Err(DocvetError::Configuration("criteria set is empty".into()));
        }
        for (index, config) in self.criteria.iter().enumerate() {
            config.threshold.check_bounds().map_err(|detail| {
                DocvetError::Configuration(format!(
                    "criterion #{} ({}): {}",
                    index, config.name, detail
                ))
            })?;
            debug!(index, name = %config.name, kind = ?config.kind, "Criterion accepted");
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CriteriaConfig> {
        self.criteria.iter()
    }

    pub fn as_slice(&self) -> &[CriteriaConfig] {
        &self.criteria
    }

    /// First criterion of the given kind, if configured.
    pub fn find(&self, kind: CriterionKind) -> Option<&CriteriaConfig> {
        find_kind(&self.criteria, kind)
    }
}

impl<'a> IntoIterator for &'a CriteriaSet {
    type Item = &'a CriteriaConfig;
    type IntoIter = std::slice::Iter<'a, CriteriaConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.criteria.iter()
    }
}

/// First criterion of `kind` in `criteria`.
pub fn find_kind(criteria: &[CriteriaConfig], kind: CriterionKind) -> Option<&CriteriaConfig> {
    criteria.iter().find(|c| c.name == kind)
}
