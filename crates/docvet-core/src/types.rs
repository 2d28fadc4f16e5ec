// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types: documents, batches, formats, and verdicts.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// A single document submitted for OCR-readiness triage.
///
/// Field names on the wire follow the ingestion API (`documentID`,
/// `requiresOCR`, ...). Only `is_accepted`, `reasons` and `warnings` are
/// written by evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "documentID")]
    pub document_id: String,
    #[serde(rename = "documentType", default)]
    pub document_type: Option<String>,
    #[serde(rename = "documentFormat", default)]
    pub document_format: Option<String>,
    #[serde(rename = "documentPath")]
    pub document_path: String,
    #[serde(rename = "requiresOCR", default)]
    pub requires_ocr: bool,
    #[serde(rename = "isAccepted", default)]
    pub is_accepted: Option<bool>,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl Document {
    /// Create an unevaluated document.
    pub fn new(id: impl Into<String>, path: impl Into<String>, requires_ocr: bool) -> Self {
        Self {
            document_id: id.into(),
            document_type: None,
            document_format: None,
            document_path: path.into(),
            requires_ocr,
            is_accepted: None,
            reasons: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Builder-style setter for the declared format.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.document_format = Some(format.into());
        self
    }

    /// Write the evaluation result onto the document.
    pub fn apply_verdict(&mut self, verdict: Verdict) {
        self.is_accepted = Some(verdict.accepted);
        self.reasons = verdict.reasons;
        self.warnings = verdict.warnings;
    }
}

/// A customer submission: a container of independent documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentBatch {
    #[serde(rename = "customerID")]
    pub customer_id: String,
    #[serde(rename = "transactionID", default)]
    pub transaction_id: Option<String>,
    pub documents: Vec<Document>,
}

/// Outcome of evaluating one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub accepted: bool,
    pub reasons: Vec<String>,
    pub warnings: Vec<String>,
}

impl Verdict {
    /// Accepted with nothing to report.
    pub fn accepted() -> Self {
        Self {
            accepted: true,
            reasons: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Rejected with a single reason.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reasons: vec![reason.into()],
            warnings: Vec::new(),
        }
    }
}

/// Input document formats the raster layer knows how to open.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Pdf,
    Tiff,
    Png,
    Jpeg,
    Bmp,
    /// Anything else; decoded by content sniffing.
    Other(String),
}

impl DocumentFormat {
    /// Parse a declared format or file extension (case-insensitive, leading
    /// dot tolerated).
    pub fn from_extension(ext: &str) -> Self {
        let lower = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        match lower.as_str() {
            "pdf" => Self::Pdf,
            "tif" | "tiff" => Self::Tiff,
            "png" => Self::Png,
            "jpg" | "jpeg" => Self::Jpeg,
            "bmp" => Self::Bmp,
            _ => Self::Other(lower),
        }
    }

    /// Use the declared format when present, otherwise infer from the path.
    pub fn resolve(declared: Option<&str>, path: impl AsRef<Path>) -> Self {
        match declared.filter(|d| !d.trim().is_empty()) {
            Some(d) => Self::from_extension(d),
            None => path
                .as_ref()
                .extension()
                .and_then(|e| e.to_str())
                .map(Self::from_extension)
                .unwrap_or_else(|| Self::Other(String::new())),
        }
    }

    /// Whether pages of this format originate from a page description with a
    /// physical size (used by the DPI fallback chain).
    pub fn is_vector_origin(&self) -> bool {
        matches!(self, Self::Pdf)
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pdf => write!(f, "pdf"),
            Self::Tiff => write!(f, "tiff"),
            Self::Png => write!(f, "png"),
            Self::Jpeg => write!(f, "jpeg"),
            Self::Bmp => write!(f, "bmp"),
            Self::Other(ext) if ext.is_empty() => write!(f, "unknown"),
            Self::Other(ext) => write!(f, "{}", ext),
        }
    }
}
