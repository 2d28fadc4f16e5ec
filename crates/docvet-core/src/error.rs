// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for docvet.

use thiserror::Error;

/// Top-level error type for all docvet operations.
///
/// The first five variants are the evaluation taxonomy. Extraction, metric
/// and transport errors are recovered per document (turned into a rejection
/// reason); configuration and validation errors abort the whole run.
#[derive(Debug, Error)]
pub enum DocvetError {
    // -- Per-document --
    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("{criterion} check failed: {detail}")]
    MetricComputation { criterion: String, detail: String },

    #[error("Critical processing error: {0}")]
    WorkerTransport(String),

    // -- Run-level --
    #[error("invalid criteria configuration: {0}")]
    Configuration(String),

    #[error("invalid input batch: {0}")]
    Validation(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DocvetError {
    /// Whether this error aborts a whole pipeline run rather than a single
    /// document.
    pub fn is_run_level(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::Validation(_) | Self::Io(_) | Self::Serialization(_)
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocvetError>;

/// Best-effort text of a caught panic payload.
pub fn panic_detail(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
