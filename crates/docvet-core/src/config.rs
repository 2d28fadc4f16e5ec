// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{DocvetError, Result};

/// Process-wide run settings. Constructed once and passed by value into the
/// pipeline; never read from ambient global state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Upper bound on pages rasterized per document.
    pub max_pages_per_document: usize,
    /// Soft per-document time budget.
    pub timeout_seconds: u64,
    /// Worker pool size. `None` uses the number of logical CPUs.
    pub max_workers: Option<usize>,
    /// Raster DPI hint when no resolution criterion is configured.
    pub default_dpi: u32,
    /// Content percentage below which a page counts as near-blank when no
    /// text_density criterion supplies one.
    pub min_content_percent_fallback: f64,
    /// Directory that receives `run_<id>.json` metrics files.
    pub metrics_dir: PathBuf,
    /// Criteria file loaded at start-up.
    pub criteria_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_pages_per_document: 5,
            timeout_seconds: 60,
            max_workers: None,
            default_dpi: 200,
            min_content_percent_fallback: 1.0,
            metrics_dir: PathBuf::from("logs"),
            criteria_path: PathBuf::from("config/criteria_config.json"),
        }
    }
}

impl AppConfig {
    /// Read settings from a JSON file; absent fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| {
            DocvetError::Configuration(format!("cannot read {}: {}", path.display(), err))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|err| {
            DocvetError::Configuration(format!("malformed app config {}: {}", path.display(), err))
        })?;
        if config.max_pages_per_document == 0 {
            return Err(DocvetError::Configuration(
                "max_pages_per_document must be at least 1".into(),
            ));
        }
        info!(path = %path.display(), "App config loaded");
        Ok(config)
    }

    /// Effective worker count (always at least one).
    pub fn worker_count(&self) -> usize {
        self.max_workers.unwrap_or_else(num_cpus::get).max(1)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.max_pages_per_document, 5);
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert!(config.worker_count() >= 1);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.json");
        std::fs::write(&path, r#"{"max_workers": 3, "timeout_seconds": 5}"#).unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.worker_count(), 3);
        assert_eq!(config.timeout_seconds, 5);
        assert_eq!(config.default_dpi, 200);
    }

    #[test]
    fn zero_workers_is_clamped() {
        let config = AppConfig {
            max_workers: Some(0),
            ..Default::default()
        };
        assert_eq!(config.worker_count(), 1);
    }

    #[test]
    fn zero_page_cap_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.json");
        std::fs::write(&path, r#"{"max_pages_per_document": 0}"#).unwrap();
        assert!(matches!(
            AppConfig::load(&path),
            Err(DocvetError::Configuration(_))
        ));
    }
}
