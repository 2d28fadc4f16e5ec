// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Run-level metrics: counters, a rejection-reason histogram and the list of
// rejected documents, exported as JSON at the end of a run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use docvet_core::error::Result;
use docvet_core::Verdict;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

/// One rejected document and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedDocument {
    #[serde(rename = "documentID")]
    pub document_id: String,
    pub reasons: Vec<String>,
}

/// Aggregate outcome of one pipeline run.
///
/// Owned by the collecting task; workers never touch it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// `<UTC timestamp>_<short uuid>`, also used in the export file name.
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub accepted: usize,
    pub rejected: usize,
    /// Occurrences of each reason across rejected documents.
    pub rejection_summary: BTreeMap<String, usize>,
    pub rejected_documents: Vec<RejectedDocument>,
    /// Documents that finished past their soft time budget.
    pub over_budget_documents: Vec<String>,
    pub elapsed_seconds: f64,
}

impl RunMetrics {
    pub fn new() -> Self {
        let started_at = Utc::now();
        let suffix = Uuid::new_v4().simple().to_string();
        Self {
            run_id: format!("{}_{}", started_at.format("%Y%m%d_%H%M%S"), &suffix[..8]),
            started_at,
            total: 0,
            accepted: 0,
            rejected: 0,
            rejection_summary: BTreeMap::new(),
            rejected_documents: Vec::new(),
            over_budget_documents: Vec::new(),
            elapsed_seconds: 0.0,
        }
    }

    /// Fold one document's verdict in.
    pub fn record(&mut self, document_id: &str, verdict: &Verdict, over_budget: bool) {
        self.total += 1;
        if over_budget {
            self.over_budget_documents.push(document_id.to_string());
        }
        if verdict.accepted {
            self.accepted += 1;
            return;
        }
        self.rejected += 1;
        for reason in &verdict.reasons {
            *self.rejection_summary.entry(reason.clone()).or_insert(0) += 1;
        }
        self.rejected_documents.push(RejectedDocument {
            document_id: document_id.to_string(),
            reasons: verdict.reasons.clone(),
        });
    }

    /// Stamp the wall-clock duration of the run.
    pub fn finish(&mut self) {
        let elapsed = Utc::now() - self.started_at;
        self.elapsed_seconds = elapsed.num_milliseconds().max(0) as f64 / 1000.0;
    }

    /// Write `run_<run_id>.json` into `dir`, creating it if needed.
    #[instrument(skip_all, fields(run_id = %self.run_id, dir = %dir.as_ref().display()))]
    pub fn export(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("run_{}.json", self.run_id));
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        info!(path = %path.display(), "Run metrics exported");
        Ok(path)
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}
