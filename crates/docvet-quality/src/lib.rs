// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docvet-quality: page quality metrics and the criteria evaluation engine.
//
// `metrics` holds the pure per-page measurements. `builtin` wraps each one
// as a `Criterion` strategy, `registry` maps criterion names to strategies,
// and `engine` folds their outcomes into an accept/reject verdict.

pub mod builtin;
pub mod criterion;
pub mod engine;
pub mod metrics;
pub mod registry;

pub use criterion::{CheckOutcome, Criterion, PageContext};
pub use engine::{CriteriaEngine, EngineSettings};
pub use registry::CriteriaRegistry;
