// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docvet-core: core types, criteria configuration, and error definitions shared
// across all crates.

pub mod config;
pub mod criteria;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use criteria::{AggregateMode, CriteriaConfig, CriteriaSet, CriteriaType, CriterionKind, Threshold};
pub use error::{DocvetError, Result, panic_detail};
pub use types::*;
