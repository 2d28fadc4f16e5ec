// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-format page extraction.

pub mod bitmap;
pub mod density;
pub mod multipage;
pub mod pdf;
#[cfg(feature = "pdfium")]
pub mod render;
