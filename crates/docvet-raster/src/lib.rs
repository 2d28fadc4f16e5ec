// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docvet-raster: turns a document on disk into an ordered, capped list of
// grayscale raster pages.
//
// Scanned PDFs (embedded page images), multi-page TIFF, and single-frame
// raster images (PNG, JPEG, BMP, ...) are supported. Declared resolution is
// carried along with each page so the quality checks can prefer it over
// estimation.

pub mod formats;
pub mod page;
pub mod provider;

pub use page::RasterPage;
pub use provider::{FileRasterProvider, RasterProvider, RasterRequest};
