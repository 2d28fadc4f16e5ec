// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Single-frame raster images (PNG, JPEG, BMP, GIF, WebP, ...) decoded with
// the `image` crate.

use docvet_core::error::{DocvetError, Result};
use tracing::debug;

use super::density;
use crate::page::RasterPage;

/// Decode one image into a grayscale page, keeping any declared DPI.
pub fn page(data: &[u8]) -> Result<RasterPage> {
    let decoded = image::load_from_memory(data)
        .map_err(|err| DocvetError::Extraction(format!("failed to decode image: {}", err)))?;
    let dpi = density::declared_dpi(data);
    debug!(
        width = decoded.width(),
        height = decoded.height(),
        dpi = ?dpi,
        "Image decoded"
    );
    Ok(RasterPage::new(decoded.to_luma8()).with_declared_dpi(dpi))
}
