// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A single grayscale page plus the resolution metadata its source declared.

use image::GrayImage;

/// PDF user-space units per inch.
pub const POINTS_PER_INCH: f64 = 72.0;

/// One normalized page. Owned by the evaluation of a single document and
/// dropped as soon as that document's checks finish.
#[derive(Debug, Clone)]
pub struct RasterPage {
    image: GrayImage,
    /// DPI recorded in the source file's own metadata, if any.
    declared_dpi: Option<f64>,
    /// Physical page width in PDF points (vector-origin formats only).
    page_width_pt: Option<f64>,
}

impl RasterPage {
    pub fn new(image: GrayImage) -> Self {
        Self {
            image,
            declared_dpi: None,
            page_width_pt: None,
        }
    }

    pub fn with_declared_dpi(mut self, dpi: Option<f64>) -> Self {
        self.declared_dpi = dpi.filter(|d| d.is_finite() && *d > 0.0);
        self
    }

    pub fn with_page_width_pt(mut self, width_pt: Option<f64>) -> Self {
        self.page_width_pt = width_pt.filter(|w| w.is_finite() && *w > 0.0);
        self
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    pub fn into_image(self) -> GrayImage {
        self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// DPI from source metadata.
    pub fn declared_dpi(&self) -> Option<f64> {
        self.declared_dpi
    }

    pub fn page_width_pt(&self) -> Option<f64> {
        self.page_width_pt
    }

    /// DPI implied by pixel width over physical page width.
    pub fn physical_dpi(&self) -> Option<f64> {
        self.page_width_pt
            .map(|pt| self.image.width() as f64 * POINTS_PER_INCH / pt)
    }
}
