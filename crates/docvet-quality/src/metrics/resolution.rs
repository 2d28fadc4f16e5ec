// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Effective page resolution.
//
// Two independent readings: the DPI the file declares (or, for
// page-description formats, pixel width over physical page width) and an
// estimate from the height of glyph-like connected components. Neither
// depends on the required minimum.

use docvet_core::DocumentFormat;
use docvet_raster::RasterPage;
use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::region_labelling::{Connectivity, connected_components};

/// Assumed physical height of a body-text glyph.
pub const GLYPH_HEIGHT_MM: f64 = 2.5;

const MM_PER_INCH: f64 = 25.4;

/// Component heights (px, exclusive) accepted as glyphs.
const GLYPH_HEIGHT_RANGE: (u32, u32) = (10, 100);

/// Width/height ratios (exclusive) accepted as glyphs.
const GLYPH_ASPECT_RANGE: (f64, f64) = (0.1, 1.5);

/// DPI the page carries in its metadata: the declared value, or for
/// page-description formats the physical DPI. `None` when neither exists.
pub fn metadata_dpi(page: &RasterPage, format: &DocumentFormat) -> Option<f64> {
    page.declared_dpi().or_else(|| {
        if format.is_vector_origin() {
            page.physical_dpi()
        } else {
            None
        }
    })
}

/// DPI implied by the median glyph height, or `None` when the page has no
/// glyph-sized components.
pub fn estimate_dpi_from_glyphs(image: &GrayImage) -> Option<f64> {
    let mut heights = glyph_heights(image);
    if heights.is_empty() {
        return None;
    }
    heights.sort_unstable();
    let mid = heights.len() / 2;
    let median = if heights.len() % 2 == 0 {
        (heights[mid - 1] + heights[mid]) as f64 / 2.0
    } else {
        heights[mid] as f64
    };
    Some(median / (GLYPH_HEIGHT_MM / MM_PER_INCH))
}

fn glyph_heights(image: &GrayImage) -> Vec<u32> {
    let Some((darkest, lightest)) = intensity_range(image) else {
        return Vec::new();
    };
    if darkest == lightest {
        return Vec::new();
    }

    // Ink becomes foreground.
    let level = otsu_level(image);
    let binary = GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([if image.get_pixel(x, y).0[0] <= level { 255 } else { 0 }])
    });
    let labels = connected_components(&binary, Connectivity::Eight, Luma([0u8]));

    // Bounding box per label; label 0 is background.
    let mut boxes: Vec<Option<(u32, u32, u32, u32)>> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label.0[0] as usize;
        if label == 0 {
            continue;
        }
        if boxes.len() <= label {
            boxes.resize(label + 1, None);
        }
        boxes[label] = Some(match boxes[label] {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }

    boxes
        .into_iter()
        .flatten()
        .filter_map(|(x0, y0, x1, y1)| {
            let width = x1 - x0 + 1;
            let height = y1 - y0 + 1;
            let aspect = width as f64 / height as f64;
            let glyph_like = height > GLYPH_HEIGHT_RANGE.0
                && height < GLYPH_HEIGHT_RANGE.1
                && aspect > GLYPH_ASPECT_RANGE.0
                && aspect < GLYPH_ASPECT_RANGE.1;
            glyph_like.then_some(height)
        })
        .collect()
}

fn intensity_range(image: &GrayImage) -> Option<(u8, u8)> {
    image.pixels().fold(None, |range, p| {
        let v = p.0[0];
        Some(match range {
            None => (v, v),
            Some((lo, hi)) => (lo.min(v), hi.max(v)),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// White page with a grid of `glyph_w` x `glyph_h` black blocks.
    fn glyph_page(glyph_w: u32, glyph_h: u32) -> GrayImage {
        let mut img = GrayImage::from_pixel(600, 400, Luma([255]));
        let cols = (560 / (glyph_w + 8)).min(20);
        for row in 0..5 {
            for col in 0..cols {
                let (ox, oy) = (20 + col * (glyph_w + 8), 20 + row * (glyph_h + 20));
                for y in oy..oy + glyph_h {
                    for x in ox..ox + glyph_w {
                        img.put_pixel(x, y, Luma([0]));
                    }
                }
            }
        }
        img
    }

    #[test]
    fn glyph_height_maps_to_dpi() {
        let dpi = estimate_dpi_from_glyphs(&glyph_page(14, 24)).unwrap();
        assert!((dpi - 24.0 * 25.4 / 2.5).abs() < 1e-9, "dpi = {}", dpi);
    }

    #[test]
    fn blank_page_has_no_estimate() {
        assert_eq!(estimate_dpi_from_glyphs(&GrayImage::from_pixel(100, 100, Luma([255]))), None);
    }

    #[test]
    fn wide_rules_are_not_glyphs() {
        // 200 x 12 bars are far wider than any glyph.
        assert_eq!(estimate_dpi_from_glyphs(&glyph_page(200, 12)), None);
    }

    #[test]
    fn declared_dpi_is_metadata() {
        let page = RasterPage::new(glyph_page(14, 24)).with_declared_dpi(Some(300.0));
        assert_eq!(metadata_dpi(&page, &DocumentFormat::Png), Some(300.0));
    }

    #[test]
    fn physical_width_only_counts_for_pdf() {
        let page = RasterPage::new(GrayImage::from_pixel(1700, 20, Luma([255])))
            .with_page_width_pt(Some(612.0));
        let dpi = metadata_dpi(&page, &DocumentFormat::Pdf).unwrap();
        assert!((dpi - 200.0).abs() < 1e-9);
        assert_eq!(metadata_dpi(&page, &DocumentFormat::Tiff), None);
    }
}
