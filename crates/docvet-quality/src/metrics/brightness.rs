// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Brightness measured on the content area, ignoring white margins.

use image::GrayImage;

/// Pixels at or above this value are treated as margin.
pub const MARGIN_THRESHOLD: u8 = 220;

/// Mean intensity inside the tightest box containing non-margin pixels.
/// A page with no such pixels falls back to its whole-page mean.
pub fn trimmed_brightness(image: &GrayImage) -> f64 {
    match content_bounds(image) {
        Some((x0, y0, x1, y1)) => region_mean(image, x0, y0, x1, y1),
        None => region_mean(image, 0, 0, image.width(), image.height()),
    }
}

/// Half-open `(x0, y0, x1, y1)` box around all pixels below the margin
/// threshold.
fn content_bounds(image: &GrayImage) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel.0[0] >= MARGIN_THRESHOLD {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x + 1, y + 1),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x + 1), y1.max(y + 1)),
        });
    }
    bounds
}

fn region_mean(image: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32) -> f64 {
    let count = (x1 - x0) as u64 * (y1 - y0) as u64;
    if count == 0 {
        return 0.0;
    }
    let mut sum = 0u64;
    for y in y0..y1 {
        for x in x0..x1 {
            sum += image.get_pixel(x, y).0[0] as u64;
        }
    }
    sum as f64 / count as f64
}
