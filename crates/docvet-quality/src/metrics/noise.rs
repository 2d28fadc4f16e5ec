// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Speckle noise: pixels a 3x3 median filter would remove.

use image::GrayImage;
use imageproc::filter::median_filter;

/// Minimum absolute difference from the median for a pixel to count as noise.
pub const NOISE_DELTA: u8 = 30;

/// Percentage (0-100) of pixels differing from their 3x3 median by more than
/// [`NOISE_DELTA`].
pub fn noise_percent(image: &GrayImage) -> f64 {
    let total = image.width() as u64 * image.height() as u64;
    if total == 0 {
        return 0.0;
    }
    let smoothed = median_filter(image, 1, 1);
    let noisy = image
        .pixels()
        .zip(smoothed.pixels())
        .filter(|(a, b)| a.0[0].abs_diff(b.0[0]) > NOISE_DELTA)
        .count() as u64;
    noisy as f64 * 100.0 / total as f64
}
