// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sharpness as the variance of the Laplacian response.

use image::GrayImage;
use imageproc::filter::laplacian_filter;

use super::variance;

/// Variance of the 4-neighbour Laplacian. Flat or blurred pages score low;
/// a uniform page scores exactly zero.
pub fn laplacian_variance(image: &GrayImage) -> f64 {
    if image.width() == 0 || image.height() == 0 {
        return 0.0;
    }
    let response = laplacian_filter(image);
    let values: Vec<f64> = response.pixels().map(|p| p.0[0] as f64).collect();
    variance(&values)
}
