// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-page quality metrics. Every function here is pure: one grayscale page
// in, one scalar out, no knowledge of thresholds or other pages.

pub mod blur;
pub mod brightness;
pub mod content;
pub mod entropy;
pub mod noise;
pub mod resolution;
pub mod skew;
pub mod watermark;

pub use blur::laplacian_variance;
pub use brightness::trimmed_brightness;
pub use content::content_ratio;
pub use entropy::histogram_entropy;
pub use noise::noise_percent;
pub use resolution::{estimate_dpi_from_glyphs, metadata_dpi};
pub use skew::estimate_skew;
pub use watermark::watermark_score;

/// Population variance. Zero for fewer than two samples.
pub(crate) fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count
}

/// 256-bin intensity histogram.
pub(crate) fn histogram(image: &image::GrayImage) -> [u64; 256] {
    let mut bins = [0u64; 256];
    for pixel in image.pixels() {
        bins[pixel.0[0] as usize] += 1;
    }
    bins
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn variance_matches_hand_computation() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((variance(&values) - 4.0).abs() < 1e-12);
        assert_eq!(variance(&[3.0]), 0.0);
    }

    #[test]
    fn histogram_counts_every_pixel() {
        let mut img = GrayImage::from_pixel(4, 4, Luma([10]));
        img.put_pixel(0, 0, Luma([250]));
        let bins = histogram(&img);
        assert_eq!(bins[10], 15);
        assert_eq!(bins[250], 1);
        assert_eq!(bins.iter().sum::<u64>(), 16);
    }
}
