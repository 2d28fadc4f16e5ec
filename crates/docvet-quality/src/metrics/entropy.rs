// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shannon entropy of the intensity histogram.

use image::GrayImage;

use super::histogram;

const LOG_EPSILON: f64 = 1e-10;

/// Entropy in bits (0..=8). Heavily quantized or posterized pages score low.
pub fn histogram_entropy(image: &GrayImage) -> f64 {
    let bins = histogram(image);
    let total: u64 = bins.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let entropy: f64 = bins
        .iter()
        .map(|&count| {
            let p = count as f64 / total as f64;
            -p * (p + LOG_EPSILON).log2()
        })
        .sum();
    entropy.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn single_tone_is_zero() {
        assert!(histogram_entropy(&GrayImage::from_pixel(8, 8, Luma([90]))) < 1e-6);
    }

    #[test]
    fn two_equal_tones_is_one_bit() {
        let img = GrayImage::from_fn(8, 8, |x, _| Luma([if x < 4 { 0 } else { 255 }]));
        assert!((histogram_entropy(&img) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn full_ramp_is_eight_bits() {
        let img = GrayImage::from_fn(256, 1, |x, _| Luma([x as u8]));
        assert!((histogram_entropy(&img) - 8.0).abs() < 1e-6);
    }
}
