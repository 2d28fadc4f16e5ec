// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tiled watermark detection in the frequency domain.
//
// A repeating pattern concentrates energy into isolated off-axis peaks of
// the 2-D spectrum. The score is the brightest such peak relative to the mean
// log-magnitude, rescaled to 0..=100.

use image::GrayImage;
use image::imageops::{self, FilterType};
use rustfft::FftPlanner;
use rustfft::num_complex::Complex;

/// Side of the square the page is resampled to before the transform.
pub const SPECTRUM_SIZE: usize = 512;

/// Frequency bins within this distance of either axis are discarded; page
/// borders and ruling lines live there.
const AXIS_HALF_WIDTH: usize = 1;

/// Raw peak/mean ratio that maps to a score of zero.
const SCORE_FLOOR: f64 = 1.5;
/// Score gained per unit of raw ratio above the floor.
const SCORE_GAIN: f64 = 20.0;

/// Watermark score in 0..=100. A blank page scores 0.
pub fn watermark_score(image: &GrayImage) -> f64 {
    if image.width() == 0 || image.height() == 0 {
        return 0.0;
    }
    let n = SPECTRUM_SIZE;
    let resized = imageops::resize(image, n as u32, n as u32, FilterType::Lanczos3);

    let mut buffer: Vec<Complex<f64>> = resized
        .pixels()
        .map(|p| Complex::new(p.0[0] as f64, 0.0))
        .collect();

    // Row transform, transpose, row transform again. The result is the
    // transposed spectrum, which is fine: the axis mask and the max/mean
    // statistics are symmetric under transposition.
    let fft = FftPlanner::<f64>::new().plan_fft_forward(n);
    for row in buffer.chunks_exact_mut(n) {
        fft.process(row);
    }
    transpose_square(&mut buffer, n);
    for row in buffer.chunks_exact_mut(n) {
        fft.process(row);
    }

    // Distance from DC along each axis stands in for an explicit fftshift.
    let near_axis = |i: usize| i.min(n - i) <= AXIS_HALF_WIDTH;
    let mut peak = 0.0f64;
    let mut sum = 0.0f64;
    for (index, value) in buffer.iter().enumerate() {
        let (u, v) = (index / n, index % n);
        if near_axis(u) || near_axis(v) {
            continue;
        }
        let magnitude = 20.0 * (value.norm() + 1.0).ln();
        peak = peak.max(magnitude);
        sum += magnitude;
    }
    let mean = sum / (n * n) as f64;

    let raw = if mean > 0.0 { peak / (mean + 1e-9) } else { 0.0 };
    ((raw - SCORE_FLOOR) * SCORE_GAIN).clamp(0.0, 100.0)
}

fn transpose_square(buffer: &mut [Complex<f64>], n: usize) {
    for r in 0..n {
        for c in (r + 1)..n {
            buffer.swap(r * n + c, c * n + r);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    /// Deterministic speckle without pulling in an RNG.
    fn speckle(size: u32) -> GrayImage {
        let mut state = 0x2545_F491_u32;
        GrayImage::from_fn(size, size, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            Luma([(state >> 24) as u8])
        })
    }

    fn diagonal_tiles(size: u32) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            let phase = (x + y) as f64 * std::f64::consts::TAU / 16.0;
            Luma([(128.0 + 100.0 * phase.sin()).round() as u8])
        })
    }

    #[test]
    fn blank_page_scores_zero() {
        assert_eq!(watermark_score(&GrayImage::from_pixel(300, 400, Luma([255]))), 0.0);
    }

    #[test]
    fn periodic_pattern_outscores_speckle() {
        let tiled = watermark_score(&diagonal_tiles(512));
        let random = watermark_score(&speckle(512));
        assert!(tiled > 20.0, "tiled = {}", tiled);
        assert!(tiled > random + 10.0, "tiled = {}, random = {}", tiled, random);
    }

    #[test]
    fn score_is_bounded() {
        let score = watermark_score(&diagonal_tiles(256));
        assert!((0.0..=100.0).contains(&score));
    }

    #[test]
    fn transpose_round_trips() {
        let mut data: Vec<Complex<f64>> = (0..9).map(|i| Complex::new(i as f64, 0.0)).collect();
        transpose_square(&mut data, 3);
        assert_eq!(data[1].re, 3.0);
        assert_eq!(data[3].re, 1.0);
        transpose_square(&mut data, 3);
        assert_eq!(data[1].re, 1.0);
    }
}
