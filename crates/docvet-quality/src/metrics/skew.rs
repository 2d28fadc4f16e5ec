// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Skew estimation by projection-profile search.
//
// A level page of text alternates between dark text rows and light gaps, so
// the per-row count of dark pixels has high variance. Rotating a tilted page
// back by its tilt restores that pattern. We try whole-degree rotations and
// keep the one with the sharpest profile.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};

use super::variance;

/// Largest tilt searched, in degrees either side of level.
pub const SEARCH_DEGREES: i32 = 5;

/// Pages are shrunk so their longer side is at most this before searching.
const MAX_SIDE: u32 = 1000;

/// Pixels darker than this count towards the row profile.
const DARK_THRESHOLD: u8 = 128;

/// Absolute skew in whole degrees. Ties go to the smallest angle, so a blank
/// or textless page reports 0.
pub fn estimate_skew(image: &GrayImage) -> f64 {
    if image.width() == 0 || image.height() == 0 {
        return 0.0;
    }
    let page = pad(&downscale(image));

    let mut best_angle = 0i32;
    let mut best_score = f64::NEG_INFINITY;
    for angle in search_order() {
        let score = if angle == 0 {
            profile_variance(&page)
        } else {
            let theta = (angle as f32).to_radians();
            let rotated = rotate_about_center(&page, theta, Interpolation::Bilinear, Luma([255]));
            profile_variance(&rotated)
        };
        if score > best_score {
            best_score = score;
            best_angle = angle;
        }
    }
    best_angle.abs() as f64
}

/// 0, -1, 1, -2, 2, ... so earlier candidates win ties.
fn search_order() -> impl Iterator<Item = i32> {
    std::iter::once(0).chain((1..=SEARCH_DEGREES).flat_map(|d| [-d, d]))
}

fn downscale(image: &GrayImage) -> GrayImage {
    let (w, h) = image.dimensions();
    let longest = w.max(h);
    if longest <= MAX_SIDE {
        return image.clone();
    }
    let scale = MAX_SIDE as f64 / longest as f64;
    let nw = ((w as f64 * scale).round() as u32).max(1);
    let nh = ((h as f64 * scale).round() as u32).max(1);
    imageops::resize(image, nw, nh, FilterType::Triangle)
}

/// White border wide enough that no content leaves the canvas when rotated
/// within the search range.
fn pad(image: &GrayImage) -> GrayImage {
    let (w, h) = image.dimensions();
    let border = (w.max(h) as f64 * (SEARCH_DEGREES as f64).to_radians().sin() / 2.0).ceil() as u32 + 1;
    let mut canvas = GrayImage::from_pixel(w + 2 * border, h + 2 * border, Luma([255]));
    imageops::overlay(&mut canvas, image, border as i64, border as i64);
    canvas
}

fn profile_variance(image: &GrayImage) -> f64 {
    let rows: Vec<f64> = image
        .rows()
        .map(|row| row.filter(|p| p.0[0] < DARK_THRESHOLD).count() as f64)
        .collect();
    variance(&rows)
}
