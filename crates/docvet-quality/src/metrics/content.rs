// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content ratio: how much of a page is ink.

use image::GrayImage;

/// Pixels strictly darker than this count as content.
pub const INK_THRESHOLD: u8 = 200;

/// Percentage (0-100) of pixels darker than [`INK_THRESHOLD`].
///
/// Shared by the text density, missing page and near-blank resolution
/// logic, so the engine computes it once per page.
pub fn content_ratio(image: &GrayImage) -> f64 {
    let total = image.width() as u64 * image.height() as u64;
    if total == 0 {
        return 0.0;
    }
    let ink = image.pixels().filter(|p| p.0[0] < INK_THRESHOLD).count() as u64;
    ink as f64 * 100.0 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn blank_page_has_no_content() {
        assert_eq!(content_ratio(&GrayImage::from_pixel(50, 50, Luma([255]))), 0.0);
    }

    #[test]
    fn threshold_is_exclusive() {
        let mut img = GrayImage::from_pixel(10, 10, Luma([INK_THRESHOLD]));
        img.put_pixel(0, 0, Luma([INK_THRESHOLD - 1]));
        assert!((content_ratio(&img) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_image_is_zero() {
        assert_eq!(content_ratio(&GrayImage::new(0, 0)), 0.0);
    }
}
