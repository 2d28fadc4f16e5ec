// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Multi-page TIFF: every image file directory is one page.

use std::io::Cursor;

use docvet_core::error::{DocvetError, Result};
use image::{DynamicImage, GrayImage, ImageBuffer};
use tiff::ColorType;
use tiff::decoder::ifd::Value;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tracing::{debug, warn};

use crate::page::RasterPage;
use crate::provider::RasterRequest;

/// TIFF `ResolutionUnit` value for centimetres.
const RESOLUTION_UNIT_CM: f64 = 3.0;

/// Decode up to `request.max_pages` pages.
pub fn pages(data: &[u8], request: &RasterRequest) -> Result<Vec<RasterPage>> {
    let mut decoder = Decoder::new(Cursor::new(data))
        .map_err(|err| DocvetError::Extraction(format!("failed to open TIFF: {}", err)))?;

    let mut pages = Vec::new();
    loop {
        let index = pages.len();
        match decode_current(&mut decoder) {
            Ok(page) => pages.push(page),
            Err(detail) if pages.is_empty() => {
                return Err(DocvetError::Extraction(format!("TIFF page 1: {}", detail)));
            }
            Err(detail) => {
                warn!(page = index + 1, %detail, "Skipping undecodable TIFF page");
            }
        }

        if pages.len() >= request.max_pages || !decoder.more_images() {
            break;
        }
        if let Err(err) = decoder.next_image() {
            warn!(error = %err, "Stopping at unreadable TIFF directory");
            break;
        }
    }

    debug!(pages = pages.len(), "TIFF decoded");
    Ok(pages)
}

fn decode_current(decoder: &mut Decoder<Cursor<&[u8]>>) -> std::result::Result<RasterPage, String> {
    let (width, height) = decoder.dimensions().map_err(|e| e.to_string())?;
    let color = decoder.colortype().map_err(|e| e.to_string())?;
    let dpi = declared_dpi(decoder);
    let samples = decoder.read_image().map_err(|e| e.to_string())?;

    let gray = to_gray(width, height, color, samples)?;
    Ok(RasterPage::new(gray).with_declared_dpi(dpi))
}

fn to_gray(
    width: u32,
    height: u32,
    color: ColorType,
    samples: DecodingResult,
) -> std::result::Result<GrayImage, String> {
    let mismatch = || format!("{}x{} {:?} does not match sample buffer", width, height, color);

    let image = match (samples, color) {
        (DecodingResult::U8(data), ColorType::Gray(8)) => {
            DynamicImage::ImageLuma8(ImageBuffer::from_raw(width, height, data).ok_or_else(mismatch)?)
        }
        (DecodingResult::U8(data), ColorType::Gray(1)) => {
            DynamicImage::ImageLuma8(unpack_bilevel(width, height, &data).ok_or_else(mismatch)?)
        }
        (DecodingResult::U16(data), ColorType::Gray(16)) => {
            DynamicImage::ImageLuma16(ImageBuffer::from_raw(width, height, data).ok_or_else(mismatch)?)
        }
        (DecodingResult::U8(data), ColorType::RGB(8)) => {
            DynamicImage::ImageRgb8(ImageBuffer::from_raw(width, height, data).ok_or_else(mismatch)?)
        }
        (DecodingResult::U8(data), ColorType::RGBA(8)) => {
            DynamicImage::ImageRgba8(ImageBuffer::from_raw(width, height, data).ok_or_else(mismatch)?)
        }
        (DecodingResult::U16(data), ColorType::RGB(16)) => {
            DynamicImage::ImageRgb16(ImageBuffer::from_raw(width, height, data).ok_or_else(mismatch)?)
        }
        (_, other) => return Err(format!("unsupported TIFF color type {:?}", other)),
    };
    Ok(image.to_luma8())
}

/// Expand 1-bit rows (padded to whole bytes, 1 = white) to 8-bit luma.
fn unpack_bilevel(width: u32, height: u32, packed: &[u8]) -> Option<GrayImage> {
    let stride = (width as usize).div_ceil(8);
    if packed.len() < stride * height as usize {
        return None;
    }
    Some(GrayImage::from_fn(width, height, |x, y| {
        let byte = packed[y as usize * stride + x as usize / 8];
        let bit = (byte >> (7 - (x % 8))) & 1;
        image::Luma([if bit == 1 { 255 } else { 0 }])
    }))
}

fn declared_dpi(decoder: &mut Decoder<Cursor<&[u8]>>) -> Option<f64> {
    let x_res = decoder
        .find_tag(Tag::XResolution)
        .ok()
        .flatten()
        .and_then(|v| value_as_f64(&v))?;
    let unit = decoder
        .find_tag(Tag::ResolutionUnit)
        .ok()
        .flatten()
        .and_then(|v| value_as_f64(&v))
        // TIFF default unit is inches.
        .unwrap_or(2.0);

    match unit {
        u if u == RESOLUTION_UNIT_CM => Some(x_res * 2.54),
        u if u == 2.0 => Some(x_res),
        // Unit 1: no absolute unit, the ratio alone says nothing about DPI.
        _ => None,
    }
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Rational(n, d) if *d != 0 => Some(*n as f64 / *d as f64),
        Value::Short(v) => Some(*v as f64),
        Value::Unsigned(v) => Some(*v as f64),
        Value::Float(v) => Some(*v as f64),
        Value::Double(v) => Some(*v),
        Value::List(items) => items.first().and_then(value_as_f64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiff::encoder::{Rational, TiffEncoder, colortype};
    use tiff::tags::ResolutionUnit;

    fn multipage_tiff(shades: &[u8], dpi: u32) -> Vec<u8> {
        let mut data = Vec::new();
        {
            let mut encoder = TiffEncoder::new(Cursor::new(&mut data)).unwrap();
            for &shade in shades {
                let pixels = vec![shade; 20 * 10];
                let mut image = encoder.new_image::<colortype::Gray8>(20, 10).unwrap();
                image.resolution(ResolutionUnit::Inch, Rational { n: dpi, d: 1 });
                image.write_data(&pixels).unwrap();
            }
        }
        data
    }

    #[test]
    fn every_directory_is_a_page() {
        let data = multipage_tiff(&[10, 120, 250], 300);
        let pages = pages(&data, &RasterRequest::default()).unwrap();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[1].image().get_pixel(0, 0).0[0], 120);
        assert_eq!(pages[2].declared_dpi(), Some(300.0));
    }

    #[test]
    fn page_cap_is_honoured() {
        let data = multipage_tiff(&[1, 2, 3, 4], 200);
        let request = RasterRequest {
            max_pages: 2,
            dpi_hint: 200,
        };
        assert_eq!(pages(&data, &request).unwrap().len(), 2);
    }

    #[test]
    fn bilevel_rows_are_unpacked() {
        // 10 px wide: two bytes per row. First row alternates, second is white.
        let packed = [0b1010_1010, 0b1100_0000, 0xFF, 0xFF];
        let gray = unpack_bilevel(10, 2, &packed).unwrap();
        assert_eq!(gray.get_pixel(0, 0).0[0], 255);
        assert_eq!(gray.get_pixel(1, 0).0[0], 0);
        assert_eq!(gray.get_pixel(9, 0).0[0], 255);
        assert_eq!(gray.get_pixel(7, 1).0[0], 255);
        assert!(unpack_bilevel(10, 3, &packed).is_none());
    }

    #[test]
    fn not_a_tiff_is_an_extraction_error() {
        assert!(matches!(
            pages(b"MM\0*garbage", &RasterRequest::default()),
            Err(DocvetError::Extraction(_))
        ));
    }
}
