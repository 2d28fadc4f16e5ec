// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Declared resolution from container metadata. The `image` crate decodes
// pixels but does not surface density, so it is read separately: PNG
// `pHYs` through `png`, Exif `XResolution` through `kamadak-exif`, and the
// JFIF `APP0` and BMP header fields that neither crate covers.

use std::io::Cursor;

use exif::{In, Reader, Tag, Value};
use png::Unit;

const INCHES_PER_METER: f64 = 0.0254;
const CM_PER_INCH: f64 = 2.54;

/// DPI declared by the file, if its format carries one.
pub fn declared_dpi(data: &[u8]) -> Option<f64> {
    png_dpi(data)
        .or_else(|| exif_dpi(data))
        .or_else(|| jfif_dpi(data))
        .or_else(|| bmp_dpi(data))
        .filter(|dpi| dpi.is_finite() && *dpi > 0.0)
}

/// Horizontal density from a PNG `pHYs` chunk. Unit-less ratios are ignored.
pub fn png_dpi(data: &[u8]) -> Option<f64> {
    let reader = png::Decoder::new(Cursor::new(data)).read_info().ok()?;
    let dims = reader.info().pixel_dims?;
    match dims.unit {
        Unit::Meter => Some(dims.xppu as f64 * INCHES_PER_METER),
        Unit::Unspecified => None,
    }
}

/// `XResolution` and `ResolutionUnit` from the primary Exif IFD (JPEG
/// `APP1`, PNG `eXIf`, WebP and TIFF containers).
pub fn exif_dpi(data: &[u8]) -> Option<f64> {
    let exif = Reader::new()
        .read_from_container(&mut Cursor::new(data))
        .ok()?;
    let x_res = match &exif.get_field(Tag::XResolution, In::PRIMARY)?.value {
        Value::Rational(values) => values.first().map(|r| r.to_f64())?,
        other => other.get_uint(0).map(f64::from)?,
    };
    // Exif default unit is inches.
    let unit = exif
        .get_field(Tag::ResolutionUnit, In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .unwrap_or(2);
    match unit {
        2 => Some(x_res),
        3 => Some(x_res * CM_PER_INCH),
        _ => None,
    }
}

/// Horizontal density from a JFIF `APP0` segment. An aspect-ratio-only
/// segment (units 0) yields `None`.
pub fn jfif_dpi(data: &[u8]) -> Option<f64> {
    if !data.starts_with(&[0xFF, 0xD8]) {
        return None;
    }

    let mut offset = 2;
    while offset + 4 <= data.len() {
        if data[offset] != 0xFF {
            return None;
        }
        let marker = data[offset + 1];
        // Start of scan: no more headers.
        if marker == 0xDA {
            return None;
        }
        let len = u16::from_be_bytes([data[offset + 2], data[offset + 3]]) as usize;
        let body_end = (offset + 2).checked_add(len)?;
        if len < 2 || body_end > data.len() {
            return None;
        }

        let body = &data[offset + 4..body_end];
        if marker == 0xE0 && body.len() >= 12 && body.starts_with(b"JFIF\0") {
            let x_density = u16::from_be_bytes([body[8], body[9]]) as f64;
            return match body[7] {
                1 => Some(x_density),
                2 => Some(x_density * CM_PER_INCH),
                _ => None,
            };
        }
        offset = body_end;
    }
    None
}

/// Horizontal density from a BMP `BITMAPINFOHEADER` (pixels per metre).
pub fn bmp_dpi(data: &[u8]) -> Option<f64> {
    if !data.starts_with(b"BM") || data.len() < 46 {
        return None;
    }
    let ppm = i32::from_le_bytes(data[38..42].try_into().ok()?);
    (ppm > 0).then(|| ppm as f64 * INCHES_PER_METER)
}
