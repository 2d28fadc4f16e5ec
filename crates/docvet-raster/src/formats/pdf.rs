// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanned PDFs: each page carries its scan as an image XObject. The largest
// image on a page is decoded as that page's raster, and the page's MediaBox
// width is kept so DPI can be derived from the physical page size. Pages
// without a decodable scan are rendered at the DPI hint when the `pdfium`
// feature is enabled.

use docvet_core::error::{DocvetError, Result};
use fax::Color;
use fax::decoder::{decode_g3, decode_g4, pels};
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageBuffer, ImageFormat};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, instrument, warn};

use crate::page::{POINTS_PER_INCH, RasterPage};
use crate::provider::RasterRequest;

/// Pages whose embedded scan exceeds this multiple of the requested DPI are
/// downsampled to it.
const OVERSAMPLE_LIMIT: f64 = 2.0;

/// Guard against cyclic `Parent` chains.
const MAX_TREE_DEPTH: usize = 32;

/// Filters that yield an image rather than a byte stream. Anything ahead of
/// one of these in a chain is byte-level.
const IMAGE_CODECS: &[&[u8]] = &[b"DCTDecode", b"CCITTFaxDecode", b"JBIG2Decode", b"JPXDecode"];

/// Extract up to `request.max_pages` pages.
#[instrument(skip_all, fields(bytes_len = data.len(), max_pages = request.max_pages))]
pub fn pages(data: &[u8], request: &RasterRequest) -> Result<Vec<RasterPage>> {
    let document = Document::load_mem(data)
        .map_err(|err| DocvetError::Extraction(format!("failed to load PDF: {}", err)))?;

    let page_ids = document.get_pages();
    if page_ids.is_empty() {
        return Err(DocvetError::Extraction("PDF has no pages".into()));
    }
    debug!(total_pages = page_ids.len(), "PDF loaded");

    let mut extracted: Vec<(u32, std::result::Result<RasterPage, String>)> = page_ids
        .iter()
        .take(request.max_pages)
        .map(|(&number, &page_id)| (number, extract_page(&document, page_id, request)))
        .collect();

    #[cfg(feature = "pdfium")]
    super::render::fill_unextracted(data, request, &mut extracted);

    let mut pages = Vec::new();
    for (number, result) in extracted {
        match result {
            Ok(page) => pages.push(page),
            Err(detail) if pages.is_empty() => {
                return Err(DocvetError::Extraction(format!("PDF page {}: {}", number, detail)));
            }
            Err(detail) => warn!(page = number, %detail, "Skipping unextractable PDF page"),
        }
    }
    Ok(pages)
}

fn extract_page(
    document: &Document,
    page_id: ObjectId,
    request: &RasterRequest,
) -> std::result::Result<RasterPage, String> {
    let width_pt = page_width_pt(document, page_id);

    let resources = inherited(document, page_id, b"Resources")
        .and_then(|obj| obj.as_dict().ok())
        .ok_or("page has no resources")?;
    let xobjects = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| resolve(document, obj).ok())
        .and_then(|obj| obj.as_dict().ok())
        .ok_or("page has no XObjects")?;

    let stream = largest_image(document, xobjects).ok_or("page has no embedded raster image")?;
    let gray = decode_image(document, stream)?;
    let gray = limit_resolution(gray, width_pt, request.dpi_hint);

    Ok(RasterPage::new(gray).with_page_width_pt(width_pt))
}

/// Physical page width in points, honouring inherited MediaBox and Rotate.
fn page_width_pt(document: &Document, page_id: ObjectId) -> Option<f64> {
    let media_box = inherited(document, page_id, b"MediaBox")?.as_array().ok()?;
    if media_box.len() != 4 {
        return None;
    }
    let coord = |i: usize| -> Option<f64> {
        resolve(document, &media_box[i]).ok()?.as_float().ok().map(f64::from)
    };
    let width = (coord(2)? - coord(0)?).abs();
    let height = (coord(3)? - coord(1)?).abs();

    let rotate = inherited(document, page_id, b"Rotate")
        .and_then(|obj| obj.as_i64().ok())
        .unwrap_or(0);
    if rotate.rem_euclid(180) == 90 {
        Some(height)
    } else {
        Some(width)
    }
}

/// Look up a page attribute, walking up the page tree for inheritable keys.
fn inherited<'a>(document: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = document.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return resolve(document, value).ok();
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = document.get_dictionary(parent).ok()?;
    }
    None
}

fn resolve<'a>(document: &'a Document, obj: &'a Object) -> std::result::Result<&'a Object, String> {
    match obj {
        Object::Reference(id) => document.get_object(*id).map_err(|e| e.to_string()),
        other => Ok(other),
    }
}

/// The image XObject with the most pixels.
fn largest_image<'a>(document: &'a Document, xobjects: &'a Dictionary) -> Option<&'a Stream> {
    xobjects
        .iter()
        .filter_map(|(_, obj)| resolve(document, obj).ok()?.as_stream().ok())
        .filter(|stream| {
            matches!(stream.dict.get(b"Subtype").and_then(|s| s.as_name()), Ok(b"Image"))
        })
        .max_by_key(|stream| dimension(&stream.dict, b"Width") * dimension(&stream.dict, b"Height"))
}

fn dimension(dict: &Dictionary, key: &[u8]) -> u64 {
    dict.get(key)
        .and_then(|v| v.as_i64())
        .map(|v| v.max(0) as u64)
        .unwrap_or(0)
}

fn filters(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_name().ok().map(|n| n.to_vec()))
            .collect(),
        _ => Vec::new(),
    }
}

/// `DecodeParms` entry for the filter at `index`. A single dictionary is
/// shared by every filter in the chain.
fn decode_parms<'a>(
    document: &'a Document,
    dict: &'a Dictionary,
    index: usize,
) -> Option<&'a Dictionary> {
    match resolve(document, dict.get(b"DecodeParms").ok()?).ok()? {
        Object::Dictionary(parms) => Some(parms),
        Object::Array(items) => resolve(document, items.get(index)?).ok()?.as_dict().ok(),
        _ => None,
    }
}

fn decode_image(document: &Document, stream: &Stream) -> std::result::Result<GrayImage, String> {
    let mut chain = filters(&stream.dict);
    let codec = match chain.last() {
        Some(last) if IMAGE_CODECS.contains(&last.as_slice()) => chain.pop(),
        _ => None,
    };
    let data = unwrap_transport(document, stream, &chain)?;

    match codec.as_deref() {
        None => decode_samples(document, &stream.dict, data),
        Some(b"DCTDecode") => {
            let decoded = image::load_from_memory_with_format(&data, ImageFormat::Jpeg)
                .map_err(|e| format!("JPEG image: {}", e))?;
            Ok(decoded.to_luma8())
        }
        Some(b"CCITTFaxDecode") => decode_fax(
            &stream.dict,
            decode_parms(document, &stream.dict, chain.len()),
            &data,
        ),
        Some(other) => Err(format!(
            "unsupported image filter {}",
            String::from_utf8_lossy(other)
        )),
    }
}

/// Undo the byte-level filters that precede the image codec.
fn unwrap_transport(
    document: &Document,
    stream: &Stream,
    chain: &[Vec<u8>],
) -> std::result::Result<Vec<u8>, String> {
    if chain.is_empty() {
        return Ok(stream.content.clone());
    }
    let mut dict = Dictionary::new();
    dict.set(
        "Filter",
        Object::Array(chain.iter().map(|name| Object::Name(name.clone())).collect()),
    );
    if chain.len() == 1 {
        if let Some(parms) = decode_parms(document, &stream.dict, 0) {
            dict.set("DecodeParms", Object::Dictionary(parms.clone()));
        }
    }
    Stream::new(dict, stream.content.clone())
        .decompressed_content()
        .map_err(|e| format!("cannot decompress image: {}", e))
}

/// CCITT Group 4 (`K < 0`) and one-dimensional Group 3 (`K = 0`) data.
fn decode_fax(
    dict: &Dictionary,
    parms: Option<&Dictionary>,
    data: &[u8],
) -> std::result::Result<GrayImage, String> {
    let parm = |key: &[u8]| parms.and_then(|p| p.get(key).ok());
    let k = parm(b"K").and_then(|v| v.as_i64().ok()).unwrap_or(0);
    let columns = parm(b"Columns").and_then(|v| v.as_i64().ok()).unwrap_or(1728);
    let rows = parm(b"Rows")
        .and_then(|v| v.as_i64().ok())
        .unwrap_or(dimension(dict, b"Height") as i64);
    let width = u16::try_from(columns)
        .ok()
        .filter(|w| *w > 0)
        .ok_or("fax image width out of range")?;
    let height = u16::try_from(rows)
        .ok()
        .filter(|h| *h > 0)
        .ok_or("fax image height out of range")?;

    // BlackIs1 and an inverted Decode array each flip the sample meaning.
    let black_is_1 = parm(b"BlackIs1").and_then(|v| v.as_bool().ok()).unwrap_or(false);
    let inverted = black_is_1 != decode_inverted(dict);
    let (ink, paper) = if inverted { (255u8, 0u8) } else { (0u8, 255u8) };

    let expected = width as usize * height as usize;
    let mut pixels = Vec::with_capacity(expected);
    let mut lines = 0u16;
    let mut push_line = |transitions: &[u16]| {
        if lines < height {
            pixels.extend(pels(transitions, width).map(|color| match color {
                Color::Black => ink,
                Color::White => paper,
            }));
            lines += 1;
        }
    };
    let decoded = match k {
        k if k < 0 => decode_g4(data.iter().copied(), width, Some(height), &mut push_line),
        0 => decode_g3(data.iter().copied(), &mut push_line),
        _ => return Err("two-dimensional Group 3 fax is not supported".into()),
    };
    decoded.ok_or("corrupt CCITT fax data")?;
    if lines == 0 {
        return Err("fax image holds no lines".into());
    }

    // Missing trailing lines are blank paper.
    pixels.resize(expected, paper);
    GrayImage::from_raw(width as u32, height as u32, pixels)
        .ok_or_else(|| "fax image does not match its dimensions".to_string())
}

fn decode_inverted(dict: &Dictionary) -> bool {
    let Ok(Object::Array(range)) = dict.get(b"Decode") else {
        return false;
    };
    let bound = |i: usize| range.get(i).and_then(|v| v.as_float().ok());
    matches!((bound(0), bound(1)), (Some(lo), Some(hi)) if lo > hi)
}

fn decode_samples(
    document: &Document,
    dict: &Dictionary,
    samples: Vec<u8>,
) -> std::result::Result<GrayImage, String> {
    let width = dimension(dict, b"Width") as u32;
    let height = dimension(dict, b"Height") as u32;
    if width == 0 || height == 0 {
        return Err("image has zero size".into());
    }
    let bits = dict
        .get(b"BitsPerComponent")
        .and_then(|v| v.as_i64())
        .unwrap_or(8);
    let components = color_components(document, dict)?;
    let mismatch = || format!("{}x{} image does not match its sample data", width, height);

    match (components, bits) {
        (1, 8) => {
            let pixels = trim(samples, width as usize * height as usize).ok_or_else(mismatch)?;
            GrayImage::from_raw(width, height, pixels).ok_or_else(mismatch)
        }
        (1, 1) => unpack_gray1(width, height, &samples).ok_or_else(mismatch),
        (3, 8) => {
            let pixels = trim(samples, width as usize * height as usize * 3).ok_or_else(mismatch)?;
            let rgb = ImageBuffer::from_raw(width, height, pixels).ok_or_else(mismatch)?;
            Ok(DynamicImage::ImageRgb8(rgb).to_luma8())
        }
        (4, 8) => {
            let pixels = trim(samples, width as usize * height as usize * 4).ok_or_else(mismatch)?;
            Ok(cmyk_to_gray(width, height, &pixels))
        }
        (c, b) => Err(format!("unsupported image layout: {} components at {} bits", c, b)),
    }
}

fn trim(mut samples: Vec<u8>, expected: usize) -> Option<Vec<u8>> {
    if samples.len() < expected {
        return None;
    }
    samples.truncate(expected);
    Some(samples)
}

fn color_components(document: &Document, dict: &Dictionary) -> std::result::Result<usize, String> {
    let Ok(space) = dict.get(b"ColorSpace") else {
        return Ok(1);
    };
    let space = resolve(document, space)?;
    match space {
        Object::Name(name) => components_for_name(name),
        Object::Array(items) => {
            let family = items
                .first()
                .and_then(|f| f.as_name().ok())
                .ok_or("malformed color space")?;
            match family {
                b"ICCBased" => {
                    let profile = items
                        .get(1)
                        .and_then(|p| resolve(document, p).ok())
                        .and_then(|p| p.as_stream().ok())
                        .ok_or("ICC profile missing")?;
                    profile
                        .dict
                        .get(b"N")
                        .and_then(|n| n.as_i64())
                        .map(|n| n as usize)
                        .map_err(|_| "ICC profile has no component count".to_string())
                }
                other => components_for_name(other),
            }
        }
        _ => Err("malformed color space".into()),
    }
}

fn components_for_name(name: &[u8]) -> std::result::Result<usize, String> {
    match name {
        b"DeviceGray" | b"CalGray" | b"G" => Ok(1),
        b"DeviceRGB" | b"CalRGB" | b"RGB" => Ok(3),
        b"DeviceCMYK" | b"CMYK" => Ok(4),
        other => Err(format!(
            "unsupported color space {}",
            String::from_utf8_lossy(other)
        )),
    }
}

/// 1-bit DeviceGray: 0 is black, rows padded to whole bytes.
fn unpack_gray1(width: u32, height: u32, packed: &[u8]) -> Option<GrayImage> {
    let stride = (width as usize).div_ceil(8);
    if packed.len() < stride * height as usize {
        return None;
    }
    Some(GrayImage::from_fn(width, height, |x, y| {
        let byte = packed[y as usize * stride + x as usize / 8];
        image::Luma([if (byte >> (7 - (x % 8))) & 1 == 1 { 255 } else { 0 }])
    }))
}

fn cmyk_to_gray(width: u32, height: u32, pixels: &[u8]) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let i = (y as usize * width as usize + x as usize) * 4;
        let k = 1.0 - pixels[i + 3] as f32 / 255.0;
        let channel = |v: u8| 255.0 * (1.0 - v as f32 / 255.0) * k;
        let (r, g, b) = (channel(pixels[i]), channel(pixels[i + 1]), channel(pixels[i + 2]));
        let luma = 0.2126 * r + 0.7152 * g + 0.0722 * b;
        image::Luma([luma.round().clamp(0.0, 255.0) as u8])
    })
}

/// Downsample scans far above the requested DPI. Never drops below the
/// hint, so the resolution verdict is unaffected.
fn limit_resolution(gray: GrayImage, width_pt: Option<f64>, dpi_hint: u32) -> GrayImage {
    let Some(width_pt) = width_pt else {
        return gray;
    };
    if dpi_hint == 0 || width_pt <= 0.0 {
        return gray;
    }
    let effective = gray.width() as f64 * POINTS_PER_INCH / width_pt;
    let ceiling = dpi_hint as f64 * OVERSAMPLE_LIMIT;
    if effective <= ceiling {
        return gray;
    }

    let scale = ceiling / effective;
    let new_w = ((gray.width() as f64 * scale).round() as u32).max(1);
    let new_h = ((gray.height() as f64 * scale).round() as u32).max(1);
    debug!(effective, ceiling, new_w, new_h, "Downsampling oversized page scan");
    image::imageops::resize(&gray, new_w, new_h, FilterType::Triangle)
}
