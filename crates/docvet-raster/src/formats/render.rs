// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pdfium rendering for PDF pages that carry no decodable scan (vector
// content, JBIG2 or JPX images). The library is bound once per process from
// the working directory or the system path; without it the embedded-image
// failures stand.

use std::sync::OnceLock;

use image::{DynamicImage, RgbaImage};
use pdfium_render::prelude::*;
use tracing::{debug, warn};

use crate::page::{POINTS_PER_INCH, RasterPage};
use crate::provider::RasterRequest;

fn pdfium() -> Option<&'static Pdfium> {
    static PDFIUM: OnceLock<Option<Pdfium>> = OnceLock::new();
    PDFIUM
        .get_or_init(|| {
            match Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library())
            {
                Ok(bindings) => Some(Pdfium::new(bindings)),
                Err(err) => {
                    warn!(error = %err, "pdfium library unavailable, PDF pages will not be rendered");
                    None
                }
            }
        })
        .as_ref()
}

/// Replace failed entries of `extracted` (1-based page number, result) with
/// pages rendered at `request.dpi_hint`.
pub fn fill_unextracted(
    data: &[u8],
    request: &RasterRequest,
    extracted: &mut [(u32, Result<RasterPage, String>)],
) {
    let Some(last_failed) = extracted
        .iter()
        .filter(|(_, result)| result.is_err())
        .map(|(number, _)| *number)
        .max()
    else {
        return;
    };
    let Some(pdfium) = pdfium() else {
        return;
    };
    let document = match pdfium.load_pdf_from_byte_slice(data, None) {
        Ok(document) => document,
        Err(err) => {
            warn!(error = %err, "pdfium could not open the document");
            return;
        }
    };

    for (index, page) in document.pages().iter().enumerate() {
        let number = index as u32 + 1;
        if number > last_failed {
            break;
        }
        let Some(slot) = extracted
            .iter_mut()
            .find(|(n, result)| *n == number && result.is_err())
        else {
            continue;
        };
        match render_page(&page, request.dpi_hint) {
            Ok(raster) => {
                debug!(page = number, dpi = request.dpi_hint, "Rendered PDF page");
                slot.1 = Ok(raster);
            }
            Err(detail) => warn!(page = number, %detail, "pdfium could not render page"),
        }
    }
}

fn render_page(page: &PdfPage, dpi: u32) -> Result<RasterPage, String> {
    let width_pt = page.width().value as f64;
    let height_pt = page.height().value as f64;
    let scale = dpi.max(1) as f64 / POINTS_PER_INCH;
    let target_width = ((width_pt * scale).round() as i32).max(1);
    let target_height = ((height_pt * scale).round() as i32).max(1);

    let bitmap = page
        .render_with_config(
            &PdfRenderConfig::new()
                .set_target_width(target_width)
                .set_target_height(target_height),
        )
        .map_err(|err| err.to_string())?;
    let rgba = RgbaImage::from_raw(
        bitmap.width() as u32,
        bitmap.height() as u32,
        bitmap.as_rgba_bytes(),
    )
    .ok_or("rendered bitmap does not match its dimensions")?;

    Ok(RasterPage::new(DynamicImage::ImageRgba8(rgba).to_luma8()).with_page_width_pt(Some(width_pt)))
}
