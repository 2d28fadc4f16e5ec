// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster provider contract and the file-backed implementation.

use std::path::Path;

use docvet_core::error::{DocvetError, Result};
use docvet_core::DocumentFormat;
use tracing::{debug, info, instrument};

use crate::formats::{bitmap, multipage, pdf};
use crate::page::RasterPage;

/// What the caller wants out of extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterRequest {
    /// Hard cap on returned pages.
    pub max_pages: usize,
    /// Resolution the downstream checks need; providers must not deliver
    /// pages below it when they control rasterization.
    pub dpi_hint: u32,
}

impl Default for RasterRequest {
    fn default() -> Self {
        Self {
            max_pages: 5,
            dpi_hint: 200,
        }
    }
}

/// Source of normalized grayscale pages for one document.
///
/// Implementations must return at least one page or fail with
/// [`DocvetError::Extraction`]; an empty list is never a valid answer.
pub trait RasterProvider: Send + Sync {
    fn pages(
        &self,
        path: &Path,
        format: &DocumentFormat,
        request: &RasterRequest,
    ) -> Result<Vec<RasterPage>>;
}

/// Reads documents from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileRasterProvider;

impl FileRasterProvider {
    pub fn new() -> Self {
        Self
    }

    /// Extract pages from bytes already in memory.
    pub fn pages_from_bytes(
        &self,
        data: &[u8],
        format: &DocumentFormat,
        request: &RasterRequest,
    ) -> Result<Vec<RasterPage>> {
        if request.max_pages == 0 {
            return Err(DocvetError::Extraction("page cap is zero".into()));
        }

        let pages = match sniff(format, data) {
            DocumentFormat::Pdf => pdf::pages(data, request)?,
            DocumentFormat::Tiff => multipage::pages(data, request)?,
            _ => vec![bitmap::page(data)?],
        };

        if pages.is_empty() {
            return Err(DocvetError::Extraction("no pages could be extracted".into()));
        }
        Ok(pages)
    }
}

impl RasterProvider for FileRasterProvider {
    #[instrument(skip_all, fields(path = %path.display(), format = %format))]
    fn pages(
        &self,
        path: &Path,
        format: &DocumentFormat,
        request: &RasterRequest,
    ) -> Result<Vec<RasterPage>> {
        let data = std::fs::read(path).map_err(|err| {
            DocvetError::Extraction(format!("cannot read {}: {}", path.display(), err))
        })?;
        debug!(bytes = data.len(), dpi_hint = request.dpi_hint, "Document read");

        let pages = self.pages_from_bytes(&data, format, request)?;
        info!(pages = pages.len(), "Raster pages extracted");
        Ok(pages)
    }
}

/// Trust the declared format unless it is unknown, then look at magic bytes.
fn sniff(declared: &DocumentFormat, data: &[u8]) -> DocumentFormat {
    match declared {
        DocumentFormat::Other(_) => {
            if data.starts_with(b"%PDF") {
                DocumentFormat::Pdf
            } else if data.starts_with(b"II*\0") || data.starts_with(b"MM\0*") {
                DocumentFormat::Tiff
            } else {
                declared.clone()
            }
        }
        known => known.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::jpeg::{JpegEncoder, PixelDensity};
    use image::{GrayImage, Luma};

    fn write_png(dir: &Path, name: &str, img: &GrayImage) -> std::path::PathBuf {
        let path = dir.join(name);
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn png_yields_one_grayscale_page() {
        let dir = tempfile::tempdir().unwrap();
        let img = GrayImage::from_pixel(40, 30, Luma([90]));
        let path = write_png(dir.path(), "scan.png", &img);

        let pages = FileRasterProvider::new()
            .pages(&path, &DocumentFormat::Png, &RasterRequest::default())
            .unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!((pages[0].width(), pages[0].height()), (40, 30));
        assert_eq!(pages[0].image().get_pixel(5, 5).0[0], 90);
        assert_eq!(pages[0].physical_dpi(), None);
    }

    #[test]
    fn jpeg_density_becomes_declared_dpi() {
        let img = GrayImage::from_pixel(16, 16, Luma([200]));
        let mut data = Vec::new();
        {
            let mut encoder = JpegEncoder::new_with_quality(&mut data, 90);
            encoder.set_pixel_density(PixelDensity::dpi(300));
            encoder.encode_image(&img).unwrap();
        }

        let pages = FileRasterProvider::new()
            .pages_from_bytes(&data, &DocumentFormat::Jpeg, &RasterRequest::default())
            .unwrap();
        assert_eq!(pages[0].declared_dpi(), Some(300.0));
    }

    #[test]
    fn missing_file_is_an_extraction_error() {
        let err = FileRasterProvider::new()
            .pages(
                Path::new("/definitely/not/here.png"),
                &DocumentFormat::Png,
                &RasterRequest::default(),
            )
            .unwrap_err();
        assert!(matches!(err, DocvetError::Extraction(_)));
    }

    #[test]
    fn garbage_bytes_are_an_extraction_error() {
        let err = FileRasterProvider::new()
            .pages_from_bytes(b"not an image", &DocumentFormat::Png, &RasterRequest::default())
            .unwrap_err();
        assert!(err.to_string().starts_with("extraction failed"));
    }

    #[test]
    fn zero_page_cap_is_rejected() {
        let request = RasterRequest {
            max_pages: 0,
            dpi_hint: 200,
        };
        assert!(FileRasterProvider::new()
            .pages_from_bytes(b"", &DocumentFormat::Png, &request)
            .is_err());
    }

    #[test]
    fn unknown_format_is_sniffed() {
        assert_eq!(
            sniff(&DocumentFormat::Other("bin".into()), b"%PDF-1.5 ..."),
            DocumentFormat::Pdf
        );
        assert_eq!(
            sniff(&DocumentFormat::Other(String::new()), b"II*\0rest"),
            DocumentFormat::Tiff
        );
        assert_eq!(sniff(&DocumentFormat::Png, b"%PDF"), DocumentFormat::Png);
    }
}
