//! PDF rasterisation: render every page to an encoded image via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async
//! contexts. `tokio::task::spawn_blocking` moves the work onto the blocking
//! thread pool so Tokio worker threads never stall during rendering.
//!
//! ## Why cap pixels, not DPI?
//!
//! Page sizes vary wildly; capping the longest edge keeps memory bounded
//! regardless of physical page size and lands in the sweet spot for vision
//! oracles. PNG is chosen over JPEG because it is lossless — text crispness
//! matters far more than file size for OCR accuracy on scanned forms.

use std::io::Cursor;
use std::io::Write as _;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::{debug, info};

use crate::error::RasterError;
use crate::model::PageImage;

/// Rasterise every page of a PDF into encoded images.
///
/// Eager by design: trade documents are a handful of pages, so a `Vec` is
/// simpler than a lazy stream and lets the caller attach all pages to one
/// oracle request.
pub async fn rasterize(path: &Path, max_pixels: u32) -> Result<Vec<PageImage>, RasterError> {
    let path_buf = path.to_path_buf();
    tokio::task::spawn_blocking(move || rasterize_blocking(&path_buf, max_pixels))
        .await
        .map_err(|e| RasterError::TaskFailed(e.to_string()))?
}

/// Rasterise an in-memory PDF buffer.
///
/// Writes the bytes to a scoped temp file (pdfium needs a filesystem path);
/// the file is removed when the guard drops, on success and failure alike.
pub async fn rasterize_bytes(bytes: &[u8], max_pixels: u32) -> Result<Vec<PageImage>, RasterError> {
    let mut tmp = tempfile::NamedTempFile::new().map_err(|e| RasterError::Io {
        path: "tempfile".into(),
        source: e,
    })?;
    tmp.write_all(bytes).map_err(|e| RasterError::Io {
        path: tmp.path().to_path_buf(),
        source: e,
    })?;
    rasterize(tmp.path(), max_pixels).await
}

fn rasterize_blocking(path: &Path, max_pixels: u32) -> Result<Vec<PageImage>, RasterError> {
    verify_pdf_magic(path)?;

    let pdfium = Pdfium::default();
    let document = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| RasterError::CorruptPdf {
            path: path.to_path_buf(),
            detail: format!("{e:?}"),
        })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut results = Vec::with_capacity(total_pages);

    for idx in 0..total_pages {
        let page = pages
            .get(idx as u16)
            .map_err(|e| RasterError::PageRender {
                page: idx + 1,
                detail: format!("{e:?}"),
            })?;

        let bitmap =
            page.render_with_config(&render_config)
                .map_err(|e| RasterError::PageRender {
                    page: idx + 1,
                    detail: format!("{e:?}"),
                })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );

        results.push(encode_page(idx + 1, &image)?);
    }

    Ok(results)
}

/// Encode a rendered page as a base64 PNG.
fn encode_page(page: usize, img: &DynamicImage) -> Result<PageImage, RasterError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| RasterError::Encode {
            page,
            detail: e.to_string(),
        })?;

    let data = STANDARD.encode(&buf);
    debug!("Encoded page {} → {} bytes base64", page, data.len());

    Ok(PageImage {
        mime_type: "image/png".into(),
        data,
    })
}

fn verify_pdf_magic(path: &Path) -> Result<(), RasterError> {
    use std::io::Read;
    let mut file = std::fs::File::open(path).map_err(|e| RasterError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut magic = [0u8; 4];
    file.read_exact(&mut magic).map_err(|e| RasterError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    if &magic != b"%PDF" {
        return Err(RasterError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let page = encode_page(1, &img).expect("encode should succeed");
        assert_eq!(page.mime_type, "image/png");
        assert!(!page.data.is_empty());
        let decoded = STANDARD.decode(&page.data).expect("valid base64");
        assert_eq!(&decoded[1..4], b"PNG");
    }

    #[tokio::test]
    async fn non_pdf_bytes_rejected() {
        let result = rasterize_bytes(b"PK\x03\x04 definitely a zip", 2048).await;
        assert!(matches!(result, Err(RasterError::NotAPdf { .. })));
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let result = rasterize(Path::new("/definitely/not/here.pdf"), 2048).await;
        assert!(matches!(result, Err(RasterError::Io { .. })));
    }
}
