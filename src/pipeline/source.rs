//! File access: read a stored document and extract its text.
//!
//! Text from scanned trade documents is unreliable — multi-column customs
//! forms come out garbled — so the extracted text is reference material;
//! when rasterisation succeeds, the page images carry the evidence. Failing
//! to extract text is therefore not fatal by itself, but a file that cannot
//! be read at all is.

use std::path::{Path, PathBuf};

use pdfium_render::prelude::*;
use tracing::{debug, info};

use crate::error::PipelineError;

/// Read the stored file and return its plain-text content.
///
/// PDFs go through pdfium's text layer (all pages concatenated); anything
/// else is read as UTF-8. An empty text layer is reported as
/// [`PipelineError::EmptyText`] so callers can decide whether vision
/// processing makes the document viable anyway.
pub async fn read_content(path: &Path) -> Result<String, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    if is_pdf_path(path) {
        let path_buf = path.to_path_buf();
        let text = tokio::task::spawn_blocking(move || extract_pdf_text(&path_buf))
            .await
            .map_err(|e| PipelineError::Internal(format!("text extraction task failed: {e}")))??;
        info!("Extracted {} characters of text from {}", text.len(), path.display());
        Ok(text)
    } else {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|_| PipelineError::FileNotFound {
                path: path.to_path_buf(),
            })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Whether the path names a PDF (by extension, matching the upload naming).
pub fn is_pdf_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

fn extract_pdf_text(path: &PathBuf) -> Result<String, PipelineError> {
    let pdfium = Pdfium::default();
    let document = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| PipelineError::Internal(format!("could not open PDF for text: {e:?}")))?;

    let pages = document.pages();
    let mut text = String::new();
    for idx in 0..pages.len() {
        let page = pages
            .get(idx)
            .map_err(|e| PipelineError::Internal(format!("page {} unavailable: {e:?}", idx + 1)))?;
        if let Ok(page_text) = page.text() {
            text.push_str(&page_text.all());
            text.push('\n');
        }
        debug!("Text pass: page {} done", idx + 1);
    }

    if text.trim().is_empty() {
        return Err(PipelineError::EmptyText {
            path: path.clone(),
        });
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_extension_detection() {
        assert!(is_pdf_path(Path::new("uploads/scan.pdf")));
        assert!(is_pdf_path(Path::new("uploads/SCAN.PDF")));
        assert!(!is_pdf_path(Path::new("uploads/scan.txt")));
        assert!(!is_pdf_path(Path::new("uploads/scan")));
    }

    #[tokio::test]
    async fn missing_file_reports_not_found() {
        let result = read_content(Path::new("/no/such/upload.txt")).await;
        assert!(matches!(result, Err(PipelineError::FileNotFound { .. })));
    }

    #[tokio::test]
    async fn plain_text_file_reads_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "INVOICE NO - 4042").unwrap();
        let content = read_content(&path).await.unwrap();
        assert_eq!(content, "INVOICE NO - 4042");
    }
}
