//! PDF sanity checks.
//!
//! Servers happily answer a PDF request with an HTML error page, so bodies are
//! screened before they are written, and files already on disk can be parsed
//! with `lopdf` to confirm they are usable.

use std::path::Path;
use thiserror::Error;

/// Markers of an error page served where a PDF was expected
const ERROR_PAGE_MARKERS: &[&str] = &["Invalid article ID", "No paper"];

/// Errors that can occur while inspecting a PDF
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("PDF at {path} is corrupt: {reason}")]
    Corrupt { path: String, reason: String },
}

/// Summary of a parsed PDF
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfInfo {
    pub pages: usize,
}

/// Whether a downloaded body is plausibly a PDF.
///
/// Binary bodies pass. A body that decodes as text passes unless it carries
/// one of the known error-page markers.
pub fn likely_pdf(body: &[u8]) -> bool {
    match std::str::from_utf8(body) {
        Ok(text) => !ERROR_PAGE_MARKERS.iter().any(|marker| text.contains(marker)),
        Err(_) => true,
    }
}

/// Parse the PDF at `path`.
pub fn inspect_pdf(path: &Path) -> Result<PdfInfo, PdfError> {
    if !path.is_file() {
        return Err(PdfError::NotFound(path.display().to_string()));
    }

    let document = lopdf::Document::load(path).map_err(|e| PdfError::Corrupt {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    Ok(PdfInfo {
        pages: document.get_pages().len(),
    })
}

/// Whether `path` holds a PDF that parses.
pub fn check_pdf(path: &Path) -> bool {
    match inspect_pdf(path) {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!("{}", e);
            false
        }
    }
}

/// Build a one-page PDF in memory.
#[cfg(test)]
pub(crate) fn sample_pdf() -> Vec<u8> {
    use lopdf::{dictionary, Document, Object};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("in-memory PDF");
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_likely_pdf() {
        assert!(likely_pdf(&[0x25, 0x50, 0x44, 0x46, 0xff, 0xfe]));
        assert!(likely_pdf(b"%PDF-1.7"));
        assert!(!likely_pdf(b"<html>Invalid article ID</html>"));
        assert!(!likely_pdf(b"No paper with that identifier"));
    }

    #[test]
    fn test_check_pdf_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ok.pdf");
        std::fs::write(&path, sample_pdf()).unwrap();

        assert!(check_pdf(&path));
        assert_eq!(inspect_pdf(&path).unwrap().pages, 1);
    }

    #[test]
    fn test_check_pdf_rejects_garbage_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.pdf");
        std::fs::write(&path, b"<html>not a pdf</html>").unwrap();

        assert!(!check_pdf(&path));
        assert!(!check_pdf(&dir.path().join("missing.pdf")));
        assert!(matches!(
            inspect_pdf(&dir.path().join("missing.pdf")),
            Err(PdfError::NotFound(_))
        ));
    }
}
