//! PDF loading, one document per page

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::Document;

/// Glyphs that PDF fonts commonly emit in place of plain ASCII
const GLYPH_REPLACEMENTS: [(char, &str); 16] = [
    ('\u{2010}', "-"),   // Hyphen
    ('\u{2011}', "-"),   // Non-breaking hyphen
    ('\u{2013}', "-"),   // En dash
    ('\u{2014}', "--"),  // Em dash
    ('\u{2018}', "'"),   // Left single quote
    ('\u{2019}', "'"),   // Right single quote
    ('\u{201C}', "\""),  // Left double quote
    ('\u{201D}', "\""),  // Right double quote
    ('\u{2022}', "* "),  // Bullet
    ('\u{2026}', "..."), // Ellipsis
    ('\u{00A0}', " "),   // Non-breaking space
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
];

/// Normalize extracted page text
///
/// Drops NUL bytes, replaces font glyphs with ASCII, trims line ends and
/// collapses runs of blank lines into a single paragraph break.
pub fn cleanup_page_text(text: &str) -> String {
    let mut result = text.replace('\0', "");
    for (glyph, replacement) in GLYPH_REPLACEMENTS {
        if result.contains(glyph) {
            result = result.replace(glyph, replacement);
        }
    }

    let mut cleaned = String::with_capacity(result.len());
    let mut blank_run = 0usize;
    for line in result.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 || cleaned.is_empty() {
                continue;
            }
        } else {
            blank_run = 0;
        }
        cleaned.push_str(line);
        cleaned.push('\n');
    }

    cleaned.trim_end().to_string()
}

/// PDF loader producing one [`Document`] per page
pub struct PdfLoader;

impl PdfLoader {
    /// Load a PDF from disk
    pub async fn load(path: impl AsRef<Path>) -> Result<Vec<Document>> {
        let path = path.as_ref();
        let source = path.display().to_string();

        let data = tokio::fs::read(path)
            .await
            .map_err(|e| Error::load(&source, e.to_string()))?;

        tracing::debug!("Read {} bytes from {}", data.len(), source);

        let task_source = source.clone();
        tokio::task::spawn_blocking(move || Self::parse(&task_source, &data))
            .await
            .map_err(|e| {
                if e.is_panic() {
                    Error::load(&source, "PDF parser panicked")
                } else {
                    Error::internal(format!("Task join error: {}", e))
                }
            })?
    }

    /// Parse PDF bytes; `source` is recorded in each document's metadata
    pub fn parse(source: &str, data: &[u8]) -> Result<Vec<Document>> {
        let pdf = lopdf::Document::load_mem(data)
            .map_err(|e| Error::load(source, format!("not a valid PDF: {}", e)))?;

        let pages = pdf.get_pages();
        if pages.is_empty() {
            return Err(Error::load(source, "PDF has no pages"));
        }
        let total_pages = pages.len() as u32;

        let mut documents = Vec::with_capacity(pages.len());
        for &page_number in pages.keys() {
            let text = match pdf.extract_text(&[page_number]) {
                Ok(text) => cleanup_page_text(&text),
                Err(e) => {
                    tracing::debug!("Could not extract text for page {}: {}", page_number, e);
                    String::new()
                }
            };
            documents.push(Document::page(source, text, page_number, total_pages));
        }

        if documents.iter().any(|doc| !doc.text.trim().is_empty()) {
            return Ok(documents);
        }

        tracing::warn!(
            "Per-page extraction produced no text for {}, trying pdf-extract",
            source
        );

        let text = pdf_extract::extract_text_from_mem(data)
            .map_err(|e| Error::load(source, format!("text extraction failed: {}", e)))?;
        let text = cleanup_page_text(&text);

        if text.is_empty() {
            return Err(Error::load(
                source,
                "PDF appears to be image-based or encrypted; no extractable text",
            ));
        }

        Ok(vec![Document::whole(source, text)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_replaces_glyphs() {
        let cleaned = cleanup_page_text("The \u{FB01}rst \u{201C}quote\u{201D}\u{2026}\0");
        assert_eq!(cleaned, "The first \"quote\"...");
    }

    #[test]
    fn test_cleanup_collapses_blank_lines() {
        let cleaned = cleanup_page_text("\n\nFirst line   \n\n\n\nSecond\n\n");
        assert_eq!(cleaned, "First line\n\nSecond");
    }

    #[test]
    fn test_parse_rejects_non_pdf() {
        let err = PdfLoader::parse("notes.pdf", b"just some text").unwrap_err();
        assert!(matches!(err, Error::Load { ref path, .. } if path == "notes.pdf"));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = PdfLoader::load("/definitely/not/here.pdf").await.unwrap_err();
        assert!(matches!(err, Error::Load { .. }));
    }
}
