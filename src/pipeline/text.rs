//! Plain-text to PDF: a direct single-shot conversion, no cascade.
//!
//! Lines are placed at a fixed x offset with a fixed vertical advance,
//! starting a new Letter page whenever the cursor would cross the bottom
//! margin. A line that cannot be drawn degrades to a placeholder string
//! instead of aborting the page.

use crate::error::ConvertError;
use crate::pipeline::fonts::FontResolution;
use crate::pipeline::layout::{push_text_line, wrap, write_pdf, PAGE_WIDTH_PT};
use printpdf::ops::Op;
use printpdf::{Mm, PdfDocument, PdfPage, Rgb};
use std::path::Path;
use tracing::warn;

const TEXT_X_PT: f32 = 50.0;
const TEXT_START_Y_PT: f32 = 750.0;
const LINE_ADVANCE_PT: f32 = 15.0;
const MIN_Y_PT: f32 = 50.0;
const FONT_SIZE_PT: f32 = 11.0;
const PAGE_WIDTH_MM: f32 = 215.9;
const PAGE_HEIGHT_MM: f32 = 279.4;

const LINE_PLACEHOLDER: &str = "[Unable to render line]";

/// Convert the text file at `input` to a PDF at `output`.
///
/// Input bytes are decoded lossily, so invalid UTF-8 degrades to
/// replacement characters rather than failing the request.
pub fn text_to_pdf(input: &Path, output: &Path) -> Result<(), ConvertError> {
    let bytes = std::fs::read(input).map_err(|_| ConvertError::FileNotFound {
        path: input.to_path_buf(),
    })?;
    let content = String::from_utf8_lossy(&bytes);
    let doc = build_text_document(&content)?;
    write_pdf(doc, output)
}

/// Paginate `content` into a PDF document.
pub(crate) fn build_text_document(content: &str) -> Result<PdfDocument, ConvertError> {
    let mut doc = PdfDocument::new("Converted Text");
    let fonts = FontResolution::resolve(&mut doc);
    let font = fonts.main().ok_or(ConvertError::NoFontAvailable)?.clone();

    let black = printpdf::color::Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None));
    let usable_width = PAGE_WIDTH_PT - TEXT_X_PT * 2.0;

    let mut pages: Vec<PdfPage> = Vec::new();
    let mut ops: Vec<Op> = Vec::new();
    let mut y = TEXT_START_Y_PT;

    for source_line in content.lines() {
        for piece in wrap(source_line, FONT_SIZE_PT, usable_width) {
            if y < MIN_Y_PT {
                let page_ops = std::mem::take(&mut ops);
                pages.push(PdfPage::new(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), page_ops));
                y = TEXT_START_Y_PT;
            }
            match drawable(&piece) {
                Ok(text) => {
                    push_text_line(&mut ops, &font, text, TEXT_X_PT, y, FONT_SIZE_PT, black.clone())
                }
                Err(detail) => {
                    warn!("Line not drawable ({detail}); substituting placeholder");
                    push_text_line(
                        &mut ops,
                        &font,
                        LINE_PLACEHOLDER,
                        TEXT_X_PT,
                        y,
                        FONT_SIZE_PT,
                        black.clone(),
                    );
                }
            }
            y -= LINE_ADVANCE_PT;
        }
    }

    pages.push(PdfPage::new(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), ops));
    doc.pages = pages;
    Ok(doc)
}

/// NUL bytes inside a PDF text string corrupt the content stream, so lines
/// carrying them are the one thing this renderer refuses to draw verbatim.
fn drawable(line: &str) -> Result<&str, &'static str> {
    if line.contains('\u{0}') {
        Err("embedded NUL")
    } else {
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_still_produces_one_page() {
        let doc = build_text_document("").unwrap();
        assert_eq!(doc.pages.len(), 1);
    }

    #[test]
    fn pagination_breaks_after_bottom_margin() {
        // 47 lines fit between y=750 and y=50 at 15pt advance.
        let content = (0..48).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let doc = build_text_document(&content).unwrap();
        assert_eq!(doc.pages.len(), 2);

        let content = (0..47).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let doc = build_text_document(&content).unwrap();
        assert_eq!(doc.pages.len(), 1);
    }

    #[test]
    fn nul_lines_get_placeholder() {
        let doc = build_text_document("fine\nbro\u{0}ken\n").unwrap();
        // Both lines drew something; the document is a single valid page.
        assert_eq!(doc.pages.len(), 1);
        assert!(!doc.pages[0].ops.is_empty());
    }

    #[test]
    fn text_to_pdf_writes_valid_header() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.txt");
        let output = dir.path().join("notes.pdf");
        std::fs::write(&input, "hello\nworld\n").unwrap();

        text_to_pdf(&input, &output).unwrap();
        let bytes = std::fs::read(&output).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn invalid_utf8_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("mixed.txt");
        let output = dir.path().join("mixed.pdf");
        std::fs::write(&input, b"ok line\xFF\xFEmore\n").unwrap();

        text_to_pdf(&input, &output).unwrap();
        assert!(output.exists());
    }
}
