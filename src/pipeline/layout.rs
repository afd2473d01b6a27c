//! Manual layout reconstruction: the cascade's last-resort DOCX renderer.
//!
//! Rebuilds a visually reasonable PDF purely from the structural model in
//! [`crate::pipeline::docx`], with no external engine involved. Fidelity is
//! deliberately modest (one font, even column widths, approximate text
//! metrics); what this strategy guarantees is that it cannot be missing from
//! a host and that it degrades per paragraph instead of failing the
//! document:
//!
//! 1. render the paragraph with its proper style;
//! 2. on failure, retry with a simplified smaller style;
//! 3. on failure again, strip to ASCII and append a marker;
//! 4. if even that fails, drop the paragraph and log it.
//!
//! Tables that cannot be drawn as grids degrade to "Table N:" plus
//! pipe-delimited rows. An empty document becomes a one-page PDF saying so,
//! and an assembly failure becomes a one-page PDF with a generic message;
//! this module reports an error only when the input cannot be parsed or the
//! output file cannot be written.

use crate::error::ConvertError;
use crate::pipeline::docx::{Block, DocModel, TableModel};
use crate::pipeline::fonts::{FontResolution, Script};
use printpdf::graphics::{LinePoint, PaintMode, Point, Polygon, PolygonRing, WindingOrder};
use printpdf::matrix::TextMatrix;
use printpdf::ops::Op;
use printpdf::text::TextItem;
use printpdf::{FontId, Mm, PdfDocument, PdfPage, PdfSaveOptions, Pt, Rgb};
use std::io::Write;
use std::path::Path;
use tracing::{debug, error, warn};

// US Letter.
pub(crate) const PAGE_WIDTH_PT: f32 = 612.0;
pub(crate) const PAGE_HEIGHT_PT: f32 = 792.0;
const PAGE_WIDTH_MM: f32 = 215.9;
const PAGE_HEIGHT_MM: f32 = 279.4;
const MARGIN_SIDE_PT: f32 = 36.0;
const MARGIN_TOP_PT: f32 = 54.0;
const MARGIN_BOTTOM_PT: f32 = 54.0;
pub(crate) const CONTENT_WIDTH_PT: f32 = PAGE_WIDTH_PT - 2.0 * MARGIN_SIDE_PT;

const CELL_FONT_SIZE: f32 = 9.0;
const CELL_LEADING: f32 = 12.0;
const CELL_PADDING: f32 = 4.0;

pub(crate) const NO_CONTENT_TEXT: &str = "No content found in document";
const RENDER_ERROR_TEXT: &str = "Error rendering document content";
const CHARSET_MARKER: &str = "[Some characters could not be displayed]";

/// Paragraph style: font size and line advance in points.
#[derive(Debug, Clone, Copy)]
struct ParaStyle {
    size: f32,
    leading: f32,
}

const HEADING_STYLE: ParaStyle = ParaStyle {
    size: 16.0,
    leading: 22.0,
};
const BODY_STYLE: ParaStyle = ParaStyle {
    size: 11.0,
    leading: 16.0,
};
const SIMPLIFIED_STYLE: ParaStyle = ParaStyle {
    size: 10.0,
    leading: 14.0,
};

fn black() -> printpdf::color::Color {
    printpdf::color::Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None))
}

fn white() -> printpdf::color::Color {
    printpdf::color::Color::Rgb(Rgb::new(1.0, 1.0, 1.0, None))
}

/// Header row fill, #4472C4.
fn header_fill() -> printpdf::color::Color {
    printpdf::color::Color::Rgb(Rgb::new(0x44 as f32 / 255.0, 0x72 as f32 / 255.0, 0xC4 as f32 / 255.0, None))
}

/// Alternating data row fill, #F2F2F2.
fn zebra_fill() -> printpdf::color::Color {
    printpdf::color::Color::Rgb(Rgb::new(0.949, 0.949, 0.949, None))
}

fn grid_stroke() -> printpdf::color::Color {
    printpdf::color::Color::Rgb(Rgb::new(0.6, 0.6, 0.6, None))
}

/// Render the DOCX at `input` to a PDF at `output`.
pub fn render_docx(input: &Path, output: &Path) -> Result<(), ConvertError> {
    let model = DocModel::parse(input)?;
    let doc = build_document(&model);
    write_pdf(doc, output)
}

/// Serialise a finished document to disk.
pub(crate) fn write_pdf(doc: PdfDocument, output: &Path) -> Result<(), ConvertError> {
    let file = std::fs::File::create(output).map_err(|e| ConvertError::OutputWriteFailed {
        path: output.to_path_buf(),
        source: e,
    })?;
    let mut writer = std::io::BufWriter::new(file);
    let mut warnings = Vec::new();
    doc.save_writer(&mut writer, &PdfSaveOptions::default(), &mut warnings);
    writer.flush().map_err(|e| ConvertError::OutputWriteFailed {
        path: output.to_path_buf(),
        source: e,
    })?;
    for w in warnings {
        debug!("pdf writer: {w:?}");
    }
    Ok(())
}

/// Build the PDF document for a structural model. Infallible by policy: any
/// assembly failure is replaced with a one-page message document.
pub(crate) fn build_document(model: &DocModel) -> PdfDocument {
    let mut doc = PdfDocument::new("Converted Document");
    let fonts = FontResolution::resolve(&mut doc);

    let pages = if model.is_empty() {
        message_page(&fonts, NO_CONTENT_TEXT)
    } else {
        match compose(model, &fonts) {
            Ok(pages) => pages,
            Err(e) => {
                error!("Document assembly failed, emitting placeholder page: {e}");
                message_page(&fonts, RENDER_ERROR_TEXT)
            }
        }
    };

    doc.pages = pages;
    doc
}

/// A single page carrying one centered-ish line of text (or nothing, when no
/// font could be embedded at all).
fn message_page(fonts: &FontResolution, text: &str) -> Vec<PdfPage> {
    let mut ops = Vec::new();
    if let Some(font) = fonts.main() {
        push_text_line(
            &mut ops,
            font,
            text,
            MARGIN_SIDE_PT,
            PAGE_HEIGHT_PT / 2.0,
            BODY_STYLE.size,
            black(),
        );
    }
    vec![PdfPage::new(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), ops)]
}

fn compose(model: &DocModel, fonts: &FontResolution) -> Result<Vec<PdfPage>, ConvertError> {
    if fonts.main().is_none() {
        return Err(ConvertError::NoFontAvailable);
    }
    let mut composer = Composer::new(fonts);
    let mut table_count = 0usize;
    for block in &model.blocks {
        match block {
            Block::Paragraph(p) => composer.paragraph(&p.text, p.heading),
            Block::Table(t) => {
                table_count += 1;
                if let Err(e) = composer.table(t) {
                    warn!("Table {table_count} grid rendering failed ({e}); using text fallback");
                    composer.table_fallback(t, table_count);
                }
            }
        }
    }
    Ok(composer.finish())
}

/// Accumulates drawing ops page by page, tracking a vertical cursor in PDF
/// coordinates (origin bottom-left).
struct Composer<'a> {
    fonts: &'a FontResolution,
    ops: Vec<Op>,
    pages: Vec<PdfPage>,
    /// Baseline position for the next line, in points from the page bottom.
    y: f32,
}

impl<'a> Composer<'a> {
    fn new(fonts: &'a FontResolution) -> Self {
        Self {
            fonts,
            ops: Vec::new(),
            pages: Vec::new(),
            y: PAGE_HEIGHT_PT - MARGIN_TOP_PT,
        }
    }

    fn new_page(&mut self) {
        let ops = std::mem::take(&mut self.ops);
        self.pages
            .push(PdfPage::new(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), ops));
        self.y = PAGE_HEIGHT_PT - MARGIN_TOP_PT;
    }

    /// Move the cursor down by `height`, breaking the page first if the
    /// space left above the bottom margin is insufficient.
    fn advance(&mut self, height: f32) {
        if self.y - height < MARGIN_BOTTOM_PT {
            self.new_page();
        }
        self.y -= height;
    }

    fn finish(mut self) -> Vec<PdfPage> {
        if !self.ops.is_empty() || self.pages.is_empty() {
            let ops = std::mem::take(&mut self.ops);
            self.pages
                .push(PdfPage::new(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), ops));
        }
        self.pages
    }

    /// Three-tier degradation entry point for one paragraph.
    fn paragraph(&mut self, text: &str, heading: bool) {
        let script = Script::detect(text);
        if !self.fonts.supports(script) {
            warn!(?script, "No registered font covers this paragraph's script; glyphs may be missing");
        }

        let style = if heading { HEADING_STYLE } else { BODY_STYLE };
        if self.try_paragraph(text, style).is_ok() {
            return;
        }
        warn!("Paragraph failed with standard style, retrying simplified");
        if self.try_paragraph(text, SIMPLIFIED_STYLE).is_ok() {
            return;
        }

        let ascii: String = text
            .chars()
            .filter(|c| c.is_ascii() && (!c.is_control() || *c == '\n' || *c == '\t'))
            .collect();
        let replacement = format!("{} {}", ascii.trim(), CHARSET_MARKER);
        if self.try_paragraph(replacement.trim(), SIMPLIFIED_STYLE).is_ok() {
            return;
        }
        warn!("Dropping paragraph that could not be rendered in any form");
    }

    fn try_paragraph(&mut self, text: &str, style: ParaStyle) -> Result<(), ConvertError> {
        drawable(text)?;
        let font = self
            .fonts
            .main()
            .ok_or(ConvertError::NoFontAvailable)?
            .clone();
        for line in wrap(text, style.size, CONTENT_WIDTH_PT) {
            self.advance(style.leading);
            let y = self.y;
            push_text_line(&mut self.ops, &font, &line, MARGIN_SIDE_PT, y, style.size, black());
        }
        // Inter-paragraph gap.
        self.advance(style.leading * 0.4);
        Ok(())
    }

    /// Draw a table as a grid: ragged rows padded to the widest row, even
    /// column widths, filled header row, alternating data row backgrounds.
    /// Checked before any op is emitted, so a failed table leaves no
    /// half-drawn grid behind for the text fallback to collide with.
    fn table(&mut self, table: &TableModel) -> Result<(), ConvertError> {
        for row in &table.rows {
            for cell in row {
                drawable(cell)?;
            }
        }
        let font = self
            .fonts
            .main()
            .ok_or(ConvertError::NoFontAvailable)?
            .clone();
        let rows = table.padded_rows();
        let cols = table.max_cols();
        if cols == 0 {
            return Ok(());
        }
        let col_width = CONTENT_WIDTH_PT / cols as f32;
        let text_width = (col_width - 2.0 * CELL_PADDING).max(CELL_FONT_SIZE);

        for (ri, row) in rows.iter().enumerate() {
            let wrapped: Vec<Vec<String>> = row
                .iter()
                .map(|cell| wrap(cell, CELL_FONT_SIZE, text_width))
                .collect();
            let line_count = wrapped.iter().map(Vec::len).max().unwrap_or(1).max(1);
            let row_height = line_count as f32 * CELL_LEADING + 2.0 * CELL_PADDING;

            if self.y - row_height < MARGIN_BOTTOM_PT {
                self.new_page();
            }
            let top = self.y;
            let bottom = top - row_height;

            let fill = if ri == 0 {
                Some(header_fill())
            } else if ri % 2 == 0 {
                Some(zebra_fill())
            } else {
                None
            };
            if let Some(color) = fill {
                self.fill_rect(MARGIN_SIDE_PT, bottom, CONTENT_WIDTH_PT, row_height, color);
            }

            let text_color = if ri == 0 { white() } else { black() };
            for (ci, lines) in wrapped.iter().enumerate() {
                let cell_x = MARGIN_SIDE_PT + ci as f32 * col_width;
                self.stroke_rect(cell_x, bottom, col_width, row_height);
                for (li, line) in lines.iter().enumerate() {
                    let line_y = top - CELL_PADDING - CELL_FONT_SIZE - li as f32 * CELL_LEADING;
                    push_text_line(
                        &mut self.ops,
                        &font,
                        line,
                        cell_x + CELL_PADDING,
                        line_y,
                        CELL_FONT_SIZE,
                        text_color.clone(),
                    );
                }
            }

            self.y = bottom;
        }
        // Gap below the table.
        self.advance(10.0);
        Ok(())
    }

    /// Best-effort text rendition of a table: a "Table N:" caption followed
    /// by one pipe-delimited line per row. Rows that still fail are skipped
    /// by the paragraph tiers.
    fn table_fallback(&mut self, table: &TableModel, index: usize) {
        self.paragraph(&format!("Table {index}:"), false);
        for row in table.padded_rows() {
            let line = row.join(" | ");
            self.paragraph(&line, false);
        }
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: printpdf::color::Color) {
        self.ops.push(Op::SetFillColor { col: color });
        self.ops.push(Op::DrawPolygon {
            polygon: rect_polygon(x, y, width, height, PaintMode::Fill),
        });
    }

    fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.ops.push(Op::SetOutlineColor { col: grid_stroke() });
        self.ops.push(Op::SetOutlineThickness { pt: Pt(0.5) });
        self.ops.push(Op::DrawPolygon {
            polygon: rect_polygon(x, y, width, height, PaintMode::Stroke),
        });
    }
}

fn rect_polygon(x: f32, y: f32, width: f32, height: f32, mode: PaintMode) -> Polygon {
    Polygon {
        rings: vec![PolygonRing {
            points: vec![
                LinePoint {
                    p: Point { x: Pt(x), y: Pt(y) },
                    bezier: false,
                },
                LinePoint {
                    p: Point {
                        x: Pt(x + width),
                        y: Pt(y),
                    },
                    bezier: false,
                },
                LinePoint {
                    p: Point {
                        x: Pt(x + width),
                        y: Pt(y + height),
                    },
                    bezier: false,
                },
                LinePoint {
                    p: Point {
                        x: Pt(x),
                        y: Pt(y + height),
                    },
                    bezier: false,
                },
            ],
        }],
        mode,
        winding_order: WindingOrder::EvenOdd,
    }
}

/// NUL bytes inside a PDF text string corrupt the content stream, so text
/// carrying them is rejected before any op is emitted; the degradation
/// tiers strip the offending characters and retry.
fn drawable(text: &str) -> Result<(), ConvertError> {
    if text.contains('\u{0}') {
        return Err(ConvertError::Internal("text contains embedded NUL".into()));
    }
    Ok(())
}

/// Emit the op sequence for one line of text at a baseline position.
pub(crate) fn push_text_line(
    ops: &mut Vec<Op>,
    font: &FontId,
    text: &str,
    x: f32,
    y: f32,
    size: f32,
    color: printpdf::color::Color,
) {
    ops.push(Op::StartTextSection);
    ops.push(Op::SetFillColor { col: color });
    ops.push(Op::SetFontSize {
        size: Pt(size),
        font: font.clone(),
    });
    ops.push(Op::SetTextMatrix {
        matrix: TextMatrix::Translate(Pt(x), Pt(y)),
    });
    ops.push(Op::WriteText {
        items: vec![TextItem::Text(text.to_string())],
        font: font.clone(),
    });
    ops.push(Op::EndTextSection);
}

/// Greedy word wrap with an approximate average glyph width of half the
/// font size. Words longer than a line are hard-split.
pub(crate) fn wrap(text: &str, font_size: f32, width_pt: f32) -> Vec<String> {
    let max_chars = ((width_pt / (font_size * 0.5)) as usize).max(1);
    let mut lines = Vec::new();

    for raw_line in text.split('\n') {
        let mut current = String::new();
        for word in raw_line.split_whitespace() {
            if word.chars().count() > max_chars {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let chars: Vec<char> = word.chars().collect();
                for chunk in chars.chunks(max_chars) {
                    lines.push(chunk.iter().collect());
                }
                continue;
            }
            let needed = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };
            if needed > max_chars && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
