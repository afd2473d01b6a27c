//! DOCX structural extraction.
//!
//! Parses a DOCX into a flat block model (paragraphs and tables) that both
//! the manual layout renderer and the HTML bridge's extraction branch
//! consume. Character-level formatting (bold, size, color) is deliberately
//! not modelled; the cascade's earlier strategies keep full fidelity, this
//! model only has to keep the text and the document's coarse structure.

use crate::error::ConvertError;
use docx_rs::{
    read_docx, DocumentChild, ParagraphChild, RunChild, TableCellContent, TableChild,
    TableRowChild,
};
use std::path::Path;

/// One paragraph of the source document.
#[derive(Debug, Clone)]
pub struct Para {
    pub text: String,
    /// True when the paragraph's style name starts with "Heading".
    pub heading: bool,
}

/// One table, as a row-major grid of plain cell texts. Rows may be ragged;
/// the consumers pad to the widest row.
#[derive(Debug, Clone)]
pub struct TableModel {
    pub rows: Vec<Vec<String>>,
}

impl TableModel {
    /// The widest row's cell count.
    pub fn max_cols(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Rows padded with empty cells to a uniform width. No row is dropped.
    pub fn padded_rows(&self) -> Vec<Vec<String>> {
        let cols = self.max_cols();
        self.rows
            .iter()
            .map(|row| {
                let mut padded = row.clone();
                padded.resize(cols, String::new());
                padded
            })
            .collect()
    }
}

/// Document blocks in source order.
#[derive(Debug, Clone)]
pub enum Block {
    Paragraph(Para),
    Table(TableModel),
}

/// The extracted structural model of one DOCX.
#[derive(Debug, Clone, Default)]
pub struct DocModel {
    pub blocks: Vec<Block>,
}

impl DocModel {
    /// Parse the DOCX at `path`. Empty paragraphs are kept out of the model;
    /// an all-empty document yields zero blocks, which the renderer turns
    /// into its "no content" page.
    pub fn parse(path: &Path) -> Result<DocModel, ConvertError> {
        let bytes = std::fs::read(path).map_err(|_| ConvertError::FileNotFound {
            path: path.to_path_buf(),
        })?;
        let docx = read_docx(&bytes).map_err(|e| ConvertError::InvalidDocx {
            path: path.to_path_buf(),
            detail: format!("{e:?}"),
        })?;

        let mut blocks = Vec::new();
        for child in &docx.document.children {
            match child {
                DocumentChild::Paragraph(para) => {
                    let extracted = extract_paragraph(para);
                    if !extracted.text.trim().is_empty() {
                        blocks.push(Block::Paragraph(extracted));
                    }
                }
                DocumentChild::Table(table) => {
                    let model = extract_table(table);
                    if !model.rows.is_empty() {
                        blocks.push(Block::Table(model));
                    }
                }
                _ => {}
            }
        }

        Ok(DocModel { blocks })
    }

    /// True when the document carries no renderable content.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Body markup for the HTML bridge's extraction branch: headings as
    /// `<h1>`, paragraphs as `<p>`, tables as bordered `<table>` grids.
    /// Raw markup only; the bridge wraps it in a styled page shell.
    pub fn to_html_body(&self) -> String {
        let mut html = String::new();
        for block in &self.blocks {
            match block {
                Block::Paragraph(p) => {
                    let tag = if p.heading { "h1" } else { "p" };
                    html.push_str(&format!("<{tag}>{}</{tag}>\n", escape_html(&p.text)));
                }
                Block::Table(t) => {
                    html.push_str("<table>\n");
                    for (i, row) in t.padded_rows().iter().enumerate() {
                        let cell_tag = if i == 0 { "th" } else { "td" };
                        html.push_str("<tr>");
                        for cell in row {
                            html.push_str(&format!(
                                "<{cell_tag}>{}</{cell_tag}>",
                                escape_html(cell)
                            ));
                        }
                        html.push_str("</tr>\n");
                    }
                    html.push_str("</table>\n");
                }
            }
        }
        html
    }
}

fn extract_paragraph(para: &docx_rs::Paragraph) -> Para {
    let mut text = String::new();
    for child in &para.children {
        if let ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                match run_child {
                    RunChild::Text(t) => text.push_str(&t.text),
                    RunChild::Tab(_) => text.push('\t'),
                    RunChild::Break(_) => text.push('\n'),
                    _ => {}
                }
            }
        }
    }

    let heading = para
        .property
        .style
        .as_ref()
        .map(|s| s.val.starts_with("Heading") || s.val.starts_with("heading"))
        .unwrap_or(false);

    Para { text, heading }
}

fn extract_table(table: &docx_rs::Table) -> TableModel {
    let mut rows = Vec::new();
    for table_child in &table.rows {
        let TableChild::TableRow(row) = table_child;
        let mut cells = Vec::new();
        for row_child in &row.cells {
            let TableRowChild::TableCell(cell) = row_child;
            let mut lines = Vec::new();
            for content in &cell.children {
                if let TableCellContent::Paragraph(para) = content {
                    let p = extract_paragraph(para);
                    if !p.text.is_empty() {
                        lines.push(p.text);
                    }
                }
            }
            cells.push(lines.join("\n"));
        }
        rows.push(cells);
    }
    TableModel { rows }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{Docx, Paragraph, Run, Table, TableCell, TableRow};

    fn write_docx(docx: Docx, dir: &Path) -> std::path::PathBuf {
        let path = dir.join("fixture.docx");
        let file = std::fs::File::create(&path).unwrap();
        docx.build().pack(file).unwrap();
        path
    }

    #[test]
    fn parses_headings_and_body() {
        let dir = tempfile::tempdir().unwrap();
        let docx = Docx::new()
            .add_paragraph(
                Paragraph::new()
                    .add_run(Run::new().add_text("Title"))
                    .style("Heading1"),
            )
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Body text.")));
        let model = DocModel::parse(&write_docx(docx, dir.path())).unwrap();

        assert_eq!(model.blocks.len(), 2);
        match (&model.blocks[0], &model.blocks[1]) {
            (Block::Paragraph(h), Block::Paragraph(b)) => {
                assert!(h.heading);
                assert_eq!(h.text, "Title");
                assert!(!b.heading);
            }
            other => panic!("unexpected blocks: {other:?}"),
        }
    }

    #[test]
    fn empty_docx_has_no_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let model = DocModel::parse(&write_docx(Docx::new(), dir.path())).unwrap();
        assert!(model.is_empty());
    }

    #[test]
    fn garbage_bytes_are_invalid_docx() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.docx");
        std::fs::write(&path, b"this is not a zip container").unwrap();
        let err = DocModel::parse(&path).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidDocx { .. }));
    }

    #[test]
    fn ragged_rows_pad_to_max_cols() {
        let table = TableModel {
            rows: vec![
                vec!["a".into(), "b".into(), "c".into()],
                vec!["d".into()],
                vec!["e".into(), "f".into()],
            ],
        };
        let padded = table.padded_rows();
        assert_eq!(table.max_cols(), 3);
        assert!(padded.iter().all(|row| row.len() == 3));
        assert_eq!(padded[1], vec!["d".to_string(), String::new(), String::new()]);
        // No row dropped.
        assert_eq!(padded.len(), 3);
    }

    #[test]
    fn table_round_trips_through_docx() {
        let dir = tempfile::tempdir().unwrap();
        let row = TableRow::new(vec![
            TableCell::new()
                .add_paragraph(Paragraph::new().add_run(Run::new().add_text("k"))),
            TableCell::new()
                .add_paragraph(Paragraph::new().add_run(Run::new().add_text("v"))),
        ]);
        let docx = Docx::new().add_table(Table::new(vec![row]));
        let model = DocModel::parse(&write_docx(docx, dir.path())).unwrap();
        match &model.blocks[0] {
            Block::Table(t) => assert_eq!(t.rows, vec![vec!["k".to_string(), "v".to_string()]]),
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn html_body_escapes_and_structures() {
        let model = DocModel {
            blocks: vec![
                Block::Paragraph(Para {
                    text: "a < b".into(),
                    heading: true,
                }),
                Block::Table(TableModel {
                    rows: vec![vec!["x".into()], vec!["y".into()]],
                }),
            ],
        };
        let html = model.to_html_body();
        assert!(html.contains("<h1>a &lt; b</h1>"));
        assert!(html.contains("<th>x</th>"));
        assert!(html.contains("<td>y</td>"));
    }
}
