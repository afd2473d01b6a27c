//! Image to PDF: the single-shot converter and the batch image merge.
//!
//! Both paths share one pixel→point convention: 96 DPI, i.e. one pixel is
//! 0.75 pt on the page. Images are normalised to 8-bit RGB before embedding
//! so palette, grayscale and alpha inputs all land in the PDF the same way.

use crate::error::{ConvertError, ItemError};
use crate::pipeline::layout::write_pdf;
use printpdf::ops::Op;
use printpdf::xobject::{XObject, XObjectTransform};
use printpdf::{Mm, PdfDocument, PdfPage, Pt, XObjectId};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Points per pixel at the service's fixed 96 DPI.
const PX_TO_PT: f32 = 72.0 / 96.0;

// A4 in points, used when the first merged image is portrait.
const A4_WIDTH_PT: f32 = 595.28;
const A4_HEIGHT_PT: f32 = 841.89;


fn pt_to_mm(pt: f32) -> Mm {
    Mm(pt * 25.4 / 72.0)
}

/// An image decoded, normalised to RGB, and registered in a document.
struct EmbeddedImage {
    id: XObjectId,
    width_px: u32,
    height_px: u32,
}

fn embed(doc: &mut PdfDocument, path: &Path) -> Result<EmbeddedImage, ConvertError> {
    let bytes = std::fs::read(path).map_err(|_| ConvertError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    let decoded = image::load_from_memory(&bytes).map_err(|e| ConvertError::EngineFailed {
        engine: "image-decode".into(),
        detail: format!("{}: {e}", path.display()),
    })?;

    // Normalise to 3-channel RGB regardless of the source color model.
    let rgb = decoded.to_rgb8();
    let (width_px, height_px) = rgb.dimensions();
    let mut png = Vec::new();
    image::DynamicImage::ImageRgb8(rgb)
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| ConvertError::Internal(format!("png re-encode: {e}")))?;

    let mut warnings = Vec::new();
    let raw = printpdf::image::RawImage::decode_from_bytes(&png, &mut warnings).map_err(|e| {
        ConvertError::EngineFailed {
            engine: "image-embed".into(),
            detail: e.to_string(),
        }
    })?;

    let id = XObjectId::new();
    doc.resources
        .xobjects
        .map
        .insert(id.clone(), XObject::Image(raw));
    Ok(EmbeddedImage {
        id,
        width_px,
        height_px,
    })
}

/// Convert a single image file to a one-page PDF sized to the image at
/// 96 DPI.
pub fn image_to_pdf(input: &Path, output: &Path) -> Result<(), ConvertError> {
    let mut doc = PdfDocument::new("Converted Image");
    let img = embed(&mut doc, input)?;

    let page_w = img.width_px as f32 * PX_TO_PT;
    let page_h = img.height_px as f32 * PX_TO_PT;
    let ops = vec![Op::UseXobject {
        id: img.id,
        transform: XObjectTransform {
            translate_x: Some(Pt(0.0)),
            translate_y: Some(Pt(0.0)),
            scale_x: Some(PX_TO_PT),
            scale_y: Some(PX_TO_PT),
            rotate: None,
            dpi: Some(72.0),
        },
    }];
    doc.pages
        .push(PdfPage::new(pt_to_mm(page_w), pt_to_mm(page_h), ops));

    write_pdf(doc, output)
}

/// Result of an image merge: how many pages made it, and which members did
/// not.
#[derive(Debug, Default)]
pub struct MergeReport {
    pub added: usize,
    pub skipped: Vec<(String, ItemError)>,
}

/// Page size for the merged PDF, chosen once from the first image:
/// strictly portrait → A4, square or landscape → the image's own pixel
/// dimensions at 96 DPI.
pub(crate) fn merge_page_size(width_px: u32, height_px: u32) -> (f32, f32) {
    if height_px > width_px {
        (A4_WIDTH_PT, A4_HEIGHT_PT)
    } else {
        (width_px as f32 * PX_TO_PT, height_px as f32 * PX_TO_PT)
    }
}

/// Placement of an image on a merge page: scaled to fill the page
/// preserving aspect ratio, centered both ways. Returns (x, y, scale) where
/// scale multiplies natural pixel size in points.
pub(crate) fn merge_placement(
    page_w: f32,
    page_h: f32,
    width_px: u32,
    height_px: u32,
) -> (f32, f32, f32) {
    let natural_w = width_px as f32 * PX_TO_PT;
    let natural_h = height_px as f32 * PX_TO_PT;
    let scale = (page_w / natural_w).min(page_h / natural_h);
    let draw_w = natural_w * scale;
    let draw_h = natural_h * scale;
    ((page_w - draw_w) / 2.0, (page_h - draw_h) / 2.0, scale)
}

/// Merge `entries` (original archive name, extracted path) into one PDF,
/// one image per page, in the given order. A member that fails to decode or
/// embed is recorded and skipped; the merge continues. The output file is
/// written only when at least one page was added.
pub fn merge_images_to_pdf(
    entries: &[(String, PathBuf)],
    output: &Path,
) -> Result<MergeReport, ConvertError> {
    let (doc, report) = build_merged_document(entries);
    if report.added > 0 {
        write_pdf(doc, output)?;
        debug!(pages = report.added, output = %output.display(), "Merged images");
    }
    Ok(report)
}

/// Assemble the merged document in entry order, one page per usable image.
fn build_merged_document(entries: &[(String, PathBuf)]) -> (PdfDocument, MergeReport) {
    let mut doc = PdfDocument::new("Merged Images");
    let mut report = MergeReport::default();
    let mut page_size: Option<(f32, f32)> = None;

    for (name, path) in entries {
        let img = match embed(&mut doc, path) {
            Ok(img) => img,
            Err(e) => {
                warn!("Skipping image '{name}' in merge: {e}");
                report.skipped.push((
                    name.clone(),
                    ItemError::ImageSkipped {
                        name: name.clone(),
                        detail: e.to_string(),
                    },
                ));
                continue;
            }
        };

        let (page_w, page_h) =
            *page_size.get_or_insert_with(|| merge_page_size(img.width_px, img.height_px));
        let (x, y, scale) = merge_placement(page_w, page_h, img.width_px, img.height_px);

        let ops = vec![Op::UseXobject {
            id: img.id,
            transform: XObjectTransform {
                translate_x: Some(Pt(x)),
                translate_y: Some(Pt(y)),
                scale_x: Some(scale * PX_TO_PT),
                scale_y: Some(scale * PX_TO_PT),
                rotate: None,
                dpi: Some(72.0),
            },
        }];
        doc.pages
            .push(PdfPage::new(pt_to_mm(page_w), pt_to_mm(page_h), ops));
        report.added += 1;
    }

    (doc, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_png(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
        let path = dir.join(name);
        let img = RgbImage::from_pixel(w, h, Rgb([120, 40, 200]));
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn portrait_first_image_selects_a4() {
        let (w, h) = merge_page_size(600, 800);
        assert!((w - A4_WIDTH_PT).abs() < 0.01);
        assert!((h - A4_HEIGHT_PT).abs() < 0.01);
    }

    #[test]
    fn landscape_first_image_selects_pixel_dims() {
        let (w, h) = merge_page_size(800, 600);
        assert!((w - 600.0).abs() < 0.01); // 800 px * 0.75
        assert!((h - 450.0).abs() < 0.01);
    }

    #[test]
    fn square_first_image_selects_pixel_dims() {
        // Square is not portrait: it gets its own page, not A4.
        let (w, h) = merge_page_size(500, 500);
        assert!((w - 375.0).abs() < 0.01);
        assert!((h - 375.0).abs() < 0.01);
    }

    #[test]
    fn placement_fills_page_and_centers() {
        let (page_w, page_h) = merge_page_size(600, 800);
        let (x, y, scale) = merge_placement(page_w, page_h, 600, 800);
        let draw_w = 600.0 * PX_TO_PT * scale;
        let draw_h = 800.0 * PX_TO_PT * scale;
        assert!(draw_w <= page_w + 0.01);
        assert!(draw_h <= page_h + 0.01);
        // Scaled to the page's limiting dimension, no margin band.
        assert!((draw_w - page_w).abs() < 0.01 || (draw_h - page_h).abs() < 0.01);
        assert!((x * 2.0 + draw_w - page_w).abs() < 0.01);
        assert!((y * 2.0 + draw_h - page_h).abs() < 0.01);
    }

    #[test]
    fn merged_document_pages_follow_entry_order() {
        let dir = tempfile::tempdir().unwrap();
        // Different pixel sizes give each page a distinct draw scale, which
        // identifies the source image per page.
        let big = write_png(dir.path(), "big.png", 100, 200);
        let small = write_png(dir.path(), "small.png", 40, 80);

        let entries = vec![
            ("big.png".to_string(), big),
            ("small.png".to_string(), small),
        ];
        let (doc, report) = build_merged_document(&entries);
        assert_eq!(report.added, 2);
        assert_eq!(doc.pages.len(), 2);

        let scale_of = |page: &printpdf::PdfPage| {
            page.ops
                .iter()
                .find_map(|op| match op {
                    Op::UseXobject { transform, .. } => transform.scale_x,
                    _ => None,
                })
                .unwrap()
        };
        // The smaller image needs the larger scale to fill the same page;
        // swapped page order would invert the comparison.
        assert!(scale_of(&doc.pages[0]) < scale_of(&doc.pages[1]));
    }

    #[test]
    fn image_to_pdf_produces_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_png(dir.path(), "a.png", 64, 48);
        let output = dir.path().join("a.pdf");
        image_to_pdf(&input, &output).unwrap();
        assert!(std::fs::read(&output).unwrap().starts_with(b"%PDF"));
    }

    #[test]
    fn merge_preserves_order_and_skips_bad_members() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_png(dir.path(), "a.png", 100, 200);
        let broken = dir.path().join("b.png");
        std::fs::write(&broken, b"not an image").unwrap();
        let c = write_png(dir.path(), "c.png", 80, 160);

        let entries = vec![
            ("a.png".to_string(), a),
            ("b.png".to_string(), broken),
            ("c.png".to_string(), c),
        ];
        let output = dir.path().join("merged.pdf");
        let report = merge_images_to_pdf(&entries, &output).unwrap();

        assert_eq!(report.added, 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].0, "b.png");
        assert!(output.exists());
    }

    #[test]
    fn merge_of_nothing_usable_writes_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("x.png");
        std::fs::write(&broken, b"junk").unwrap();
        let output = dir.path().join("merged.pdf");
        let report =
            merge_images_to_pdf(&[("x.png".to_string(), broken)], &output).unwrap();
        assert_eq!(report.added, 0);
        assert!(!output.exists());
    }
}
