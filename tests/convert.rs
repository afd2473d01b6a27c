//! End-to-end conversion tests.
//!
//! All fixtures are generated in-test (docx-rs for documents, the image
//! crate for bitmaps, the zip crate for archives), so nothing here touches
//! the network. The docx path runs on a bare host: with no external engine
//! installed the cascade bottoms out at the built-in layout renderer.

use converthub::{convert_file, convert_zip, Capabilities, ConversionConfig, ConvertError};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;

// ── Fixture builders ─────────────────────────────────────────────────────

fn write_docx(path: &Path) {
    let file = File::create(path).unwrap();
    docx_rs::Docx::new()
        .add_paragraph(
            docx_rs::Paragraph::new()
                .add_run(docx_rs::Run::new().add_text("Quarterly Report"))
                .style("Heading1"),
        )
        .add_paragraph(
            docx_rs::Paragraph::new()
                .add_run(docx_rs::Run::new().add_text("Revenue held steady across all regions.")),
        )
        .build()
        .pack(file)
        .unwrap();
}

fn write_png(path: &Path) {
    ::image::RgbImage::from_pixel(40, 24, ::image::Rgb([200, 60, 60]))
        .save_with_format(path, ::image::ImageFormat::Png)
        .unwrap();
}

fn assert_pdf(path: &Path) {
    let bytes = std::fs::read(path).unwrap();
    assert!(
        bytes.starts_with(b"%PDF"),
        "{} is not a PDF",
        path.display()
    );
}

fn archive_entries(path: &Path) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

// ── Direct conversions ───────────────────────────────────────────────────

#[test]
fn docx_converts_on_a_bare_host() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("report.docx");
    write_docx(&input);

    let result = convert_file(&Capabilities::probe(), &ConversionConfig::default(), &input)
        .unwrap();

    assert_eq!(result.path, dir.path().join("report.pdf"));
    assert!(result.bytes > 0);
    assert!(result.strategy.is_some());
    assert_pdf(&result.path);
}

#[test]
fn txt_converts_without_any_engine() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("notes.txt");
    std::fs::write(&input, "line one\nline two\n").unwrap();

    let result = convert_file(&Capabilities::none(), &ConversionConfig::default(), &input)
        .unwrap();
    assert_pdf(&result.path);
}

#[test]
fn png_converts_to_single_page_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("photo.png");
    write_png(&input);

    let result = convert_file(&Capabilities::none(), &ConversionConfig::default(), &input)
        .unwrap();
    assert_pdf(&result.path);
}

#[test]
fn unsupported_extension_is_rejected_before_any_write() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("data.xyz");
    std::fs::write(&input, b"opaque").unwrap();

    let err = convert_file(&Capabilities::none(), &ConversionConfig::default(), &input)
        .unwrap_err();
    assert!(matches!(err, ConvertError::UnsupportedInput { .. }));
    assert!(!dir.path().join("data.pdf").exists());
}

// ── Batch conversion ─────────────────────────────────────────────────────

fn write_batch_zip(path: &Path, members: &[(&str, &[u8])]) {
    let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default();
    for (name, bytes) in members {
        writer.start_file(*name, options).unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap();
}

#[test]
fn batch_skips_bad_members_and_converts_the_rest() {
    let dir = tempfile::tempdir().unwrap();

    // Build real member fixtures first, then pack them.
    let docx_path = dir.path().join("good.docx");
    write_docx(&docx_path);
    let png_path = dir.path().join("chart.png");
    write_png(&png_path);
    let docx_bytes = std::fs::read(&docx_path).unwrap();
    let png_bytes = std::fs::read(&png_path).unwrap();

    let archive = dir.path().join("bundle.zip");
    write_batch_zip(
        &archive,
        &[
            ("broken.docx", b"this is not a word document".as_slice()),
            ("readme.txt", b"plain text member\n".as_slice()),
            ("good.docx", docx_bytes.as_slice()),
            ("chart.png", png_bytes.as_slice()),
            ("ignored.dat", b"unclassified".as_slice()),
        ],
    );

    let outcome = convert_zip(&Capabilities::probe(), &archive).unwrap();

    let converted: Vec<&str> = outcome.converted.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(converted.len(), 2, "txt and good docx: {converted:?}");
    assert!(converted.iter().any(|n| n.contains("readme.txt")));
    assert!(converted.iter().any(|n| n.contains("good.docx")));

    assert_eq!(outcome.skipped.len(), 1, "only the broken docx is skipped");
    let merged = outcome.merged_images.as_ref().expect("png should merge");
    assert_pdf(merged);

    // The response archive holds every success plus the merged image PDF.
    let entries = archive_entries(&outcome.archive_path);
    assert_eq!(entries.len(), 3, "entries: {entries:?}");
    assert!(entries.iter().any(|e| e.ends_with("images_merged.pdf")));
    for (_, pdf) in &outcome.converted {
        assert_pdf(pdf);
    }
}

#[test]
fn images_only_zip_yields_just_the_merged_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let png_path = dir.path().join("a.png");
    write_png(&png_path);
    let png_bytes = std::fs::read(&png_path).unwrap();

    let archive = dir.path().join("images.zip");
    write_batch_zip(
        &archive,
        &[
            ("one.png", png_bytes.as_slice()),
            ("two.png", png_bytes.as_slice()),
        ],
    );

    let outcome = convert_zip(&Capabilities::none(), &archive).unwrap();
    assert!(outcome.converted.is_empty());
    assert!(outcome.merged_images.is_some());

    let entries = archive_entries(&outcome.archive_path);
    assert_eq!(entries, vec!["images_merged.pdf".to_string()]);
}

#[test]
fn zip_dispatch_through_convert_file_returns_the_archive() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("docs.zip");
    write_batch_zip(&archive, &[("memo.txt", b"one member\n".as_slice())]);

    let result = convert_file(&Capabilities::none(), &ConversionConfig::default(), &archive)
        .unwrap();
    assert!(result.bytes > 0);
    assert!(result
        .path
        .file_name()
        .is_some_and(|n| n == "converted_files.zip"));
}

#[test]
fn corrupt_zip_is_an_invalid_archive_error() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("bad.zip");
    std::fs::write(&archive, b"PK\x03\x04 truncated garbage").unwrap();

    let err = convert_zip(&Capabilities::none(), &archive).unwrap_err();
    assert!(matches!(err, ConvertError::InvalidArchive { .. }));
}

#[test]
fn missing_input_is_file_not_found() {
    let err = convert_file(
        &Capabilities::none(),
        &ConversionConfig::default(),
        PathBuf::from("/nonexistent/thing.docx").as_path(),
    )
    .unwrap_err();
    assert!(matches!(err, ConvertError::FileNotFound { .. }));
}
