//! ZIP batch conversion: fan an archive's members through the single-file
//! converters and repackage the results.
//!
//! Members are classified straight from the archive's central directory, in
//! entry order, because the image-merge contract is "pages in original
//! archive order" and a filesystem walk after extraction would re-order by
//! directory layout. Documents (`.txt`, `.docx`) are converted one by one;
//! images are merged into a single `images_merged.pdf`; anything else is
//! ignored. One bad member never aborts the batch; it is recorded in the
//! outcome and skipped.
//!
//! The working directory is deliberately kept, not deleted: the output
//! archive lives inside it and is streamed to the client after this
//! function returns. The server removes staged inputs; working directories
//! are left to the host's temp cleanup.

use crate::capabilities::Capabilities;
use crate::cascade;
use crate::error::{ConvertError, ItemError};
use crate::output::BatchOutcome;
use crate::pipeline::{image, text};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use zip::write::SimpleFileOptions;

/// Name of the archive returned for a ZIP batch request.
pub const BATCH_ARCHIVE_NAME: &str = "converted_files.zip";
/// Entry name for the merged image PDF inside the output archive.
pub const MERGED_IMAGES_NAME: &str = "images_merged.pdf";

const DOCUMENT_EXTENSIONS: &[&str] = &["txt", "docx"];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "tiff"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Document,
    Image,
}

/// Classify an archive member by extension; `None` means "ignore".
fn classify(name: &str) -> Option<EntryKind> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
        Some(EntryKind::Document)
    } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(EntryKind::Image)
    } else {
        None
    }
}

/// Convert every usable member of the ZIP at `archive_path`.
///
/// Returns a [`BatchOutcome`] whose `archive_path` points at a flat
/// `converted_files.zip` holding one PDF per converted document plus, when
/// the archive contained images, one merged image PDF. Partial success is
/// success: the archive contains whatever converted.
pub fn convert_zip(caps: &Capabilities, archive_path: &Path) -> Result<BatchOutcome, ConvertError> {
    let work = tempfile::Builder::new()
        .prefix("convert-zip-")
        .tempdir()
        .map_err(|e| ConvertError::Internal(format!("tempdir: {e}")))?;
    // Keep the directory: the response is served from it.
    let work = work.keep();

    let input_dir = work.join("input");
    let output_dir = work.join("converted");
    for dir in [&input_dir, &output_dir] {
        std::fs::create_dir_all(dir).map_err(|e| ConvertError::OutputWriteFailed {
            path: dir.clone(),
            source: e,
        })?;
    }

    let mut outcome = BatchOutcome {
        archive_path: work.join(BATCH_ARCHIVE_NAME),
        converted: Vec::new(),
        skipped: Vec::new(),
        merged_images: None,
    };

    let (documents, images) = extract_members(archive_path, &input_dir, &mut outcome.skipped)?;
    info!(
        documents = documents.len(),
        images = images.len(),
        "Classified archive members"
    );

    for (name, path) in &documents {
        match convert_document(caps, name, path, &output_dir) {
            Ok(pdf_path) => outcome.converted.push((name.clone(), pdf_path)),
            Err(e) => {
                warn!("Skipping document '{name}': {e}");
                outcome.skipped.push((
                    name.clone(),
                    ItemError::DocumentFailed {
                        name: name.clone(),
                        detail: e.to_string(),
                    },
                ));
            }
        }
    }

    if !images.is_empty() {
        let merged_path = output_dir.join(MERGED_IMAGES_NAME);
        let report = image::merge_images_to_pdf(&images, &merged_path)?;
        outcome.skipped.extend(report.skipped);
        if report.added > 0 {
            outcome.merged_images = Some(merged_path);
        }
    }

    if outcome.is_empty() {
        warn!("Batch produced no output; returning empty archive");
    }
    write_output_archive(&outcome)?;
    Ok(outcome)
}

/// Extract the convertible members of the archive, preserving central
/// directory order within each class. Entries whose names escape the
/// extraction directory, and entries that fail to read, are skipped.
#[allow(clippy::type_complexity)]
fn extract_members(
    archive_path: &Path,
    input_dir: &Path,
    skipped: &mut Vec<(String, ItemError)>,
) -> Result<(Vec<(String, PathBuf)>, Vec<(String, PathBuf)>), ConvertError> {
    let file = std::fs::File::open(archive_path).map_err(|_| ConvertError::FileNotFound {
        path: archive_path.to_path_buf(),
    })?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| ConvertError::InvalidArchive {
        path: archive_path.to_path_buf(),
        detail: e.to_string(),
    })?;

    let mut documents = Vec::new();
    let mut images = Vec::new();

    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                skipped.push((
                    format!("#{index}"),
                    ItemError::EntryUnreadable {
                        name: format!("#{index}"),
                        detail: e.to_string(),
                    },
                ));
                continue;
            }
        };
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let Some(kind) = classify(&name) else {
            continue;
        };
        if entry.enclosed_name().is_none() {
            warn!("Skipping archive entry with unsafe path: {name}");
            continue;
        }

        // Flatten into the extraction directory; the index prefix keeps
        // same-named members in nested directories from colliding.
        let base = Path::new(&name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("entry{index}"));
        let dest = input_dir.join(format!("{index:04}_{base}"));

        // Stream to disk rather than buffering: the header's declared
        // uncompressed size is attacker-controlled, so it must never size
        // an allocation. A member whose stream breaks (truncation, CRC
        // mismatch) is skipped without taking the batch down.
        let mut out = std::fs::File::create(&dest).map_err(|e| ConvertError::OutputWriteFailed {
            path: dest.clone(),
            source: e,
        })?;
        if let Err(e) = std::io::copy(&mut entry, &mut out) {
            skipped.push((
                name.clone(),
                ItemError::EntryUnreadable {
                    name,
                    detail: e.to_string(),
                },
            ));
            let _ = std::fs::remove_file(&dest);
            continue;
        }

        match kind {
            EntryKind::Document => documents.push((name, dest)),
            EntryKind::Image => images.push((name, dest)),
        }
    }

    Ok((documents, images))
}

/// One document through the matching single-document converter. The output
/// name is the member's base name with a `.pdf` extension.
fn convert_document(
    caps: &Capabilities,
    name: &str,
    path: &Path,
    output_dir: &Path,
) -> Result<PathBuf, ConvertError> {
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let pdf_path = output_dir.join(format!("{stem}.pdf"));

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "docx" => {
            cascade::convert_docx(caps, path, &pdf_path)?;
        }
        "txt" => {
            text::text_to_pdf(path, &pdf_path)?;
        }
        other => {
            return Err(ConvertError::UnsupportedInput {
                extension: other.to_string(),
            })
        }
    }
    Ok(pdf_path)
}

/// Pack every produced PDF into the flat output archive.
fn write_output_archive(outcome: &BatchOutcome) -> Result<(), ConvertError> {
    let file =
        std::fs::File::create(&outcome.archive_path).map_err(|e| ConvertError::OutputWriteFailed {
            path: outcome.archive_path.clone(),
            source: e,
        })?;
    let mut writer = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut entries: Vec<&PathBuf> = outcome.converted.iter().map(|(_, p)| p).collect();
    if let Some(merged) = &outcome.merged_images {
        entries.push(merged);
    }

    for path in entries {
        let entry_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        writer
            .start_file(&entry_name, options)
            .map_err(|e| ConvertError::Internal(format!("zip entry '{entry_name}': {e}")))?;
        let bytes = std::fs::read(path).map_err(|e| ConvertError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        })?;
        writer
            .write_all(&bytes)
            .map_err(|e| ConvertError::Internal(format!("zip write '{entry_name}': {e}")))?;
    }
    writer
        .finish()
        .map_err(|e| ConvertError::Internal(format!("zip finish: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_documents_images_and_noise() {
        assert_eq!(classify("a/b/report.DOCX"), Some(EntryKind::Document));
        assert_eq!(classify("notes.txt"), Some(EntryKind::Document));
        assert_eq!(classify("photo.JPEG"), Some(EntryKind::Image));
        assert_eq!(classify("scan.tiff"), Some(EntryKind::Image));
        assert_eq!(classify("readme.md"), None);
        assert_eq!(classify("no_extension"), None);
    }

    #[test]
    fn extraction_preserves_archive_order() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("in.zip");
        let file = std::fs::File::create(&zip_path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        // Deliberately not alphabetical: order must come from the archive,
        // not from filename sorting.
        for name in ["c.png", "a.png", "b.png"] {
            writer.start_file(name, options).unwrap();
            writer.write_all(b"fake image bytes").unwrap();
        }
        writer.finish().unwrap();

        let input_dir = dir.path().join("input");
        std::fs::create_dir(&input_dir).unwrap();
        let mut skipped = Vec::new();
        let (documents, images) = extract_members(&zip_path, &input_dir, &mut skipped).unwrap();

        assert!(documents.is_empty());
        let names: Vec<&str> = images.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["c.png", "a.png", "b.png"]);
        assert!(skipped.is_empty());
    }

    #[test]
    fn member_with_broken_stream_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("in.zip");
        let file = std::fs::File::create(&zip_path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        // Stored entries so the payload bytes appear verbatim in the file.
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        writer.start_file("mangled.txt", options).unwrap();
        writer.write_all(b"PAYLOAD-TO-CORRUPT").unwrap();
        writer.start_file("intact.txt", options).unwrap();
        writer.write_all(b"survives").unwrap();
        writer.finish().unwrap();

        // Flip a payload byte so the first entry fails its CRC check when
        // its stream is drained.
        let mut bytes = std::fs::read(&zip_path).unwrap();
        let pos = bytes
            .windows(b"PAYLOAD-TO-CORRUPT".len())
            .position(|w| w == b"PAYLOAD-TO-CORRUPT")
            .unwrap();
        bytes[pos] ^= 0xFF;
        std::fs::write(&zip_path, &bytes).unwrap();

        let input_dir = dir.path().join("input");
        std::fs::create_dir(&input_dir).unwrap();
        let mut skipped = Vec::new();
        let (documents, _images) =
            extract_members(&zip_path, &input_dir, &mut skipped).unwrap();

        let names: Vec<&str> = documents.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["intact.txt"]);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].0, "mangled.txt");
        // The half-written extraction must not linger.
        assert!(!input_dir.join("0000_mangled.txt").exists());
    }
}
