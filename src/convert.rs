//! Top-level conversion entry points.
//!
//! [`convert_file`] dispatches on the input's extension: DOCX goes through
//! the cascade, TXT and images through their single-shot converters, and
//! ZIP through the batch handler. Everything here is blocking; the `_async`
//! wrappers exist for the server and move the work onto tokio's blocking
//! pool, since pdfium and the external engines must not run on async worker
//! threads.

use crate::batch;
use crate::capabilities::Capabilities;
use crate::cascade;
use crate::config::ConversionConfig;
use crate::error::ConvertError;
use crate::output::ConversionResult;
use crate::pipeline::{image, pdf_images, text};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const IMAGE_INPUT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "tiff"];

/// Convert a single uploaded file to its PDF (or, for ZIP input, to an
/// output archive). The output is written next to the input, named after
/// its stem.
///
/// # Errors
/// [`ConvertError::FileNotFound`] for a missing input and
/// [`ConvertError::UnsupportedInput`] for an unknown extension, both before
/// anything is written; otherwise whatever the matching converter reports.
pub fn convert_file(
    caps: &Capabilities,
    config: &ConversionConfig,
    input: &Path,
) -> Result<ConversionResult, ConvertError> {
    if !input.is_file() {
        return Err(ConvertError::FileNotFound {
            path: input.to_path_buf(),
        });
    }
    let extension = input
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let result = match extension.as_str() {
        "docx" => {
            let output = input.with_extension("pdf");
            cascade::convert_docx(caps, input, &output)
        }
        "txt" => {
            let output = input.with_extension("pdf");
            text::text_to_pdf(input, &output)?;
            ConversionResult::validate(&output, None)
        }
        ext if IMAGE_INPUT_EXTENSIONS.contains(&ext) => {
            let output = input.with_extension("pdf");
            image::image_to_pdf(input, &output)?;
            ConversionResult::validate(&output, None)
        }
        "zip" => {
            let outcome = batch::convert_zip(caps, input)?;
            info!(
                converted = outcome.converted.len(),
                skipped = outcome.skipped.len(),
                merged = outcome.merged_images.is_some(),
                "Batch finished"
            );
            ConversionResult::validate(&outcome.archive_path, None)
        }
        other => Err(ConvertError::UnsupportedInput {
            extension: other.to_string(),
        }),
    }?;

    if result.bytes < config.small_output_warn_bytes {
        warn!(
            bytes = result.bytes,
            output = %result.path.display(),
            "Suspiciously small output; returning it anyway"
        );
    }
    Ok(result)
}

/// Rasterise a PDF into page images and return the packaged archive path.
/// Thin wrapper over [`crate::pipeline::pdf_images::pdf_to_images`], using
/// a sibling directory of the input as the output area.
pub fn convert_pdf_to_images(
    config: &ConversionConfig,
    input: &Path,
) -> Result<PathBuf, ConvertError> {
    let out_dir = input.with_extension("pages");
    pdf_images::pdf_to_images(input, &out_dir, config)
}

/// [`convert_file`] on tokio's blocking pool.
#[cfg(feature = "server")]
pub async fn convert_file_async(
    caps: Capabilities,
    config: ConversionConfig,
    input: PathBuf,
) -> Result<ConversionResult, ConvertError> {
    tokio::task::spawn_blocking(move || convert_file(&caps, &config, &input))
        .await
        .map_err(|e| ConvertError::Internal(format!("Conversion task panicked: {e}")))?
}

/// [`convert_pdf_to_images`] on tokio's blocking pool.
#[cfg(feature = "server")]
pub async fn convert_pdf_to_images_async(
    config: ConversionConfig,
    input: PathBuf,
) -> Result<PathBuf, ConvertError> {
    tokio::task::spawn_blocking(move || convert_pdf_to_images(&config, &input))
        .await
        .map_err(|e| ConvertError::Internal(format!("Conversion task panicked: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_extension_is_rejected_before_any_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("payload.xyz");
        std::fs::write(&input, b"whatever").unwrap();

        let err = convert_file(&Capabilities::none(), &ConversionConfig::default(), &input)
            .unwrap_err();
        assert!(err.to_string().contains(".xyz"), "got: {err}");
        assert!(!input.with_extension("pdf").exists());
    }

    #[test]
    fn txt_converts_directly() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.txt");
        std::fs::write(&input, "a note\n").unwrap();

        let result =
            convert_file(&Capabilities::none(), &ConversionConfig::default(), &input).unwrap();
        assert!(result.bytes > 0);
        assert!(result.strategy.is_none());
        assert_eq!(result.path, dir.path().join("notes.pdf"));
    }

    #[test]
    fn image_converts_directly() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("pic.png");
        ::image::RgbImage::from_pixel(32, 32, ::image::Rgb([10, 20, 30]))
            .save(&input)
            .unwrap();

        let result =
            convert_file(&Capabilities::none(), &ConversionConfig::default(), &input).unwrap();
        assert!(result.path.ends_with("pic.pdf"));
        assert!(result.bytes > 0);
    }
}
