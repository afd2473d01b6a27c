//! PDF to page images: rasterise each page via pdfium and package the
//! results as a ZIP.
//!
//! pdfium wraps a C++ library with thread-local state, so the async server
//! calls this through `spawn_blocking` (see [`crate::convert`]); everything
//! here is synchronous.

use crate::config::ConversionConfig;
use crate::error::ConvertError;
use pdfium_render::prelude::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;

/// Name of the archive produced for a PDF-to-images request.
pub const IMAGES_ARCHIVE_NAME: &str = "converted_images.zip";

/// Rasterise every page of `input` into `out_dir` and pack the images into
/// `converted_images.zip` inside the same directory.
///
/// Pages are named `page_001.png`, `page_002.png`, … (extension per the
/// configured format). Returns the archive path. When
/// `config.cleanup_page_images` is set, the loose page files are removed
/// after packaging.
pub fn pdf_to_images(
    input: &Path,
    out_dir: &Path,
    config: &ConversionConfig,
) -> Result<PathBuf, ConvertError> {
    std::fs::create_dir_all(out_dir).map_err(|e| ConvertError::OutputWriteFailed {
        path: out_dir.to_path_buf(),
        source: e,
    })?;

    let page_files = render_pages(input, out_dir, config)?;
    info!(pages = page_files.len(), "Rasterised PDF pages");

    let archive_path = out_dir.join(IMAGES_ARCHIVE_NAME);
    let file = std::fs::File::create(&archive_path).map_err(|e| ConvertError::OutputWriteFailed {
        path: archive_path.clone(),
        source: e,
    })?;
    let mut writer = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for page_file in &page_files {
        let name = page_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        writer
            .start_file(&name, options)
            .map_err(|e| ConvertError::Internal(format!("zip entry '{name}': {e}")))?;
        let bytes = std::fs::read(page_file).map_err(|e| ConvertError::OutputWriteFailed {
            path: page_file.clone(),
            source: e,
        })?;
        writer
            .write_all(&bytes)
            .map_err(|e| ConvertError::Internal(format!("zip write '{name}': {e}")))?;
    }
    writer
        .finish()
        .map_err(|e| ConvertError::Internal(format!("zip finish: {e}")))?;

    if config.cleanup_page_images {
        for page_file in &page_files {
            if let Err(e) = std::fs::remove_file(page_file) {
                warn!("Could not remove page image '{}': {e}", page_file.display());
            }
        }
    }

    Ok(archive_path)
}

fn render_pages(
    input: &Path,
    out_dir: &Path,
    config: &ConversionConfig,
) -> Result<Vec<PathBuf>, ConvertError> {
    let pdfium = Pdfium::default();
    let document = pdfium
        .load_pdf_from_file(input, None)
        .map_err(|e| ConvertError::CorruptPdf {
            path: input.to_path_buf(),
            detail: format!("{e:?}"),
        })?;

    let pages = document.pages();
    let total = pages.len() as usize;
    let extension = config.image_format.extension();
    let mut files = Vec::with_capacity(total);

    for idx in 0..total {
        let page = pages
            .get(idx as u16)
            .map_err(|e| ConvertError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{e:?}"),
            })?;

        // DPI to pixels: pdfium renders to a target pixel width, so derive
        // it from the page's physical width in points.
        let target_width = (page.width().value * config.raster_dpi as f32 / 72.0) as i32;
        let render_config = PdfRenderConfig::new().set_target_width(target_width.max(1));

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| ConvertError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{e:?}"),
            })?;
        let image = bitmap.as_image();

        let path = out_dir.join(format!("page_{:03}.{extension}", idx + 1));
        image
            .into_rgb8()
            .save_with_format(&path, config.image_format.to_image_format())
            .map_err(|e| ConvertError::RasterisationFailed {
                page: idx + 1,
                detail: format!("save: {e}"),
            })?;
        debug!("Wrote {}", path.display());
        files.push(path);
    }

    Ok(files)
}
