//! Error types for the converthub library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ConvertError`] — **Fatal**: the conversion cannot proceed at all
//!   (unsupported extension, unreadable input, every cascade strategy
//!   exhausted). Returned as `Err(ConvertError)` from the top-level
//!   `convert*` functions.
//!
//! * [`ItemError`] — **Non-fatal**: a single archive member failed (corrupt
//!   DOCX, undecodable image) but the rest of the batch is fine. Stored
//!   inside [`crate::output::BatchOutcome`] so callers can inspect partial
//!   success rather than losing the whole archive to one bad member.
//!
//! Strategy-level failures inside the cascade are a third, internal,
//! category: they are represented as `ConvertError` values too, but the
//! controller logs and swallows them until the chain is exhausted, at which
//! point the last one surfaces inside [`ConvertError::AllStrategiesFailed`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the converthub library.
///
/// Per-archive-member failures use [`ItemError`] and are stored in
/// [`crate::output::BatchOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The file extension is not one of the supported input formats.
    ///
    /// No fallback is attempted for unsupported input; this is reported to
    /// the caller immediately.
    #[error("Unsupported file type: '.{extension}'. Supported: .docx, .txt, .zip, .jpg, .jpeg, .png, .bmp, .gif, .tiff")]
    UnsupportedInput { extension: String },

    /// The DOCX could not be parsed into a structural model.
    #[error("Failed to parse DOCX '{path}': {detail}")]
    InvalidDocx { path: PathBuf, detail: String },

    /// The uploaded archive is not a readable ZIP.
    #[error("Failed to read ZIP archive '{path}': {detail}")]
    InvalidArchive { path: PathBuf, detail: String },

    /// An `image_format` value outside the accepted set.
    #[error("Invalid image format '{given}'. Valid choices: png, jpeg, jpg")]
    InvalidImageFormat { given: String },

    // ── Strategy errors (logged and swallowed by the cascade) ─────────────
    /// A conversion engine binary is not on the execution path.
    ///
    /// Distinct from [`ConvertError::EngineFailed`] so the cascade can tell
    /// "tool absent" apart from "tool present but the content broke it".
    #[error("Conversion engine '{engine}' not found on this host")]
    EngineMissing { engine: String },

    /// An external conversion engine ran but did not produce usable output.
    #[error("Engine '{engine}' failed: {detail}")]
    EngineFailed { engine: String, detail: String },

    /// A strategy completed without error but its output file is missing
    /// or zero bytes. Treated as a strategy failure by the controller.
    #[error("Strategy '{strategy}' produced no output at '{path}'")]
    EmptyOutput { strategy: String, path: PathBuf },

    // ── Terminal errors ───────────────────────────────────────────────────
    /// Every strategy in the cascade failed; the last error is quoted.
    #[error("All {attempts} conversion strategies failed.\nLast error: {last_error}")]
    AllStrategiesFailed { attempts: usize, last_error: String },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The manual renderer could not embed any font at all, not even the
    /// bundled one. Text output would be blank, so this aborts the render.
    #[error("No usable font could be embedded for rendering")]
    NoFontAvailable,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file or directory.
    #[error("Failed to write output '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    /// True when the error means "engine binary absent" rather than
    /// "engine present but the document broke it". Both fall through in
    /// the cascade; only the distinction is logged.
    pub fn is_missing_engine(&self) -> bool {
        matches!(self, ConvertError::EngineMissing { .. })
    }
}

/// A non-fatal error for a single archive member.
///
/// Stored in [`crate::output::BatchOutcome::skipped`] when a member fails.
/// The overall batch continues with the remaining members.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ItemError {
    /// A document member failed every conversion attempt.
    #[error("Document '{name}' failed to convert: {detail}")]
    DocumentFailed { name: String, detail: String },

    /// An image member could not be decoded or placed on a merge page.
    #[error("Image '{name}' skipped: {detail}")]
    ImageSkipped { name: String, detail: String },

    /// An archive entry could not be extracted at all.
    #[error("Entry '{name}' unreadable: {detail}")]
    EntryUnreadable { name: String, detail: String },
}
