//! # converthub
//!
//! Best-effort file conversion: DOCX, TXT, images, and ZIP batches in,
//! PDF out. The reverse direction, PDF pages out as images, is also served.
//!
//! ## Why this crate?
//!
//! Faithful DOCX rendering needs a full layout engine, and the good ones
//! (LibreOffice, a TeX toolchain, a headless browser) may or may not exist
//! on the host. Rather than hard-requiring any of them, conversion walks a
//! fixed cascade of strategies from highest fidelity to lowest and takes
//! the first one that produces a non-empty PDF. The final strategy is a
//! built-in layout pass with an embedded fallback font, so a bare host
//! still gets a readable PDF instead of an error.
//!
//! ## Conversion Cascade
//!
//! ```text
//! DOCX
//!  │
//!  ├─ 1. office         LibreOffice headless (full fidelity)
//!  ├─ 2. pandoc-direct  pandoc → xelatex
//!  ├─ 3. html-bridge    pandoc/built-in HTML → chromium or fullbleed
//!  └─ 4. manual-layout  built-in printpdf layout, embedded font
//! ```
//!
//! TXT and image inputs skip the cascade and render directly; ZIP inputs
//! fan out per member (documents converted, images merged into one PDF)
//! and come back as an archive of results.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use converthub::{convert_file, Capabilities, ConversionConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let caps = Capabilities::probe();
//!     let config = ConversionConfig::default();
//!     let result = convert_file(&caps, &config, "report.docx".as_ref())?;
//!     println!("wrote {} ({} bytes)", result.path.display(), result.bytes);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | Enables the `converthub` binary and HTTP layer (axum + clap + tracing-subscriber) |
//!
//! Disable `server` when using only the library to avoid pulling in the
//! HTTP-only deps:
//! ```toml
//! converthub = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod capabilities;
pub mod cascade;
pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::convert_zip;
pub use capabilities::{Capabilities, StrategyKind};
pub use cascade::convert_docx;
pub use config::{ConversionConfig, ConversionConfigBuilder, ImageFormat};
pub use convert::{convert_file, convert_pdf_to_images};
#[cfg(feature = "server")]
pub use convert::{convert_file_async, convert_pdf_to_images_async};
pub use error::{ConvertError, ItemError};
pub use output::{BatchOutcome, ConversionResult};
