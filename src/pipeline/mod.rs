//! Conversion building blocks.
//!
//! Each submodule implements one converter or one cascade strategy. The
//! cascade controller ([`crate::cascade`]) and the batch handler
//! ([`crate::batch`]) compose them; nothing in here knows about HTTP.
//!
//! ## DOCX strategies, in cascade order
//!
//! ```text
//! office ──▶ pandoc ──▶ html_bridge ──▶ layout
//! (soffice)  (direct)   (HTML interm.)  (structural rebuild)
//! ```
//!
//! 1. [`office`]      — LibreOffice headless conversion, highest fidelity
//! 2. [`pandoc`]      — direct pandoc→PDF, plus the bridge's HTML step
//! 3. [`html_bridge`] — DOCX→HTML→PDF via Chromium or `fullbleed`
//! 4. [`layout`]      — manual reconstruction from [`docx`]'s model with
//!    fonts from [`fonts`]; the strategy that cannot be missing
//!
//! ## Single-shot converters
//!
//! [`text`], [`image`] and [`pdf_images`] have no fallback chain; they are
//! one library call deep and fail or succeed in one step.

pub mod docx;
pub mod fonts;
pub mod html_bridge;
pub mod image;
pub mod layout;
pub mod office;
pub mod pandoc;
pub mod pdf_images;
pub mod text;
