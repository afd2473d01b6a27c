//! Configuration types for file conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across requests, serialise them for logging,
//! and diff two runs to understand why their outputs differ.

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Configuration for a conversion request.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use converthub::{ConversionConfig, ImageFormat};
///
/// let config = ConversionConfig::builder()
///     .raster_dpi(300)
///     .image_format(ImageFormat::Jpeg)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Rasterisation DPI for PDF-to-images conversion. Range: 72–600. Default: 200.
    ///
    /// 200 DPI keeps text legible in the exported page images without the
    /// memory cost of print-resolution renders. Raise it for small-font
    /// documents; 72 matches on-screen size.
    pub raster_dpi: u32,

    /// Output raster format for PDF-to-images conversion. Default: PNG.
    pub image_format: ImageFormat,

    /// Delete the loose per-page image files after they have been packed
    /// into the output archive. Default: true.
    ///
    /// Set to false when the caller wants to inspect individual pages in the
    /// working directory after the archive is built.
    pub cleanup_page_images: bool,

    /// Outputs smaller than this many bytes are logged as suspicious.
    /// Default: 1000.
    ///
    /// Heuristic only: a tiny PDF usually means an engine silently produced
    /// an empty shell. The output is still returned as success.
    pub small_output_warn_bytes: u64,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            raster_dpi: 200,
            image_format: ImageFormat::Png,
            cleanup_page_images: true,
            small_output_warn_bytes: 1000,
        }
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn raster_dpi(mut self, dpi: u32) -> Self {
        self.config.raster_dpi = dpi.clamp(72, 600);
        self
    }

    pub fn image_format(mut self, format: ImageFormat) -> Self {
        self.config.image_format = format;
        self
    }

    pub fn cleanup_page_images(mut self, v: bool) -> Self {
        self.config.cleanup_page_images = v;
        self
    }

    pub fn small_output_warn_bytes(mut self, bytes: u64) -> Self {
        self.config.small_output_warn_bytes = bytes;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConvertError> {
        let c = &self.config;
        if c.raster_dpi < 72 || c.raster_dpi > 600 {
            return Err(ConvertError::InvalidConfig(format!(
                "raster DPI must be 72–600, got {}",
                c.raster_dpi
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Raster format for exported PDF pages.
///
/// `jpg` is accepted as an alias for JPEG on parse; the canonical extension
/// written to disk is `jpg` for either spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageFormat {
    /// Lossless; larger files. (default)
    #[default]
    Png,
    /// Lossy; smaller files, fine for text at 200 DPI.
    Jpeg,
}

impl ImageFormat {
    /// File extension for page images, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }

    /// The `image` crate's output format for this variant.
    pub fn to_image_format(self) -> image::ImageFormat {
        match self {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

impl FromStr for ImageFormat {
    type Err = ConvertError;

    /// Case-insensitive; accepts `png`, `jpeg` and `jpg`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            other => Err(ConvertError::InvalidImageFormat {
                given: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
