//! HTTP server binary for converthub.
//!
//! A thin shim over the library crate: parse flags, probe the host for
//! conversion engines, and serve.

use anyhow::{Context, Result};
use clap::Parser;
use converthub::server::AppState;
use converthub::{Capabilities, ConversionConfig, ImageFormat};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve on the default address
  converthub

  # Public bind, custom port
  converthub --bind 0.0.0.0 --port 9000

  # Convert a document
  curl -F "file=@report.docx" http://127.0.0.1:8080/convert -o report.pdf

  # Batch: ZIP in, ZIP of PDFs out
  curl -F "file=@bundle.zip" http://127.0.0.1:8080/convert -o converted_files.zip

  # PDF pages as JPEGs
  curl -F "file=@report.pdf" -F "image_format=jpeg" \
       http://127.0.0.1:8080/pdf-to-images -o pages.zip

CONVERSION ENGINES:
  DOCX conversion tries each available engine in order and falls back to a
  built-in renderer, so none of these are required:

    soffice / libreoffice   highest fidelity
    pandoc (+ xelatex)      good typography
    chromium / chrome       HTML print path

  Engine availability is probed once at startup and logged.

ENVIRONMENT VARIABLES:
  RUST_LOG                Tracing filter (default: info)
  CONVERTHUB_UPLOAD_DIR   Staging directory for uploads
"#;

/// Best-effort file conversion service (DOCX/TXT/images/ZIP to PDF, PDF to images).
#[derive(Parser, Debug)]
#[command(
    name = "converthub",
    version,
    about = "Best-effort file conversion HTTP service",
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Address to bind.
    #[arg(long, env = "CONVERTHUB_BIND", default_value = "127.0.0.1")]
    bind: IpAddr,

    /// Port to listen on.
    #[arg(short, long, env = "CONVERTHUB_PORT", default_value_t = 8080)]
    port: u16,

    /// Staging directory for uploads and conversion outputs.
    #[arg(long, env = "CONVERTHUB_UPLOAD_DIR", default_value = "temp_uploads")]
    upload_dir: PathBuf,

    /// Rasterisation DPI for PDF-to-images (72-600).
    #[arg(long, env = "CONVERTHUB_DPI", default_value_t = 200)]
    dpi: u32,

    /// Default page image format: png, jpeg or jpg.
    #[arg(long, env = "CONVERTHUB_IMAGE_FORMAT", default_value = "png")]
    image_format: ImageFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let caps = Capabilities::probe();
    let config = ConversionConfig::builder()
        .raster_dpi(cli.dpi)
        .image_format(cli.image_format)
        .build()
        .context("Invalid configuration")?;

    let state = Arc::new(AppState {
        caps,
        config,
        upload_dir: cli.upload_dir,
    });

    let addr = SocketAddr::new(cli.bind, cli.port);
    converthub::server::serve(addr, state)
        .await
        .context("Server failed")
}
