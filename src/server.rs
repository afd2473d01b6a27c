//! HTTP surface: multipart upload in, converted file out.
//!
//! Three routes plus a health probe:
//!
//! * `POST /convert` and `POST /convert-to-pdf` — multipart `file` field;
//!   responds with the converted PDF (or batch archive) as an attachment.
//! * `POST /pdf-to-images` — multipart `file` plus optional `image_format`
//!   text field; responds with a ZIP of page images.
//! * `GET /health` — liveness.
//!
//! Uploads are staged under `{upload_dir}/{uuid}_{filename}` and the staged
//! input is deleted after the request on every path, success or failure.
//! Errors are JSON bodies of the shape `{"detail": …}`: 400 for client
//! mistakes (unsupported extension, bad format value, malformed multipart),
//! 500 for conversion failures.

use crate::capabilities::Capabilities;
use crate::config::{ConversionConfig, ImageFormat};
use crate::convert::{convert_file_async, convert_pdf_to_images_async};
use crate::error::ConvertError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

/// Maximum accepted upload size.
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

const SUPPORTED_EXTENSIONS: &[&str] =
    &["docx", "txt", "zip", "jpg", "jpeg", "png", "bmp", "gif", "tiff"];

/// Shared per-process state: the startup capability probe, the conversion
/// config, and the staging directory.
pub struct AppState {
    pub caps: Capabilities,
    pub config: ConversionConfig,
    pub upload_dir: PathBuf,
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/convert", post(convert))
        .route("/convert-to-pdf", post(convert))
        .route("/pdf-to-images", post(pdf_to_images))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> Result<(), ConvertError> {
    tokio::fs::create_dir_all(&state.upload_dir)
        .await
        .map_err(|e| ConvertError::OutputWriteFailed {
            path: state.upload_dir.clone(),
            source: e,
        })?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ConvertError::Internal(format!("bind {addr}: {e}")))?;
    info!("Listening on http://{addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ConvertError::Internal(format!("server: {e}")))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}

// ── Error mapping ────────────────────────────────────────────────────────

/// JSON error response: `{"detail": …}` with an HTTP status.
struct ApiError(StatusCode, String);

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self(StatusCode::BAD_REQUEST, detail.into())
    }
}

impl From<ConvertError> for ApiError {
    fn from(e: ConvertError) -> Self {
        let status = match e {
            ConvertError::UnsupportedInput { .. } | ConvertError::InvalidImageFormat { .. } => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Conversion failed: {e}");
        }
        Self(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "detail": self.1 }))).into_response()
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

struct Upload {
    filename: String,
    bytes: Vec<u8>,
    image_format: Option<String>,
}

/// Pull the `file` field (and an optional `image_format` text field) out of
/// the multipart body.
async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    let mut filename = None;
    let mut bytes = None;
    let mut image_format = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("file") => {
                let name = field
                    .file_name()
                    .map(ToString::to_string)
                    .ok_or_else(|| ApiError::bad_request("File field is missing a filename"))?;
                // Base name only: the client does not get to pick paths.
                filename = Path::new(&name)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned());
                bytes = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Upload read failed: {e}")))?
                        .to_vec(),
                );
            }
            Some("image_format") => {
                image_format = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Bad image_format field: {e}")))?,
                );
            }
            _ => {}
        }
    }

    match (filename, bytes) {
        (Some(filename), Some(bytes)) => Ok(Upload {
            filename,
            bytes,
            image_format,
        }),
        _ => Err(ApiError::bad_request("Missing 'file' field in upload")),
    }
}

fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Write the upload under a uuid-prefixed name in the staging directory.
async fn stage(state: &AppState, upload: &Upload) -> Result<PathBuf, ApiError> {
    tokio::fs::create_dir_all(&state.upload_dir)
        .await
        .map_err(|e| ApiError::from(ConvertError::OutputWriteFailed {
            path: state.upload_dir.clone(),
            source: e,
        }))?;
    let staged = state
        .upload_dir
        .join(format!("{}_{}", Uuid::new_v4(), upload.filename));
    tokio::fs::write(&staged, &upload.bytes)
        .await
        .map_err(|e| ApiError::from(ConvertError::OutputWriteFailed {
            path: staged.clone(),
            source: e,
        }))?;
    Ok(staged)
}

fn attachment_response(bytes: Vec<u8>, filename: &str) -> Response {
    let content_type = if filename.ends_with(".zip") {
        "application/zip"
    } else {
        "application/pdf"
    };
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

async fn convert(State(state): State<Arc<AppState>>, multipart: Multipart) -> Result<Response, ApiError> {
    let upload = read_upload(multipart).await?;
    let extension = extension_of(&upload.filename);

    // Reject before staging: an unsupported upload never touches disk.
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ApiError::from(ConvertError::UnsupportedInput { extension }));
    }

    let staged = stage(&state, &upload).await?;
    let result = convert_file_async(state.caps.clone(), state.config.clone(), staged.clone()).await;
    // The staged input goes away regardless of how conversion fared.
    let _ = tokio::fs::remove_file(&staged).await;
    let result = result?;

    let bytes = tokio::fs::read(&result.path)
        .await
        .map_err(|e| ApiError::from(ConvertError::OutputWriteFailed {
            path: result.path.clone(),
            source: e,
        }))?;
    let _ = tokio::fs::remove_file(&result.path).await;

    let download_name = if extension == "zip" {
        crate::batch::BATCH_ARCHIVE_NAME.to_string()
    } else {
        let stem = Path::new(&upload.filename)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "converted".to_string());
        format!("{stem}.pdf")
    };
    Ok(attachment_response(bytes, &download_name))
}

async fn pdf_to_images(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let upload = read_upload(multipart).await?;
    if extension_of(&upload.filename) != "pdf" {
        return Err(ApiError::bad_request(
            "Only PDF input is supported on this endpoint",
        ));
    }

    let mut config = state.config.clone();
    if let Some(format) = &upload.image_format {
        config.image_format = format.parse::<ImageFormat>().map_err(ApiError::from)?;
    }

    let staged = stage(&state, &upload).await?;
    let result = convert_pdf_to_images_async(config, staged.clone()).await;
    let _ = tokio::fs::remove_file(&staged).await;
    let archive_path = result?;

    let bytes = tokio::fs::read(&archive_path)
        .await
        .map_err(|e| ApiError::from(ConvertError::OutputWriteFailed {
            path: archive_path.clone(),
            source: e,
        }))?;
    if let Some(pages_dir) = archive_path.parent() {
        let _ = tokio::fs::remove_dir_all(pages_dir).await;
    }
    Ok(attachment_response(
        bytes,
        crate::pipeline::pdf_images::IMAGES_ARCHIVE_NAME,
    ))
}
