//! Image upload to public blob storage.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use tracing::info;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::config::Config;
use crate::error::ServerError;
use crate::middleware::AuthUser;
use crate::schemas::upload::{UploadForm, UploadResponse};
use crate::state::AppState;

/// Room for multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 16 * 1024;

#[derive(OpenApi)]
#[openapi(paths(upload), components(schemas(UploadForm, UploadResponse)))]
pub struct UploadApi;

pub fn router(config: &Config) -> Router<Arc<AppState>> {
    Router::new()
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes + MULTIPART_OVERHEAD))
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

fn too_large(limit: usize) -> ServerError {
    ServerError::PayloadTooLarge(format!("File size exceeds the {} KiB limit", limit / 1024))
}

/// `<unix millis>-<random>.<ext>`
fn blob_name(ext: &str) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("{}-{}.{ext}", Utc::now().timestamp_millis(), &random[..8])
}

#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Stored; public URL returned", body = UploadResponse),
        (status = 400, description = "No file or unsupported type"),
        (status = 403, description = "Tier does not allow images"),
        (status = 413, description = "File too large"),
        (status = 503, description = "Blob storage not configured"),
    )
)]
pub async fn upload(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ServerError> {
    user.limits().check_image_allowed()?;
    let blob = state
        .blob
        .clone()
        .ok_or_else(|| ServerError::ServiceUnavailable("File storage is not configured".into()))?;
    let limit = state.config.max_upload_bytes;

    let multipart_error = |e: axum::extract::multipart::MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            too_large(limit)
        } else {
            ServerError::BadRequest(e.body_text())
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_ascii_lowercase();
        let ext = extension_for(&content_type).ok_or_else(|| {
            ServerError::BadRequest("Invalid file type. Only JPEG, PNG, GIF, and WebP are allowed".into())
        })?;
        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.len() > limit {
            return Err(too_large(limit));
        }

        let filename = blob_name(ext);
        let size = bytes.len();
        let url = blob.put(&filename, &content_type, bytes).await?;
        info!(user_id = %user.id, filename, size, "image uploaded");
        return Ok(Json(UploadResponse { url, success: true }));
    }

    Err(ServerError::BadRequest("No file provided".into()))
}
