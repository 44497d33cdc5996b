//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors become a JSON body
//! `{"error": "..."}` with a matching status code.
//!
//! Database and internal errors are logged with full detail but only a
//! generic message is returned, so SQL and file paths never reach clients.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use chthon_core::TierError;

use crate::blob::BlobError;
use crate::gateway::GatewayError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("blob storage error: {0}")]
    Blob(#[from] BlobError),

    /// Missing, malformed, or expired credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but the caller's tier does not permit the action.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// A required integration (gateway key, blob token) is not configured.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match &self {
            ServerError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.clone()),
            ServerError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
            ServerError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ServerError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
            ServerError::PayloadTooLarge(m) => {
                let body = json!({ "error": m, "code": "FILE_TOO_LARGE" });
                return (StatusCode::PAYLOAD_TOO_LARGE, Json(body)).into_response();
            }
            ServerError::ServiceUnavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m.clone()),

            ServerError::Gateway(e) => {
                warn!(error = %e, "AI gateway request failed");
                (StatusCode::BAD_GATEWAY, "error from AI gateway".to_owned())
            }
            ServerError::Blob(e) => {
                warn!(error = %e, "blob upload failed");
                (StatusCode::BAD_GATEWAY, "failed to upload file".to_owned())
            }
            ServerError::Database(e) => {
                error!(error = %e, "database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_owned())
            }
            ServerError::Internal(m) => {
                error!(message = %m, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_owned())
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}

impl From<TierError> for ServerError {
    fn from(e: TierError) -> Self {
        match e {
            TierError::ZeroMaxTokens => ServerError::BadRequest(e.to_string()),
            TierError::NoProviders => ServerError::ServiceUnavailable(e.to_string()),
            _ => ServerError::Forbidden(e.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ServerError {
    fn from(e: validator::ValidationErrors) -> Self {
        ServerError::BadRequest(e.to_string())
    }
}

impl From<JsonRejection> for ServerError {
    fn from(e: JsonRejection) -> Self {
        ServerError::BadRequest(e.body_text())
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(e: serde_json::Error) -> Self {
        ServerError::Internal(format!("json: {e}"))
    }
}
