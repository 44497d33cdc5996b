//! Request extractors whose rejections use the uniform error body.

use axum::extract::FromRequest;

use crate::error::ServerError;

/// `axum::Json` that rejects malformed or incomplete bodies with a 400
/// `{"error": …}` instead of axum's plain-text 422.
#[derive(Debug, Clone, FromRequest)]
#[from_request(via(axum::Json), rejection(ServerError))]
pub struct ApiJson<T>(pub T);
