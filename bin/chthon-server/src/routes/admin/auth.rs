use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use tracing::warn;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::extract::ApiJson;
use crate::schemas::admin::AdminAuthRequest;
use crate::schemas::auth::SuccessResponse;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(admin_auth), components(schemas(AdminAuthRequest)))]
pub struct AdminAuthApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/auth", post(admin_auth))
}

/// Check an admin key without touching any admin data.
#[utoipa::path(
    post,
    path = "/api/admin/auth",
    tag = "admin",
    request_body = AdminAuthRequest,
    responses(
        (status = 200, description = "Key accepted", body = SuccessResponse),
        (status = 401, description = "Invalid admin key"),
    )
)]
pub async fn admin_auth(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<AdminAuthRequest>,
) -> Result<Json<SuccessResponse>, ServerError> {
    match state.config.admin_key.as_deref() {
        Some(expected) if expected == req.admin_key => Ok(Json(SuccessResponse { success: true })),
        _ => {
            warn!("rejected admin key");
            Err(ServerError::Unauthorized("Invalid admin key".into()))
        }
    }
}
