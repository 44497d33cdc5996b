use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::info;
use utoipa::OpenApi;

use crate::entities::UserStore;
use crate::error::ServerError;
use crate::extract::ApiJson;
use crate::schemas::admin::{AdminUsersResponse, TierUpdate, UpdateUsersRequest, UpdateUsersResponse};
use crate::schemas::user::AdminUserView;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(list_users, update_users),
    components(schemas(AdminUsersResponse, AdminUserView, UpdateUsersRequest, TierUpdate, UpdateUsersResponse))
)]
pub struct UsersApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/update", post(update_users))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "admin",
    responses(
        (status = 200, description = "All users, newest first", body = AdminUsersResponse),
        (status = 401, description = "Admin key required"),
    )
)]
pub async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<AdminUsersResponse>, ServerError> {
    let users = state.store.list_users().await?;
    Ok(Json(AdminUsersResponse { users: users.iter().map(AdminUserView::from).collect() }))
}

#[utoipa::path(
    post,
    path = "/api/admin/users/update",
    tag = "admin",
    request_body = UpdateUsersRequest,
    responses(
        (status = 200, description = "Users re-tiered", body = UpdateUsersResponse),
        (status = 400, description = "No user ids or no updates"),
        (status = 401, description = "Admin key required"),
    )
)]
pub async fn update_users(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<UpdateUsersRequest>,
) -> Result<Json<UpdateUsersResponse>, ServerError> {
    if req.user_ids.is_empty() {
        return Err(ServerError::BadRequest("No user IDs provided".into()));
    }
    let updates = req.updates.ok_or_else(|| ServerError::BadRequest("No updates provided".into()))?;
    let custom = updates.custom_limits()?;

    let updated_count = state.store.update_users_tier(&req.user_ids, updates.tier, custom.as_ref()).await?;
    info!(tier = %updates.tier, requested = req.user_ids.len(), updated_count, "users re-tiered");
    Ok(Json(UpdateUsersResponse { success: true, updated_count }))
}
