use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chthon_core::summarize;
use utoipa::OpenApi;

use crate::entities::AnalyticsStore;
use crate::error::ServerError;
use crate::schemas::admin::AnalyticsResponse;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_analytics), components(schemas(AnalyticsResponse)))]
pub struct AnalyticsApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/analytics", get(get_analytics))
}

#[utoipa::path(
    get,
    path = "/api/admin/analytics",
    tag = "admin",
    responses(
        (status = 200, description = "Every record plus the aggregate summary", body = AnalyticsResponse),
        (status = 401, description = "Admin key required"),
    )
)]
pub async fn get_analytics(State(state): State<Arc<AppState>>) -> Result<Json<AnalyticsResponse>, ServerError> {
    let raw_data = state.store.list_records().await?;
    let summary = summarize(&raw_data);
    Ok(Json(AnalyticsResponse { raw_data, summary }))
}
