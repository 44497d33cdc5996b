//! The signed-in user's own profile and limits.

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::middleware::AuthUser;
use crate::schemas::user::{MeResponse, UserConfigResponse, UserSummary};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_me, get_user_config), components(schemas(MeResponse, UserConfigResponse)))]
pub struct UserApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/user/me", get(get_me))
        .route("/user/config", get(get_user_config))
}

#[utoipa::path(
    get,
    path = "/api/user/me",
    tag = "user",
    responses(
        (status = 200, description = "Profile with effective limits", body = MeResponse),
        (status = 401, description = "Not signed in"),
    )
)]
pub async fn get_me(AuthUser { user, .. }: AuthUser) -> Result<Json<MeResponse>, ServerError> {
    Ok(Json(MeResponse { user: UserSummary::from(&user), limits: user.limits() }))
}

#[utoipa::path(
    get,
    path = "/api/user/config",
    tag = "user",
    responses(
        (status = 200, description = "Tier and any stored custom configuration", body = UserConfigResponse),
        (status = 401, description = "Not signed in"),
    )
)]
pub async fn get_user_config(AuthUser { user, .. }: AuthUser) -> Result<Json<UserConfigResponse>, ServerError> {
    Ok(Json(UserConfigResponse { tier: user.tier, tier_config: user.tier_config }))
}

#[cfg(test)]
mod test {
    use axum::http::StatusCode;
    use chthon_core::{TierLimits, UserTier};

    use crate::routes::testing::harness;

    #[tokio::test]
    async fn me_reports_resolved_limits() {
        let h = harness(None, None).await;
        let premium = h.user("p", UserTier::Premium, None).await;
        let (status, body) = h.get("/api/user/me", Some(&premium)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tier"], "premium");
        assert_eq!(body["limits"]["max_tokens"], 1500);
        assert_eq!(body["limits"]["available_providers"].as_array().unwrap().len(), 3);

        let config = TierLimits { max_tokens: 64, ..TierLimits::for_tier(UserTier::Custom) };
        let custom = h.user("c", UserTier::Custom, Some(config)).await;
        let (_, body) = h.get("/api/user/me", Some(&custom)).await;
        assert_eq!(body["limits"]["max_tokens"], 64);
        let (_, body) = h.get("/api/user/config", Some(&custom)).await;
        assert_eq!(body["tier"], "custom");
        assert_eq!(body["tier_config"]["max_tokens"], 64);
    }

    #[tokio::test]
    async fn requires_a_valid_token() {
        let h = harness(None, None).await;
        assert_eq!(h.get("/api/user/me", None).await.0, StatusCode::UNAUTHORIZED);
        assert_eq!(h.get("/api/user/config", Some("forged")).await.0, StatusCode::UNAUTHORIZED);
    }
}
