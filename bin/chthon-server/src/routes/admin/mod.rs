pub mod analytics;
pub mod auth;
pub mod users;

use std::sync::Arc;

use axum::{Router, middleware};
use utoipa::OpenApi;

use crate::middleware::require_admin_key;
use crate::state::AppState;

/// Routes nested under `/api/admin`. Everything but the key check itself
/// requires the `ADMIN_KEY` bearer.
pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let guarded = Router::new()
        .merge(users::router())
        .merge(analytics::router())
        .route_layer(middleware::from_fn_with_state(state, require_admin_key));
    Router::new().merge(auth::router()).merge(guarded)
}

#[derive(OpenApi)]
#[openapi()]
pub struct AdminApi;

pub fn api_docs() -> utoipa::openapi::OpenApi {
    let mut spec = AdminApi::openapi();
    spec.merge(auth::AdminAuthApi::openapi());
    spec.merge(users::UsersApi::openapi());
    spec.merge(analytics::AnalyticsApi::openapi());
    spec
}

#[cfg(test)]
mod test {
    use axum::http::StatusCode;
    use chthon_core::UserTier;
    use serde_json::json;

    use crate::config::Config;
    use crate::routes::testing::{ADMIN_KEY, FakeGateway, harness, harness_with};

    #[tokio::test]
    async fn admin_key_guards_routes() {
        let h = harness(None, None).await;
        assert_eq!(h.get("/api/admin/users", None).await.0, StatusCode::UNAUTHORIZED);
        assert_eq!(h.get("/api/admin/users", Some("wrong")).await.0, StatusCode::UNAUTHORIZED);
        assert_eq!(h.get("/api/admin/users", Some(ADMIN_KEY)).await.0, StatusCode::OK);

        let (status, body) = h.post("/api/admin/auth", None, json!({"admin_key": ADMIN_KEY})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let (status, body) = h.post("/api/admin/auth", None, json!({"admin_key": "nope"})).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid admin key");
    }

    #[tokio::test]
    async fn unset_key_locks_everything() {
        let h = harness_with(Config::default(), None, None).await;
        assert_eq!(h.get("/api/admin/analytics", Some("")).await.0, StatusCode::UNAUTHORIZED);
        assert_eq!(h.get("/api/admin/analytics", Some("anything")).await.0, StatusCode::UNAUTHORIZED);
        let (status, _) = h.post("/api/admin/auth", None, json!({"admin_key": ""})).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn update_users_tier() {
        let h = harness(None, None).await;
        let token = h.user("u1", UserTier::Registered, None).await;
        h.user("u2", UserTier::Registered, None).await;

        let (status, body) = h.post("/api/admin/users/update", Some(ADMIN_KEY), json!({"user_ids": [], "updates": {"tier": "premium"}})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No user IDs provided");
        let (status, body) = h.post("/api/admin/users/update", Some(ADMIN_KEY), json!({"user_ids": ["u1"]})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No updates provided");

        let (status, body) = h
            .post(
                "/api/admin/users/update",
                Some(ADMIN_KEY),
                json!({"user_ids": ["u1", "ghost"], "updates": {"tier": "custom", "max_tokens": 2500}}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true, "updated_count": 1}));

        let (_, me) = h.get("/api/user/me", Some(&token)).await;
        assert_eq!(me["tier"], "custom");
        assert_eq!(me["limits"]["max_tokens"], 2500);

        let (_, listing) = h.get("/api/admin/users", Some(ADMIN_KEY)).await;
        let users = listing["users"].as_array().unwrap();
        assert_eq!(users.len(), 2);
        let u1 = users.iter().find(|u| u["id"] == "u1").unwrap();
        assert_eq!(u1["tier_config"]["max_tokens"], 2500);
        assert_eq!(u1["sign_in"], "external");
        assert!(u1.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn analytics_summarises_chat_traffic() {
        let h = harness(Some(FakeGateway::answering("fine")), None).await;
        let token = h.user("u1", UserTier::Premium, None).await;
        for _ in 0..2 {
            h.post("/api/chat", Some(&token), json!({"messages": [{"role": "user", "content": "hi"}]})).await;
        }

        let (status, body) = h.get("/api/admin/analytics", Some(ADMIN_KEY)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["raw_data"].as_array().unwrap().len(), 2);
        assert_eq!(body["summary"]["total_requests"], 2);
        assert_eq!(body["summary"]["total_tokens"], 60);
        assert_eq!(body["summary"]["tier_stats"]["premium"]["requests"], 2);
        assert_eq!(body["summary"]["provider_stats"]["openai/gpt-4o-mini"]["success_rate"], 100.0);
    }
}
