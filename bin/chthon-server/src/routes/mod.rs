//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, per-request trace-ID injection)
//! - Optional Swagger UI / OpenAPI spec endpoint (disable with `CHTHON_ENABLE_SWAGGER=false`)
//! - Everything else nested under `/api`; admin routes additionally
//!   require the `ADMIN_KEY` bearer.

mod admin;
mod auth;
mod chat;
pub mod doc;
mod health;
mod sessions;
mod upload;
mod user;

use std::sync::Arc;

use axum::{Router, middleware};
use tower::ServiceBuilder;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::{cors_layer, trace_middleware};
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(user::router())
        .merge(sessions::router())
        .merge(chat::router())
        .merge(upload::router(&state.config))
        .nest("/admin", admin::router(state.clone()));

    let mut app = Router::new().nest("/api", api_router);

    if state.config.enable_swagger {
        app = app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", doc::get_docs()));
    }

    app.layer(
        ServiceBuilder::new()
            .layer(middleware::from_fn(trace_middleware))
            .layer(cors_layer(&state.config)),
    )
    .with_state(state)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Router test harness: in-memory store, scripted gateway and blob fakes.

    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use bytes::Bytes;
    use chrono::{Duration, Utc};
    use chthon_core::{TierLimits, UserTier};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::blob::{BlobError, BlobStore};
    use crate::config::Config;
    use crate::entities::{AuthTokenStore, UserRecord, UserStore, memory_store};
    use crate::gateway::{ChatGateway, GatewayError, GatewayReply, GatewayRequest, TokenUsage};
    use crate::state::AppState;

    pub const ADMIN_KEY: &str = "test-admin-key";

    /// Answers every request with `reply`, or a provider failure when `None`.
    pub struct FakeGateway {
        pub reply: Option<GatewayReply>,
        pub seen: Mutex<Vec<GatewayRequest>>,
    }

    impl FakeGateway {
        pub fn answering(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Some(GatewayReply {
                    text: text.to_owned(),
                    cost: 0.0005,
                    usage: TokenUsage { prompt_tokens: 20, completion_tokens: 10, total_tokens: 30 },
                    finish_reason: Some("stop".into()),
                }),
                seen: Mutex::new(Vec::new()),
            })
        }

        pub fn failing() -> Arc<Self> {
            Arc::new(Self { reply: None, seen: Mutex::new(Vec::new()) })
        }

        pub fn requests(&self) -> Vec<GatewayRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatGateway for FakeGateway {
        async fn chat(&self, request: GatewayRequest) -> Result<GatewayReply, GatewayError> {
            let provider = request.provider.to_string();
            self.seen.lock().unwrap().push(request);
            self.reply.clone().ok_or(GatewayError::Provider { provider, message: "overloaded".into() })
        }
    }

    #[derive(Default)]
    pub struct FakeBlob {
        pub stored: Mutex<Vec<(String, String, usize)>>,
    }

    #[async_trait]
    impl BlobStore for FakeBlob {
        async fn put(&self, filename: &str, content_type: &str, bytes: Bytes) -> Result<String, BlobError> {
            self.stored.lock().unwrap().push((filename.to_owned(), content_type.to_owned(), bytes.len()));
            Ok(format!("https://blob.test/{filename}"))
        }
    }

    pub struct Harness {
        pub app: Router,
        pub state: Arc<AppState>,
    }

    pub async fn harness(gateway: Option<Arc<FakeGateway>>, blob: Option<Arc<FakeBlob>>) -> Harness {
        let config = Config { admin_key: Some(ADMIN_KEY.into()), max_upload_bytes: 1024, ..Config::default() };
        harness_with(config, gateway, blob).await
    }

    pub async fn harness_with(
        config: Config,
        gateway: Option<Arc<FakeGateway>>,
        blob: Option<Arc<FakeBlob>>,
    ) -> Harness {
        let state = Arc::new(AppState {
            config: Arc::new(config),
            store: Arc::new(memory_store().await),
            gateway: gateway.map(|g| g as Arc<dyn ChatGateway>),
            blob: blob.map(|b| b as Arc<dyn BlobStore>),
        });
        Harness { app: super::build(state.clone()), state }
    }

    impl Harness {
        /// Insert a user directly and return a live bearer token for them.
        pub async fn user(&self, id: &str, tier: UserTier, tier_config: Option<TierLimits>) -> String {
            let now = Utc::now();
            self.state
                .store
                .create_user(UserRecord {
                    id: id.into(),
                    email: format!("{id}@example.com"),
                    name: id.into(),
                    image: None,
                    password_hash: None,
                    tier,
                    tier_config,
                    created_at: now,
                    updated_at: now,
                })
                .await
                .unwrap();
            self.state.store.create_token(id, Duration::hours(1)).await.unwrap().token
        }

        pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
            let resp = self.app.clone().oneshot(req).await.unwrap();
            let status = resp.status();
            let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
            let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
            (status, body)
        }

        pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
            self.send(request("GET", uri, token, None)).await
        }

        pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
            self.send(request("POST", uri, token, Some(body))).await
        }
    }

    pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }
}
