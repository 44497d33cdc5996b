use std::sync::Arc;

use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::{Request, header, request::Parts};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Duration;
use tracing::debug;

use crate::entities::{AuthTokenStore, UserRecord, UserStore};
use crate::error::ServerError;
use crate::state::AppState;

fn bearer(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Guard for `/api/admin`: the bearer must equal `ADMIN_KEY`.
///
/// With no key configured every request is refused.
pub async fn require_admin_key(State(state): State<Arc<AppState>>, req: Request<Body>, next: Next) -> Response {
    let (parts, body) = req.into_parts();
    let authorised = matches!(
        (state.config.admin_key.as_deref(), bearer(&parts)),
        (Some(expected), Some(provided)) if expected == provided
    );
    if !authorised {
        debug!(path = %parts.uri.path(), "admin request rejected");
        return ServerError::Unauthorized("Unauthorized".into()).into_response();
    }
    next.run(Request::from_parts(parts, body)).await
}

/// The raw bearer token of the request, 401 when absent.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        bearer(parts)
            .map(|t| BearerToken(t.to_owned()))
            .ok_or_else(|| ServerError::Unauthorized("Unauthorized".into()))
    }
}

/// The signed-in user behind `Authorization: Bearer <token>`.
///
/// Resolving the extractor also slides the token's expiry forward.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: UserRecord,
    pub token: String,
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let ttl = Duration::hours(state.config.session_ttl_hours);
        let unauthorized = || ServerError::Unauthorized("Unauthorized".into());

        let session = state.store.validate_token(&token, ttl).await?.ok_or_else(unauthorized)?;
        let user = state.store.get_user(&session.user_id).await?.ok_or_else(unauthorized)?;
        Ok(AuthUser { user, token })
    }
}
