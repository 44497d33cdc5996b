//! Email/password accounts and bearer tokens.

use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng};
use argon2::Argon2;
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Duration, Utc};
use chthon_core::UserTier;
use tracing::info;
use utoipa::OpenApi;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{AuthTokenStore, UserRecord, UserStore};
use crate::error::ServerError;
use crate::extract::ApiJson;
use crate::middleware::BearerToken;
use crate::schemas::auth::{
    CheckEmailQuery, CheckEmailResponse, LoginRequest, LoginResponse, SignInMethod, SignupRequest, SuccessResponse,
};
use crate::schemas::user::UserSummary;
use crate::state::AppState;

const EXTERNAL_ACCOUNT_MESSAGE: &str =
    "This email is already registered with an external provider. Please sign in with that provider instead.";

#[derive(OpenApi)]
#[openapi(
    paths(signup, login, logout, check_email),
    components(schemas(
        SignupRequest,
        LoginRequest,
        LoginResponse,
        CheckEmailResponse,
        SignInMethod,
        SuccessResponse,
        UserSummary
    ))
)]
pub struct AuthApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/check-email", get(check_email))
}

async fn hash_password(password: String) -> Result<String, ServerError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ServerError::Internal(format!("password hashing failed: {e}")))
    })
    .await
    .map_err(|e| ServerError::Internal(format!("hashing task failed: {e}")))?
}

async fn verify_password(password: String, stored: String) -> Result<bool, ServerError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&stored)
            .map_err(|e| ServerError::Internal(format!("stored password hash is unreadable: {e}")))?;
        Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
    })
    .await
    .map_err(|e| ServerError::Internal(format!("verification task failed: {e}")))?
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Account created", body = SuccessResponse),
        (status = 400, description = "Invalid input or email already registered"),
    )
)]
pub async fn signup(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Result<Json<SuccessResponse>, ServerError> {
    req.validate()?;
    let email = normalize_email(&req.email);

    if let Some(existing) = state.store.get_user_by_email(&email).await? {
        let message = if existing.password_hash.is_some() {
            "Email already registered"
        } else {
            EXTERNAL_ACCOUNT_MESSAGE
        };
        return Err(ServerError::BadRequest(message.into()));
    }

    let now = Utc::now();
    let user = UserRecord {
        id: Uuid::new_v4().to_string(),
        email,
        name: req.name.trim().to_owned(),
        image: None,
        password_hash: Some(hash_password(req.password).await?),
        tier: UserTier::Registered,
        tier_config: None,
        created_at: now,
        updated_at: now,
    };
    let user_id = user.id.clone();
    state.store.create_user(user).await?;
    info!(user_id = %user_id, "account created");
    Ok(Json(SuccessResponse { success: true }))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 401, description = "Wrong email or password"),
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ServerError> {
    req.validate()?;
    let rejected = || ServerError::Unauthorized("Invalid email or password".into());

    let user = state.store.get_user_by_email(&req.email).await?.ok_or_else(rejected)?;
    let stored = user.password_hash.clone().ok_or_else(rejected)?;
    if !verify_password(req.password, stored).await? {
        return Err(rejected());
    }

    let token = state
        .store
        .create_token(&user.id, Duration::hours(state.config.session_ttl_hours))
        .await?;
    info!(user_id = %user.id, "signed in");
    Ok(Json(LoginResponse { token: token.token, expires_at: token.expires_at, user: UserSummary::from(&user) }))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Token revoked", body = SuccessResponse),
        (status = 401, description = "No bearer token"),
    )
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    BearerToken(token): BearerToken,
) -> Result<Json<SuccessResponse>, ServerError> {
    let revoked = state.store.delete_token(&token).await?;
    Ok(Json(SuccessResponse { success: revoked }))
}

#[utoipa::path(
    get,
    path = "/api/auth/check-email",
    tag = "auth",
    params(CheckEmailQuery),
    responses(
        (status = 200, description = "Whether the email has an account", body = CheckEmailResponse),
        (status = 400, description = "Email missing"),
    )
)]
pub async fn check_email(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CheckEmailQuery>,
) -> Result<Json<CheckEmailResponse>, ServerError> {
    let email = query
        .email
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| ServerError::BadRequest("Email is required".into()))?;

    let response = match state.store.get_user_by_email(&email).await? {
        None => CheckEmailResponse { exists: false, provider: None },
        Some(user) => CheckEmailResponse {
            exists: true,
            provider: Some(if user.password_hash.is_some() { SignInMethod::Email } else { SignInMethod::External }),
        },
    };
    Ok(Json(response))
}

#[cfg(test)]
mod test {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::routes::testing::harness;

    #[tokio::test]
    async fn signup_login_logout() {
        let h = harness(None, None).await;
        let creds = json!({"email": "Ana@Example.com", "password": "correct horse", "name": "Ana"});
        let (status, body) = h.post("/api/auth/signup", None, creds).await;
        assert_eq!(status, StatusCode::OK, "{body}");

        let (status, _) = h
            .post("/api/auth/login", None, json!({"email": "ana@example.com", "password": "wrong password"}))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = h
            .post("/api/auth/login", None, json!({"email": "ana@example.com", "password": "correct horse"}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["tier"], "registered");
        assert!(body["user"].get("password_hash").is_none());
        let token = body["token"].as_str().unwrap().to_owned();

        let (status, me) = h.get("/api/user/me", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["email"], "ana@example.com");

        let (status, body) = h.post("/api/auth/logout", Some(&token), json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let (status, _) = h.get("/api/user/me", Some(&token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn duplicate_signup_messages() {
        let h = harness(None, None).await;
        let creds = json!({"email": "ana@example.com", "password": "correct horse", "name": "Ana"});
        h.post("/api/auth/signup", None, creds.clone()).await;
        let (status, body) = h.post("/api/auth/signup", None, creds).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Email already registered");

        // Harness users have no password, like externally created accounts.
        h.user("ext", UserTier::Registered, None).await;
        let (status, body) = h
            .post("/api/auth/signup", None, json!({"email": "ext@example.com", "password": "correct horse", "name": "E"}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], EXTERNAL_ACCOUNT_MESSAGE);
    }

    #[tokio::test]
    async fn signup_validates_input() {
        let h = harness(None, None).await;
        let (status, _) = h
            .post("/api/auth/signup", None, json!({"email": "not-an-email", "password": "correct horse", "name": "A"}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = h
            .post("/api/auth/signup", None, json!({"email": "a@example.com", "password": "short", "name": "A"}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn check_email_reports_sign_in_method() {
        let h = harness(None, None).await;
        h.user("ext", UserTier::Registered, None).await;
        h.post("/api/auth/signup", None, json!({"email": "pw@example.com", "password": "correct horse", "name": "P"}))
            .await;

        let (status, _) = h.get("/api/auth/check-email", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = h.get("/api/auth/check-email?email=nobody@example.com", None).await;
        assert_eq!(body, json!({"exists": false}));
        let (_, body) = h.get("/api/auth/check-email?email=pw@example.com", None).await;
        assert_eq!(body, json!({"exists": true, "provider": "email"}));
        let (_, body) = h.get("/api/auth/check-email?email=ext@example.com", None).await;
        assert_eq!(body, json!({"exists": true, "provider": "external"}));
    }

    #[tokio::test]
    async fn logout_requires_token() {
        let h = harness(None, None).await;
        let (status, _) = h.post("/api/auth/logout", None, json!({})).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
