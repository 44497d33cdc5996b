use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::schemas::user::UserSummary;

/// Request body for `POST /api/auth/signup`.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 256, message = "password must be 8 to 256 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "name must be 1 to 100 characters"))]
    pub name: String,
}

/// Request body for `POST /api/auth/login`.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Opaque bearer token for the `Authorization` header.
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct CheckEmailQuery {
    pub email: Option<String>,
}

/// How an existing account signs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SignInMethod {
    Email,
    External,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckEmailResponse {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<SignInMethod>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}
