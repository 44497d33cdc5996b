use chrono::{DateTime, Utc};
use chthon_core::{TierLimits, UserTier};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::UserRecord;

/// Public view of an account. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub tier: UserTier,
}

impl From<&UserRecord> for UserSummary {
    fn from(u: &UserRecord) -> Self {
        Self { id: u.id.clone(), email: u.email.clone(), name: u.name.clone(), image: u.image.clone(), tier: u.tier }
    }
}

/// Response body for `GET /api/user/me`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: UserSummary,
    /// Effective limits after any custom configuration is applied.
    pub limits: TierLimits,
}

/// Response body for `GET /api/user/config`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserConfigResponse {
    pub tier: UserTier,
    pub tier_config: Option<TierLimits>,
}

/// One row of `GET /api/admin/users`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminUserView {
    #[serde(flatten)]
    pub user: UserSummary,
    pub tier_config: Option<TierLimits>,
    /// `email` for password accounts, `external` otherwise.
    pub sign_in: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&UserRecord> for AdminUserView {
    fn from(u: &UserRecord) -> Self {
        Self {
            user: UserSummary::from(u),
            tier_config: u.tier_config.clone(),
            sign_in: if u.password_hash.is_some() { "email" } else { "external" }.to_owned(),
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}
