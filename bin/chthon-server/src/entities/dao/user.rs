use chrono::{DateTime, Utc};
use chthon_core::{TierLimits, UserTier, resolve_limits};

/// A row in the `users` table.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub name: String,
    pub image: Option<String>,
    /// `None` for accounts created through an external identity provider.
    pub password_hash: Option<String>,
    pub tier: UserTier,
    /// Only meaningful for [`UserTier::Custom`].
    pub tier_config: Option<TierLimits>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn limits(&self) -> TierLimits {
        resolve_limits(self.tier, self.tier_config.as_ref())
    }
}
