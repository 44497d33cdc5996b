use chthon_core::{AnalyticsRecord, AnalyticsSummary, ProviderId, TierLimits, UserTier};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ServerError;
use crate::schemas::user::AdminUserView;

/// Request body for `POST /api/admin/auth`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AdminAuthRequest {
    pub admin_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminUsersResponse {
    pub users: Vec<AdminUserView>,
}

/// New tier plus, for `custom`, any limits that differ from the defaults.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TierUpdate {
    pub tier: UserTier,
    pub max_tokens: Option<u32>,
    pub can_select_provider: Option<bool>,
    pub can_upload_images: Option<bool>,
    pub available_providers: Option<Vec<String>>,
}

impl TierUpdate {
    fn has_custom_fields(&self) -> bool {
        self.max_tokens.is_some()
            || self.can_select_provider.is_some()
            || self.can_upload_images.is_some()
            || self.available_providers.is_some()
    }

    /// The configuration to store, `None` unless the tier is `custom` and
    /// at least one limit was given.
    pub fn custom_limits(&self) -> Result<Option<TierLimits>, ServerError> {
        if self.tier != UserTier::Custom || !self.has_custom_fields() {
            return Ok(None);
        }
        let mut limits = TierLimits::for_tier(UserTier::Custom);
        if let Some(max_tokens) = self.max_tokens {
            if max_tokens == 0 {
                return Err(ServerError::BadRequest("max_tokens must be positive".into()));
            }
            limits.max_tokens = max_tokens;
        }
        if let Some(v) = self.can_select_provider {
            limits.can_select_provider = v;
        }
        if let Some(v) = self.can_upload_images {
            limits.can_upload_images = v;
        }
        if let Some(ids) = &self.available_providers {
            limits.available_providers = ids
                .iter()
                .map(|id| id.parse::<ProviderId>())
                .collect::<Result<_, _>>()
                .map_err(|e| ServerError::BadRequest(e.to_string()))?;
        }
        Ok(Some(limits))
    }
}

/// Request body for `POST /api/admin/users/update`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateUsersRequest {
    #[serde(default)]
    pub user_ids: Vec<String>,
    pub updates: Option<TierUpdate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateUsersResponse {
    pub success: bool,
    pub updated_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalyticsResponse {
    pub raw_data: Vec<AnalyticsRecord>,
    pub summary: AnalyticsSummary,
}

#[cfg(test)]
mod test {
    use super::*;

    fn update(tier: UserTier) -> TierUpdate {
        TierUpdate { tier, max_tokens: None, can_select_provider: None, can_upload_images: None, available_providers: None }
    }

    #[test]
    fn only_custom_tier_produces_limits() {
        let mut premium = update(UserTier::Premium);
        premium.max_tokens = Some(9000);
        assert!(premium.custom_limits().unwrap().is_none());
        assert!(update(UserTier::Custom).custom_limits().unwrap().is_none());
    }

    #[test]
    fn custom_fields_override_defaults() {
        let mut custom = update(UserTier::Custom);
        custom.max_tokens = Some(4000);
        custom.can_upload_images = Some(false);
        custom.available_providers = Some(vec!["xai/grok-2-latest".into()]);
        let limits = custom.custom_limits().unwrap().unwrap();
        assert_eq!(limits.max_tokens, 4000);
        assert!(!limits.can_upload_images);
        assert!(limits.can_select_provider);
        assert_eq!(limits.available_providers[0].as_str(), "xai/grok-2-latest");
    }

    #[test]
    fn bad_custom_fields_are_rejected() {
        let mut custom = update(UserTier::Custom);
        custom.available_providers = Some(vec!["no-slash".into()]);
        assert!(custom.custom_limits().is_err());
        let mut zero = update(UserTier::Custom);
        zero.max_tokens = Some(0);
        assert!(zero.custom_limits().is_err());
    }
}
