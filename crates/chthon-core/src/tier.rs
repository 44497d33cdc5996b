//! Usage tiers and the limits attached to them.
//!
//! The static table lives in [`TierLimits::for_tier`]. Custom-tier users
//! carry their own [`TierLimits`] (set by an administrator) which replaces
//! the table entry wholesale, see [`resolve_limits`].

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

use crate::error::TierError;
use crate::provider::ProviderId;

pub const GPT_4O_MINI: &str = "openai/gpt-4o-mini";
pub const GEMINI_15_FLASH: &str = "google/gemini-1.5-flash";
pub const GROK_2_LATEST: &str = "xai/grok-2-latest";

/// A named usage plan.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserTier {
    #[default]
    Registered,
    Premium,
    Custom,
}

/// What a tier is allowed to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TierLimits {
    /// Ceiling on completion tokens per request.
    pub max_tokens: u32,
    pub can_select_provider: bool,
    pub can_upload_images: bool,
    /// Providers in preference order; the first one is the default.
    #[schema(value_type = Vec<String>)]
    pub available_providers: Vec<ProviderId>,
}

fn providers(ids: &[&str]) -> Vec<ProviderId> {
    ids.iter().filter_map(|id| id.parse().ok()).collect()
}

impl TierLimits {
    /// The statically configured limits for `tier`.
    ///
    /// `Custom` returns the defaults a custom user falls back to when no
    /// configuration has been stored for them.
    pub fn for_tier(tier: UserTier) -> Self {
        match tier {
            UserTier::Registered | UserTier::Custom => Self {
                max_tokens: 1000,
                can_select_provider: true,
                can_upload_images: true,
                available_providers: providers(&[GPT_4O_MINI, GEMINI_15_FLASH]),
            },
            UserTier::Premium => Self {
                max_tokens: 1500,
                can_select_provider: true,
                can_upload_images: true,
                available_providers: providers(&[GPT_4O_MINI, GEMINI_15_FLASH, GROK_2_LATEST]),
            },
        }
    }

    /// Pick the provider for one request.
    ///
    /// The first available provider wins unless the tier may choose and a
    /// provider was requested; a chosen provider must be on the tier's list.
    pub fn select_provider(&self, requested: Option<&ProviderId>) -> Result<ProviderId, TierError> {
        let default = self.available_providers.first().ok_or(TierError::NoProviders)?;
        let Some(requested) = requested.filter(|_| self.can_select_provider) else {
            return Ok(default.clone());
        };
        self.available_providers
            .iter()
            .find(|p| *p == requested)
            .cloned()
            .ok_or_else(|| TierError::ProviderNotAllowed(requested.to_string()))
    }

    pub fn check_image_allowed(&self) -> Result<(), TierError> {
        if self.can_upload_images {
            Ok(())
        } else {
            Err(TierError::ImagesNotAllowed)
        }
    }

    /// The completion budget for a request, never above the tier ceiling.
    pub fn clamp_max_tokens(&self, requested: Option<u32>) -> Result<u32, TierError> {
        match requested {
            Some(0) => Err(TierError::ZeroMaxTokens),
            Some(n) => Ok(n.min(self.max_tokens)),
            None => Ok(self.max_tokens),
        }
    }
}

/// Limits that apply to a user, honouring a stored custom configuration.
pub fn resolve_limits(tier: UserTier, custom_config: Option<&TierLimits>) -> TierLimits {
    match (tier, custom_config) {
        (UserTier::Custom, Some(config)) => config.clone(),
        _ => TierLimits::for_tier(tier),
    }
}
