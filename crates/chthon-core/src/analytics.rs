//! Per-request usage records and their aggregation.
//!
//! Costs are carried as integer micro-units (millionths of a US dollar) so
//! that totals are exact and independent of record order; they are turned
//! back into dollars only in [`AnalyticsSummary`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::tier::UserTier;

const MICROS_PER_DOLLAR: f64 = 1_000_000.0;

/// Convert a dollar amount reported by the gateway to micro-units.
pub fn dollars_to_micros(cost: f64) -> i64 {
    if cost.is_finite() {
        (cost * MICROS_PER_DOLLAR).round() as i64
    } else {
        0
    }
}

pub fn micros_to_dollars(micros: i64) -> f64 {
    micros as f64 / MICROS_PER_DOLLAR
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RequestType {
    #[default]
    Text,
    Image,
}

/// Usage reported by one upstream provider for one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProviderDetail {
    pub cost_micros: i64,
    #[serde(default)]
    pub tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

impl ProviderDetail {
    /// Best available token count: total, else prompt + completion, else the
    /// plain `tokens` field.
    pub fn effective_tokens(&self) -> u64 {
        if let Some(total) = self.total_tokens.filter(|t| *t > 0) {
            return total;
        }
        let split = self.prompt_tokens.unwrap_or(0) + self.completion_tokens.unwrap_or(0);
        if split > 0 { split } else { self.tokens }
    }
}

/// One logged chat request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalyticsRecord {
    pub provider: String,
    pub model: String,
    pub request_type: RequestType,
    pub timestamp: DateTime<Utc>,
    pub cost_micros: i64,
    pub tokens: u64,
    pub processing_time_ms: u64,
    pub success: bool,
    pub error: Option<String>,
    pub user_tier: UserTier,
    /// `None` for requests that could not be tied to a user.
    pub user_id: Option<String>,
    #[serde(default)]
    pub provider_details: BTreeMap<String, ProviderDetail>,
    pub request_size: Option<u64>,
    pub response_size: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UsageStats {
    pub requests: u64,
    pub cost: f64,
    pub tokens: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProviderStats {
    pub requests: u64,
    pub cost: f64,
    pub tokens: u64,
    /// Percentage of successful requests, 0-100.
    pub success_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TypeStats {
    pub text: UsageStats,
    pub image: UsageStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalyticsSummary {
    pub total_cost: f64,
    pub total_tokens: u64,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub success_rate: f64,
    pub provider_stats: BTreeMap<String, ProviderStats>,
    pub model_stats: BTreeMap<String, UsageStats>,
    pub type_stats: TypeStats,
    pub tier_stats: BTreeMap<String, UsageStats>,
    /// Keyed by UTC date, `YYYY-MM-DD`.
    pub daily_usage: BTreeMap<String, UsageStats>,
    pub provider_details_summary: BTreeMap<String, UsageStats>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    requests: u64,
    successes: u64,
    cost_micros: i64,
    tokens: u64,
}

impl Bucket {
    fn add(&mut self, cost_micros: i64, tokens: u64, success: bool) {
        self.requests += 1;
        self.successes += u64::from(success);
        self.cost_micros += cost_micros;
        self.tokens += tokens;
    }

    fn usage(&self) -> UsageStats {
        UsageStats {
            requests: self.requests,
            cost: micros_to_dollars(self.cost_micros),
            tokens: self.tokens,
        }
    }

    fn success_rate(&self) -> f64 {
        rate(self.successes, self.requests)
    }
}

fn rate(part: u64, whole: u64) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 / whole as f64 * 100.0 }
}

fn usage_map(buckets: BTreeMap<String, Bucket>) -> BTreeMap<String, UsageStats> {
    buckets.into_iter().map(|(k, b)| (k, b.usage())).collect()
}

/// Aggregate `records` in a single pass.
///
/// The result only depends on the multiset of records, not their order.
pub fn summarize<'a, I>(records: I) -> AnalyticsSummary
where
    I: IntoIterator<Item = &'a AnalyticsRecord>,
{
    let mut total = Bucket::default();
    let mut providers: BTreeMap<String, Bucket> = BTreeMap::new();
    let mut models: BTreeMap<String, Bucket> = BTreeMap::new();
    let mut text = Bucket::default();
    let mut image = Bucket::default();
    let mut tiers: BTreeMap<String, Bucket> = BTreeMap::new();
    let mut days: BTreeMap<String, Bucket> = BTreeMap::new();
    let mut details: BTreeMap<String, Bucket> = BTreeMap::new();
    let mut details_total = Bucket::default();

    for r in records {
        let (cost, tokens, ok) = (r.cost_micros, r.tokens, r.success);
        total.add(cost, tokens, ok);
        providers.entry(r.provider.clone()).or_default().add(cost, tokens, ok);
        models.entry(r.model.clone()).or_default().add(cost, tokens, ok);
        match r.request_type {
            RequestType::Text => text.add(cost, tokens, ok),
            RequestType::Image => image.add(cost, tokens, ok),
        }
        tiers.entry(r.user_tier.to_string()).or_default().add(cost, tokens, ok);
        days.entry(r.timestamp.format("%Y-%m-%d").to_string())
            .or_default()
            .add(cost, tokens, ok);

        for (provider, detail) in &r.provider_details {
            let detail_tokens = detail.effective_tokens();
            details.entry(provider.clone()).or_default().add(detail.cost_micros, detail_tokens, true);
            details_total.add(detail.cost_micros, detail_tokens, true);
        }
    }

    // Records logged before usage was tracked per request only carry
    // provider details.
    let total_cost_micros = if total.cost_micros == 0 { details_total.cost_micros } else { total.cost_micros };
    let total_tokens = if total.tokens == 0 { details_total.tokens } else { total.tokens };

    AnalyticsSummary {
        total_cost: micros_to_dollars(total_cost_micros),
        total_tokens,
        total_requests: total.requests,
        successful_requests: total.successes,
        failed_requests: total.requests - total.successes,
        success_rate: total.success_rate(),
        provider_stats: providers
            .into_iter()
            .map(|(k, b)| {
                (
                    k,
                    ProviderStats {
                        requests: b.requests,
                        cost: micros_to_dollars(b.cost_micros),
                        tokens: b.tokens,
                        success_rate: b.success_rate(),
                    },
                )
            })
            .collect(),
        model_stats: usage_map(models),
        type_stats: TypeStats { text: text.usage(), image: image.usage() },
        tier_stats: usage_map(tiers),
        daily_usage: usage_map(days),
        provider_details_summary: usage_map(details),
    }
}
