use std::collections::BTreeMap;
use std::future::Future;
use std::str::FromStr;

use chthon_core::{AnalyticsRecord, RequestType, UserTier};
use uuid::Uuid;

use crate::entities::{AnyStore, from_db_int, parse_db_time, to_db_int, to_db_time};

/// Append-only log of chat requests.
pub trait AnalyticsStore: Send + Sync + 'static {
    fn insert_record(&self, record: &AnalyticsRecord) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    /// Newest first.
    fn list_records(&self) -> impl Future<Output = Result<Vec<AnalyticsRecord>, sqlx::Error>> + Send;
}

#[derive(sqlx::FromRow)]
struct AnalyticsRow {
    user_id: Option<String>,
    provider: String,
    model: String,
    request_type: String,
    cost_micros: i64,
    tokens: i64,
    processing_time_ms: i64,
    success: i64,
    error: Option<String>,
    user_tier: String,
    provider_details: Option<String>,
    request_size: Option<i64>,
    response_size: Option<i64>,
    created_at: String,
}

impl From<AnalyticsRow> for AnalyticsRecord {
    fn from(row: AnalyticsRow) -> Self {
        let provider_details = row
            .provider_details
            .and_then(|raw| {
                serde_json::from_str(&raw)
                    .map_err(|e| tracing::warn!(error = %e, "ignoring unreadable provider_details"))
                    .ok()
            })
            .unwrap_or_else(BTreeMap::new);
        AnalyticsRecord {
            request_type: RequestType::from_str(&row.request_type).unwrap_or_default(),
            user_tier: UserTier::from_str(&row.user_tier).unwrap_or_default(),
            provider: row.provider,
            model: row.model,
            timestamp: parse_db_time(&row.created_at, "analytics.created_at"),
            cost_micros: row.cost_micros,
            tokens: from_db_int(row.tokens),
            processing_time_ms: from_db_int(row.processing_time_ms),
            success: row.success != 0,
            error: row.error,
            user_id: row.user_id,
            provider_details,
            request_size: row.request_size.map(from_db_int),
            response_size: row.response_size.map(from_db_int),
        }
    }
}

impl AnalyticsStore for AnyStore {
    async fn insert_record(&self, record: &AnalyticsRecord) -> Result<(), sqlx::Error> {
        let provider_details = if record.provider_details.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&record.provider_details).map_err(|e| sqlx::Error::Encode(Box::new(e)))?)
        };
        sqlx::query(
            "INSERT INTO analytics (id, user_id, provider, model, request_type, cost_micros, tokens, \
             processing_time_ms, success, error, user_tier, provider_details, request_size, response_size, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&record.user_id)
        .bind(&record.provider)
        .bind(&record.model)
        .bind(record.request_type.as_ref())
        .bind(record.cost_micros)
        .bind(to_db_int(record.tokens))
        .bind(to_db_int(record.processing_time_ms))
        .bind(i64::from(record.success))
        .bind(&record.error)
        .bind(record.user_tier.as_ref())
        .bind(provider_details)
        .bind(record.request_size.map(to_db_int))
        .bind(record.response_size.map(to_db_int))
        .bind(to_db_time(&record.timestamp))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_records(&self) -> Result<Vec<AnalyticsRecord>, sqlx::Error> {
        let rows: Vec<AnalyticsRow> = sqlx::query_as(
            "SELECT user_id, provider, model, request_type, cost_micros, tokens, processing_time_ms, \
             success, error, user_tier, provider_details, request_size, response_size, created_at \
             FROM analytics ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(AnalyticsRecord::from).collect())
    }
}
