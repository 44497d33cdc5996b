use std::future::Future;
use std::str::FromStr;

use chrono::Utc;
use chthon_core::{TierLimits, UserTier};

use crate::entities::{AnyStore, dao::UserRecord, parse_db_time, to_db_time};

pub trait UserStore: Send + Sync + 'static {
    fn create_user(&self, user: UserRecord) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn get_user(&self, id: &str) -> impl Future<Output = Result<Option<UserRecord>, sqlx::Error>> + Send;
    fn get_user_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<UserRecord>, sqlx::Error>> + Send;
    fn list_users(&self) -> impl Future<Output = Result<Vec<UserRecord>, sqlx::Error>> + Send;
    /// Re-tier every user in `ids`; returns how many rows matched.
    fn update_users_tier(
        &self,
        ids: &[String],
        tier: UserTier,
        tier_config: Option<&TierLimits>,
    ) -> impl Future<Output = Result<u64, sqlx::Error>> + Send;
}

type UserRow = (
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    Option<String>,
    String,
    String,
);

const USER_COLUMNS: &str =
    "id, email, name, image, password_hash, tier, tier_config, created_at, updated_at";

fn from_row(
    (id, email, name, image, password_hash, tier, tier_config, created_at, updated_at): UserRow,
) -> UserRecord {
    let tier = UserTier::from_str(&tier).unwrap_or_else(|_| {
        tracing::warn!(user_id = %id, raw = %tier, "unknown stored tier; treating as registered");
        UserTier::Registered
    });
    let tier_config = tier_config.and_then(|raw| {
        serde_json::from_str::<TierLimits>(&raw)
            .map_err(|e| tracing::warn!(user_id = %id, error = %e, "ignoring unreadable tier_config"))
            .ok()
    });
    UserRecord {
        id,
        email,
        name,
        image,
        password_hash,
        tier,
        tier_config,
        created_at: parse_db_time(&created_at, "users.created_at"),
        updated_at: parse_db_time(&updated_at, "users.updated_at"),
    }
}

fn encode_config(config: Option<&TierLimits>) -> Result<Option<String>, sqlx::Error> {
    config
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

impl UserStore for AnyStore {
    async fn create_user(&self, user: UserRecord) -> Result<(), sqlx::Error> {
        let tier_config = encode_config(user.tier_config.as_ref())?;
        sqlx::query(
            "INSERT INTO users (id, email, name, image, password_hash, tier, tier_config, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.image)
        .bind(&user.password_hash)
        .bind(user.tier.as_ref())
        .bind(&tier_config)
        .bind(to_db_time(&user.created_at))
        .bind(to_db_time(&user.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_user(&self, id: &str) -> Result<Option<UserRecord>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(from_row))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                .bind(email.trim().to_lowercase())
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(from_row))
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, sqlx::Error> {
        let rows: Vec<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"))
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(from_row).collect())
    }

    async fn update_users_tier(
        &self,
        ids: &[String],
        tier: UserTier,
        tier_config: Option<&TierLimits>,
    ) -> Result<u64, sqlx::Error> {
        // Non-custom tiers never carry a stored configuration.
        let tier_config = match tier {
            UserTier::Custom => encode_config(tier_config)?,
            _ => None,
        };
        let updated_at = to_db_time(&Utc::now());

        let mut tx = self.pool.begin().await?;
        let mut updated = 0;
        for id in ids {
            let result = sqlx::query(
                "UPDATE users SET tier = $1, tier_config = $2, updated_at = $3 WHERE id = $4",
            )
            .bind(tier.as_ref())
            .bind(&tier_config)
            .bind(&updated_at)
            .bind(id)
            .execute(&mut *tx)
            .await?;
            updated += result.rows_affected();
        }
        tx.commit().await?;
        Ok(updated)
    }
}
