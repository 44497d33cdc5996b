use std::future::Future;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::entities::{AnyStore, dao::AuthToken, parse_db_time, to_db_time};

/// Opaque bearer tokens with a sliding expiry.
pub trait AuthTokenStore: Send + Sync + 'static {
    fn create_token(
        &self,
        user_id: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<AuthToken, sqlx::Error>> + Send;
    /// Look up a live token and push its expiry out by `ttl`.
    ///
    /// Expired tokens are deleted and reported as absent.
    fn validate_token(
        &self,
        token: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<Option<AuthToken>, sqlx::Error>> + Send;
    fn delete_token(&self, token: &str) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
}

impl AuthTokenStore for AnyStore {
    async fn create_token(&self, user_id: &str, ttl: Duration) -> Result<AuthToken, sqlx::Error> {
        let created_at = Utc::now();
        let token = AuthToken {
            token: Uuid::new_v4().to_string(),
            user_id: user_id.to_owned(),
            created_at,
            expires_at: created_at + ttl,
        };
        sqlx::query(
            "INSERT INTO auth_tokens (token, user_id, created_at, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&token.token)
        .bind(&token.user_id)
        .bind(to_db_time(&token.created_at))
        .bind(to_db_time(&token.expires_at))
        .execute(&self.pool)
        .await?;
        Ok(token)
    }

    async fn validate_token(&self, token: &str, ttl: Duration) -> Result<Option<AuthToken>, sqlx::Error> {
        let row: Option<(String, String, String, String)> = sqlx::query_as(
            "SELECT token, user_id, created_at, expires_at FROM auth_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        let Some((token, user_id, created_at, expires_at)) = row else {
            return Ok(None);
        };

        let now = Utc::now();
        if parse_db_time(&expires_at, "auth_tokens.expires_at") <= now {
            self.delete_token(&token).await?;
            return Ok(None);
        }

        let expires_at = now + ttl;
        sqlx::query("UPDATE auth_tokens SET expires_at = $1 WHERE token = $2")
            .bind(to_db_time(&expires_at))
            .bind(&token)
            .execute(&self.pool)
            .await?;

        Ok(Some(AuthToken {
            token,
            user_id,
            created_at: parse_db_time(&created_at, "auth_tokens.created_at"),
            expires_at,
        }))
    }

    async fn delete_token(&self, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::{UserStore, memory_store, sample_user};

    #[tokio::test]
    async fn token_lifecycle() {
        let store = memory_store().await;
        store.create_user(sample_user("u1", "a@example.com")).await.unwrap();

        let issued = store.create_token("u1", Duration::hours(1)).await.unwrap();
        let live = store
            .validate_token(&issued.token, Duration::hours(2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(live.user_id, "u1");
        assert!(live.expires_at > issued.expires_at);

        assert!(store.delete_token(&issued.token).await.unwrap());
        assert!(!store.delete_token(&issued.token).await.unwrap());
        assert!(store.validate_token(&issued.token, Duration::hours(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_token_is_rejected_and_removed() {
        let store = memory_store().await;
        store.create_user(sample_user("u1", "a@example.com")).await.unwrap();

        let issued = store.create_token("u1", Duration::seconds(-5)).await.unwrap();
        assert!(store.validate_token(&issued.token, Duration::hours(1)).await.unwrap().is_none());
        assert!(!store.delete_token(&issued.token).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_token_is_absent() {
        let store = memory_store().await;
        assert!(store.validate_token("nope", Duration::hours(1)).await.unwrap().is_none());
    }
}
