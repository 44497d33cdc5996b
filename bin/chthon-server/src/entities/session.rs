use std::future::Future;

use chrono::{DateTime, Utc};

use crate::entities::{AnyStore, dao::ChatSessionRecord, parse_db_time, to_db_time};

/// Chat sessions, always scoped to their owner.
///
/// A session owned by another user behaves exactly like a missing one.
pub trait SessionStore: Send + Sync + 'static {
    fn create_session(
        &self,
        session: ChatSessionRecord,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn get_session(
        &self,
        id: &str,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<ChatSessionRecord>, sqlx::Error>> + Send;
    /// Most recently updated first.
    fn list_sessions(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<ChatSessionRecord>, sqlx::Error>> + Send;
    fn rename_session(
        &self,
        id: &str,
        user_id: &str,
        name: &str,
    ) -> impl Future<Output = Result<Option<ChatSessionRecord>, sqlx::Error>> + Send;
    /// Set `last_updated`; a no-op for unknown ids.
    fn touch_session(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    /// Delete the session and its messages; `false` when nothing matched.
    fn delete_session(&self, id: &str, user_id: &str) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
}

type SessionRow = (String, String, String, String, String);

fn from_row((id, user_id, name, created_at, last_updated): SessionRow) -> ChatSessionRecord {
    ChatSessionRecord {
        id,
        user_id,
        name,
        created_at: parse_db_time(&created_at, "chat_sessions.created_at"),
        last_updated: parse_db_time(&last_updated, "chat_sessions.last_updated"),
    }
}

impl SessionStore for AnyStore {
    async fn create_session(&self, session: ChatSessionRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO chat_sessions (id, user_id, name, created_at, last_updated) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(&session.name)
        .bind(to_db_time(&session.created_at))
        .bind(to_db_time(&session.last_updated))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_session(&self, id: &str, user_id: &str) -> Result<Option<ChatSessionRecord>, sqlx::Error> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT id, user_id, name, created_at, last_updated \
             FROM chat_sessions WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(from_row))
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<ChatSessionRecord>, sqlx::Error> {
        let rows: Vec<SessionRow> = sqlx::query_as(
            "SELECT id, user_id, name, created_at, last_updated \
             FROM chat_sessions WHERE user_id = $1 ORDER BY last_updated DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(from_row).collect())
    }

    async fn rename_session(
        &self,
        id: &str,
        user_id: &str,
        name: &str,
    ) -> Result<Option<ChatSessionRecord>, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE chat_sessions SET name = $1, last_updated = $2 WHERE id = $3 AND user_id = $4",
        )
        .bind(name)
        .bind(to_db_time(&Utc::now()))
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_session(id, user_id).await
    }

    async fn touch_session(&self, id: &str, at: DateTime<Utc>) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE chat_sessions SET last_updated = $1 WHERE id = $2")
            .bind(to_db_time(&at))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_session(&self, id: &str, user_id: &str) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query("DELETE FROM chat_sessions WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted > 0 {
            sqlx::query("DELETE FROM messages WHERE session_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(deleted > 0)
    }
}
