use std::future::Future;
use std::str::FromStr;

use chthon_core::Role;

use crate::entities::{AnyStore, dao::MessageRecord, parse_db_time, to_db_time};

pub trait ChatStore: Send + Sync + 'static {
    /// Append a message. Callers bump the session with
    /// [`SessionStore::touch_session`](crate::entities::SessionStore::touch_session).
    fn append_message(&self, msg: MessageRecord) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    /// Oldest first.
    fn list_messages(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<Vec<MessageRecord>, sqlx::Error>> + Send;
}

impl ChatStore for AnyStore {
    async fn append_message(&self, msg: MessageRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO messages (id, session_id, role, content, image_url, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&msg.id)
        .bind(&msg.session_id)
        .bind(msg.role.as_ref())
        .bind(&msg.content)
        .bind(&msg.image_url)
        .bind(to_db_time(&msg.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<MessageRecord>, sqlx::Error> {
        let rows: Vec<(String, String, String, String, Option<String>, String)> = sqlx::query_as(
            "SELECT id, session_id, role, content, image_url, created_at \
             FROM messages WHERE session_id = $1 ORDER BY created_at ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, session_id, role, content, image_url, created_at)| MessageRecord {
                role: Role::from_str(&role).unwrap_or_else(|_| {
                    tracing::warn!(message_id = %id, raw = %role, "unknown stored role; treating as user");
                    Role::User
                }),
                id,
                session_id,
                content,
                image_url,
                created_at: parse_db_time(&created_at, "messages.created_at"),
            })
            .collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::{ChatSessionRecord, SessionStore, UserStore, memory_store, sample_user};
    use chrono::{Duration, Utc};
    use tracing_test::traced_test;

    #[tokio::test]
    async fn messages_come_back_in_order() {
        let store = memory_store().await;
        store.create_user(sample_user("u1", "a@example.com")).await.unwrap();
        let start = Utc::now() - Duration::hours(1);
        store
            .create_session(ChatSessionRecord {
                id: "s1".into(),
                user_id: "u1".into(),
                name: "Chat".into(),
                created_at: start,
                last_updated: start,
            })
            .await
            .unwrap();

        for (i, role) in [Role::User, Role::Assistant, Role::User].into_iter().enumerate() {
            store
                .append_message(MessageRecord {
                    id: format!("m{i}"),
                    session_id: "s1".into(),
                    role,
                    content: format!("message {i}"),
                    image_url: (i == 2).then(|| "https://blob.example/cat.png".to_owned()),
                    created_at: start + Duration::seconds(i as i64 + 1),
                })
                .await
                .unwrap();
        }

        let msgs = store.list_messages("s1").await.unwrap();
        let ids: Vec<_> = msgs.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m0", "m1", "m2"]);
        assert_eq!(msgs[1].role, Role::Assistant);
        assert_eq!(msgs[2].image_url.as_deref(), Some("https://blob.example/cat.png"));
        assert!(store.list_messages("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    #[traced_test]
    async fn unknown_roles_read_back_as_user() {
        let store = memory_store().await;
        store.create_user(sample_user("u1", "a@example.com")).await.unwrap();
        let now = Utc::now();
        store
            .create_session(ChatSessionRecord {
                id: "s1".into(),
                user_id: "u1".into(),
                name: "Chat".into(),
                created_at: now,
                last_updated: now,
            })
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO messages (id, session_id, role, content, image_url, created_at) \
             VALUES ('m0', 's1', 'narrator', 'once upon a time', NULL, $1)",
        )
        .bind(to_db_time(&now))
        .execute(&store.pool)
        .await
        .unwrap();

        let msgs = store.list_messages("s1").await.unwrap();
        assert_eq!(msgs[0].role, Role::User);
        assert!(logs_contain("unknown stored role"));
    }
}
