//! Persistence layer.
//!
//! Each table gets a repository trait (`UserStore`, `SessionStore`, …) and
//! [`AnyStore`] implements all of them on top of a `sqlx::Any` pool. The
//! driver (SQLite or Postgres) is picked from the URL scheme when the store
//! connects, so handlers never know which backend they are talking to.
//!
//! Trait methods use `impl Future` in their signatures, so no boxing is
//! needed for the store seam.

pub mod analytics;
pub mod auth;
pub mod chat;
pub mod dao;
pub mod session;
pub mod user;

pub use dao::{AuthToken, ChatSessionRecord, MessageRecord, UserRecord};

pub use analytics::AnalyticsStore;
pub use auth::AuthTokenStore;
pub use chat::ChatStore;
pub use session::SessionStore;
pub use user::UserStore;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::any::AnyPoolOptions;

#[derive(Clone, Debug)]
pub struct AnyStore {
    pool: sqlx::Pool<sqlx::Any>,
}

impl AnyStore {
    /// Connect to `url` and run pending migrations.
    ///
    /// `url` is any sqlx URL with a compiled-in driver, e.g.
    /// `"sqlite://chthon.db?mode=rwc"`, `"postgres://…"`, or
    /// `"sqlite::memory:"` for tests (use a single connection there, every
    /// in-memory connection is its own database).
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(url)
            .await?;
        // Path is resolved relative to CARGO_MANIFEST_DIR at compile time.
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Round-trip a trivial query to prove the database is reachable.
    pub async fn ping(&self) -> Result<DateTime<Utc>, sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(Utc::now())
    }
}

/// Fixed-width RFC 3339 so timestamps sort lexicographically in SQL.
pub(crate) fn to_db_time(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_db_time(raw: &str, field: &'static str) -> DateTime<Utc> {
    raw.parse().unwrap_or_else(|e: chrono::ParseError| {
        tracing::warn!(raw = %raw, field, error = %e, "failed to parse stored timestamp; using now");
        Utc::now()
    })
}

pub(crate) fn to_db_int(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

pub(crate) fn from_db_int(v: i64) -> u64 {
    u64::try_from(v).unwrap_or(0)
}

#[cfg(test)]
pub(crate) async fn memory_store() -> AnyStore {
    AnyStore::connect("sqlite::memory:", 1)
        .await
        .expect("in-memory sqlite store")
}

#[cfg(test)]
pub(crate) fn sample_user(id: &str, email: &str) -> UserRecord {
    let now = Utc::now();
    UserRecord {
        id: id.into(),
        email: email.into(),
        name: format!("User {id}"),
        image: None,
        password_hash: None,
        tier: chthon_core::UserTier::Registered,
        tier_config: None,
        created_at: now,
        updated_at: now,
    }
}
