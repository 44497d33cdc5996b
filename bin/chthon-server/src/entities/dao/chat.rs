use chrono::{DateTime, Utc};
use chthon_core::Role;

/// A single row in the `messages` table.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub id: String,
    pub session_id: String,
    pub role: Role,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}
