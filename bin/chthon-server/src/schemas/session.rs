use chrono::{DateTime, Utc};
use chthon_core::Role;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::entities::{ChatSessionRecord, MessageRecord};

/// Request body for `POST /api/chat-sessions`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
pub struct CreateSessionRequest {
    /// Defaults to `Chat <timestamp>`.
    #[validate(length(max = 200))]
    pub name: Option<String>,
}

/// Request body for `PUT /api/chat-sessions/{id}`.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct RenameSessionRequest {
    #[validate(length(min = 1, max = 200, message = "name must be 1 to 200 characters"))]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl From<ChatSessionRecord> for SessionResponse {
    fn from(s: ChatSessionRecord) -> Self {
        Self { id: s.id, name: s.name, created_at: s.created_at, last_updated: s.last_updated }
    }
}

/// Request body for `POST /api/chat-sessions/{id}/messages`.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct AppendMessageRequest {
    pub role: Role,
    #[validate(length(min = 1, message = "content must not be empty"))]
    pub content: String,
    #[validate(url)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<MessageRecord> for MessageResponse {
    fn from(m: MessageRecord) -> Self {
        Self { id: m.id, role: m.role, content: m.content, image_url: m.image_url, created_at: m.created_at }
    }
}
