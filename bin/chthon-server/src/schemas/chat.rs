use chthon_core::{ConversationMessage, Role};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::gateway::TokenUsage;

/// Request body for `POST /api/chat`.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct ChatRequest {
    /// Conversation so far; the last user message is the prompt.
    #[validate(length(min = 1, message = "messages must not be empty"))]
    pub messages: Vec<ConversationMessage>,
    /// `vendor/model`; defaults to the tier's first provider.
    pub provider: Option<String>,
    /// Persist the exchange into this session when it belongs to the caller.
    pub session_id: Option<String>,
    #[validate(url)]
    pub image_url: Option<String>,
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    /// Always `assistant`.
    pub role: Role,
    pub content: String,
    pub provider: String,
    pub usage: TokenUsage,
}
