//! Upstream chat gateway.
//!
//! Handlers talk to [`ChatGateway`]; production uses [`EdenAiGateway`] and
//! tests plug in a fake.

mod eden;

pub use eden::EdenAiGateway;

use async_trait::async_trait;
use chthon_core::{ConversationMessage, ProviderId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gateway returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider {provider} failed: {message}")]
    Provider { provider: String, message: String },

    #[error("gateway reply has no entry for provider {0}")]
    MissingProvider(String),

    #[error("gateway reply could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One chat completion request.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub provider: ProviderId,
    /// The prompt being answered.
    pub text: String,
    pub system_prompt: String,
    /// Earlier turns, oldest first. Never contains `text` itself.
    pub history: Vec<ConversationMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayReply {
    /// Raw generated text, before any cleanup.
    pub text: String,
    /// Cost in US dollars as billed by the gateway.
    pub cost: f64,
    pub usage: TokenUsage,
    pub finish_reason: Option<String>,
}

#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn chat(&self, request: GatewayRequest) -> Result<GatewayReply, GatewayError>;
}
