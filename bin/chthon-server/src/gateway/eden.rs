use std::collections::HashMap;

use async_trait::async_trait;
use chthon_core::Role;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ChatGateway, GatewayError, GatewayReply, GatewayRequest, TokenUsage};

/// Client for Eden AI's `text/chat` endpoint.
#[derive(Debug, Clone)]
pub struct EdenAiGateway {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl EdenAiGateway {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_key, base_url)
    }

    pub fn with_client(http: reqwest::Client, api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }
}

#[derive(Serialize)]
struct ChatBody<'a> {
    providers: &'a str,
    text: &'a str,
    chatbot_global_action: &'a str,
    previous_history: Vec<HistoryTurn<'a>>,
    temperature: f64,
    max_tokens: u32,
    fallback_providers: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_url: Option<&'a str>,
}

#[derive(Serialize)]
struct HistoryTurn<'a> {
    role: &'static str,
    message: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderReply {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    generated_text: Option<String>,
    #[serde(default)]
    cost: Option<f64>,
    #[serde(default)]
    error: Option<ProviderFailure>,
    #[serde(default)]
    usage: Option<UsageBlock>,
    #[serde(default)]
    original_response: Option<OriginalResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProviderFailure {
    Message { message: String },
    Text(String),
}

#[derive(Debug, Default, Deserialize)]
struct UsageBlock {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

#[derive(Debug, Default, Deserialize)]
struct OriginalResponse {
    #[serde(default)]
    usage: Option<UsageBlock>,
    #[serde(default)]
    choices: Vec<OriginalChoice>,
}

#[derive(Debug, Deserialize)]
struct OriginalChoice {
    #[serde(default)]
    finish_reason: Option<String>,
}

fn history_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant | Role::System => "assistant",
    }
}

impl ProviderReply {
    fn into_reply(self, provider: &str) -> Result<GatewayReply, GatewayError> {
        if self.status.as_deref() == Some("fail") {
            let message = match self.error {
                Some(ProviderFailure::Message { message }) | Some(ProviderFailure::Text(message)) => message,
                None => "unknown provider error".to_owned(),
            };
            return Err(GatewayError::Provider { provider: provider.to_owned(), message });
        }

        let original = self.original_response.unwrap_or_default();
        let usage = self.usage.or(original.usage).unwrap_or_default();
        let total_tokens = if usage.total_tokens > 0 {
            usage.total_tokens
        } else {
            usage.prompt_tokens + usage.completion_tokens
        };
        Ok(GatewayReply {
            text: self.generated_text.unwrap_or_default(),
            cost: self.cost.unwrap_or(0.0),
            usage: TokenUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens,
            },
            finish_reason: original.choices.into_iter().find_map(|c| c.finish_reason),
        })
    }
}

#[async_trait]
impl ChatGateway for EdenAiGateway {
    async fn chat(&self, request: GatewayRequest) -> Result<GatewayReply, GatewayError> {
        let provider = request.provider.as_str();
        let body = ChatBody {
            providers: provider,
            text: &request.text,
            chatbot_global_action: &request.system_prompt,
            previous_history: request
                .history
                .iter()
                .map(|m| HistoryTurn { role: history_role(m.role), message: &m.content })
                .collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            fallback_providers: "",
            file_url: request.image_url.as_deref(),
        };

        debug!(provider, history = body.previous_history.len(), "sending chat request");
        let response = self
            .http
            .post(format!("{}/text/chat", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;
        if !status.is_success() {
            warn!(provider, status = status.as_u16(), "gateway returned an error status");
            return Err(GatewayError::Status { status: status.as_u16(), body: raw });
        }

        let mut replies: HashMap<String, ProviderReply> = serde_json::from_str(&raw)?;
        let reply = replies
            .remove(provider)
            .or_else(|| replies.remove(request.provider.vendor()))
            .ok_or_else(|| GatewayError::MissingProvider(provider.to_owned()))?;
        reply.into_reply(provider)
    }
}
