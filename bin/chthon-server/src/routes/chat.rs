//! `POST /api/chat`: tier checks, context truncation, gateway call,
//! analytics and optional session persistence.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use chthon_core::{
    AnalyticsRecord, ConversationMessage, ProviderDetail, ProviderId, RequestType, Role, clean_generated_text,
    dollars_to_micros, truncate_conversation,
};
use tracing::{info, warn};
use utoipa::OpenApi;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{AnalyticsStore, ChatStore, MessageRecord, SessionStore, UserRecord};
use crate::error::ServerError;
use crate::extract::ApiJson;
use crate::gateway::{GatewayReply, GatewayRequest, TokenUsage};
use crate::middleware::AuthUser;
use crate::schemas::chat::{ChatRequest, ChatResponse};
use crate::state::AppState;

const DEFAULT_TEMPERATURE: f64 = 0.7;

#[derive(OpenApi)]
#[openapi(paths(chat), components(schemas(ChatRequest, ChatResponse, TokenUsage)))]
pub struct ChatApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(chat))
}

/// Prompt, history and effective system prompt for one gateway call.
struct Prepared {
    text: String,
    history: Vec<ConversationMessage>,
    system_prompt: String,
}

/// Cut the conversation at the last user message, truncate it to `budget`
/// with the system prompt pinned, and split it back into its parts.
///
/// Client-supplied system messages are appended to the configured prompt.
fn prepare_conversation(
    messages: &[ConversationMessage],
    system_prompt: &str,
    budget: usize,
) -> Result<Prepared, ServerError> {
    let prompt_index = messages
        .iter()
        .rposition(|m| m.role == Role::User)
        .ok_or_else(|| ServerError::BadRequest("No user message found".into()))?;

    let mut conversation = Vec::with_capacity(prompt_index + 2);
    conversation.push(ConversationMessage::system(system_prompt));
    conversation.extend_from_slice(&messages[..=prompt_index]);
    let mut kept = truncate_conversation(&conversation, budget, true);

    // The prompt is always the last message to survive truncation.
    let text = kept.pop().map(|m| m.content).unwrap_or_default();
    let (system, history): (Vec<_>, Vec<_>) = kept.into_iter().partition(|m| m.role == Role::System);
    let system_prompt = system.into_iter().map(|m| m.content).collect::<Vec<_>>().join("\n\n");
    Ok(Prepared { text, history, system_prompt })
}

fn analytics_record(
    user: &UserRecord,
    provider: &ProviderId,
    request_type: RequestType,
    request_size: usize,
    elapsed_ms: u64,
    outcome: Result<(&GatewayReply, usize), String>,
) -> AnalyticsRecord {
    let mut record = AnalyticsRecord {
        provider: provider.to_string(),
        model: provider.model().to_owned(),
        request_type,
        timestamp: Utc::now(),
        cost_micros: 0,
        tokens: 0,
        processing_time_ms: elapsed_ms,
        success: outcome.is_ok(),
        error: None,
        user_tier: user.tier,
        user_id: Some(user.id.clone()),
        provider_details: BTreeMap::new(),
        request_size: Some(request_size as u64),
        response_size: None,
    };
    match outcome {
        Ok((reply, response_size)) => {
            record.cost_micros = dollars_to_micros(reply.cost);
            record.tokens = reply.usage.total_tokens;
            record.response_size = Some(response_size as u64);
            record.provider_details.insert(
                provider.vendor().to_owned(),
                ProviderDetail {
                    cost_micros: record.cost_micros,
                    tokens: reply.usage.total_tokens,
                    processing_time_ms: Some(elapsed_ms),
                    model: Some(provider.model().to_owned()),
                    prompt_tokens: Some(reply.usage.prompt_tokens),
                    completion_tokens: Some(reply.usage.completion_tokens),
                    total_tokens: Some(reply.usage.total_tokens),
                    finish_reason: reply.finish_reason.clone(),
                },
            );
        }
        Err(message) => record.error = Some(message),
    }
    record
}

/// Store the exchange when `session_id` names one of the caller's sessions.
async fn persist_exchange(
    state: &AppState,
    user: &UserRecord,
    session_id: &str,
    prompt: MessageRecord,
    answer: &str,
) -> Result<(), ServerError> {
    if state.store.get_session(session_id, &user.id).await?.is_none() {
        warn!(session_id, user_id = %user.id, "chat session not owned by caller; not persisting");
        return Ok(());
    }
    let answered_at = Utc::now();
    state.store.append_message(prompt).await?;
    state
        .store
        .append_message(MessageRecord {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_owned(),
            role: Role::Assistant,
            content: answer.to_owned(),
            image_url: None,
            created_at: answered_at,
        })
        .await?;
    state.store.touch_session(session_id, answered_at).await?;
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/chat",
    tag = "chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatResponse),
        (status = 400, description = "No user message or invalid parameters"),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Tier does not allow the provider or images"),
        (status = 502, description = "Gateway failure"),
        (status = 503, description = "Gateway not configured"),
    )
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    AuthUser { user, .. }: AuthUser,
    ApiJson(req): ApiJson<ChatRequest>,
) -> Result<Json<ChatResponse>, ServerError> {
    req.validate()?;
    let gateway = state
        .gateway
        .clone()
        .ok_or_else(|| ServerError::ServiceUnavailable("AI gateway is not configured".into()))?;

    let limits = user.limits();
    if req.image_url.is_some() {
        limits.check_image_allowed()?;
    }
    let requested = req
        .provider
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .map(str::parse::<ProviderId>)
        .transpose()
        .map_err(|e| ServerError::BadRequest(e.to_string()))?;
    let provider = limits.select_provider(requested.as_ref())?;
    let max_tokens = limits.clamp_max_tokens(req.max_tokens)?;

    let prepared = prepare_conversation(&req.messages, &state.config.system_prompt, state.config.context_token_budget)?;
    let prompt = MessageRecord {
        id: Uuid::new_v4().to_string(),
        session_id: req.session_id.clone().unwrap_or_default(),
        role: Role::User,
        content: prepared.text.clone(),
        image_url: req.image_url.clone(),
        created_at: Utc::now(),
    };
    let request_type = if req.image_url.is_some() { RequestType::Image } else { RequestType::Text };
    let request_size = prepared.text.len();

    let started = Instant::now();
    let result = gateway
        .chat(GatewayRequest {
            provider: provider.clone(),
            text: prepared.text,
            system_prompt: prepared.system_prompt,
            history: prepared.history,
            temperature: req.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens,
            image_url: req.image_url,
        })
        .await;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let reply = match result {
        Ok(reply) => reply,
        Err(e) => {
            let record = analytics_record(&user, &provider, request_type, request_size, elapsed_ms, Err(e.to_string()));
            if let Err(db) = state.store.insert_record(&record).await {
                warn!(error = %db, "failed to record analytics for failed request");
            }
            return Err(e.into());
        }
    };

    let content = clean_generated_text(&reply.text);
    let record = analytics_record(
        &user,
        &provider,
        request_type,
        request_size,
        elapsed_ms,
        Ok((&reply, content.len())),
    );
    if let Err(e) = state.store.insert_record(&record).await {
        warn!(error = %e, "failed to record analytics");
    }

    if let Some(session_id) = req.session_id.as_deref() {
        if let Err(e) = persist_exchange(&state, &user, session_id, prompt, &content).await {
            warn!(session_id, error = %e, "failed to persist chat exchange");
        }
    }

    info!(
        user_id = %user.id,
        provider = %provider,
        tokens = reply.usage.total_tokens,
        elapsed_ms,
        "chat completed"
    );
    Ok(Json(ChatResponse { role: Role::Assistant, content, provider: provider.to_string(), usage: reply.usage }))
}

#[cfg(test)]
mod test {
    use super::*;
    use axum::http::StatusCode;
    use chthon_core::{TierLimits, UserTier};
    use serde_json::json;

    use crate::routes::testing::{FakeGateway, harness};

    fn msgs(body: serde_json::Value) -> serde_json::Value {
        json!({ "messages": body })
    }

    #[test]
    fn prepare_uses_last_user_message() {
        let messages = vec![
            ConversationMessage::user("first"),
            ConversationMessage::assistant("reply"),
            ConversationMessage::user("second"),
            ConversationMessage::assistant("dangling"),
        ];
        let p = prepare_conversation(&messages, "SYS", 4000).unwrap();
        assert_eq!(p.text, "second");
        assert_eq!(p.system_prompt, "SYS");
        assert_eq!(p.history, messages[..2].to_vec());
    }

    #[test]
    fn prepare_truncates_history_but_keeps_prompt() {
        let long = "x".repeat(400);
        let messages: Vec<_> = (0..20)
            .map(|i| if i % 2 == 0 { ConversationMessage::user(long.clone()) } else { ConversationMessage::assistant(long.clone()) })
            .chain([ConversationMessage::user("question")])
            .collect();
        let p = prepare_conversation(&messages, "SYS", 500).unwrap();
        assert_eq!(p.text, "question");
        assert_eq!(p.system_prompt, "SYS");
        assert!(p.history.len() < 20);
    }

    #[test]
    fn prepare_appends_client_system_messages_to_prompt() {
        let messages = [
            ConversationMessage::system("Answer in French."),
            ConversationMessage::user("hello"),
            ConversationMessage::assistant("bonjour"),
            ConversationMessage::user("how are you?"),
        ];
        let p = prepare_conversation(&messages, "SYS", 4000).unwrap();
        assert_eq!(p.system_prompt, "SYS\n\nAnswer in French.");
        assert_eq!(p.text, "how are you?");
        assert_eq!(p.history.len(), 2);
        assert!(p.history.iter().all(|m| m.role != Role::System));
    }

    #[test]
    fn prepare_requires_a_user_message() {
        let err = prepare_conversation(&[ConversationMessage::assistant("hi")], "SYS", 4000);
        assert!(matches!(err, Err(ServerError::BadRequest(_))));
    }

    #[tokio::test]
    async fn chat_cleans_reply_and_records_analytics() {
        let gateway = FakeGateway::answering("### Plan\n- **pack** bags\n\n\n\n- go");
        let h = harness(Some(gateway.clone()), None).await;
        let token = h.user("u1", UserTier::Registered, None).await;

        let (status, body) = h
            .post(
                "/api/chat",
                Some(&token),
                msgs(json!([
                    {"role": "user", "content": "Plan a trip"},
                    {"role": "assistant", "content": "Where to?"},
                    {"role": "user", "content": "Lisbon"}
                ])),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["role"], "assistant");
        assert_eq!(body["content"], "Plan\n• pack bags\n\n• go");
        assert_eq!(body["provider"], "openai/gpt-4o-mini");
        assert_eq!(body["usage"]["total_tokens"], 30);

        let sent = gateway.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "Lisbon");
        assert_eq!(sent[0].history.len(), 2);
        assert_eq!(sent[0].max_tokens, 1000);
        assert_eq!(sent[0].temperature, DEFAULT_TEMPERATURE);

        let records = h.state.store.list_records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].success);
        assert_eq!(records[0].cost_micros, 500);
        assert_eq!(records[0].user_tier, UserTier::Registered);
        assert_eq!(records[0].provider_details["openai"].total_tokens, Some(30));
    }

    #[tokio::test]
    async fn failures_are_recorded() {
        let h = harness(Some(FakeGateway::failing()), None).await;
        let token = h.user("u1", UserTier::Premium, None).await;
        let (status, _) = h.post("/api/chat", Some(&token), msgs(json!([{"role": "user", "content": "hi"}]))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let records = h.state.store.list_records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(!records[0].success);
        assert!(records[0].error.as_deref().unwrap().contains("overloaded"));
    }

    #[tokio::test]
    async fn tier_rules_are_enforced() {
        let gateway = FakeGateway::answering("ok");
        let h = harness(Some(gateway.clone()), None).await;
        let registered = h.user("r", UserTier::Registered, None).await;
        let hi = json!([{"role": "user", "content": "hi"}]);

        let (status, _) = h
            .post("/api/chat", Some(&registered), json!({"messages": hi, "provider": "xai/grok-2-latest"}))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = h
            .post("/api/chat", Some(&registered), json!({"messages": hi, "provider": "google/gemini-1.5-flash", "max_tokens": 5000}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["provider"], "google/gemini-1.5-flash");
        assert_eq!(gateway.requests()[0].max_tokens, 1000);

        let locked = TierLimits {
            can_upload_images: false,
            can_select_provider: false,
            ..TierLimits::for_tier(UserTier::Custom)
        };
        let custom = h.user("c", UserTier::Custom, Some(locked)).await;
        let (status, _) = h
            .post("/api/chat", Some(&custom), json!({"messages": hi, "image_url": "https://blob.test/a.png"}))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        // Without selection rights the request is served by the default provider.
        let (status, body) = h
            .post("/api/chat", Some(&custom), json!({"messages": hi, "provider": "google/gemini-1.5-flash"}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["provider"], "openai/gpt-4o-mini");
        assert_eq!(gateway.requests().last().unwrap().provider.as_str(), "openai/gpt-4o-mini");
        let (status, _) = h
            .post("/api/chat", Some(&custom), json!({"messages": hi, "provider": "openai/gpt-4o-mini"}))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn bad_requests() {
        let h = harness(Some(FakeGateway::answering("ok")), None).await;
        let token = h.user("u1", UserTier::Registered, None).await;

        let (status, body) = h.post("/api/chat", Some(&token), msgs(json!([{"role": "assistant", "content": "hi"}]))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No user message found");

        let (status, _) = h.post("/api/chat", Some(&token), msgs(json!([]))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = h
            .post("/api/chat", Some(&token), json!({"messages": [{"role": "user", "content": "hi"}], "provider": "gpt"}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = h.post("/api/chat", None, msgs(json!([{"role": "user", "content": "hi"}]))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unconfigured_gateway_is_unavailable() {
        let h = harness(None, None).await;
        let token = h.user("u1", UserTier::Registered, None).await;
        let (status, _) = h.post("/api/chat", Some(&token), msgs(json!([{"role": "user", "content": "hi"}]))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn exchange_is_persisted_to_owned_session() {
        let h = harness(Some(FakeGateway::answering("**Sure**")), None).await;
        let alice = h.user("alice", UserTier::Registered, None).await;
        let bob = h.user("bob", UserTier::Registered, None).await;
        let (_, session) = h.post("/api/chat-sessions", Some(&alice), json!({"name": "s"})).await;
        let session_id = session["id"].as_str().unwrap();

        let body = json!({"messages": [{"role": "user", "content": "Help?"}], "session_id": session_id});
        assert_eq!(h.post("/api/chat", Some(&bob), body.clone()).await.0, StatusCode::OK);
        let stored = h.state.store.list_messages(session_id).await.unwrap();
        assert!(stored.is_empty());

        assert_eq!(h.post("/api/chat", Some(&alice), body).await.0, StatusCode::OK);
        let stored = h.state.store.list_messages(session_id).await.unwrap();
        let pairs: Vec<_> = stored.iter().map(|m| (m.role, m.content.as_str())).collect();
        assert_eq!(pairs, [(Role::User, "Help?"), (Role::Assistant, "Sure")]);
    }
}
