//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::blob::{BlobStore, HttpBlobStore};
use crate::config::Config;
use crate::entities::AnyStore;
use crate::gateway::{ChatGateway, EdenAiGateway};

/// State shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Users, tokens, sessions, messages and analytics.
    pub store: Arc<AnyStore>,
    /// `None` when no gateway key is configured; chat answers 503.
    pub gateway: Option<Arc<dyn ChatGateway>>,
    /// `None` when no blob token is configured; upload answers 503.
    pub blob: Option<Arc<dyn BlobStore>>,
}

impl AppState {
    /// Wire the outbound clients whose credentials are present in `config`.
    pub fn new(config: Config, store: AnyStore) -> Self {
        let gateway = config.gateway_api_key.as_ref().map(|key| {
            Arc::new(EdenAiGateway::new(key.clone(), config.gateway_base_url.clone())) as Arc<dyn ChatGateway>
        });
        let blob = config
            .blob_token
            .as_ref()
            .map(|token| Arc::new(HttpBlobStore::new(token.clone(), config.blob_base_url.clone())) as Arc<dyn BlobStore>);
        Self { config: Arc::new(config), store: Arc::new(store), gateway, blob }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("gateway", &self.gateway.is_some())
            .field("blob", &self.blob.is_some())
            .finish_non_exhaustive()
    }
}
