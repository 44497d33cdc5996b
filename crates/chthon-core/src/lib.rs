//! Domain logic shared by the chthon service.
//!
//! Nothing in this crate performs I/O: the server crate feeds it user rows,
//! chat messages and analytics records and persists whatever comes back.

pub mod analytics;
pub mod error;
pub mod format;
pub mod message;
pub mod provider;
pub mod tier;
pub mod tokens;

pub use analytics::{
    AnalyticsRecord, AnalyticsSummary, ProviderDetail, RequestType, dollars_to_micros, micros_to_dollars,
    summarize,
};
pub use error::{ProviderParseError, TierError};
pub use format::clean_generated_text;
pub use message::{ConversationMessage, Role};
pub use provider::ProviderId;
pub use tier::{TierLimits, UserTier, resolve_limits};
pub use tokens::{estimate_conversation_tokens, estimate_token_count, truncate_conversation};
