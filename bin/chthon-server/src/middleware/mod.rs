//! HTTP middleware stack.

pub mod auth;
pub mod cors;
pub mod trace;

pub use auth::{AuthUser, BearerToken, require_admin_key};
pub use cors::cors_layer;
pub use trace::trace_middleware;
