//! Server configuration, loaded from environment variables at startup.

/// Built-in assistant instructions sent with every chat request.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. When listing items, use simple bullet \
     points (•) for list items and avoid using special characters like ### or **. Format categories with a colon \
     at the end.";

/// Upper bound on `CHTHON_SESSION_TTL_HOURS` (ten years).
pub const MAX_SESSION_TTL_HOURS: i64 = 87_600;

/// Runtime configuration for chthon-server.
///
/// Every field has a default so the server starts without any environment
/// variables set; the outbound integrations (gateway, blob storage, admin
/// routes) stay disabled until their keys are provided.
#[derive(Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// sqlx connection URL. The scheme picks the driver: `sqlite://…` or
    /// `postgres://…` (default: `"sqlite://chthon.db?mode=rwc"`).
    pub database_url: String,

    pub database_max_connections: u32,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// When set, logs are also written to a daily-rolling file here.
    pub log_dir: Option<String>,

    /// Comma-separated list of allowed CORS origins; `None` allows any.
    pub cors_allowed_origins: Option<String>,

    pub enable_swagger: bool,

    /// Sliding lifetime of a user bearer token, within
    /// `1..=MAX_SESSION_TTL_HOURS`.
    pub session_ttl_hours: i64,

    /// Token budget the conversation history is truncated to.
    pub context_token_budget: usize,

    pub system_prompt: String,

    pub max_upload_bytes: usize,

    /// Static key guarding `/api/admin`; `None` locks the admin routes.
    pub admin_key: Option<String>,

    pub gateway_api_key: Option<String>,
    pub gateway_base_url: String,

    pub blob_token: Option<String>,
    pub blob_base_url: String,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("CHTHON_BIND", "0.0.0.0:3000"),
            database_url: env_or("CHTHON_DATABASE_URL", "sqlite://chthon.db?mode=rwc"),
            database_max_connections: parse_env("CHTHON_DATABASE_MAX_CONNECTIONS", 5),
            log_level: env_or("CHTHON_LOG", "info"),
            log_json: env_flag("CHTHON_LOG_JSON", false),
            log_dir: env_opt("CHTHON_LOG_DIR"),
            cors_allowed_origins: env_opt("CHTHON_CORS_ORIGINS"),
            enable_swagger: env_flag("CHTHON_ENABLE_SWAGGER", true),
            session_ttl_hours: session_ttl_hours(parse_env("CHTHON_SESSION_TTL_HOURS", 24)),
            context_token_budget: parse_env(
                "CHTHON_CONTEXT_TOKEN_BUDGET",
                chthon_core::tokens::DEFAULT_CONTEXT_TOKENS,
            ),
            system_prompt: env_or("CHTHON_SYSTEM_PROMPT", DEFAULT_SYSTEM_PROMPT),
            max_upload_bytes: parse_env("CHTHON_MAX_UPLOAD_BYTES", 2 * 1024 * 1024),
            admin_key: env_opt("ADMIN_KEY"),
            gateway_api_key: env_opt("EDEN_AI_API_KEY"),
            gateway_base_url: env_or("EDEN_AI_BASE_URL", "https://api.edenai.run/v2"),
            blob_token: env_opt("BLOB_READ_WRITE_TOKEN"),
            blob_base_url: env_or("BLOB_BASE_URL", "https://blob.vercel-storage.com"),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("database_url", &self.database_url)
            .field("database_max_connections", &self.database_max_connections)
            .field("log_level", &self.log_level)
            .field("log_json", &self.log_json)
            .field("log_dir", &self.log_dir)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("enable_swagger", &self.enable_swagger)
            .field("session_ttl_hours", &self.session_ttl_hours)
            .field("context_token_budget", &self.context_token_budget)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("admin_key", &redacted(&self.admin_key))
            .field("gateway_api_key", &redacted(&self.gateway_api_key))
            .field("gateway_base_url", &self.gateway_base_url)
            .field("blob_token", &redacted(&self.blob_token))
            .field("blob_base_url", &self.blob_base_url)
            .finish_non_exhaustive()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".into(),
            database_url: "sqlite::memory:".into(),
            database_max_connections: 1,
            log_level: "info".into(),
            log_json: false,
            log_dir: None,
            cors_allowed_origins: None,
            enable_swagger: false,
            session_ttl_hours: 24,
            context_token_budget: chthon_core::tokens::DEFAULT_CONTEXT_TOKENS,
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_upload_bytes: 2 * 1024 * 1024,
            admin_key: None,
            gateway_api_key: None,
            gateway_base_url: "https://api.edenai.run/v2".into(),
            blob_token: None,
            blob_base_url: "https://blob.vercel-storage.com".into(),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn redacted(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| "<redacted>")
}

/// Out-of-range values would expire every token or overflow the expiry
/// timestamp, so they are clamped.
fn session_ttl_hours(hours: i64) -> i64 {
    let clamped = hours.clamp(1, MAX_SESSION_TTL_HOURS);
    if clamped != hours {
        eprintln!("WARN: CHTHON_SESSION_TTL_HOURS={hours} is out of range; using {clamped}");
    }
    clamped
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn session_ttl_is_clamped() {
        assert_eq!(session_ttl_hours(24), 24);
        assert_eq!(session_ttl_hours(0), 1);
        assert_eq!(session_ttl_hours(-5), 1);
        assert_eq!(session_ttl_hours(10_000_000_000), MAX_SESSION_TTL_HOURS);
        assert_eq!(session_ttl_hours(i64::MAX), MAX_SESSION_TTL_HOURS);

        // The ceiling still produces a representable expiry.
        let expiry = Utc::now().checked_add_signed(Duration::hours(session_ttl_hours(10_000_000_000)));
        assert!(expiry.is_some());
    }

    #[test]
    fn debug_hides_secrets() {
        let cfg = Config {
            admin_key: Some("admin-secret".into()),
            gateway_api_key: Some("gateway-secret".into()),
            blob_token: Some("blob-secret".into()),
            ..Config::default()
        };
        let printed = format!("{cfg:?}");
        assert!(!printed.contains("secret"), "{printed}");
        assert!(printed.contains("<redacted>"));
        assert!(printed.contains("gateway_base_url"));
    }
}
