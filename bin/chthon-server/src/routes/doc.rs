use utoipa::OpenApi;

use crate::routes::{admin, auth, chat, health, sessions, upload, user};

#[derive(OpenApi)]
#[openapi(
    info(title = "chthon-server", description = "chthon chat service API", version = "0.1.0"),
    components(schemas(
        chthon_core::ConversationMessage,
        chthon_core::Role,
        chthon_core::UserTier,
        chthon_core::TierLimits,
    ))
)]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(auth::AuthApi::openapi());
    root.merge(user::UserApi::openapi());
    root.merge(sessions::SessionApi::openapi());
    root.merge(chat::ChatApi::openapi());
    root.merge(upload::UploadApi::openapi());
    root.merge(admin::api_docs());
    root
}
