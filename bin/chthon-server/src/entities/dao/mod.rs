pub mod auth;
pub mod chat;
pub mod session;
pub mod user;

pub use auth::AuthToken;
pub use chat::MessageRecord;
pub use session::ChatSessionRecord;
pub use user::UserRecord;
