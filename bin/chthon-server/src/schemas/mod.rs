//! Request and response bodies for the `/api` routes.

pub mod admin;
pub mod auth;
pub mod chat;
pub mod session;
pub mod upload;
pub mod user;
