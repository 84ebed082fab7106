//! # biblib server
//!
//! HTTP surface over the biblib core services. Identity arrives from the
//! upstream gateway in `X-Adsws-Uid`; this crate never authenticates callers
//! itself.

pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::AppState;
pub use infra::errors::{AppError, AppResult};
pub use routes::create_app;
