//! Web server module for receiving image-generation callbacks.
//!
//! Exactly one path is served: `/webhook`, for any method (the guard answers
//! 405). Everything else is 404.

pub mod form;
pub mod guard;
pub mod handlers;

use axum::{extract::DefaultBodyLimit, routing::any, Router};
use tower_http::trace::TraceLayer;

pub use form::decode_multipart;
pub use guard::{admit, Decision, Rejection, MULTIPART_FORM_DATA};
pub use handlers::{not_found, webhook, AppState};

/// Path of the callback endpoint.
pub const WEBHOOK_PATH: &str = "/webhook";

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_body_bytes;

    Router::new()
        .route(WEBHOOK_PATH, any(webhook))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
