//! Endpoint handlers.
//!
//! The webhook handler:
//! 1. Runs the transport guard (405 / 400)
//! 2. Decodes the multipart body (400 if it cannot be decoded)
//! 3. Hands the form to the processor
//! 4. Returns 200 OK, whatever the processor reported

use std::sync::Arc;

use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::process::{handle_form, ProcessOutcome};
use crate::store::ImageStore;
use crate::web::form::decode_multipart;
use crate::web::guard::{admit, Decision, Rejection};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: ImageStore,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let store = config.image_store();
        Self {
            config: Arc::new(config),
            store,
        }
    }
}

// =============================================================================
// Fallback
// =============================================================================

/// Any path other than `/webhook`.
pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}

// =============================================================================
// Webhook
// =============================================================================

/// Image-generation callback endpoint.
///
/// Registered for every method so the guard, not the router, answers 405.
pub async fn webhook(State(state): State<AppState>, request: Request) -> Response {
    let decision = {
        let content_type = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        admit(request.method(), content_type)
    };

    if let Decision::Reject(rejection) = decision {
        warn!(
            method = %request.method(),
            status = rejection.status().as_u16(),
            "webhook_request_rejected"
        );
        return rejection.into_response();
    }

    let multipart = match Multipart::from_request(request, &state).await {
        Ok(multipart) => multipart,
        Err(e) => {
            warn!(error = %e, "webhook_multipart_rejected");
            return Rejection::BadRequest.into_response();
        }
    };

    let form = match decode_multipart(multipart).await {
        Ok(form) => form,
        Err(e) => {
            warn!(error = %e, "webhook_multipart_decode_failed");
            return Rejection::BadRequest.into_response();
        }
    };

    let ProcessOutcome::Handled = handle_form(&state.store, form).await;

    (StatusCode::OK, "OK").into_response()
}
