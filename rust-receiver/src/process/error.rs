//! Processing failures and the log-and-continue error path.

use thiserror::Error;
use tracing::error;

use crate::callback::CallbackError;
use crate::store::StoreError;

/// Why a callback did not produce a stored image.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The upstream API reported that generation failed.
    #[error("upstream reported status {status}: {message}")]
    Upstream { status: String, message: String },

    /// The callback could not be interpreted.
    #[error(transparent)]
    Malformed(#[from] CallbackError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ProcessError {
    /// Log category, so upstream failures and local anomalies stay
    /// distinguishable even though the HTTP response is identical.
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessError::Upstream { .. } => "upstream",
            ProcessError::Malformed(_) => "malformed",
            ProcessError::Store(StoreError::InvalidKey(_)) => "malformed",
            ProcessError::Store(_) => "storage",
        }
    }
}

/// Record a processing failure. Never propagates.
pub fn report_failure(id_gen: Option<&str>, err: &ProcessError) {
    let id_gen = id_gen.unwrap_or("");
    let kind = err.kind();

    match err {
        ProcessError::Upstream { status, message } => {
            error!(
                kind,
                id_gen = %id_gen,
                upstream_status = %status,
                img_message = %message,
                error = %err,
                "webhook_upstream_failed"
            );
        }
        ProcessError::Malformed(_) | ProcessError::Store(StoreError::InvalidKey(_)) => {
            error!(kind, id_gen = %id_gen, error = %err, "webhook_callback_malformed");
        }
        ProcessError::Store(_) => {
            error!(kind, id_gen = %id_gen, error = %err, "webhook_image_store_failed");
        }
    }
}
