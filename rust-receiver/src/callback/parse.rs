//! Conversion of a raw multipart form into an [`InboundCallback`].

use thiserror::Error;

use super::types::{fields, CallbackOutcome, InboundCallback, RawForm};

/// Status value the upstream sends when the image was generated.
pub const SUCCESS_STATUS: &str = "200";

/// Message used when a failed callback carries no `img_message`.
const UNKNOWN_FAILURE: &str = "unknown error";

/// A callback that cannot be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Status was "200" but no usable image file was attached.
    #[error("resImage is not a file")]
    NotAFile,
}

/// Parse a decoded form into a typed callback.
///
/// Only `status` is required. `id_gen` and `time_gen` default to empty; whether
/// an empty `id_gen` is usable is up to the storage policy. A non-"200" status
/// yields [`CallbackOutcome::Failed`] without looking at `res_image`. A "200"
/// status requires `res_image` to be a non-empty file part; a text field of
/// that name does not count.
pub fn parse_callback(mut form: RawForm) -> Result<InboundCallback, CallbackError> {
    let status = form
        .take_field(fields::STATUS)
        .ok_or(CallbackError::MissingField(fields::STATUS))?;
    let id_gen = form.take_field(fields::ID_GEN).unwrap_or_default();
    let time_gen = form.take_field(fields::TIME_GEN).unwrap_or_default();

    let outcome = if status != SUCCESS_STATUS {
        let message = form
            .take_field(fields::IMG_MESSAGE)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_FAILURE.to_string());
        CallbackOutcome::Failed { status, message }
    } else {
        let image = form
            .take_file(fields::RES_IMAGE)
            .filter(|f| !f.is_empty())
            .ok_or(CallbackError::NotAFile)?;
        CallbackOutcome::Generated(image)
    };

    Ok(InboundCallback {
        id_gen,
        time_gen,
        outcome,
    })
}
