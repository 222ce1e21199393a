//! Callback data model.
//!
//! The web layer decodes a multipart body into a [`RawForm`]; [`parse_callback`]
//! turns that loosely typed form into an [`InboundCallback`] whose outcome is
//! either a generated image or an upstream-reported failure, never both.
//!
//! ```text
//! multipart body → RawForm → parse_callback() → InboundCallback
//! ```

pub mod parse;
pub mod types;

pub use parse::{parse_callback, CallbackError, SUCCESS_STATUS};
pub use types::{CallbackOutcome, FilePart, InboundCallback, RawForm};
