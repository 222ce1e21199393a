//! Imagehook - webhook receiver for an asynchronous image-generation API.
//!
//! This library provides shared modules for the two binaries:
//! - `imagehook-web`: web server receiving generation callbacks
//! - `imagehook-submit`: client submitting an image for generation
//!
//! ## Architecture
//!
//! ```text
//! imagehook-submit → generation API ─(callback)→ POST /webhook → ImageStore
//! ```

pub mod callback;
pub mod config;
pub mod process;
pub mod store;
pub mod submit;
pub mod web;

// Re-export commonly used types
pub use callback::{parse_callback, CallbackError, CallbackOutcome, FilePart, InboundCallback, RawForm};
pub use config::Config;
pub use process::{handle_form, process_callback, ProcessError, ProcessOutcome, SavedImage};
pub use store::{ImageStore, StorageKeyPolicy, StoreError};
pub use submit::{SubmitClient, SubmitError, SubmitRequest};
pub use web::{router, AppState};
