//! Webhook callback processing.
//!
//! ## Processing Flow
//!
//! ```text
//! RawForm → parse_callback() → process_callback() → ImageStore
//!                    └──────────────┴─ Err ─→ report_failure()
//! ```
//!
//! [`process_callback`] returns a `Result`; [`handle_form`] sits on top of it
//! and always yields [`ProcessOutcome::Handled`]. Once a callback was decoded
//! the sender gets an acknowledgment whatever happened, so it does not
//! redeliver a callback that was already consumed.

pub mod error;

use std::path::PathBuf;

use tracing::info;

use crate::callback::types::fields;
use crate::callback::{parse_callback, CallbackOutcome, InboundCallback, RawForm};
use crate::store::ImageStore;

pub use error::{report_failure, ProcessError};

/// Result of handling a callback, as seen by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Handled,
}

/// An image written for a successful callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedImage {
    pub path: PathBuf,
    pub bytes: usize,
}

/// Process a parsed callback: persist the image or surface the upstream failure.
pub async fn process_callback(
    store: &ImageStore,
    callback: InboundCallback,
) -> Result<SavedImage, ProcessError> {
    let InboundCallback {
        id_gen,
        time_gen,
        outcome,
    } = callback;

    let image = match outcome {
        CallbackOutcome::Failed { status, message } => {
            return Err(ProcessError::Upstream { status, message });
        }
        CallbackOutcome::Generated(image) => image,
    };

    let bytes = image.len();
    let path = store.save(&id_gen, image.data).await?;

    info!(
        id_gen = %id_gen,
        time_gen = %time_gen,
        path = %path.display(),
        bytes,
        file_name = ?image.file_name,
        content_type = ?image.content_type,
        "webhook_image_saved"
    );

    Ok(SavedImage { path, bytes })
}

/// Handle a decoded form end to end. Failures go to [`report_failure`].
pub async fn handle_form(store: &ImageStore, form: RawForm) -> ProcessOutcome {
    let id_gen = form.field(fields::ID_GEN).map(str::to_string);

    info!(
        status = ?form.field(fields::STATUS),
        id_gen = ?id_gen,
        time_gen = ?form.field(fields::TIME_GEN),
        field_count = form.field_count(),
        file_count = form.file_count(),
        "webhook_received"
    );

    let result = match parse_callback(form) {
        Ok(callback) => process_callback(store, callback).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        report_failure(id_gen.as_deref(), &e);
    }

    ProcessOutcome::Handled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::{CallbackError, FilePart};
    use crate::store::StorageKeyPolicy;
    use bytes::Bytes;
    use std::future::Future;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Shared sink for a test subscriber.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Run `fut` under a JSON subscriber shaped like the binaries' and return
    /// everything it logged.
    async fn capture_logs<F: Future>(fut: F) -> String {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .flatten_event(true)
            .with_writer(move || writer.clone())
            .finish();

        let _guard = tracing::subscriber::set_default(subscriber);
        fut.await;

        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    fn log_line<'a>(logs: &'a str, event: &str) -> &'a str {
        logs.lines()
            .find(|line| line.contains(event))
            .unwrap_or_else(|| panic!("no {} event in logs:\n{}", event, logs))
    }

    fn generated(id_gen: &str, data: &'static [u8]) -> InboundCallback {
        InboundCallback {
            id_gen: id_gen.to_string(),
            time_gen: "3.2".to_string(),
            outcome: CallbackOutcome::Generated(FilePart {
                file_name: Some("out.png".to_string()),
                content_type: Some("image/png".to_string()),
                data: Bytes::from_static(data),
            }),
        }
    }

    #[tokio::test]
    async fn test_process_callback_saves_image() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ImageStore::new(tmp.path(), StorageKeyPolicy::IdGen);

        let saved = process_callback(&store, generated("job-1", b"pixels"))
            .await
            .unwrap();

        assert_eq!(saved.path, tmp.path().join("job-1.png"));
        assert_eq!(saved.bytes, 6);
        assert_eq!(std::fs::read(&saved.path).unwrap(), b"pixels");
    }

    #[tokio::test]
    async fn test_process_callback_upstream_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ImageStore::new(tmp.path().join("uploads"), StorageKeyPolicy::IdGen);
        let callback = InboundCallback {
            id_gen: "job-2".to_string(),
            time_gen: "".to_string(),
            outcome: CallbackOutcome::Failed {
                status: "500".to_string(),
                message: "upstream failed".to_string(),
            },
        };

        let err = process_callback(&store, callback).await.unwrap_err();

        assert_eq!(err.kind(), "upstream");
        assert!(err.to_string().contains("upstream failed"));
        assert!(!tmp.path().join("uploads").exists());
    }

    #[tokio::test]
    async fn test_process_callback_invalid_key_is_malformed() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ImageStore::new(tmp.path(), StorageKeyPolicy::IdGen);

        let err = process_callback(&store, generated("../../x", b"pixels"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "malformed");
    }

    #[tokio::test]
    async fn test_process_callback_storage_failure() {
        let tmp = tempfile::tempdir().unwrap();
        // A regular file where the upload directory should be
        let blocker = tmp.path().join("uploads");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let store = ImageStore::new(&blocker, StorageKeyPolicy::IdGen);

        let err = process_callback(&store, generated("job-3", b"pixels"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "storage");
    }

    #[tokio::test]
    async fn test_handle_form_always_handled() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ImageStore::new(tmp.path().join("uploads"), StorageKeyPolicy::IdGen);

        // Missing everything
        assert_eq!(
            handle_form(&store, RawForm::new()).await,
            ProcessOutcome::Handled
        );

        // Success status without image
        let mut form = RawForm::new();
        form.insert_field("status", "200");
        form.insert_field("id_gen", "job-4");
        assert_eq!(handle_form(&store, form).await, ProcessOutcome::Handled);

        assert!(!tmp.path().join("uploads").exists());
    }

    #[tokio::test]
    async fn test_upstream_failure_is_logged() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ImageStore::new(tmp.path(), StorageKeyPolicy::IdGen);
        let mut form = RawForm::new();
        form.insert_field("status", "500");
        form.insert_field("id_gen", "job-5");
        form.insert_field("img_message", "upstream failed");

        let logs = capture_logs(handle_form(&store, form)).await;

        let line = log_line(&logs, "webhook_upstream_failed");
        assert!(line.contains("upstream failed"), "{}", line);
        assert!(line.contains(r#""kind":"upstream""#), "{}", line);
        assert!(line.contains(r#""id_gen":"job-5""#), "{}", line);
        assert!(!logs.contains("webhook_callback_malformed"));
    }

    #[tokio::test]
    async fn test_upstream_failure_without_id_gen_is_logged_as_upstream() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ImageStore::new(tmp.path(), StorageKeyPolicy::IdGen);
        let mut form = RawForm::new();
        form.insert_field("status", "500");
        form.insert_field("img_message", "upstream failed");

        let logs = capture_logs(handle_form(&store, form)).await;

        let line = log_line(&logs, "webhook_upstream_failed");
        assert!(line.contains("upstream failed"), "{}", line);
        assert!(line.contains(r#""kind":"upstream""#), "{}", line);
        assert!(!logs.contains("webhook_callback_malformed"));
        assert!(!logs.contains("missing required field"));
    }

    #[tokio::test]
    async fn test_missing_image_is_logged_as_malformed() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ImageStore::new(tmp.path(), StorageKeyPolicy::IdGen);
        let mut form = RawForm::new();
        form.insert_field("status", "200");
        form.insert_field("id_gen", "job-6");

        let logs = capture_logs(handle_form(&store, form)).await;

        let line = log_line(&logs, "webhook_callback_malformed");
        assert!(line.contains("resImage is not a file"), "{}", line);
        assert!(line.contains(r#""kind":"malformed""#), "{}", line);
        assert!(!logs.contains("webhook_upstream_failed"));
    }

    #[tokio::test]
    async fn test_failure_kinds_are_distinct_in_logs() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ImageStore::new(tmp.path(), StorageKeyPolicy::IdGen);

        let mut failed = RawForm::new();
        failed.insert_field("status", "500");
        failed.insert_field("id_gen", "job-7");
        failed.insert_field("img_message", "upstream failed");

        let mut no_image = RawForm::new();
        no_image.insert_field("status", "200");
        no_image.insert_field("id_gen", "job-7");

        let logs = capture_logs(async move {
            handle_form(&store, failed).await;
            handle_form(&store, no_image).await;
        })
        .await;

        let upstream = log_line(&logs, "webhook_upstream_failed");
        let malformed = log_line(&logs, "webhook_callback_malformed");
        assert!(upstream.contains(r#""kind":"upstream""#));
        assert!(!upstream.contains(r#""kind":"malformed""#));
        assert!(malformed.contains(r#""kind":"malformed""#));
        assert!(!malformed.contains(r#""kind":"upstream""#));
    }

    #[tokio::test]
    async fn test_success_without_id_gen_under_fixed_policy_saves() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ImageStore::new(
            tmp.path(),
            StorageKeyPolicy::Fixed("resImage.png".to_string()),
        );

        let saved = process_callback(&store, generated("", b"pixels"))
            .await
            .unwrap();

        assert_eq!(saved.path, tmp.path().join("resImage.png"));
        assert_eq!(std::fs::read(&saved.path).unwrap(), b"pixels");
    }

    #[tokio::test]
    async fn test_success_without_id_gen_under_id_gen_policy_is_malformed() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ImageStore::new(tmp.path().join("uploads"), StorageKeyPolicy::IdGen);

        let err = process_callback(&store, generated("", b"pixels"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "malformed");
        assert!(!tmp.path().join("uploads").exists());
    }

    #[test]
    fn test_missing_image_error_message() {
        let err: ProcessError = CallbackError::NotAFile.into();
        assert!(err.to_string().contains("resImage is not a file"));
    }
}
