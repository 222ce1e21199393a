//! Callback types shared by the web layer and the processor.

use std::collections::HashMap;

use bytes::Bytes;

/// Multipart field names sent by the upstream API.
pub mod fields {
    pub const STATUS: &str = "status";
    pub const ID_GEN: &str = "id_gen";
    pub const TIME_GEN: &str = "time_gen";
    pub const IMG_MESSAGE: &str = "img_message";
    pub const RES_IMAGE: &str = "res_image";
}

// =============================================================================
// Raw Form
// =============================================================================

/// A binary part of a multipart body that was uploaded as a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Filename declared by the sender
    pub file_name: Option<String>,
    /// Content type declared by the sender
    pub content_type: Option<String>,
    /// File contents
    pub data: Bytes,
}

impl FilePart {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Decoded multipart form, independent of the HTTP framework.
///
/// Parts carrying a filename are files; everything else is a text field.
/// When a name repeats, the first occurrence wins.
#[derive(Debug, Clone, Default)]
pub struct RawForm {
    fields: HashMap<String, String>,
    files: HashMap<String, FilePart>,
}

impl RawForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.entry(name.into()).or_insert_with(|| value.into());
    }

    pub fn insert_file(&mut self, name: impl Into<String>, file: FilePart) {
        self.files.entry(name.into()).or_insert(file);
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn file(&self, name: &str) -> Option<&FilePart> {
        self.files.get(name)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub(crate) fn take_field(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }

    pub(crate) fn take_file(&mut self, name: &str) -> Option<FilePart> {
        self.files.remove(name)
    }
}

// =============================================================================
// Inbound Callback
// =============================================================================

/// What the upstream API reported for a generation job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The image was generated and delivered
    Generated(FilePart),
    /// The upstream job failed
    Failed {
        /// Status value sent by the upstream (anything but "200")
        status: String,
        /// Human-readable failure reason
        message: String,
    },
}

/// A parsed webhook callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundCallback {
    /// Correlates the callback with the submitted job
    pub id_gen: String,
    /// Generation time label, logged only
    pub time_gen: String,
    pub outcome: CallbackOutcome,
}
