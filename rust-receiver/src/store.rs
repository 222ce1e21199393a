//! Local image storage.
//!
//! Images are written atomically: bytes land in a temporary file inside the
//! upload directory and are then renamed over the final path, so a reader
//! never observes a partially written image.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

/// Extension given to images stored under an `id_gen` key.
pub const IMAGE_EXTENSION: &str = "png";

/// Longest `id_gen` accepted as a storage key.
const MAX_KEY_LEN: usize = 200;

/// How the output filename is derived for a callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageKeyPolicy {
    /// `<upload_dir>/<id_gen>.png`. Concurrent callbacks never collide.
    IdGen,
    /// Always the same filename. Concurrent callbacks overwrite each other
    /// and the last rename wins.
    Fixed(String),
}

/// Errors raised while storing an image.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The callback id cannot be used as a filename.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("failed to create upload directory {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to write image {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("image write task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Writes callback images into a single directory.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
    policy: StorageKeyPolicy,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>, policy: StorageKeyPolicy) -> Self {
        Self {
            root: root.into(),
            policy,
        }
    }

    pub fn policy(&self) -> &StorageKeyPolicy {
        &self.policy
    }

    /// Resolve the final path for a callback.
    pub fn path_for(&self, id_gen: &str) -> Result<PathBuf, StoreError> {
        match &self.policy {
            StorageKeyPolicy::IdGen => {
                if !is_valid_key(id_gen) {
                    return Err(StoreError::InvalidKey(id_gen.to_string()));
                }
                Ok(self.root.join(format!("{}.{}", id_gen, IMAGE_EXTENSION)))
            }
            StorageKeyPolicy::Fixed(filename) => {
                if !is_valid_key(filename) {
                    return Err(StoreError::InvalidKey(filename.clone()));
                }
                Ok(self.root.join(filename))
            }
        }
    }

    /// Store `data` for the callback identified by `id_gen`.
    ///
    /// Returns the final path of the written image.
    pub async fn save(&self, id_gen: &str, data: Bytes) -> Result<PathBuf, StoreError> {
        let path = self.path_for(id_gen)?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| StoreError::CreateDir {
                path: self.root.clone(),
                source,
            })?;

        let dir = self.root.clone();
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&dir, &target, &data))
            .await?
            .map_err(|source| StoreError::Write {
                path: path.clone(),
                source,
            })?;

        debug!(path = %path.display(), "image_store_written");

        Ok(path)
    }
}

/// Write `data` to a temp file in `dir`, flush it, then rename it to `target`.
fn write_atomic(dir: &Path, target: &Path, data: &[u8]) -> io::Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

/// A key is usable as a filename if it cannot escape the upload directory.
fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && !key.starts_with('.')
        && !key
            .chars()
            .any(|c| c == '/' || c == '\\' || c == ':' || c.is_control())
}
