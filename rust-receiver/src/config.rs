//! Configuration module for environment variable parsing.
//!
//! Reads all configuration from environment variables. Unset variables fall
//! back to defaults; unparsable values fall back too, with a warning.

use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;

use crate::store::{ImageStore, StorageKeyPolicy};

/// Default filename used by the fixed storage-key policy.
pub const DEFAULT_FIXED_FILENAME: &str = "resImage.png";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Web Server Configuration
    // =========================================================================
    /// Address the web server binds to
    pub bind_addr: IpAddr,

    /// Port for the web server to listen on
    pub port: u16,

    /// Maximum accepted request body size in bytes
    pub max_body_bytes: usize,

    // =========================================================================
    // Image Storage
    // =========================================================================
    /// Directory generated images are written to
    pub upload_dir: PathBuf,

    /// How the output filename is derived for each callback
    pub storage_key_policy: StorageKeyPolicy,

    // =========================================================================
    // Submit Client
    // =========================================================================
    /// Upstream image-generation endpoint
    pub api_url: Option<String>,

    /// Key sent in the `x-api-key` header
    pub api_key: Option<String>,

    /// Public URL of this receiver's `/webhook` endpoint
    pub webhook_url: Option<String>,

    /// HTTP request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 4000,
            max_body_bytes: 10 << 20,
            upload_dir: PathBuf::from("uploads"),
            storage_key_policy: StorageKeyPolicy::IdGen,
            api_url: None,
            api_key: None,
            webhook_url: None,
            request_timeout_ms: 30_000,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            bind_addr: parse_var("BIND_ADDR", defaults.bind_addr),
            port: parse_var("PORT", defaults.port),
            max_body_bytes: parse_var("MAX_BODY_BYTES", defaults.max_body_bytes),

            upload_dir: env::var("UPLOAD_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),

            storage_key_policy: parse_policy(
                "STORAGE_KEY_POLICY",
                "FIXED_FILENAME",
                defaults.storage_key_policy,
            ),

            api_url: non_empty_var("API_URL"),
            api_key: non_empty_var("API_KEY"),
            webhook_url: non_empty_var("WEBHOOK_URL"),
            request_timeout_ms: parse_var("REQUEST_TIMEOUT_MS", defaults.request_timeout_ms),
        }
    }

    /// Build the image store described by this configuration.
    pub fn image_store(&self) -> ImageStore {
        ImageStore::new(self.upload_dir.clone(), self.storage_key_policy.clone())
    }
}

/// Parse a typed environment variable, falling back to `default`.
fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

/// Read a variable, treating blank values as unset.
fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the storage-key policy ("id_gen" or "fixed").
fn parse_policy(name: &str, filename_var: &str, default: StorageKeyPolicy) -> StorageKeyPolicy {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "id_gen" | "idgen" => StorageKeyPolicy::IdGen,
        "fixed" => StorageKeyPolicy::Fixed(
            non_empty_var(filename_var).unwrap_or_else(|| DEFAULT_FIXED_FILENAME.to_string()),
        ),
        _ => {
            warn!(env_var = name, value = %raw, "Invalid storage key policy, using default");
            default
        }
    }
}
