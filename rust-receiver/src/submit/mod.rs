//! Outbound client that submits an image to the generation API.
//!
//! The API answers asynchronously: the result is later delivered to the
//! `webhook` URL sent with the request, where the web server picks it up.
//! No retries are attempted.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::{
    multipart::{Form, Part},
    Client, StatusCode,
};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::Config;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Errors raised while submitting a job.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("image not found: {}", .0.display())]
    ImageNotFound(PathBuf),

    #[error("failed to read image {}: {source}", .path.display())]
    ReadImage {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("API_URL is not configured")]
    MissingApiUrl,

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with something other than 200.
    #[error("API error. Code: {status}, Response: {body}")]
    Api { status: u16, body: String },
}

/// A generation job to submit.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub image_path: PathBuf,
    pub webhook_url: Url,
    pub id_gen: String,
    /// Extra generation parameters, sent as text fields
    pub params: Vec<(String, String)>,
}

impl SubmitRequest {
    pub fn new(image_path: impl Into<PathBuf>, webhook_url: Url, id_gen: impl Into<String>) -> Self {
        Self {
            image_path: image_path.into(),
            webhook_url,
            id_gen: id_gen.into(),
            params: Vec::new(),
        }
    }

    /// Add a generation parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }
}

/// HTTP client for the generation API.
#[derive(Clone)]
pub struct SubmitClient {
    http: Client,
    api_url: Url,
    api_key: Option<String>,
}

impl SubmitClient {
    pub fn new(api_url: Url, api_key: Option<String>, timeout: Duration) -> Result<Self, SubmitError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_url,
            api_key,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, SubmitError> {
        let api_url = config.api_url.as_deref().ok_or(SubmitError::MissingApiUrl)?;
        Self::new(
            Url::parse(api_url)?,
            config.api_key.clone(),
            Duration::from_millis(config.request_timeout_ms),
        )
    }

    /// Submit a job and return the API's response body.
    pub async fn submit(&self, request: &SubmitRequest) -> Result<String, SubmitError> {
        let form = build_form(request).await?;

        info!(
            api_url = %self.api_url,
            id_gen = %request.id_gen,
            webhook_url = %request.webhook_url,
            param_count = request.params.len(),
            has_api_key = self.api_key.is_some(),
            "submit_request_starting"
        );

        let mut builder = self.http.post(self.api_url.clone()).multipart(form);
        if let Some(key) = &self.api_key {
            builder = builder.header(API_KEY_HEADER, key.as_str());
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                if e.is_timeout() {
                    error!(api_url = %self.api_url, error = %e, "submit_request_timeout");
                } else {
                    error!(api_url = %self.api_url, error = %e, "submit_request_error");
                }
                return Err(e.into());
            }
        };

        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK {
            error!(
                id_gen = %request.id_gen,
                status_code = status.as_u16(),
                "submit_api_error"
            );
            return Err(SubmitError::Api {
                status: status.as_u16(),
                body,
            });
        }

        info!(
            id_gen = %request.id_gen,
            status_code = status.as_u16(),
            "submit_request_complete"
        );

        Ok(body)
    }
}

/// Build the multipart form: `image`, `webhook`, `id_gen`, then extra params.
async fn build_form(request: &SubmitRequest) -> Result<Form, SubmitError> {
    let path = &request.image_path;
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SubmitError::ImageNotFound(path.clone()));
        }
        Err(source) => {
            return Err(SubmitError::ReadImage {
                path: path.clone(),
                source,
            });
        }
    };

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    let image = Part::bytes(data)
        .file_name(file_name)
        .mime_str(guess_mime(path))?;

    let mut form = Form::new()
        .part("image", image)
        .text("webhook", request.webhook_url.to_string())
        .text("id_gen", request.id_gen.clone());

    for (name, value) in &request.params {
        form = form.text(name.clone(), value.clone());
    }

    Ok(form)
}

/// Content type from the file extension.
fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}
