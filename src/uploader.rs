use crate::config::AppConfig;
use crate::error::Error;
use crate::validator::InvalidCapture;
use reqwest::blocking::{multipart, Client};
use reqwest::header::COOKIE;
use reqwest::StatusCode;
use std::fmt;
use std::path::Path;
use tracing::{error, info};

/// Marker the service puts in a 200 response for content it has already seen.
pub const ALREADY_SUBMITTED_MARKER: &str = "already submitted";

/// Result of pushing one capture through the pipeline. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded,
    AlreadySubmitted,
    Skipped(String),
    Invalid(InvalidCapture),
    TransportFailed(String),
}

impl UploadOutcome {
    /// Whether the file's digest belongs in the ledger.
    pub fn is_recorded(&self) -> bool {
        matches!(self, UploadOutcome::Uploaded | UploadOutcome::AlreadySubmitted)
    }
}

impl fmt::Display for UploadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadOutcome::Uploaded => write!(f, "uploaded"),
            UploadOutcome::AlreadySubmitted => write!(f, "already submitted"),
            UploadOutcome::Skipped(reason) => write!(f, "skipped: {}", reason),
            UploadOutcome::Invalid(reason) => write!(f, "invalid: {}", reason),
            UploadOutcome::TransportFailed(reason) => write!(f, "upload failed: {}", reason),
        }
    }
}

/// Multipart client for the handshake analysis service.
///
/// The API key travels as a `key=` cookie; the service does not read it from any
/// header or query parameter.
pub struct Uploader {
    client: Client,
    endpoint: String,
    api_key: String,
    dry_run: bool,
}

impl Uploader {
    pub fn new(config: &AppConfig, dry_run: bool) -> Result<Self, Error> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            endpoint: config.api_base_url(),
            api_key: config.api_key.clone(),
            dry_run,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns only `Uploaded`, `AlreadySubmitted` or `TransportFailed`.
    pub fn upload(&self, path: &Path) -> UploadOutcome {
        if self.dry_run {
            info!("[DRY RUN] File {} would be uploaded.", path.display());
            return UploadOutcome::Uploaded;
        }

        let form = match multipart::Form::new().file("file", path) {
            Ok(form) => form,
            Err(e) => {
                error!("Could not open {} for upload: {}", path.display(), e);
                return UploadOutcome::TransportFailed(e.to_string());
            }
        };

        let response = match self
            .client
            .post(&self.endpoint)
            .header(COOKIE, format!("key={}", self.api_key))
            .multipart(form)
            .send()
        {
            Ok(response) => response,
            Err(e) => {
                error!(
                    "Request exception while uploading {}: {}",
                    path.display(),
                    e
                );
                return UploadOutcome::TransportFailed(e.to_string());
            }
        };

        let status = response.status();
        let body = match response.text() {
            Ok(body) => body,
            Err(e) => {
                error!(
                    "Failed to read response for {} (HTTP {}): {}",
                    path.display(),
                    status,
                    e
                );
                return UploadOutcome::TransportFailed(e.to_string());
            }
        };

        interpret_response(path, status, &body)
    }
}

fn interpret_response(path: &Path, status: StatusCode, body: &str) -> UploadOutcome {
    if status != StatusCode::OK {
        error!(
            "Failed to upload {}: HTTP {} - {}",
            path.display(),
            status.as_u16(),
            body
        );
        return UploadOutcome::TransportFailed(format!("HTTP {}", status.as_u16()));
    }

    if body.contains(ALREADY_SUBMITTED_MARKER) {
        info!("File {} was already submitted.", path.display());
        UploadOutcome::AlreadySubmitted
    } else {
        info!("Successfully uploaded: {}", path.display());
        UploadOutcome::Uploaded
    }
}
