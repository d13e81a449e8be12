//! File upload handling.
//!
//! Handles:
//! - Upload validation (size and MIME type limits)
//! - Binary ↔ data URI encoding for storage and re-display
//! - Human-readable file sizes
//! - Test type inference from file names

mod encoding;
mod test_type;

pub use encoding::*;
pub use test_type::*;

use thiserror::Error;

use crate::config::CoreConfig;

/// Upload errors.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("File too large: {size} bytes (max {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("Patient email is required")]
    MissingPatientEmail,

    #[error("Failed to read file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),
}

/// A file as received from the upload form.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub name: String,
    /// MIME type as reported by the client
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Limits applied before a file reaches the store.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadLimits {
    pub max_bytes: u64,
    pub accepted_mime_types: Vec<String>,
}

/// 2 MB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 2 * 1024 * 1024;

pub const DEFAULT_ACCEPTED_MIME_TYPES: [&str; 4] =
    ["application/pdf", "image/jpeg", "image/jpg", "image/png"];

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            accepted_mime_types: DEFAULT_ACCEPTED_MIME_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl From<&CoreConfig> for UploadLimits {
    fn from(config: &CoreConfig) -> Self {
        Self {
            max_bytes: config.max_upload_bytes,
            accepted_mime_types: config.accepted_mime_types.clone(),
        }
    }
}

/// Validate an upload against size and type limits.
pub fn validate_upload(
    file: &UploadedFile,
    patient_email: &str,
    limits: &UploadLimits,
) -> Result<(), UploadError> {
    if file.size() > limits.max_bytes {
        return Err(UploadError::TooLarge {
            size: file.size(),
            max: limits.max_bytes,
        });
    }

    let mime = file.mime_type.to_lowercase();
    if !limits.accepted_mime_types.iter().any(|t| *t == mime) {
        return Err(UploadError::UnsupportedType(file.mime_type.clone()));
    }

    if patient_email.trim().is_empty() {
        return Err(UploadError::MissingPatientEmail);
    }

    Ok(())
}
