//! Domain models for the upload pipeline.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// A single untrusted upload as received from the transport.
///
/// Created per call and dropped once the pipeline finishes with it.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub original_filename: String,
    pub content_type: String,
    pub data: Bytes,
}

impl UploadRequest {
    pub fn new(
        original_filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            original_filename: original_filename.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Size of the content in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Metadata describing one durably stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageDescriptor {
    /// Name supplied by the client, kept for display only.
    pub original_filename: String,
    /// UUID-prefixed sanitized name the file is stored under.
    pub stored_filename: String,
    pub content_type: String,
    pub size: u64,
    /// Absolute path under the storage root.
    pub storage_path: PathBuf,
    /// Root-relative key (`yyyy/MM/dd/stored_filename`).
    pub storage_key: String,
    pub uploaded_at: DateTime<Utc>,
    /// Lowercase hex SHA-256 of the content; absent if hashing failed.
    pub checksum: Option<String>,
}

/// Outcome of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    /// The stored filename.
    pub filename: String,
    pub size: u64,
    pub mime_type: String,
    /// Extracted text; empty when extraction was unsupported or failed.
    pub extracted_text: String,
    pub uploaded_at: DateTime<Utc>,
    /// False when the scanner was unavailable and the fail-open policy let the upload through.
    pub scan_passed: bool,
    pub storage_path: PathBuf,
    pub descriptor: StorageDescriptor,
}

/// Verdict returned by a content scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanVerdict {
    Clean,
    /// Malicious content found; carries the engine's signature name.
    Infected(String),
    /// The engine could not produce a verdict (unreachable, timed out, garbled reply).
    Unavailable(String),
}

/// Outcome of a text extraction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    Text(String),
    Failed(String),
}
