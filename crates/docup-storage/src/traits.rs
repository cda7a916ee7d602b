//! Storage abstraction trait
//!
//! This module defines the Storage trait implemented by storage backends.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use docup_core::StorageDescriptor;
use std::path::Path;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Everything the writer needs to know about a file besides its bytes.
#[derive(Debug, Clone)]
pub struct NewObject {
    /// Single path component produced by the sanitizer.
    pub stored_filename: String,
    /// Client-supplied name, recorded for display only.
    pub original_filename: String,
    pub content_type: String,
}

/// Storage abstraction trait
///
/// The upload pipeline only talks to storage through this trait so the
/// filesystem writer can be swapped for a test double.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Persist `data` under the date partition for `uploaded_at` and describe the result.
    ///
    /// A file already present at the exact same path is replaced.
    async fn store(
        &self,
        data: Bytes,
        object: NewObject,
        uploaded_at: DateTime<Utc>,
    ) -> StorageResult<StorageDescriptor>;

    /// Read a stored file by its root-relative key
    async fn read(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Check whether a file exists at the root-relative key
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Absolute storage root
    fn root(&self) -> &Path;
}
