use docup_core::AppError;
use docup_storage::StorageError;

use crate::validator::ValidationError;

/// Client-attributable reasons an upload was refused. Nothing is written.
#[derive(Debug, thiserror::Error)]
pub enum Rejection {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("File rejected: malicious content detected ({signature})")]
    Infected { signature: String },

    #[error("File rejected: content scanning is unavailable")]
    ScannerUnavailable,
}

/// The storage writer failed.
///
/// Displays a generic message; the wrapped error carries paths and is only
/// meant for logs.
#[derive(Debug, thiserror::Error)]
#[error("storage failure")]
pub struct StorageFault {
    #[source]
    source: StorageError,
}

impl StorageFault {
    pub fn new(source: StorageError) -> Self {
        Self { source }
    }

    pub fn storage_error(&self) -> &StorageError {
        &self.source
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error(transparent)]
    Failed(#[from] StorageFault),
}

impl From<ValidationError> for UploadError {
    fn from(err: ValidationError) -> Self {
        UploadError::Rejected(Rejection::Invalid(err))
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Rejected(Rejection::Invalid(e)) => match e {
                ValidationError::EmptyFile => AppError::InvalidInput(e.to_string()),
                ValidationError::SizeExceeded { .. } => AppError::PayloadTooLarge(e.to_string()),
                ValidationError::DisallowedType { .. } => {
                    AppError::UnsupportedFileType(e.to_string())
                }
                ValidationError::UnsafeName(_) => AppError::UnsafeFilename(e.to_string()),
            },
            UploadError::Rejected(Rejection::Infected { signature }) => {
                AppError::VirusDetected(signature)
            }
            UploadError::Rejected(Rejection::ScannerUnavailable) => {
                AppError::ScannerUnavailable("content scanner unavailable".to_string())
            }
            UploadError::Failed(fault) => AppError::Storage(fault.to_string()),
        }
    }
}
