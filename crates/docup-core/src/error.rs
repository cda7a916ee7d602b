//! Error types module
//!
//! This module provides the application-level error type used by the HTTP
//! layer. Library crates define their own `thiserror` enums and convert into
//! `AppError` at the boundary.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues and policy rejections
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "STORAGE_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Unsafe filename: {0}")]
    UnsafeFilename(String),

    #[error("Virus detected: {0}")]
    VirusDetected(String),

    #[error("Scanner unavailable: {0}")]
    ScannerUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::InternalWithSource {
            message: "I/O error".to_string(),
            source: err.into(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

/// (status, code, recoverable, suggested action, sensitive, log level)
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::PayloadTooLarge(_) => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Reduce file size and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::UnsupportedFileType(_) => (
            400,
            "UNSUPPORTED_FILE_TYPE",
            false,
            Some("Upload one of the allowed file types"),
            false,
            LogLevel::Debug,
        ),
        AppError::UnsafeFilename(_) => (
            400,
            "UNSAFE_FILENAME",
            false,
            Some("Rename the file and try again"),
            false,
            LogLevel::Warn,
        ),
        AppError::VirusDetected(_) => (
            403,
            "VIRUS_DETECTED",
            false,
            None,
            false,
            LogLevel::Warn,
        ),
        AppError::ScannerUnavailable(_) => (
            503,
            "SCANNER_UNAVAILABLE",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Warn,
        ),
        AppError::Storage(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            false,
            Some("Contact support if this error persists"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get error type name for logging
    pub fn error_type(&self) -> &str {
        match self {
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::UnsupportedFileType(_) => "UnsupportedFileType",
            AppError::UnsafeFilename(_) => "UnsafeFilename",
            AppError::VirusDetected(_) => "VirusDetected",
            AppError::ScannerUnavailable(_) => "ScannerUnavailable",
            AppError::Storage(_) => "Storage",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::PayloadTooLarge(ref msg) => msg.clone(),
            AppError::UnsupportedFileType(ref msg) => msg.clone(),
            AppError::UnsafeFilename(ref msg) => msg.clone(),
            AppError::VirusDetected(ref signature) => {
                format!("File rejected: malicious content detected ({})", signature)
            }
            AppError::ScannerUnavailable(_) => {
                "File rejected: content scanning is currently unavailable".to_string()
            }
            AppError::Storage(_) => "storage failure".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}
