//! DocUp Core Library
//!
//! This crate provides the types shared by every DocUp crate: configuration,
//! the application error type, and the upload pipeline's domain models.

pub mod config;
pub mod content_types;
pub mod error;
pub mod log_safety;
pub mod models;
pub mod scan_policy;

pub use config::{Config, OcrConfig, ScannerConfig, ServerConfig, UploadConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use log_safety::sanitize_for_log;
pub use models::{ExtractionOutcome, ScanVerdict, StorageDescriptor, UploadRequest, UploadResult};
pub use scan_policy::ScanFallbackPolicy;
