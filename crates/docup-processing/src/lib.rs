//! DocUp Processing Library
//!
//! Validation and orchestration of the upload pipeline:
//! validate → scan → extract → store.

pub mod upload;
pub mod validator;

pub use upload::{
    Clock, ContentScanner, EngineStatus, Rejection, StorageFault, TextExtractor, UploadError,
    UploadService, UploadStage,
};
pub use validator::{UploadValidator, ValidationError};
