//! Upload orchestration: validate → scan → extract → store.

pub mod error;
pub mod pipeline;
pub mod traits;
pub mod types;

pub use error::{Rejection, StorageFault, UploadError};
pub use pipeline::{Clock, EngineStatus, UploadService};
pub use traits::{ContentScanner, TextExtractor};
pub use types::UploadStage;
