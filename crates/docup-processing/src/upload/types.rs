//! Pipeline states.
//!
//! Each state owns exactly the data produced so far; a step consumes one state
//! and yields the next.

use docup_core::{StorageDescriptor, UploadRequest, UploadResult};
use uuid::Uuid;

/// Name of a pipeline state, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    Received,
    Validated,
    Scanned,
    Extracted,
    Stored,
    Completed,
}

/// Passed every validation rule.
#[derive(Debug)]
pub struct ValidatedUpload {
    pub upload_id: Uuid,
    pub request: UploadRequest,
    /// Resolved from the validated extension; reported in the result.
    pub mime_type: String,
}

/// Screened by the content scanner, or let through by the fail-open policy.
#[derive(Debug)]
pub struct ScannedUpload {
    pub validated: ValidatedUpload,
    pub scan_passed: bool,
}

#[derive(Debug)]
pub struct ExtractedUpload {
    pub scanned: ScannedUpload,
    /// Empty when extraction failed or was unsupported.
    pub extracted_text: String,
}

#[derive(Debug)]
pub struct StoredUpload {
    pub extracted: ExtractedUpload,
    pub descriptor: StorageDescriptor,
}

#[derive(Debug)]
pub enum UploadState {
    Received(UploadRequest),
    Validated(ValidatedUpload),
    Scanned(ScannedUpload),
    Extracted(ExtractedUpload),
    Stored(StoredUpload),
    Completed(UploadResult),
}

impl UploadState {
    pub fn stage(&self) -> UploadStage {
        match self {
            UploadState::Received(_) => UploadStage::Received,
            UploadState::Validated(_) => UploadStage::Validated,
            UploadState::Scanned(_) => UploadStage::Scanned,
            UploadState::Extracted(_) => UploadStage::Extracted,
            UploadState::Stored(_) => UploadStage::Stored,
            UploadState::Completed(_) => UploadStage::Completed,
        }
    }
}

impl StoredUpload {
    /// Build the final result. Only reachable once the file is on disk.
    pub fn into_result(self) -> UploadResult {
        let StoredUpload {
            extracted,
            descriptor,
        } = self;

        UploadResult {
            filename: descriptor.stored_filename.clone(),
            size: descriptor.size,
            mime_type: extracted.scanned.validated.mime_type,
            extracted_text: extracted.extracted_text,
            uploaded_at: descriptor.uploaded_at,
            scan_passed: extracted.scanned.scan_passed,
            storage_path: descriptor.storage_path.clone(),
            descriptor,
        }
    }
}
