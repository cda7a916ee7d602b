//! Application state shared by every handler.

use docup_processing::UploadService;

#[derive(Clone)]
pub struct AppState {
    pub upload_service: UploadService,
}
