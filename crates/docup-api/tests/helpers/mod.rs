//! Test helpers: build AppState and router for integration tests.
//!
//! Engines are replaced with in-process fakes so the suite runs without
//! clamd or tesseract. Run with `cargo test -p docup-api`.

use async_trait::async_trait;
use axum_test::TestServer;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use docup_api::setup::routes;
use docup_api::state::AppState;
use docup_core::{Config, ExtractionOutcome, ScanVerdict};
use docup_processing::{ContentScanner, TextExtractor, UploadService};
use docup_storage::LocalStorage;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Maximum upload size configured for tests.
pub const TEST_MAX_FILE_SIZE: usize = 1024;

pub struct FakeScanner {
    pub verdict: ScanVerdict,
}

#[async_trait]
impl ContentScanner for FakeScanner {
    async fn scan(&self, _data: Bytes) -> ScanVerdict {
        self.verdict.clone()
    }

    async fn is_available(&self) -> bool {
        !matches!(self.verdict, ScanVerdict::Unavailable(_))
    }
}

pub struct FakeExtractor {
    pub text: &'static str,
    pub available: bool,
}

#[async_trait]
impl TextExtractor for FakeExtractor {
    async fn extract(&self, _data: Bytes, _content_type: &str) -> ExtractionOutcome {
        ExtractionOutcome::Text(self.text.to_string())
    }

    async fn is_available(&self) -> bool {
        self.available
    }
}

/// Test application: server plus the temporary storage root it writes into.
pub struct TestApp {
    pub server: TestServer,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn storage_root(&self) -> &Path {
        self._temp_dir.path()
    }

    /// Count regular files anywhere under the storage root.
    pub fn stored_file_count(&self) -> usize {
        count_files(self.storage_root())
    }
}

fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .map(|entry| {
                    let path = entry.path();
                    if path.is_dir() {
                        count_files(&path)
                    } else {
                        1
                    }
                })
                .sum()
        })
        .unwrap_or(0)
}

pub fn fixed_clock() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 5, 12, 0, 0).unwrap()
}

pub fn test_config(storage_root: &Path, policy: &str) -> Config {
    let mut vars: HashMap<&str, String> = HashMap::new();
    vars.insert("DOCUP_STORAGE_PATH", storage_root.display().to_string());
    vars.insert("DOCUP_MAX_FILE_SIZE_BYTES", TEST_MAX_FILE_SIZE.to_string());
    vars.insert("DOCUP_ALLOWED_EXTENSIONS", "jpg,jpeg,png,pdf".to_string());
    vars.insert("SCANNER_UNAVAILABLE_POLICY", policy.to_string());
    vars.insert("ENVIRONMENT", "test".to_string());

    Config::from_lookup(|key| vars.get(key).cloned()).expect("test config should be valid")
}

/// Build a test app with the given scanner verdict and policy.
pub async fn setup_test_app(verdict: ScanVerdict, policy: &str) -> TestApp {
    setup_test_app_with_extractor(verdict, policy, true).await
}

pub async fn setup_test_app_with_extractor(
    verdict: ScanVerdict,
    policy: &str,
    extractor_available: bool,
) -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = test_config(temp_dir.path(), policy);

    let storage = LocalStorage::new(temp_dir.path())
        .await
        .expect("Failed to create local storage");

    let upload_service = UploadService::new(
        &config.upload,
        Arc::new(FakeScanner { verdict }),
        Arc::new(FakeExtractor {
            text: "Invoice 42",
            available: extractor_available,
        }),
        Arc::new(storage),
    )
    .with_clock(fixed_clock);

    let state = Arc::new(AppState { upload_service });

    let router = routes::setup_routes(&config, state).expect("Failed to build router");
    let server = TestServer::new(router.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        _temp_dir: temp_dir,
    }
}
