//! Upload pipeline: validate → scan → extract → store.
//!
//! [`UploadService`] drives one request through the states in
//! [`types`](super::types). Validation and scanning can reject, storage can
//! fail, extraction never aborts the upload.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use uuid::Uuid;

use docup_core::content_types;
use docup_core::{
    sanitize_for_log, ExtractionOutcome, ScanFallbackPolicy, ScanVerdict, UploadConfig,
    UploadRequest, UploadResult,
};
use docup_storage::{keys, NewObject, Storage};

use super::error::{Rejection, StorageFault, UploadError};
use super::traits::{ContentScanner, TextExtractor};
use super::types::{
    ExtractedUpload, ScannedUpload, StoredUpload, UploadState, ValidatedUpload,
};
use crate::validator::{UploadValidator, ValidationError};

/// Source of the upload timestamp (and so of the date partition).
pub type Clock = fn() -> DateTime<Utc>;

/// Availability of the external engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineStatus {
    pub scanner: bool,
    pub extractor: bool,
}

impl EngineStatus {
    pub fn all_available(&self) -> bool {
        self.scanner && self.extractor
    }
}

/// Upload orchestrator
///
/// Holds the engines for its whole lifetime. Cheap to clone; every clone
/// shares the same engines and storage.
#[derive(Clone)]
pub struct UploadService {
    validator: UploadValidator,
    scan_policy: ScanFallbackPolicy,
    scanner: Arc<dyn ContentScanner>,
    extractor: Arc<dyn TextExtractor>,
    storage: Arc<dyn Storage>,
    clock: Clock,
}

impl UploadService {
    pub fn new(
        config: &UploadConfig,
        scanner: Arc<dyn ContentScanner>,
        extractor: Arc<dyn TextExtractor>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self {
            validator: UploadValidator::from_config(config),
            scan_policy: config.scanner_unavailable_policy,
            scanner,
            extractor,
            storage,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn validator(&self) -> &UploadValidator {
        &self.validator
    }

    pub fn scan_policy(&self) -> ScanFallbackPolicy {
        self.scan_policy
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Run one upload through the pipeline.
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadResult, UploadError> {
        let upload_id = Uuid::new_v4();
        let start = Instant::now();

        tracing::info!(
            upload_id = %upload_id,
            filename = %sanitize_for_log(&request.original_filename),
            size_bytes = request.size(),
            "Upload received"
        );

        let mut state = UploadState::Received(request);
        loop {
            let from = state.stage();
            let next = match state {
                UploadState::Completed(result) => {
                    tracing::info!(
                        upload_id = %upload_id,
                        stored_filename = %result.filename,
                        size_bytes = result.size,
                        scan_passed = result.scan_passed,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "Upload completed"
                    );
                    return Ok(result);
                }
                other => self.step(upload_id, other).await,
            };

            match next {
                Ok(next) => {
                    tracing::debug!(
                        upload_id = %upload_id,
                        from = ?from,
                        to = ?next.stage(),
                        "Upload state transition"
                    );
                    state = next;
                }
                Err(err) => {
                    log_terminal(upload_id, from, &err);
                    return Err(err);
                }
            }
        }
    }

    async fn step(&self, upload_id: Uuid, state: UploadState) -> Result<UploadState, UploadError> {
        let next = match state {
            UploadState::Received(request) => {
                UploadState::Validated(self.validate(upload_id, request)?)
            }
            UploadState::Validated(validated) => UploadState::Scanned(self.scan(validated).await?),
            UploadState::Scanned(scanned) => UploadState::Extracted(self.extract(scanned).await),
            UploadState::Extracted(extracted) => UploadState::Stored(self.store(extracted).await?),
            UploadState::Stored(stored) => UploadState::Completed(stored.into_result()),
            UploadState::Completed(result) => UploadState::Completed(result),
        };
        Ok(next)
    }

    fn validate(
        &self,
        upload_id: Uuid,
        request: UploadRequest,
    ) -> Result<ValidatedUpload, ValidationError> {
        let extension = self
            .validator
            .validate_all(&request.original_filename, request.size())?;

        if !content_types::declared_type_matches(&extension, &request.content_type) {
            tracing::warn!(
                upload_id = %upload_id,
                extension = %extension,
                declared_content_type = %sanitize_for_log(&request.content_type),
                "Declared content type does not match file extension"
            );
        }
        let mime_type = content_types::resolve_content_type(&extension, &request.content_type);

        Ok(ValidatedUpload {
            upload_id,
            request,
            mime_type,
        })
    }

    async fn scan(&self, validated: ValidatedUpload) -> Result<ScannedUpload, Rejection> {
        let upload_id = validated.upload_id;

        let verdict = AssertUnwindSafe(self.scanner.scan(validated.request.data.clone()))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| ScanVerdict::Unavailable("content scanner panicked".to_string()));

        let scan_passed = match verdict {
            ScanVerdict::Clean => true,
            ScanVerdict::Infected(signature) => {
                tracing::warn!(
                    upload_id = %upload_id,
                    virus = %signature,
                    "Malicious content detected, upload rejected"
                );
                return Err(Rejection::Infected { signature });
            }
            ScanVerdict::Unavailable(reason) => match self.scan_policy {
                ScanFallbackPolicy::FailOpen => {
                    tracing::warn!(
                        upload_id = %upload_id,
                        reason = %reason,
                        policy = %self.scan_policy,
                        "Content scanner unavailable, continuing without a scan"
                    );
                    false
                }
                ScanFallbackPolicy::FailClosed => {
                    tracing::error!(
                        upload_id = %upload_id,
                        reason = %reason,
                        policy = %self.scan_policy,
                        "Content scanner unavailable, upload rejected"
                    );
                    return Err(Rejection::ScannerUnavailable);
                }
            },
        };

        Ok(ScannedUpload {
            validated,
            scan_passed,
        })
    }

    async fn extract(&self, scanned: ScannedUpload) -> ExtractedUpload {
        let upload_id = scanned.validated.upload_id;
        let data = scanned.validated.request.data.clone();

        let outcome = AssertUnwindSafe(self.extractor.extract(data, &scanned.validated.mime_type))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| ExtractionOutcome::Failed("text extractor panicked".to_string()));

        let extracted_text = match outcome {
            ExtractionOutcome::Text(text) => {
                tracing::debug!(
                    upload_id = %upload_id,
                    text_len = text.len(),
                    "Text extracted"
                );
                text
            }
            ExtractionOutcome::Failed(reason) => {
                tracing::warn!(
                    upload_id = %upload_id,
                    reason = %reason,
                    "Text extraction failed, continuing with empty text"
                );
                String::new()
            }
        };

        ExtractedUpload {
            scanned,
            extracted_text,
        }
    }

    async fn store(&self, extracted: ExtractedUpload) -> Result<StoredUpload, StorageFault> {
        let validated = &extracted.scanned.validated;

        let sanitized = keys::sanitize(&validated.request.original_filename);
        let object = NewObject {
            stored_filename: keys::stored_filename(validated.upload_id, &sanitized),
            original_filename: validated.request.original_filename.clone(),
            content_type: validated.mime_type.clone(),
        };

        let descriptor = self
            .storage
            .store(validated.request.data.clone(), object, (self.clock)())
            .await
            .map_err(StorageFault::new)?;

        Ok(StoredUpload {
            extracted,
            descriptor,
        })
    }

    /// Probe both engines concurrently.
    pub async fn engine_status(&self) -> EngineStatus {
        let (scanner, extractor) =
            tokio::join!(self.scanner.is_available(), self.extractor.is_available());
        EngineStatus { scanner, extractor }
    }

    /// Healthy when both the scanner and the extractor are reachable.
    pub async fn is_healthy(&self) -> bool {
        self.engine_status().await.all_available()
    }
}

fn log_terminal(upload_id: Uuid, from: super::types::UploadStage, err: &UploadError) {
    match err {
        UploadError::Rejected(rejection) => {
            tracing::warn!(
                upload_id = %upload_id,
                stage = ?from,
                reason = %rejection,
                "Upload rejected"
            );
        }
        UploadError::Failed(fault) => {
            tracing::error!(
                upload_id = %upload_id,
                stage = ?from,
                error = %fault.storage_error(),
                "Upload failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use chrono::TimeZone;
    use docup_storage::{LocalStorage, StorageError, StorageResult};
    use docup_core::StorageDescriptor;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct MockScanner {
        verdict: ScanVerdict,
        available: bool,
        calls: AtomicUsize,
    }

    impl MockScanner {
        fn new(verdict: ScanVerdict) -> Arc<Self> {
            Arc::new(Self {
                available: !matches!(verdict, ScanVerdict::Unavailable(_)),
                verdict,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ContentScanner for MockScanner {
        async fn scan(&self, _data: Bytes) -> ScanVerdict {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.verdict.clone()
        }

        async fn is_available(&self) -> bool {
            self.available
        }
    }

    enum ExtractorBehavior {
        Text(&'static str),
        Fail,
        Panic,
    }

    struct MockExtractor {
        behavior: ExtractorBehavior,
        calls: AtomicUsize,
    }

    impl MockExtractor {
        fn new(behavior: ExtractorBehavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextExtractor for MockExtractor {
        async fn extract(&self, _data: Bytes, _content_type: &str) -> ExtractionOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                ExtractorBehavior::Text(text) => ExtractionOutcome::Text(text.to_string()),
                ExtractorBehavior::Fail => {
                    ExtractionOutcome::Failed("engine exited with status 1".to_string())
                }
                ExtractorBehavior::Panic => panic!("extractor crashed"),
            }
        }

        async fn is_available(&self) -> bool {
            true
        }
    }

    struct FailingStorage {
        root: PathBuf,
    }

    #[async_trait]
    impl Storage for FailingStorage {
        async fn store(
            &self,
            _data: Bytes,
            _object: NewObject,
            _uploaded_at: DateTime<Utc>,
        ) -> StorageResult<StorageDescriptor> {
            Err(StorageError::UploadFailed(
                "Failed to write file /srv/private/uploads/x.pdf: No space left on device"
                    .to_string(),
            ))
        }

        async fn read(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
            Err(StorageError::NotFound(storage_key.to_string()))
        }

        async fn exists(&self, _storage_key: &str) -> StorageResult<bool> {
            Ok(false)
        }

        fn root(&self) -> &Path {
            &self.root
        }
    }

    fn fixed_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 5, 12, 0, 0).unwrap()
    }

    fn config(policy: ScanFallbackPolicy) -> UploadConfig {
        UploadConfig {
            storage_path: "unused".to_string(),
            max_file_size_bytes: 5 * 1024 * 1024,
            allowed_extensions: vec!["jpg".into(), "jpeg".into(), "png".into(), "pdf".into()],
            scanner_unavailable_policy: policy,
        }
    }

    async fn service(
        root: &Path,
        scanner: Arc<MockScanner>,
        extractor: Arc<MockExtractor>,
        policy: ScanFallbackPolicy,
    ) -> UploadService {
        let storage = LocalStorage::new(root).await.unwrap();
        UploadService::new(&config(policy), scanner, extractor, Arc::new(storage))
            .with_clock(fixed_clock)
    }

    fn dir_is_empty(path: &Path) -> bool {
        std::fs::read_dir(path).unwrap().next().is_none()
    }

    fn pdf(name: &str, size: usize) -> UploadRequest {
        let mut data = b"%PDF-1.4\n".to_vec();
        data.resize(size, b'x');
        UploadRequest::new(name, "application/pdf", data)
    }

    #[tokio::test]
    async fn test_clean_pdf_completes_with_dated_path() {
        let dir = tempdir().unwrap();
        let scanner = MockScanner::new(ScanVerdict::Clean);
        let extractor = MockExtractor::new(ExtractorBehavior::Text("Quarterly report"));
        let service = service(
            dir.path(),
            scanner.clone(),
            extractor.clone(),
            ScanFallbackPolicy::FailClosed,
        )
        .await;

        let result = service
            .upload(pdf("report.PDF", 2 * 1024 * 1024))
            .await
            .unwrap();

        assert_eq!(result.mime_type, "application/pdf");
        assert!(result.scan_passed);
        assert_eq!(result.extracted_text, "Quarterly report");
        assert_eq!(result.size, 2 * 1024 * 1024);
        assert_eq!(result.uploaded_at, fixed_clock());

        let (uuid_part, rest) = result.filename.split_once('_').unwrap();
        assert!(Uuid::parse_str(uuid_part).is_ok());
        assert_eq!(rest, "report.pdf");

        let expected_dir = service.storage().root().join("2024").join("01").join("05");
        assert_eq!(result.storage_path, expected_dir.join(&result.filename));
        assert!(result.storage_path.exists());

        assert_eq!(result.descriptor.original_filename, "report.PDF");
        assert_eq!(result.descriptor.checksum.as_ref().map(|c| c.len()), Some(64));
        assert_eq!(scanner.calls(), 1);
        assert_eq!(extractor.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_upload_rejected_before_side_effects() {
        let dir = tempdir().unwrap();
        let scanner = MockScanner::new(ScanVerdict::Clean);
        let extractor = MockExtractor::new(ExtractorBehavior::Text(""));
        let service = service(
            dir.path(),
            scanner.clone(),
            extractor.clone(),
            ScanFallbackPolicy::FailOpen,
        )
        .await;

        let err = service
            .upload(UploadRequest::new("empty.pdf", "application/pdf", Bytes::new()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            UploadError::Rejected(Rejection::Invalid(ValidationError::EmptyFile))
        ));
        assert_eq!(scanner.calls(), 0);
        assert_eq!(extractor.calls(), 0);
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_oversized_upload_rejected() {
        let dir = tempdir().unwrap();
        let scanner = MockScanner::new(ScanVerdict::Clean);
        let extractor = MockExtractor::new(ExtractorBehavior::Text(""));
        let service = service(
            dir.path(),
            scanner.clone(),
            extractor,
            ScanFallbackPolicy::FailOpen,
        )
        .await;

        let err = service
            .upload(pdf("big.pdf", 5 * 1024 * 1024 + 1))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            UploadError::Rejected(Rejection::Invalid(ValidationError::SizeExceeded { .. }))
        ));
        assert_eq!(scanner.calls(), 0);
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_disallowed_extension_rejected_before_scan() {
        let dir = tempdir().unwrap();
        let scanner = MockScanner::new(ScanVerdict::Clean);
        let extractor = MockExtractor::new(ExtractorBehavior::Text(""));
        let service = service(
            dir.path(),
            scanner.clone(),
            extractor,
            ScanFallbackPolicy::FailOpen,
        )
        .await;

        let err = service
            .upload(UploadRequest::new(
                "my..secret.exe",
                "application/octet-stream",
                b"MZ".to_vec(),
            ))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            UploadError::Rejected(Rejection::Invalid(ValidationError::DisallowedType { .. }))
        ));
        assert_eq!(scanner.calls(), 0);
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_traversal_name_rejected() {
        let dir = tempdir().unwrap();
        let service = service(
            dir.path(),
            MockScanner::new(ScanVerdict::Clean),
            MockExtractor::new(ExtractorBehavior::Text("")),
            ScanFallbackPolicy::FailOpen,
        )
        .await;

        let err = service
            .upload(pdf("../../etc/passwd.pdf", 64))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            UploadError::Rejected(Rejection::Invalid(ValidationError::UnsafeName(_)))
        ));
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_infected_upload_rejected_without_writing() {
        let dir = tempdir().unwrap();
        let extractor = MockExtractor::new(ExtractorBehavior::Text("never"));
        let service = service(
            dir.path(),
            MockScanner::new(ScanVerdict::Infected("Eicar-Test-Signature".to_string())),
            extractor.clone(),
            ScanFallbackPolicy::FailOpen,
        )
        .await;

        let err = service.upload(pdf("invoice.pdf", 128)).await.unwrap_err();

        match err {
            UploadError::Rejected(Rejection::Infected { signature }) => {
                assert_eq!(signature, "Eicar-Test-Signature")
            }
            other => panic!("expected infected rejection, got {:?}", other),
        }
        assert_eq!(extractor.calls(), 0);
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_unavailable_scanner_fail_open_completes_unscanned() {
        let dir = tempdir().unwrap();
        let service = service(
            dir.path(),
            MockScanner::new(ScanVerdict::Unavailable("connection refused".to_string())),
            MockExtractor::new(ExtractorBehavior::Text("text")),
            ScanFallbackPolicy::FailOpen,
        )
        .await;

        let result = service.upload(pdf("notes.pdf", 128)).await.unwrap();

        assert!(!result.scan_passed);
        assert!(result.storage_path.exists());
    }

    #[tokio::test]
    async fn test_unavailable_scanner_fail_closed_rejects() {
        let dir = tempdir().unwrap();
        let extractor = MockExtractor::new(ExtractorBehavior::Text("text"));
        let service = service(
            dir.path(),
            MockScanner::new(ScanVerdict::Unavailable("timed out".to_string())),
            extractor.clone(),
            ScanFallbackPolicy::FailClosed,
        )
        .await;

        let err = service.upload(pdf("notes.pdf", 128)).await.unwrap_err();

        assert!(matches!(
            err,
            UploadError::Rejected(Rejection::ScannerUnavailable)
        ));
        assert_eq!(extractor.calls(), 0);
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_crashing_extractor_still_completes() {
        let dir = tempdir().unwrap();
        let service = service(
            dir.path(),
            MockScanner::new(ScanVerdict::Clean),
            MockExtractor::new(ExtractorBehavior::Panic),
            ScanFallbackPolicy::FailClosed,
        )
        .await;

        let result = service.upload(pdf("scan.pdf", 256)).await.unwrap();

        assert_eq!(result.extracted_text, "");
        assert!(result.storage_path.exists());
        assert_eq!(result.descriptor.size, 256);
        assert!(result.descriptor.checksum.is_some());
    }

    #[tokio::test]
    async fn test_failed_extraction_yields_empty_text() {
        let dir = tempdir().unwrap();
        let service = service(
            dir.path(),
            MockScanner::new(ScanVerdict::Clean),
            MockExtractor::new(ExtractorBehavior::Fail),
            ScanFallbackPolicy::FailClosed,
        )
        .await;

        let result = service.upload(pdf("scan.pdf", 256)).await.unwrap();
        assert_eq!(result.extracted_text, "");
    }

    #[tokio::test]
    async fn test_storage_failure_is_generic() {
        let service = UploadService::new(
            &config(ScanFallbackPolicy::FailClosed),
            MockScanner::new(ScanVerdict::Clean),
            MockExtractor::new(ExtractorBehavior::Text("")),
            Arc::new(FailingStorage {
                root: PathBuf::from("/srv/private/uploads"),
            }),
        );

        let err = service.upload(pdf("report.pdf", 64)).await.unwrap_err();

        assert!(matches!(err, UploadError::Failed(_)));
        assert_eq!(err.to_string(), "storage failure");
    }

    #[tokio::test]
    async fn test_concurrent_identical_uploads_get_distinct_paths() {
        let dir = tempdir().unwrap();
        let service = service(
            dir.path(),
            MockScanner::new(ScanVerdict::Clean),
            MockExtractor::new(ExtractorBehavior::Text("")),
            ScanFallbackPolicy::FailClosed,
        )
        .await;

        let (a, b) = tokio::join!(
            service.upload(pdf("same.pdf", 512)),
            service.upload(pdf("same.pdf", 512))
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.filename, b.filename);
        assert_ne!(a.storage_path, b.storage_path);
        assert_eq!(a.descriptor.checksum, b.descriptor.checksum);

        let storage = service.storage();
        assert_eq!(storage.read(&a.descriptor.storage_key).await.unwrap().len(), 512);
        assert_eq!(storage.read(&b.descriptor.storage_key).await.unwrap().len(), 512);
    }

    #[tokio::test]
    async fn test_mime_type_comes_from_extension() {
        let dir = tempdir().unwrap();
        let service = service(
            dir.path(),
            MockScanner::new(ScanVerdict::Clean),
            MockExtractor::new(ExtractorBehavior::Text("")),
            ScanFallbackPolicy::FailClosed,
        )
        .await;

        let result = service
            .upload(UploadRequest::new(
                "photo.JPG",
                "application/octet-stream",
                vec![0xFF, 0xD8, 0xFF, 0xE0],
            ))
            .await
            .unwrap();

        assert_eq!(result.mime_type, "image/jpeg");
        assert!(result.filename.ends_with("_photo.jpg"));
    }

    #[tokio::test]
    async fn test_health_requires_both_engines() {
        let dir = tempdir().unwrap();
        let healthy = service(
            dir.path(),
            MockScanner::new(ScanVerdict::Clean),
            MockExtractor::new(ExtractorBehavior::Text("")),
            ScanFallbackPolicy::FailClosed,
        )
        .await;
        assert!(healthy.is_healthy().await);

        let degraded = service(
            dir.path(),
            MockScanner::new(ScanVerdict::Unavailable("down".to_string())),
            MockExtractor::new(ExtractorBehavior::Text("")),
            ScanFallbackPolicy::FailClosed,
        )
        .await;
        let status = degraded.engine_status().await;
        assert!(!status.scanner);
        assert!(status.extractor);
        assert!(!degraded.is_healthy().await);
    }
}
