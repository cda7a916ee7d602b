//! Boundaries to the external scanning and extraction engines.

use async_trait::async_trait;
use bytes::Bytes;
use docup_core::{ExtractionOutcome, ScanVerdict};

/// Malicious-content screening engine
///
/// Implementations report what the engine said and nothing more; the
/// unavailable-scanner policy is applied by the caller.
#[async_trait]
pub trait ContentScanner: Send + Sync {
    async fn scan(&self, data: Bytes) -> ScanVerdict;

    async fn is_available(&self) -> bool;
}

/// Text extraction engine
///
/// Failures are reported as [`ExtractionOutcome::Failed`], never as errors.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, data: Bytes, content_type: &str) -> ExtractionOutcome;

    async fn is_available(&self) -> bool;
}
