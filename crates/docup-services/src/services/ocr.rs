//! Text extraction adapter.
//!
//! Images go through the Tesseract CLI, PDFs through their embedded text layer.

use async_trait::async_trait;
use bytes::Bytes;
use docup_core::{ExtractionOutcome, OcrConfig};
use docup_processing::TextExtractor;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

#[derive(Clone, Debug)]
pub struct OcrTextExtractor {
    tesseract_path: String,
    language: String,
    timeout_secs: u64,
}

impl OcrTextExtractor {
    pub fn new(tesseract_path: String, language: String, timeout_secs: u64) -> Self {
        Self {
            tesseract_path,
            language,
            timeout_secs,
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(
            config.tesseract_path.clone(),
            config.language.clone(),
            config.timeout_secs,
        )
    }

    /// Run Tesseract on an image written to a temporary file.
    async fn extract_image_text(&self, data: Bytes) -> Result<String, String> {
        let temp = tempfile::Builder::new()
            .prefix("docup-ocr-")
            .tempfile()
            .map_err(|e| format!("Failed to create temp file for OCR: {}", e))?;
        tokio::fs::write(temp.path(), &data)
            .await
            .map_err(|e| format!("Failed to write OCR input: {}", e))?;

        let child = Command::new(&self.tesseract_path)
            .arg(temp.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("Failed to start tesseract: {}", e))?;

        let output = tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| format!("Tesseract timed out after {} seconds", self.timeout_secs))?
        .map_err(|e| format!("Tesseract failed: {}", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "Tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Read the PDF text layer on the blocking pool; a panic inside the parser becomes an error.
    async fn extract_pdf_text(&self, data: Bytes) -> Result<String, String> {
        tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&data)
                .map_err(|e| format!("PDF text extraction failed: {}", e))
        })
        .await
        .map_err(|e| format!("PDF extraction task failed: {}", e))?
    }

    /// Run `tesseract --version` within the timeout.
    pub async fn tesseract_available(&self) -> bool {
        let child = Command::new(&self.tesseract_path)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        match tokio::time::timeout(Duration::from_secs(self.timeout_secs), child).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                tracing::debug!(error = %e, path = %self.tesseract_path, "Tesseract not runnable");
                false
            }
            Err(_) => {
                tracing::debug!(timeout_secs = self.timeout_secs, "Tesseract version check timed out");
                false
            }
        }
    }
}

#[async_trait]
impl TextExtractor for OcrTextExtractor {
    async fn extract(&self, data: Bytes, content_type: &str) -> ExtractionOutcome {
        let start = Instant::now();
        let content_type = content_type.to_lowercase();

        let result = if content_type.starts_with("image/") {
            self.extract_image_text(data).await
        } else if content_type == "application/pdf" {
            self.extract_pdf_text(data).await
        } else {
            return ExtractionOutcome::Failed(format!(
                "unsupported content type: {}",
                content_type
            ));
        };

        match result {
            Ok(raw) => {
                let text = normalize_text(&raw);
                tracing::debug!(
                    content_type = %content_type,
                    text_len = text.len(),
                    duration_ms = start.elapsed().as_millis(),
                    "Text extraction completed"
                );
                ExtractionOutcome::Text(text)
            }
            Err(reason) => ExtractionOutcome::Failed(reason),
        }
    }

    async fn is_available(&self) -> bool {
        self.tesseract_available().await
    }
}

/// Collapse whitespace runs to single spaces and trim.
fn normalize_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
