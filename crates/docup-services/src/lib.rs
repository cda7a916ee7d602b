//! DocUp Services Layer
//!
//! Adapters for the external engines the upload pipeline depends on: the
//! ClamAV daemon for content scanning and Tesseract / the PDF text layer for
//! text extraction. Each implements the matching `docup-processing` trait.

pub mod services;

pub use services::clamav::ClamAVService;
pub use services::ocr::OcrTextExtractor;
