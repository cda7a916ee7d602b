pub mod clamav;
pub mod ocr;
