//! Configuration module
//!
//! This module provides configuration structures for the upload pipeline,
//! the scanning and extraction engines, and the HTTP server.

use std::env;

use crate::scan_policy::ScanFallbackPolicy;

// Common constants
const MAX_FILE_SIZE_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_STORAGE_PATH: &str = "./uploads";
const DEFAULT_ALLOWED_EXTENSIONS: &str = "jpg,jpeg,png,pdf";
const CLAMAV_PORT: u16 = 3310;
const CLAMAV_TIMEOUT_SECS: u64 = 10;
const OCR_TIMEOUT_SECS: u64 = 30;
const SERVER_PORT: u16 = 8080;
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:4200,http://localhost";

/// HTTP server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
}

/// Settings consumed by the upload pipeline
#[derive(Clone, Debug)]
pub struct UploadConfig {
    pub storage_path: String,
    pub max_file_size_bytes: usize,
    /// Lower-cased, without leading dots.
    pub allowed_extensions: Vec<String>,
    pub scanner_unavailable_policy: ScanFallbackPolicy,
}

/// ClamAV daemon connection settings
#[derive(Clone, Debug)]
pub struct ScannerConfig {
    pub host: String,
    pub port: u16,
    pub timeout_secs: u64,
}

/// Tesseract settings
#[derive(Clone, Debug)]
pub struct OcrConfig {
    pub tesseract_path: String,
    pub language: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub upload: UploadConfig,
    pub scanner: ScannerConfig,
    pub ocr: OcrConfig,
}

impl Config {
    /// Load configuration from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let cors_origins_str = var("CORS_ORIGINS", DEFAULT_CORS_ORIGINS);
        if is_production_env(&environment) && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }
        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let scanner_unavailable_policy = lookup("SCANNER_UNAVAILABLE_POLICY")
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "SCANNER_UNAVAILABLE_POLICY must be set to fail-open or fail-closed"
                )
            })?
            .parse::<ScanFallbackPolicy>()?;

        let config = Config {
            server: ServerConfig {
                port: var("PORT", &SERVER_PORT.to_string())
                    .parse()
                    .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
                cors_origins,
                environment,
            },
            upload: UploadConfig {
                storage_path: var("DOCUP_STORAGE_PATH", DEFAULT_STORAGE_PATH),
                max_file_size_bytes: var(
                    "DOCUP_MAX_FILE_SIZE_BYTES",
                    &MAX_FILE_SIZE_BYTES.to_string(),
                )
                .parse()
                .map_err(|_| anyhow::anyhow!("DOCUP_MAX_FILE_SIZE_BYTES must be a valid number"))?,
                allowed_extensions: parse_extension_list(&var(
                    "DOCUP_ALLOWED_EXTENSIONS",
                    DEFAULT_ALLOWED_EXTENSIONS,
                )),
                scanner_unavailable_policy,
            },
            scanner: ScannerConfig {
                host: var("CLAMAV_HOST", "localhost"),
                port: var("CLAMAV_PORT", &CLAMAV_PORT.to_string())
                    .parse()
                    .map_err(|_| anyhow::anyhow!("CLAMAV_PORT must be a valid port number"))?,
                timeout_secs: var("CLAMAV_TIMEOUT_SECS", &CLAMAV_TIMEOUT_SECS.to_string())
                    .parse()
                    .map_err(|_| anyhow::anyhow!("CLAMAV_TIMEOUT_SECS must be a valid number"))?,
            },
            ocr: OcrConfig {
                tesseract_path: var("TESSERACT_PATH", "tesseract"),
                language: var("OCR_LANGUAGE", "eng"),
                timeout_secs: var("OCR_TIMEOUT_SECS", &OCR_TIMEOUT_SECS.to_string())
                    .parse()
                    .map_err(|_| anyhow::anyhow!("OCR_TIMEOUT_SECS must be a valid number"))?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.upload.validate()?;

        if self.scanner.timeout_secs == 0 {
            return Err(anyhow::anyhow!("CLAMAV_TIMEOUT_SECS must be greater than 0"));
        }
        if self.ocr.timeout_secs == 0 {
            return Err(anyhow::anyhow!("OCR_TIMEOUT_SECS must be greater than 0"));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_env(&self.server.environment)
    }

    pub fn server_port(&self) -> u16 {
        self.server.port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.server.cors_origins
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.upload.max_file_size_bytes
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.upload.allowed_extensions
    }

    pub fn scanner_unavailable_policy(&self) -> ScanFallbackPolicy {
        self.upload.scanner_unavailable_policy
    }
}

impl UploadConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.storage_path.trim().is_empty() {
            return Err(anyhow::anyhow!("DOCUP_STORAGE_PATH must not be empty"));
        }
        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!(
                "DOCUP_MAX_FILE_SIZE_BYTES must be greater than 0"
            ));
        }
        if self.allowed_extensions.is_empty() {
            return Err(anyhow::anyhow!(
                "DOCUP_ALLOWED_EXTENSIONS must list at least one extension"
            ));
        }
        Ok(())
    }
}

fn is_production_env(environment: &str) -> bool {
    let environment = environment.to_lowercase();
    environment == "production" || environment == "prod"
}

/// Parse a comma-separated extension list, lower-casing entries and dropping leading dots.
pub fn parse_extension_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_start_matches('.').to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
