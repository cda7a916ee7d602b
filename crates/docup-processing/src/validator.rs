use docup_core::UploadConfig;
use docup_storage::keys;

/// Reasons an upload is refused before anything touches the scanner or disk.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("File is empty")]
    EmptyFile,

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    SizeExceeded { size: usize, max: usize },

    #[error("File type not allowed: '{extension}' (allowed: {allowed:?})")]
    DisallowedType {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("Unsafe filename: {0}")]
    UnsafeName(String),
}

/// Upload validator
///
/// Pure rule set applied to every upload. Rules run in a fixed order and the
/// first failure wins.
#[derive(Debug, Clone)]
pub struct UploadValidator {
    max_file_size: usize,
    allowed_extensions: Vec<String>,
}

impl UploadValidator {
    pub fn new(max_file_size: usize, allowed_extensions: Vec<String>) -> Self {
        Self {
            max_file_size,
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|e| e.to_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(
            config.max_file_size_bytes,
            config.allowed_extensions.clone(),
        )
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(ValidationError::SizeExceeded {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Reject filenames carrying NUL bytes
    pub fn validate_no_nul(&self, filename: &str) -> Result<(), ValidationError> {
        if filename.contains('\0') {
            return Err(ValidationError::UnsafeName(
                "filename contains a NUL byte".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate file extension, returning it lower-cased
    pub fn validate_extension(&self, filename: &str) -> Result<String, ValidationError> {
        let extension = keys::extension_of(filename);

        if extension.is_empty() || !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::DisallowedType {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        Ok(extension)
    }

    /// Reject filenames containing a parent-directory segment
    pub fn validate_no_traversal(&self, filename: &str) -> Result<(), ValidationError> {
        if filename.contains("..") {
            return Err(ValidationError::UnsafeName(
                "filename contains '..'".to_string(),
            ));
        }
        Ok(())
    }

    /// Run every rule in order and return the validated extension
    pub fn validate_all(&self, filename: &str, size: usize) -> Result<String, ValidationError> {
        self.validate_file_size(size)?;
        self.validate_no_nul(filename)?;
        let extension = self.validate_extension(filename)?;
        self.validate_no_traversal(filename)?;
        Ok(extension)
    }
}
