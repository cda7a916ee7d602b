use crate::checksum::compute_checksum;
use crate::keys;
use crate::traits::{NewObject, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use docup_core::StorageDescriptor;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/docup/uploads")
    ///
    /// The root is made absolute and lexically normalized once, here. A root
    /// that is empty or still contains `..` after normalization is refused.
    pub async fn new(base_path: impl AsRef<Path>) -> StorageResult<Self> {
        let base_path = resolve_root(base_path.as_ref())?;

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        tracing::info!(root = %base_path.display(), "Local storage initialized");

        Ok(LocalStorage { base_path })
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// This function validates that the storage key doesn't contain path traversal
    /// sequences that could escape the base storage directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.is_empty()
            || storage_key.contains("..")
            || storage_key.starts_with('/')
            || storage_key.contains(['\\', '\0'])
        {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        let relative = Path::new(storage_key);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::InvalidKey(
                "Storage key must be a relative path".to_string(),
            ));
        }

        let path = self.base_path.join(relative);
        if path.strip_prefix(&self.base_path).is_err() {
            return Err(StorageError::InvalidKey(
                "Storage key resolves outside storage directory".to_string(),
            ));
        }

        Ok(path)
    }

    /// Reject paths that escape the root through symlinks.
    async fn ensure_within_root(&self, path: &Path) -> StorageResult<()> {
        let base_canonical = fs::canonicalize(&self.base_path).await.map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        if let Ok(canonical) = fs::canonicalize(path).await {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Ensure parent directory exists
    ///
    /// `create_dir_all` treats an existing directory as success, including one
    /// created concurrently by another upload.
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::UploadFailed(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn store(
        &self,
        data: Bytes,
        object: NewObject,
        uploaded_at: DateTime<Utc>,
    ) -> StorageResult<StorageDescriptor> {
        if !keys::is_single_component(&object.stored_filename) {
            return Err(StorageError::InvalidKey(format!(
                "Stored filename must be a single path component: {}",
                object.stored_filename
            )));
        }

        let key = keys::storage_key(uploaded_at, &object.stored_filename);
        let path = self.key_to_path(&key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        if let Err(e) = write_file(&path, &data).await {
            if let Err(cleanup_err) = fs::remove_file(&path).await {
                if cleanup_err.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        path = %path.display(),
                        error = %cleanup_err,
                        "Failed to remove partially written file"
                    );
                }
            }
            return Err(StorageError::UploadFailed(format!(
                "Failed to write file {}: {}",
                path.display(),
                e
            )));
        }

        let checksum = compute_checksum(data).await;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage write successful"
        );

        Ok(StorageDescriptor {
            original_filename: object.original_filename,
            stored_filename: object.stored_filename,
            content_type: object.content_type,
            size: size as u64,
            storage_path: path,
            storage_key: key,
            uploaded_at,
            checksum,
        })
    }

    async fn read(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(storage_key)?;
        let start = std::time::Instant::now();

        if !is_regular_file(&path).await {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }
        self.ensure_within_root(&path).await?;

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read {}: {}", storage_key, e))
        })?;

        tracing::debug!(
            key = %storage_key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage read successful"
        );

        Ok(data)
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(storage_key)?;
        Ok(is_regular_file(&path).await)
    }

    fn root(&self) -> &Path {
        &self.base_path
    }
}

/// Directories and missing paths are not stored objects.
async fn is_regular_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Create (or truncate), write and fsync.
async fn write_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    Ok(())
}

/// Make `configured` absolute and drop `.` components.
fn resolve_root(configured: &Path) -> StorageResult<PathBuf> {
    if configured.as_os_str().is_empty() || configured.to_string_lossy().trim().is_empty() {
        return Err(StorageError::ConfigError(
            "Storage path must not be empty".to_string(),
        ));
    }

    let absolute = if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        std::env::current_dir()?.join(configured)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(StorageError::ConfigError(format!(
                    "Storage path must not contain '..' segments: {}",
                    configured.display()
                )));
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    Ok(normalized)
}
