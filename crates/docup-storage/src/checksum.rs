use bytes::Bytes;
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Hash on the blocking pool so large uploads don't stall the executor.
///
/// Returns `None` (and logs) if the hashing task fails; the caller treats the
/// checksum as optional.
pub async fn compute_checksum(data: Bytes) -> Option<String> {
    match tokio::task::spawn_blocking(move || sha256_hex(&data)).await {
        Ok(checksum) => Some(checksum),
        Err(e) => {
            tracing::warn!(error = %e, "Checksum computation failed; storing without checksum");
            None
        }
    }
}
