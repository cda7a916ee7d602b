//! Extension to MIME type mapping.

/// Fallback for uploads whose type cannot be determined.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Canonical MIME type for a lower-cased file extension, if known.
pub fn canonical_content_type(extension: &str) -> Option<&'static str> {
    let content_type = match extension {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "csv" => "text/csv",
        _ => return None,
    };
    Some(content_type)
}

/// Normalize MIME type by stripping parameters (e.g. "image/jpeg; charset=utf-8" -> "image/jpeg").
pub fn normalize_mime_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .map(|s| s.trim())
        .unwrap_or(content_type)
        .to_lowercase()
}

/// Resolve the MIME type reported for an upload.
///
/// The extension wins when it is known; otherwise the declared type (without
/// parameters) is used, and `application/octet-stream` when neither is usable.
pub fn resolve_content_type(extension: &str, declared: &str) -> String {
    if let Some(canonical) = canonical_content_type(extension) {
        return canonical.to_string();
    }
    let declared = normalize_mime_type(declared);
    if declared.is_empty() {
        OCTET_STREAM.to_string()
    } else {
        declared
    }
}

/// Whether a declared content type agrees with the type implied by the extension.
///
/// Unknown extensions always match since there is nothing to compare against.
pub fn declared_type_matches(extension: &str, declared: &str) -> bool {
    match canonical_content_type(extension) {
        Some(canonical) => normalize_mime_type(declared) == canonical,
        None => true,
    }
}
