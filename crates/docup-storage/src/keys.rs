//! Stored-name and storage-key generation.
//!
//! Key format: `{yyyy}/{MM}/{dd}/{uuid}_{base}.{extension}`, dated in UTC.
//! Every backend must derive names through this module.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Base name used when nothing usable survives sanitization.
pub const UNNAMED_PLACEHOLDER: &str = "unnamed";

/// Common filesystem limit for a single path component.
const MAX_STORED_NAME_BYTES: usize = 255;
const MAX_EXTENSION_BYTES: usize = 32;
/// `{uuid}_` prefix plus the `.` before the extension.
const UUID_PREFIX_BYTES: usize = 36 + 1 + 1;

/// An untrusted filename reduced to safe components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedName {
    pub base: String,
    /// Lower-cased; empty when the original had no usable extension.
    pub extension: String,
}

/// Sanitize an untrusted filename into a base name and extension.
///
/// Pure and deterministic. The extension is whatever follows the last `.`,
/// provided that dot is neither the first nor the last character.
pub fn sanitize(original: &str) -> SanitizedName {
    let cleaned: String = original.chars().filter(|c| *c != '\0').collect();
    let (raw_base, raw_extension) = split_extension(&cleaned);

    let extension = truncate_bytes(
        clean_component(raw_extension).to_lowercase(),
        MAX_EXTENSION_BYTES,
    );

    let budget = MAX_STORED_NAME_BYTES - UUID_PREFIX_BYTES - extension.len();
    let base = truncate_bytes(clean_component(raw_base.trim()), budget)
        .trim_end_matches('.')
        .to_string();
    let base = if base.is_empty() {
        UNNAMED_PLACEHOLDER.to_string()
    } else {
        base
    };

    SanitizedName { base, extension }
}

/// Lower-cased extension as the sanitizer would derive it.
pub fn extension_of(original: &str) -> String {
    sanitize(original).extension
}

fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx < name.len() - 1 => (&name[..idx], &name[idx + 1..]),
        _ => (name, ""),
    }
}

/// Apply the character filter shared by base name and extension.
///
/// Whitespace is kept; only the base name is trimmed, so an extension such as
/// `"pdf "` survives as written and fails the allow-set check.
fn clean_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\r' | '\n' | '\t' => {
                out.push('_')
            }
            '.' if chars.peek() == Some(&'.') => {
                while chars.peek() == Some(&'.') {
                    chars.next();
                }
                out.push('_');
            }
            c => out.push(c),
        }
    }

    // A trailing dot would run into the extension separator.
    let out = out.trim_end_matches('.');
    match out.strip_prefix('.') {
        Some(rest) => format!("_{}", rest),
        None => out.to_string(),
    }
}

fn truncate_bytes(mut s: String, max: usize) -> String {
    if s.len() > max {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s.truncate(end);
    }
    s
}

/// Build the on-disk name `{id}_{base}.{extension}`.
pub fn stored_filename(id: Uuid, name: &SanitizedName) -> String {
    if name.extension.is_empty() {
        format!("{}_{}", id, name.base)
    } else {
        format!("{}_{}.{}", id, name.base, name.extension)
    }
}

/// Sanitize `original` and prefix it with a fresh v4 UUID.
pub fn generate_stored_filename(original: &str) -> String {
    stored_filename(Uuid::new_v4(), &sanitize(original))
}

/// `yyyy/MM/dd` for the given instant.
pub fn date_partition(at: DateTime<Utc>) -> String {
    at.format("%Y/%m/%d").to_string()
}

/// Root-relative key for a stored file.
pub fn storage_key(at: DateTime<Utc>, stored_filename: &str) -> String {
    format!("{}/{}", date_partition(at), stored_filename)
}

/// Whether `name` is usable as a single path component.
pub fn is_single_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}
