//! DocUp Storage Library
//!
//! This crate provides the storage abstraction and the local filesystem writer
//! for uploaded documents, plus the filename sanitizer that derives on-disk names.
//!
//! # Storage key format
//!
//! Files are laid out by upload date (UTC):
//!
//! - `{root}/{yyyy}/{MM}/{dd}/{uuid}_{base}.{extension}`
//!
//! The storage key is the root-relative part of that path. Keys must not contain
//! `..` or a leading `/`. Key generation is centralized in the `keys` module.

pub mod checksum;
pub mod keys;
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use keys::{sanitize, SanitizedName};
pub use local::LocalStorage;
pub use traits::{NewObject, Storage, StorageError, StorageResult};
