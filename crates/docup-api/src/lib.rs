//! DocUp API Library
//!
//! This crate provides the HTTP handlers and application setup for the
//! document upload service.

mod handlers;
mod utils;

pub mod error;
pub mod setup;
pub mod state;
pub mod telemetry;

// Re-exports
pub use error::ErrorResponse;
pub use state::AppState;
