//! Shared types and utilities for swiftslice.
//!
//! This crate provides common functionality used across all swiftslice crates:
//! - Content digest computation (streaming MD5, the etag algorithm)
//! - Generic progress callback trait
//! - Remote object path joining and naming conventions
//! - Shared constants and error types

pub mod constants;
pub mod error;
pub mod hash;
pub mod progress;
pub mod remote_path;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::PathError;
pub use hash::{hash_bytes, Md5Hasher};
pub use progress::{progress_fn, FnProgress, NoOpProgress, ProgressCallback};
pub use remote_path::{
    chunk_object_path, join_path, manifest_entry_path, segment_container_for,
};
