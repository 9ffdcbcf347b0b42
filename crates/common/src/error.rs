//! Shared error types used across swiftslice crates.

use thiserror::Error;

/// Remote-path errors shared across crates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    /// A path component is empty (or became empty after stripping the
    /// leading delimiter). Object URLs with empty components are rejected
    /// before any network call is made.
    #[error("Empty component in path: {parts}")]
    EmptyComponent {
        /// The components that were being joined, comma-separated.
        parts: String,
    },
}
