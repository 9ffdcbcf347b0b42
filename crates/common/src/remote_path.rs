//! Remote object path joining and naming conventions.
//!
//! Object-storage URLs are built from container and object-path components
//! joined with `/`. Empty components are rejected eagerly so malformed names
//! fail before any network call is made.

use crate::constants::SEGMENT_CONTAINER_PREFIX;
use crate::error::PathError;

/// Join path components with `/`, validating each one.
///
/// A single leading `/` is stripped from each component so that manifest
/// entry paths (which start with `/`) can be joined directly.
///
/// # Errors
/// Returns [`PathError::EmptyComponent`] if any component is empty, or
/// becomes empty after stripping its leading delimiter.
pub fn join_path(parts: &[&str]) -> Result<String, PathError> {
    let mut cleaned: Vec<&str> = Vec::with_capacity(parts.len());

    for part in parts {
        let trimmed: &str = part.strip_prefix('/').unwrap_or(part);
        if trimmed.is_empty() {
            return Err(PathError::EmptyComponent {
                parts: parts.join(","),
            });
        }
        cleaned.push(trimmed);
    }

    Ok(cleaned.join("/"))
}

/// Name of the staging container holding chunk objects for `container`.
///
/// Returns `"_segments_{container}"`.
pub fn segment_container_for(container: &str) -> String {
    format!("{}{}", SEGMENT_CONTAINER_PREFIX, container)
}

/// Remote object path for one chunk of a sliced upload.
///
/// Returns `"{filename}-{number}"` where `number` is the 1-based chunk
/// sequence number.
pub fn chunk_object_path(filename: &str, number: u64) -> String {
    format!("{}-{}", filename, number)
}

/// Manifest entry path for one chunk.
///
/// Returns `"/{segment_container}/{filename}-{number}"`. The leading slash
/// is part of the manifest wire format: entry paths are absolute within the
/// storage account.
pub fn manifest_entry_path(segment_container: &str, filename: &str, number: u64) -> String {
    format!(
        "/{}/{}",
        segment_container,
        chunk_object_path(filename, number)
    )
}
