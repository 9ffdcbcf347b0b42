//! Shared constants used across swiftslice crates.

/// Default slice size for chunked uploads (2MB).
/// Each slice is uploaded as an independent object in the segment container.
pub const DEFAULT_SLICE_SIZE: u64 = 2 * 1024 * 1024;

/// Default number of simultaneously outstanding transfer operations.
pub const DEFAULT_CONCURRENCY: usize = 2;

/// Default per-chunk retry limit before the whole upload is rejected.
pub const DEFAULT_RETRY_LIMIT: u32 = 3;

/// Prefix for the staging container that holds uploaded chunks
/// prior to manifest commit.
pub const SEGMENT_CONTAINER_PREFIX: &str = "_segments_";
