//! Shared data structures for storage operations.

use serde::{Deserialize, Serialize};

use swiftslice_common::{DEFAULT_CONCURRENCY, DEFAULT_RETRY_LIMIT, DEFAULT_SLICE_SIZE};

/// Result of a remote existence probe.
///
/// `digest` is the remote object's etag; a probe that finds nothing returns
/// `None` at the call site rather than an `ObjectStat` with an absent digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStat {
    /// Content digest (etag) reported by the store.
    pub digest: String,
    /// Object size in bytes.
    pub size: u64,
    /// True if the object is a static large object backed by a manifest.
    pub is_static_manifest: bool,
    /// True if the object is a dynamic large object.
    pub is_dynamic_manifest: bool,
}

/// One object returned by a container listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    /// Object name within its container.
    pub name: String,
    /// Object size in bytes.
    pub size: u64,
    /// Content digest (etag).
    pub digest: String,
}

/// One entry of a multi-part manifest, derived 1:1 from a finished chunk.
/// Immutable once created. Field names are the manifest wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Absolute chunk path: `/{segment_container}/{filename}-{number}`.
    pub path: String,
    /// Chunk content digest.
    pub etag: String,
    /// Chunk size in bytes.
    pub size_bytes: u64,
}

/// Byte-level progress of a single transfer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteProgress {
    /// Bytes sent so far.
    pub sent: u64,
    /// Total bytes for this request.
    pub total: u64,
}

/// Options for chunked upload operations.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Slice size in bytes. Every chunk but the last has exactly this size.
    pub slice_size: u64,
    /// Maximum number of simultaneously outstanding transfer operations.
    pub concurrency: usize,
    /// Per-chunk retry limit. Once a chunk has failed this many times the
    /// whole operation rejects.
    pub retry_limit: u32,
    /// Destination filename override.
    pub filename: Option<String>,
    /// Content type to set on the committed manifest via a follow-up
    /// metadata update.
    pub content_type: Option<String>,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            slice_size: DEFAULT_SLICE_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            retry_limit: DEFAULT_RETRY_LIMIT,
            filename: None,
            content_type: None,
        }
    }
}

impl UploadOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the slice size in bytes.
    pub fn with_slice_size(mut self, slice_size: u64) -> Self {
        self.slice_size = slice_size;
        self
    }

    /// Set the concurrency limit.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the per-chunk retry limit.
    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    /// Override the destination filename.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Set the content type for the committed manifest.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Aggregated statistics for one upload operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSummary {
    /// Total number of chunks the source was split into.
    pub chunks_total: u64,
    /// Chunks whose bytes were actually transferred.
    pub chunks_uploaded: u64,
    /// Chunks skipped because the remote digest already matched.
    pub chunks_skipped: u64,
    /// Total bytes transferred.
    pub bytes_transferred: u64,
    /// Total bytes skipped.
    pub bytes_skipped: u64,
}
