//! Deterministic slicing of a byte source into upload chunks.
//!
//! A source of `S` bytes with slice size `L` defines `N = ceil(S / L)`
//! chunks numbered 1..N. Every chunk but the last has exactly `L` bytes;
//! the last chunk is the remainder. Chunks are pulled lazily, one at a
//! time, so peak payload memory stays proportional to the scheduler's
//! concurrency rather than the file size.

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio::io::AsyncReadExt;

use swiftslice_common::hash_bytes;

use crate::error::StorageError;

/// Memoized digest of a chunk payload. Computation starts when the chunk
/// is issued, independent of transfer scheduling, so hashing overlaps
/// with dispatch. `Err` carries the message of a failed hashing task.
pub(crate) type DigestFuture = Shared<BoxFuture<'static, Result<String, String>>>;

fn spawn_digest(payload: Arc<Vec<u8>>) -> DigestFuture {
    tokio::task::spawn_blocking(move || hash_bytes(&payload))
        .map(|res| res.map_err(|e| e.to_string()))
        .boxed()
        .shared()
}

/// Transfer state of a single chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    /// Pulled from the slicer, not yet dispatched.
    Queued,
    /// Existence probe or transfer in flight.
    Running,
    /// Confirmed present remotely; payload released.
    Done,
    /// Failed with retry budget left; payload retained for redispatch.
    RetryPending,
    /// Retry budget exhausted. Terminates the whole operation.
    FatalFailed,
}

/// One contiguous byte range of the source, uploaded as an independent
/// object. Owned exclusively by the scheduler's queue from creation until
/// its terminal state.
pub struct Chunk {
    /// 1-based, contiguous sequence number.
    pub number: u64,
    /// Byte offset within the source.
    pub offset: u64,
    /// Chunk size in bytes.
    pub size: u64,
    /// Payload bytes; `None` once the chunk is `Done`.
    pub(crate) payload: Option<Arc<Vec<u8>>>,
    /// In-flight digest computation, started at issue time.
    pub(crate) digest: DigestFuture,
    /// Digest memoized once the chunk is confirmed present.
    pub(crate) etag: Option<String>,
    /// Current transfer state.
    pub state: ChunkState,
    /// Number of failed transfer attempts so far.
    pub retries: u32,
}

impl Chunk {
    /// Content digest, available once the chunk is `Done`.
    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    /// Whether the payload is still held in memory.
    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }
}

impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunk")
            .field("number", &self.number)
            .field("offset", &self.offset)
            .field("size", &self.size)
            .field("state", &self.state)
            .field("retries", &self.retries)
            .field("has_payload", &self.payload.is_some())
            .finish()
    }
}

/// Source of bytes for a chunked upload.
#[derive(Debug, Clone)]
pub enum SliceSource {
    /// In-memory bytes.
    Bytes(Vec<u8>),
    /// Read from the file at this path.
    FilePath(PathBuf),
}

enum SliceReader {
    Memory(Arc<Vec<u8>>),
    File { file: tokio::fs::File, path: String },
}

/// Lazy, pull-based chunk source.
///
/// The cursor is monotonic: every call to [`Slicer::next`] issues the next
/// not-yet-issued chunk, with no re-issuing and no rewinding.
pub struct Slicer {
    reader: SliceReader,
    size: u64,
    slice_size: u64,
    total: u64,
    issued: u64,
}

impl Slicer {
    /// Open a source for slicing.
    ///
    /// # Errors
    /// `InvalidConfig` if `slice_size` is zero; `IoError` if a file source
    /// cannot be opened or sized.
    pub async fn open(source: SliceSource, slice_size: u64) -> Result<Self, StorageError> {
        if slice_size == 0 {
            return Err(StorageError::InvalidConfig {
                message: "slice size must be greater than zero".to_string(),
            });
        }

        let (reader, size) = match source {
            SliceSource::Bytes(data) => {
                let size: u64 = data.len() as u64;
                (SliceReader::Memory(Arc::new(data)), size)
            }
            SliceSource::FilePath(path) => {
                let display: String = path.display().to_string();
                let file: tokio::fs::File =
                    tokio::fs::File::open(&path)
                        .await
                        .map_err(|e| StorageError::IoError {
                            path: display.clone(),
                            message: e.to_string(),
                        })?;
                let size: u64 = file
                    .metadata()
                    .await
                    .map_err(|e| StorageError::IoError {
                        path: display.clone(),
                        message: e.to_string(),
                    })?
                    .len();
                (SliceReader::File { file, path: display }, size)
            }
        };

        let total: u64 = size.div_ceil(slice_size);
        log::debug!("slicing {} bytes into {} chunks of {}", size, total, slice_size);

        Ok(Self {
            reader,
            size,
            slice_size,
            total,
            issued: 0,
        })
    }

    /// Total source size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Total number of chunks the source defines.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Count of chunks not yet issued.
    pub fn remaining(&self) -> u64 {
        self.total - self.issued
    }

    /// Issue the next chunk, or `None` if all chunks have been issued.
    ///
    /// The returned chunk's digest computation is already running.
    pub async fn next(&mut self) -> Result<Option<Chunk>, StorageError> {
        if self.issued >= self.total {
            return Ok(None);
        }

        let number: u64 = self.issued + 1;
        let offset: u64 = self.issued * self.slice_size;
        let size: u64 = if number == self.total {
            self.size - offset
        } else {
            self.slice_size
        };

        let payload: Arc<Vec<u8>> = match &mut self.reader {
            SliceReader::Memory(data) => {
                let start: usize = offset as usize;
                let end: usize = (offset + size) as usize;
                Arc::new(data[start..end].to_vec())
            }
            SliceReader::File { file, path } => {
                let mut buf: Vec<u8> = vec![0u8; size as usize];
                file.read_exact(&mut buf)
                    .await
                    .map_err(|e| StorageError::IoError {
                        path: path.clone(),
                        message: e.to_string(),
                    })?;
                Arc::new(buf)
            }
        };

        self.issued = number;

        Ok(Some(Chunk {
            number,
            offset,
            size,
            digest: spawn_digest(Arc::clone(&payload)),
            payload: Some(payload),
            etag: None,
            state: ChunkState::Queued,
            retries: 0,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    async fn collect_sizes(data: Vec<u8>, slice_size: u64) -> (Slicer, Vec<u64>) {
        let mut slicer = Slicer::open(SliceSource::Bytes(data), slice_size)
            .await
            .unwrap();
        let mut sizes: Vec<u64> = Vec::new();
        while let Some(chunk) = slicer.next().await.unwrap() {
            sizes.push(chunk.size);
        }
        (slicer, sizes)
    }

    #[tokio::test]
    async fn test_chunk_count_and_sizes_with_remainder() {
        let (slicer, sizes) = collect_sizes(vec![7u8; 250], 100).await;
        assert_eq!(slicer.total(), 3);
        assert_eq!(sizes, vec![100, 100, 50]);
        assert_eq!(sizes.iter().sum::<u64>(), 250);
    }

    #[tokio::test]
    async fn test_chunk_count_exact_multiple() {
        let (slicer, sizes) = collect_sizes(vec![0u8; 300], 100).await;
        assert_eq!(slicer.total(), 3);
        assert_eq!(sizes, vec![100, 100, 100]);
    }

    #[tokio::test]
    async fn test_single_chunk_source() {
        let (slicer, sizes) = collect_sizes(vec![1u8; 42], 100).await;
        assert_eq!(slicer.total(), 1);
        assert_eq!(sizes, vec![42]);
    }

    #[tokio::test]
    async fn test_empty_source_has_no_chunks() {
        let (slicer, sizes) = collect_sizes(Vec::new(), 100).await;
        assert_eq!(slicer.total(), 0);
        assert!(sizes.is_empty());
    }

    #[tokio::test]
    async fn test_zero_slice_size_rejected() {
        let result = Slicer::open(SliceSource::Bytes(vec![1, 2, 3]), 0).await;
        assert!(matches!(result, Err(StorageError::InvalidConfig { .. })));
    }

    #[tokio::test]
    async fn test_cursor_is_monotonic() {
        let mut slicer = Slicer::open(SliceSource::Bytes(vec![0u8; 250]), 100)
            .await
            .unwrap();
        assert_eq!(slicer.remaining(), 3);

        let first = slicer.next().await.unwrap().unwrap();
        assert_eq!(first.number, 1);
        assert_eq!(slicer.remaining(), 2);

        let second = slicer.next().await.unwrap().unwrap();
        assert_eq!(second.number, 2);
        assert_eq!(second.offset, 100);

        let third = slicer.next().await.unwrap().unwrap();
        assert_eq!(third.number, 3);
        assert_eq!(slicer.remaining(), 0);
        assert!(slicer.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_digest_starts_at_issue_and_matches_payload() {
        let data: Vec<u8> = (0u8..=255).cycle().take(150).collect();
        let mut slicer = Slicer::open(SliceSource::Bytes(data.clone()), 100)
            .await
            .unwrap();

        let chunk = slicer.next().await.unwrap().unwrap();
        let digest: String = chunk.digest.clone().await.unwrap();
        assert_eq!(digest, hash_bytes(&data[..100]));

        // Shared future memoizes: awaiting again yields the same value.
        assert_eq!(chunk.digest.clone().await.unwrap(), digest);
    }

    #[tokio::test]
    async fn test_file_source_slices_match_memory_source() {
        let data: Vec<u8> = (0u8..200).collect();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.bin");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&data).unwrap();
        drop(file);

        let mut slicer = Slicer::open(SliceSource::FilePath(path), 128).await.unwrap();
        assert_eq!(slicer.size(), 200);
        assert_eq!(slicer.total(), 2);

        let first = slicer.next().await.unwrap().unwrap();
        assert_eq!(first.payload.as_deref().unwrap().as_slice(), &data[..128]);
        let second = slicer.next().await.unwrap().unwrap();
        assert_eq!(second.payload.as_deref().unwrap().as_slice(), &data[128..]);
        assert_eq!(second.size, 72);
    }

    #[tokio::test]
    async fn test_file_source_missing_file() {
        let result = Slicer::open(
            SliceSource::FilePath(PathBuf::from("/nonexistent/source.bin")),
            100,
        )
        .await;
        assert!(matches!(result, Err(StorageError::IoError { .. })));
    }
}
