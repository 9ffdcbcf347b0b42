//! Manifest assembly and commit.
//!
//! Once every chunk of an upload is confirmed present in the staging
//! container, the manifest stitches them back into one logical object:
//! an ordered list of `{path, etag, size_bytes}` entries registered under
//! the destination filename.

use std::collections::HashMap;

use swiftslice_common::manifest_entry_path;

use crate::error::StorageError;
use crate::slicer::{Chunk, ChunkState};
use crate::traits::ObjectStoreGateway;
use crate::types::ManifestEntry;

/// Builds and commits the manifest for one finished chunked upload.
pub struct ManifestBuilder {
    entries: Vec<ManifestEntry>,
}

impl ManifestBuilder {
    /// Derive manifest entries from finished chunks.
    ///
    /// Chunks are sorted by sequence number; they arrive in order from the
    /// scheduler, but the manifest is the durable artifact so the order is
    /// enforced here as well.
    ///
    /// # Errors
    /// `Other` if any chunk is not `Done` or is missing its digest.
    pub fn from_chunks(
        segment_container: &str,
        filename: &str,
        chunks: &[Chunk],
    ) -> Result<Self, StorageError> {
        let mut ordered: Vec<&Chunk> = chunks.iter().collect();
        ordered.sort_by_key(|chunk| chunk.number);

        let mut entries: Vec<ManifestEntry> = Vec::with_capacity(ordered.len());
        for chunk in ordered {
            if chunk.state != ChunkState::Done {
                return Err(StorageError::Other {
                    message: format!(
                        "cannot build manifest: chunk {} is {:?}",
                        chunk.number, chunk.state
                    ),
                });
            }
            let etag: &str = chunk.etag().ok_or_else(|| StorageError::Other {
                message: format!("chunk {} has no digest", chunk.number),
            })?;
            entries.push(ManifestEntry {
                path: manifest_entry_path(segment_container, filename, chunk.number),
                etag: etag.to_string(),
                size_bytes: chunk.size,
            });
        }

        Ok(Self { entries })
    }

    /// The ordered manifest entries.
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Sum of all entry sizes; equals the source file size.
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.size_bytes).sum()
    }

    /// Serialize the ordered entry list to the manifest wire format.
    pub fn to_json(&self) -> Result<String, StorageError> {
        serde_json::to_string(&self.entries).map_err(|e| StorageError::Other {
            message: format!("failed to serialize manifest: {}", e),
        })
    }

    /// Commit the manifest under `container/filename`.
    ///
    /// Ensures the destination container exists, registers the manifest,
    /// and optionally issues a follow-up metadata update for the content
    /// type (manifest commit alone cannot set it).
    ///
    /// Commit failure is terminal: it is surfaced directly without retry.
    pub async fn commit<G: ObjectStoreGateway>(
        &self,
        gateway: &G,
        container: &str,
        filename: &str,
        content_type: Option<&str>,
    ) -> Result<(), StorageError> {
        gateway.ensure_container(container).await?;

        log::debug!(
            "committing manifest {}/{} ({} entries, {} bytes)",
            container,
            filename,
            self.entries.len(),
            self.total_bytes()
        );
        gateway
            .commit_manifest(container, filename, &self.entries)
            .await
            .map_err(|e| StorageError::ManifestCommitFailed {
                container: container.to_string(),
                filename: filename.to_string(),
                message: e.to_string(),
            })?;

        if let Some(content_type) = content_type {
            let mut headers: HashMap<String, String> = HashMap::new();
            headers.insert("Content-Type".to_string(), content_type.to_string());
            gateway.update_metadata(container, filename, &headers).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryGateway;
    use crate::slicer::{SliceSource, Slicer};
    use crate::traits::ObjectStoreGateway;

    async fn done_chunks(data: Vec<u8>, slice_size: u64) -> Vec<Chunk> {
        let mut slicer = Slicer::open(SliceSource::Bytes(data), slice_size)
            .await
            .unwrap();
        let mut chunks: Vec<Chunk> = Vec::new();
        while let Some(mut chunk) = slicer.next().await.unwrap() {
            let digest: String = chunk.digest.clone().await.unwrap();
            chunk.etag = Some(digest);
            chunk.state = ChunkState::Done;
            chunk.payload = None;
            chunks.push(chunk);
        }
        chunks
    }

    #[tokio::test]
    async fn test_entries_are_ordered_and_sum_to_source_size() {
        let chunks = done_chunks(vec![4u8; 250], 100).await;
        let builder = ManifestBuilder::from_chunks("_segments_c", "file.bin", &chunks).unwrap();

        let entries = builder.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].path, "/_segments_c/file.bin-1");
        assert_eq!(entries[1].path, "/_segments_c/file.bin-2");
        assert_eq!(entries[2].path, "/_segments_c/file.bin-3");
        assert_eq!(entries[2].size_bytes, 50);
        assert_eq!(builder.total_bytes(), 250);
    }

    #[tokio::test]
    async fn test_out_of_order_chunks_are_sorted() {
        let mut chunks = done_chunks(vec![4u8; 250], 100).await;
        chunks.reverse();
        let builder = ManifestBuilder::from_chunks("_segments_c", "file.bin", &chunks).unwrap();

        let numbers: Vec<&str> = builder
            .entries()
            .iter()
            .map(|e| e.path.rsplit('-').next().unwrap())
            .collect();
        assert_eq!(numbers, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_unfinished_chunk_is_rejected() {
        let mut chunks = done_chunks(vec![4u8; 200], 100).await;
        chunks[1].state = ChunkState::RetryPending;
        let result = ManifestBuilder::from_chunks("_segments_c", "file.bin", &chunks);
        assert!(matches!(result, Err(StorageError::Other { .. })));
    }

    #[tokio::test]
    async fn test_to_json_wire_format() {
        let chunks = done_chunks(vec![1u8; 100], 100).await;
        let builder = ManifestBuilder::from_chunks("_segments_c", "f", &chunks).unwrap();
        let json: String = builder.to_json().unwrap();
        assert!(json.starts_with(r#"[{"path":"/_segments_c/f-1","etag":""#));
        assert!(json.contains(r#""size_bytes":100"#));
    }

    #[tokio::test]
    async fn test_commit_creates_container_and_sets_content_type() {
        let gateway = MemoryGateway::new();
        gateway.ensure_container("_segments_c").await.unwrap();

        let data: Vec<u8> = vec![8u8; 150];
        let mut slicer = Slicer::open(SliceSource::Bytes(data), 100).await.unwrap();
        let mut chunks: Vec<Chunk> = Vec::new();
        while let Some(mut chunk) = slicer.next().await.unwrap() {
            let payload = chunk.payload.clone().unwrap();
            let path: String = format!("file.bin-{}", chunk.number);
            gateway
                .upload("_segments_c", &path, &payload, None)
                .await
                .unwrap();
            chunk.etag = Some(chunk.digest.clone().await.unwrap());
            chunk.state = ChunkState::Done;
            chunk.payload = None;
            chunks.push(chunk);
        }

        let builder = ManifestBuilder::from_chunks("_segments_c", "file.bin", &chunks).unwrap();
        builder
            .commit(&gateway, "c", "file.bin", Some("application/octet-stream"))
            .await
            .unwrap();

        let stat = gateway.probe("c", "file.bin").await.unwrap().unwrap();
        assert!(stat.is_static_manifest);
        assert_eq!(stat.size, 150);
        let metadata = gateway.object_metadata("c", "file.bin").unwrap();
        assert_eq!(metadata.get("Content-Type").unwrap(), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_commit_failure_is_terminal_error() {
        let gateway = MemoryGateway::new();
        let chunks = done_chunks(vec![1u8; 100], 100).await;
        // Chunks were never staged, so the commit must fail.
        let builder = ManifestBuilder::from_chunks("_segments_c", "file.bin", &chunks).unwrap();
        let err = builder
            .commit(&gateway, "c", "file.bin", None)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::ManifestCommitFailed { .. }));
    }
}
