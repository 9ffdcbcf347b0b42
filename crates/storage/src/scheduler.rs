//! Bounded-concurrency retrying upload driver.
//!
//! The scheduler is a single owning task: it pulls chunks from the slicer,
//! keeps at most `concurrency` transfers outstanding through a
//! [`FuturesUnordered`] set, and processes one completion at a time, so all
//! chunk-state mutation is serialized without locks.
//!
//! Work selection is a two-tier queue: chunks waiting for a retry
//! (oldest-failed-first) are always dispatched before new chunks are pulled
//! from the slicer. Retried chunks still hold their payload, so draining
//! them first keeps in-flight payload memory bounded and keeps failed
//! chunks from being starved by fresh work.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio_util::sync::CancellationToken;

use swiftslice_common::{chunk_object_path, progress_fn, ProgressCallback};

use crate::error::StorageError;
use crate::progress::ProgressAggregator;
use crate::slicer::{Chunk, ChunkState, DigestFuture, Slicer};
use crate::traits::ObjectStoreGateway;
use crate::types::{ByteProgress, UploadOptions};

/// Outcome of one chunk transfer attempt.
enum TransferResult {
    /// Bytes were sent and the object is now present.
    Uploaded { etag: String },
    /// The remote object already matched the local digest; nothing sent.
    Skipped { etag: String },
}

struct ChunkOutcome {
    number: u64,
    result: Result<TransferResult, StorageError>,
}

/// Result of a completed scheduling run: every chunk confirmed present,
/// in sequence order, plus transfer counters.
#[derive(Debug)]
pub struct ScheduleResult {
    /// All chunks, ordered by sequence number, all in the `Done` state
    /// with payloads released.
    pub chunks: Vec<Chunk>,
    /// Chunks whose bytes were transferred.
    pub chunks_uploaded: u64,
    /// Chunks skipped via digest match.
    pub chunks_skipped: u64,
    /// Bytes transferred.
    pub bytes_transferred: u64,
    /// Bytes skipped.
    pub bytes_skipped: u64,
}

/// Drives chunk transfers for one upload operation against a staging
/// container.
pub struct UploadScheduler<'a, G: ObjectStoreGateway> {
    gateway: &'a G,
    container: String,
    filename: String,
    concurrency: usize,
    retry_limit: u32,
    cancel: CancellationToken,
}

impl<'a, G: ObjectStoreGateway> UploadScheduler<'a, G> {
    /// Create a scheduler uploading chunks of `filename` into `container`
    /// (the staging container).
    pub fn new(
        gateway: &'a G,
        container: impl Into<String>,
        filename: impl Into<String>,
        options: &UploadOptions,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            gateway,
            container: container.into(),
            filename: filename.into(),
            concurrency: options.concurrency.max(1),
            retry_limit: options.retry_limit.max(1),
            cancel,
        }
    }

    /// Run the scheduling loop to completion.
    ///
    /// Resolves with the full ordered chunk queue once every chunk is
    /// confirmed present remotely. Rejects with the triggering error when
    /// any chunk exhausts its retry budget, with `Cancelled` when the
    /// token fires, and aborts outstanding transfers in both cases.
    pub async fn run(
        &self,
        slicer: &mut Slicer,
        progress: &ProgressAggregator<'_>,
    ) -> Result<ScheduleResult, StorageError> {
        let mut queue: Vec<Chunk> = Vec::with_capacity(slicer.total() as usize);
        let mut retry_queue: VecDeque<usize> = VecDeque::new();
        let mut inflight: FuturesUnordered<BoxFuture<'_, ChunkOutcome>> =
            FuturesUnordered::new();

        let mut chunks_uploaded: u64 = 0;
        let mut chunks_skipped: u64 = 0;
        let mut bytes_transferred: u64 = 0;
        let mut bytes_skipped: u64 = 0;

        loop {
            // Tick: fill every free slot. Retry work first, then new chunks.
            while inflight.len() < self.concurrency {
                if self.cancel.is_cancelled() {
                    return Err(StorageError::Cancelled);
                }

                let index: usize = match retry_queue.pop_front() {
                    Some(index) => index,
                    None => match slicer.next().await? {
                        Some(chunk) => {
                            queue.push(chunk);
                            queue.len() - 1
                        }
                        None => break,
                    },
                };

                let chunk: &mut Chunk = &mut queue[index];
                let payload: Arc<Vec<u8>> = match chunk.payload.clone() {
                    Some(payload) => payload,
                    None => {
                        return Err(StorageError::Other {
                            message: format!("chunk {} has no payload to dispatch", chunk.number),
                        })
                    }
                };
                chunk.state = ChunkState::Running;
                log::debug!("dispatching chunk {} ({} bytes)", chunk.number, chunk.size);

                inflight.push(Box::pin(self.transfer(
                    chunk.number,
                    payload,
                    chunk.digest.clone(),
                    progress,
                )));
            }

            if inflight.is_empty() {
                break;
            }

            let outcome: ChunkOutcome = tokio::select! {
                _ = self.cancel.cancelled() => return Err(StorageError::Cancelled),
                Some(outcome) = inflight.next() => outcome,
            };

            // Chunks are issued and appended in sequence order.
            let index: usize = (outcome.number - 1) as usize;
            let chunk: &mut Chunk = &mut queue[index];

            match outcome.result {
                Ok(TransferResult::Uploaded { etag }) => {
                    chunks_uploaded += 1;
                    bytes_transferred += chunk.size;
                    Self::finish_chunk(chunk, etag);
                    progress.chunk_done(chunk.number, chunk.size);
                }
                Ok(TransferResult::Skipped { etag }) => {
                    log::debug!("chunk {} already uploaded", chunk.number);
                    chunks_skipped += 1;
                    bytes_skipped += chunk.size;
                    Self::finish_chunk(chunk, etag);
                    progress.chunk_done(chunk.number, chunk.size);
                }
                Err(StorageError::Cancelled) => return Err(StorageError::Cancelled),
                Err(err) => {
                    chunk.retries += 1;
                    progress.chunk_failed(chunk.number);

                    if chunk.retries >= self.retry_limit {
                        chunk.state = ChunkState::FatalFailed;
                        log::warn!(
                            "chunk {} failed {} times, giving up: {}",
                            chunk.number,
                            chunk.retries,
                            err
                        );
                        return Err(StorageError::RetryExhausted {
                            number: chunk.number,
                            source: Box::new(err),
                        });
                    }

                    log::debug!(
                        "chunk {} failed (attempt {}), queued for retry: {}",
                        chunk.number,
                        chunk.retries,
                        err
                    );
                    chunk.state = ChunkState::RetryPending;
                    retry_queue.push_back(index);
                }
            }
        }

        Ok(ScheduleResult {
            chunks: queue,
            chunks_uploaded,
            chunks_skipped,
            bytes_transferred,
            bytes_skipped,
        })
    }

    fn finish_chunk(chunk: &mut Chunk, etag: String) {
        chunk.state = ChunkState::Done;
        chunk.etag = Some(etag);
        // Payload released here so peak memory stays bounded by
        // concurrency x slice size.
        chunk.payload = None;
    }

    async fn transfer(
        &self,
        number: u64,
        payload: Arc<Vec<u8>>,
        digest: DigestFuture,
        progress: &ProgressAggregator<'_>,
    ) -> ChunkOutcome {
        let result = self.transfer_inner(number, payload, digest, progress).await;
        ChunkOutcome { number, result }
    }

    async fn transfer_inner(
        &self,
        number: u64,
        payload: Arc<Vec<u8>>,
        digest: DigestFuture,
        progress: &ProgressAggregator<'_>,
    ) -> Result<TransferResult, StorageError> {
        let path: String = chunk_object_path(&self.filename, number);

        // Local digest and remote probe run concurrently; hashing overlaps
        // with the network round trip.
        let (digest, probe) = tokio::join!(digest, self.gateway.probe(&self.container, &path));
        let digest: String = digest.map_err(|message| StorageError::Other { message })?;

        match probe {
            Ok(Some(stat)) if stat.digest == digest => {
                log::debug!("local digest {} matches remote for chunk {}", digest, number);
                return Ok(TransferResult::Skipped { etag: digest });
            }
            Ok(_) => {}
            // Probe failures count against the chunk's retry budget the
            // same way transfer failures do.
            Err(err) => return Err(err),
        }

        let callback = progress_fn(move |bytes: &ByteProgress| {
            progress.transfer_progress(number, bytes.sent);
            true
        });
        self.gateway
            .upload(&self.container, &path, &payload, Some(&callback))
            .await?;

        Ok(TransferResult::Uploaded { etag: digest })
    }
}
