//! High-level upload orchestration.
//!
//! This module ties the engine together for any [`ObjectStoreGateway`]
//! implementation:
//!
//! - Chunked uploads: slice, schedule under bounded concurrency with
//!   retry, skip chunks whose remote digest already matches, commit the
//!   manifest.
//! - Direct uploads for objects small enough not to bother slicing.
//! - Manifest-aware deletes.
//!
//! # Example
//!
//! ```ignore
//! use swiftslice_storage::{SliceSource, UploadOrchestrator, UploadOptions};
//!
//! let orchestrator = UploadOrchestrator::new(&gateway)
//!     .with_options(UploadOptions::new().with_concurrency(4));
//! let summary = orchestrator
//!     .upload(SliceSource::FilePath(path), "movie.mp4", "videos", None)
//!     .await?;
//! ```

use tokio_util::sync::CancellationToken;

use swiftslice_common::{join_path, segment_container_for, ProgressCallback};

use crate::error::StorageError;
use crate::manifest::ManifestBuilder;
use crate::progress::ProgressAggregator;
use crate::scheduler::{ScheduleResult, UploadScheduler};
use crate::slicer::{SliceSource, Slicer};
use crate::traits::ObjectStoreGateway;
use crate::types::{ByteProgress, UploadOptions, UploadSummary};

/// High-level upload operations using any gateway implementation.
pub struct UploadOrchestrator<'a, G: ObjectStoreGateway> {
    gateway: &'a G,
    options: UploadOptions,
    cancel: CancellationToken,
}

impl<'a, G: ObjectStoreGateway> UploadOrchestrator<'a, G> {
    /// Create a new orchestrator with default options.
    pub fn new(gateway: &'a G) -> Self {
        Self {
            gateway,
            options: UploadOptions::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Set upload options.
    pub fn with_options(mut self, options: UploadOptions) -> Self {
        self.options = options;
        self
    }

    /// Use an external cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that cancels this orchestrator's operations when fired.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Upload a source as a chunked object.
    ///
    /// Ensures the `_segments_` staging container exists, uploads all
    /// chunks (skipping any whose remote digest already matches), then
    /// commits the manifest under `container/filename` and optionally
    /// updates its content type. `progress` receives the overall
    /// completion ratio in `[0, 1]`; returning `false` cancels.
    ///
    /// Malformed names fail synchronously, before any network call.
    pub async fn upload(
        &self,
        source: SliceSource,
        filename: &str,
        container: &str,
        progress: Option<&dyn ProgressCallback<f64>>,
    ) -> Result<UploadSummary, StorageError> {
        let filename: &str = self.options.filename.as_deref().unwrap_or(filename);
        join_path(&[container, filename])?;

        let segment_container: String = segment_container_for(container);
        self.gateway.ensure_container(&segment_container).await?;

        let mut slicer: Slicer = Slicer::open(source, self.options.slice_size).await?;
        log::debug!(
            "uploading {} as {} chunks to {}",
            filename,
            slicer.total(),
            segment_container
        );

        let aggregator = ProgressAggregator::new(slicer.size(), progress, self.cancel.clone());
        let scheduler = UploadScheduler::new(
            self.gateway,
            segment_container.clone(),
            filename,
            &self.options,
            self.cancel.clone(),
        );
        let result: ScheduleResult = scheduler.run(&mut slicer, &aggregator).await?;

        let manifest: ManifestBuilder =
            ManifestBuilder::from_chunks(&segment_container, filename, &result.chunks)?;
        manifest
            .commit(
                self.gateway,
                container,
                filename,
                self.options.content_type.as_deref(),
            )
            .await?;

        Ok(UploadSummary {
            chunks_total: result.chunks.len() as u64,
            chunks_uploaded: result.chunks_uploaded,
            chunks_skipped: result.chunks_skipped,
            bytes_transferred: result.bytes_transferred,
            bytes_skipped: result.bytes_skipped,
        })
    }

    /// Upload bytes as a single object, without slicing or manifest.
    pub async fn direct_upload(
        &self,
        data: &[u8],
        filename: &str,
        container: &str,
        progress: Option<&dyn ProgressCallback<ByteProgress>>,
    ) -> Result<(), StorageError> {
        let filename: &str = self.options.filename.as_deref().unwrap_or(filename);
        join_path(&[container, filename])?;
        self.gateway
            .upload(container, filename, data, progress)
            .await
    }

    /// Delete an object, cascading over its chunks when it is a static
    /// large object.
    pub async fn delete(&self, container: &str, path: &str) -> Result<(), StorageError> {
        join_path(&[container, path])?;
        let cascade: bool = matches!(
            self.gateway.probe(container, path).await?,
            Some(stat) if stat.is_static_manifest
        );
        if cascade {
            log::debug!("{}/{} is a static manifest, cascading delete", container, path);
        }
        self.gateway.delete_object(container, path, cascade).await
    }
}
