//! Chunked upload engine for Swift-style object storage.
//!
//! Large objects are sliced into fixed-size chunks, staged into a
//! `_segments_` companion container under bounded concurrency with
//! per-chunk retry, then stitched back together by committing a static
//! manifest under the destination name. Chunks whose remote digest
//! already matches the local payload are skipped, which makes interrupted
//! uploads resumable at chunk granularity.
//!
//! # Layers
//!
//! - [`ObjectStoreGateway`] - the backend trait; one object store
//!   operation per method
//! - [`Slicer`] - demand-driven chunk production with digests computed
//!   off the async runtime
//! - [`UploadScheduler`] - the bounded-concurrency retrying transfer loop
//! - [`ManifestBuilder`] - manifest assembly and commit
//! - [`UploadOrchestrator`] - the high-level entry point tying it all
//!   together
//!
//! [`MemoryGateway`] is an in-memory backend used throughout the test
//! suites; it models container/object semantics including manifests and
//! cascading deletes.

mod error;
mod manifest;
mod memory;
mod progress;
mod scheduler;
mod slicer;
mod traits;
mod types;
mod upload;

pub use error::StorageError;
pub use manifest::ManifestBuilder;
pub use memory::MemoryGateway;
pub use progress::ProgressAggregator;
pub use scheduler::{ScheduleResult, UploadScheduler};
pub use slicer::{Chunk, ChunkState, SliceSource, Slicer};
pub use traits::ObjectStoreGateway;
pub use types::{
    ByteProgress, ManifestEntry, ObjectStat, RemoteObject, UploadOptions, UploadSummary,
};
pub use upload::UploadOrchestrator;
