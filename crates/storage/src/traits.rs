//! Gateway trait for object-store operations.
//!
//! The upload engine is transport-agnostic: everything it needs from the
//! object store goes through [`ObjectStoreGateway`]. Implementations map
//! these operations onto their protocol (an HTTP backend, the in-memory
//! backend in [`crate::MemoryGateway`], ...).

use std::collections::HashMap;

use async_trait::async_trait;

use swiftslice_common::ProgressCallback;

use crate::error::StorageError;
use crate::types::{ByteProgress, ManifestEntry, ObjectStat, RemoteObject};

/// Object-store operations consumed by the upload engine.
#[async_trait]
pub trait ObjectStoreGateway: Send + Sync {
    /// Check whether an object exists and return its digest and manifest
    /// markers. Returns `Ok(None)` when the object does not exist; any
    /// other failure is an `Err`. Callers rely on that distinction.
    async fn probe(
        &self,
        container: &str,
        path: &str,
    ) -> Result<Option<ObjectStat>, StorageError>;

    /// Upload raw bytes as one object, reporting transfer byte progress
    /// through `progress` if requested.
    async fn upload(
        &self,
        container: &str,
        path: &str,
        data: &[u8],
        progress: Option<&dyn ProgressCallback<ByteProgress>>,
    ) -> Result<(), StorageError>;

    /// Create the container if it does not exist. Idempotent.
    async fn ensure_container(&self, container: &str) -> Result<(), StorageError>;

    /// Register a static large object assembled from `entries`, in order.
    async fn commit_manifest(
        &self,
        container: &str,
        filename: &str,
        entries: &[ManifestEntry],
    ) -> Result<(), StorageError>;

    /// Update object metadata headers. Manifest commit cannot set them,
    /// so content type and friends arrive as a second request.
    async fn update_metadata(
        &self,
        container: &str,
        filename: &str,
        headers: &HashMap<String, String>,
    ) -> Result<(), StorageError>;

    /// Delete an object. With `cascade` set, a static-manifest target must
    /// also remove the chunk objects it references.
    async fn delete_object(
        &self,
        container: &str,
        path: &str,
        cascade: bool,
    ) -> Result<(), StorageError>;

    /// Delete an empty container.
    async fn delete_container(&self, container: &str) -> Result<(), StorageError>;

    /// List the objects in a container.
    async fn list_objects(&self, container: &str) -> Result<Vec<RemoteObject>, StorageError>;

    /// List all containers.
    async fn list_containers(&self) -> Result<Vec<String>, StorageError>;
}
