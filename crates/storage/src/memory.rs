//! In-memory object-store backend.
//!
//! Implements the full [`ObjectStoreGateway`] contract against a
//! `RwLock<HashMap>`, including static-manifest commit validation and
//! cascading manifest deletes. Useful for tests and for embedders that
//! want a local backend with real gateway semantics.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use swiftslice_common::{hash_bytes, ProgressCallback};

use crate::error::StorageError;
use crate::traits::ObjectStoreGateway;
use crate::types::{ByteProgress, ManifestEntry, ObjectStat, RemoteObject};

struct StoredObject {
    data: Vec<u8>,
    digest: String,
    manifest: Option<Vec<ManifestEntry>>,
    metadata: HashMap<String, String>,
}

#[derive(Default)]
struct Container {
    objects: HashMap<String, StoredObject>,
}

/// In-memory gateway backed by a `RwLock<HashMap>`.
#[derive(Default)]
pub struct MemoryGateway {
    containers: RwLock<HashMap<String, Container>>,
}

impl MemoryGateway {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch an object's bytes. For a static manifest this is the logical
    /// concatenation of its chunks.
    pub fn object_bytes(&self, container: &str, path: &str) -> Option<Vec<u8>> {
        let containers = self.containers.read().expect("lock poisoned");
        containers
            .get(container)
            .and_then(|c| c.objects.get(path))
            .map(|o| o.data.clone())
    }

    /// Fetch an object's metadata headers.
    pub fn object_metadata(&self, container: &str, path: &str) -> Option<HashMap<String, String>> {
        let containers = self.containers.read().expect("lock poisoned");
        containers
            .get(container)
            .and_then(|c| c.objects.get(path))
            .map(|o| o.metadata.clone())
    }

    fn split_entry_path(path: &str) -> Result<(&str, &str), StorageError> {
        path.strip_prefix('/')
            .and_then(|rest| rest.split_once('/'))
            .ok_or_else(|| StorageError::Other {
                message: format!("malformed manifest entry path: {}", path),
            })
    }
}

#[async_trait]
impl ObjectStoreGateway for MemoryGateway {
    async fn probe(
        &self,
        container: &str,
        path: &str,
    ) -> Result<Option<ObjectStat>, StorageError> {
        let containers = self.containers.read().expect("lock poisoned");
        let stat: Option<ObjectStat> = containers
            .get(container)
            .and_then(|c| c.objects.get(path))
            .map(|obj| ObjectStat {
                digest: obj.digest.clone(),
                size: obj.data.len() as u64,
                is_static_manifest: obj.manifest.is_some(),
                is_dynamic_manifest: false,
            });
        Ok(stat)
    }

    async fn upload(
        &self,
        container: &str,
        path: &str,
        data: &[u8],
        progress: Option<&dyn ProgressCallback<ByteProgress>>,
    ) -> Result<(), StorageError> {
        let total: u64 = data.len() as u64;
        if let Some(cb) = progress {
            if !cb.on_progress(&ByteProgress { sent: 0, total }) {
                return Err(StorageError::Cancelled);
            }
        }

        {
            let mut containers = self.containers.write().expect("lock poisoned");
            let entry: &mut Container =
                containers
                    .get_mut(container)
                    .ok_or_else(|| StorageError::NotFound {
                        container: container.to_string(),
                        path: path.to_string(),
                    })?;
            log::debug!("storing {}/{} ({} bytes)", container, path, data.len());
            entry.objects.insert(
                path.to_string(),
                StoredObject {
                    data: data.to_vec(),
                    digest: hash_bytes(data),
                    manifest: None,
                    metadata: HashMap::new(),
                },
            );
        }

        if let Some(cb) = progress {
            if !cb.on_progress(&ByteProgress { sent: total, total }) {
                return Err(StorageError::Cancelled);
            }
        }
        Ok(())
    }

    async fn ensure_container(&self, container: &str) -> Result<(), StorageError> {
        let mut containers = self.containers.write().expect("lock poisoned");
        containers.entry(container.to_string()).or_default();
        Ok(())
    }

    async fn commit_manifest(
        &self,
        container: &str,
        filename: &str,
        entries: &[ManifestEntry],
    ) -> Result<(), StorageError> {
        let mut containers = self.containers.write().expect("lock poisoned");

        // Validate every referenced chunk before mutating anything.
        let mut logical: Vec<u8> = Vec::new();
        for entry in entries {
            let (chunk_container, chunk_path) = Self::split_entry_path(&entry.path)?;
            let chunk: &StoredObject = containers
                .get(chunk_container)
                .and_then(|c| c.objects.get(chunk_path))
                .ok_or_else(|| StorageError::NotFound {
                    container: chunk_container.to_string(),
                    path: chunk_path.to_string(),
                })?;
            if chunk.digest != entry.etag {
                return Err(StorageError::Other {
                    message: format!(
                        "digest mismatch for manifest entry {}: expected {}, stored {}",
                        entry.path, entry.etag, chunk.digest
                    ),
                });
            }
            logical.extend_from_slice(&chunk.data);
        }

        // Manifest etag is the digest of the concatenated chunk digests.
        let combined: String = entries
            .iter()
            .map(|e| e.etag.as_str())
            .collect::<Vec<&str>>()
            .join("");
        let digest: String = hash_bytes(combined.as_bytes());

        let target: &mut Container =
            containers
                .get_mut(container)
                .ok_or_else(|| StorageError::NotFound {
                    container: container.to_string(),
                    path: filename.to_string(),
                })?;
        log::debug!(
            "committing manifest {}/{} with {} entries",
            container,
            filename,
            entries.len()
        );
        target.objects.insert(
            filename.to_string(),
            StoredObject {
                data: logical,
                digest,
                manifest: Some(entries.to_vec()),
                metadata: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn update_metadata(
        &self,
        container: &str,
        filename: &str,
        headers: &HashMap<String, String>,
    ) -> Result<(), StorageError> {
        let mut containers = self.containers.write().expect("lock poisoned");
        let object: &mut StoredObject = containers
            .get_mut(container)
            .and_then(|c| c.objects.get_mut(filename))
            .ok_or_else(|| StorageError::NotFound {
                container: container.to_string(),
                path: filename.to_string(),
            })?;
        for (key, value) in headers {
            object.metadata.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    async fn delete_object(
        &self,
        container: &str,
        path: &str,
        cascade: bool,
    ) -> Result<(), StorageError> {
        let mut containers = self.containers.write().expect("lock poisoned");
        let object: StoredObject = containers
            .get_mut(container)
            .and_then(|c| c.objects.remove(path))
            .ok_or_else(|| StorageError::NotFound {
                container: container.to_string(),
                path: path.to_string(),
            })?;

        if cascade {
            if let Some(entries) = object.manifest {
                for entry in entries {
                    let (chunk_container, chunk_path) = Self::split_entry_path(&entry.path)?;
                    if let Some(c) = containers.get_mut(chunk_container) {
                        c.objects.remove(chunk_path);
                    }
                }
            }
        }
        Ok(())
    }

    async fn delete_container(&self, container: &str) -> Result<(), StorageError> {
        let mut containers = self.containers.write().expect("lock poisoned");
        match containers.get(container) {
            Some(c) if !c.objects.is_empty() => Err(StorageError::Other {
                message: format!("container {} is not empty", container),
            }),
            Some(_) => {
                containers.remove(container);
                Ok(())
            }
            None => Err(StorageError::NotFound {
                container: container.to_string(),
                path: String::new(),
            }),
        }
    }

    async fn list_objects(&self, container: &str) -> Result<Vec<RemoteObject>, StorageError> {
        let containers = self.containers.read().expect("lock poisoned");
        let entry: &Container =
            containers
                .get(container)
                .ok_or_else(|| StorageError::NotFound {
                    container: container.to_string(),
                    path: String::new(),
                })?;
        let mut objects: Vec<RemoteObject> = entry
            .objects
            .iter()
            .map(|(name, obj)| RemoteObject {
                name: name.clone(),
                size: obj.data.len() as u64,
                digest: obj.digest.clone(),
            })
            .collect();
        objects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(objects)
    }

    async fn list_containers(&self) -> Result<Vec<String>, StorageError> {
        let containers = self.containers.read().expect("lock poisoned");
        let mut names: Vec<String> = containers.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_probe_distinguishes_absent_from_present() {
        let gateway = MemoryGateway::new();
        gateway.ensure_container("c").await.unwrap();

        assert!(gateway.probe("c", "missing").await.unwrap().is_none());

        gateway.upload("c", "obj", b"payload", None).await.unwrap();
        let stat = gateway.probe("c", "obj").await.unwrap().unwrap();
        assert_eq!(stat.digest, hash_bytes(b"payload"));
        assert_eq!(stat.size, 7);
        assert!(!stat.is_static_manifest);
    }

    #[tokio::test]
    async fn test_upload_to_missing_container_fails() {
        let gateway = MemoryGateway::new();
        let err = gateway.upload("nope", "obj", b"x", None).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_ensure_container_is_idempotent() {
        let gateway = MemoryGateway::new();
        gateway.ensure_container("c").await.unwrap();
        gateway.upload("c", "obj", b"x", None).await.unwrap();
        gateway.ensure_container("c").await.unwrap();
        // Re-ensuring does not wipe existing objects.
        assert!(gateway.probe("c", "obj").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_commit_manifest_builds_logical_object() {
        let gateway = MemoryGateway::new();
        gateway.ensure_container("segs").await.unwrap();
        gateway.ensure_container("dest").await.unwrap();
        gateway.upload("segs", "f-1", b"hello ", None).await.unwrap();
        gateway.upload("segs", "f-2", b"world", None).await.unwrap();

        let entries = vec![
            ManifestEntry {
                path: "/segs/f-1".to_string(),
                etag: hash_bytes(b"hello "),
                size_bytes: 6,
            },
            ManifestEntry {
                path: "/segs/f-2".to_string(),
                etag: hash_bytes(b"world"),
                size_bytes: 5,
            },
        ];
        gateway.commit_manifest("dest", "f", &entries).await.unwrap();

        assert_eq!(gateway.object_bytes("dest", "f").unwrap(), b"hello world");
        let stat = gateway.probe("dest", "f").await.unwrap().unwrap();
        assert!(stat.is_static_manifest);
    }

    #[tokio::test]
    async fn test_commit_manifest_rejects_missing_chunk() {
        let gateway = MemoryGateway::new();
        gateway.ensure_container("dest").await.unwrap();
        let entries = vec![ManifestEntry {
            path: "/segs/f-1".to_string(),
            etag: "abc".to_string(),
            size_bytes: 3,
        }];
        let err = gateway
            .commit_manifest("dest", "f", &entries)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_commit_manifest_rejects_digest_mismatch() {
        let gateway = MemoryGateway::new();
        gateway.ensure_container("segs").await.unwrap();
        gateway.ensure_container("dest").await.unwrap();
        gateway.upload("segs", "f-1", b"actual", None).await.unwrap();

        let entries = vec![ManifestEntry {
            path: "/segs/f-1".to_string(),
            etag: "wrong-digest".to_string(),
            size_bytes: 6,
        }];
        let err = gateway
            .commit_manifest("dest", "f", &entries)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Other { .. }));
    }

    #[tokio::test]
    async fn test_update_metadata_merges_headers() {
        let gateway = MemoryGateway::new();
        gateway.ensure_container("c").await.unwrap();
        gateway.upload("c", "obj", b"x", None).await.unwrap();

        let mut headers: HashMap<String, String> = HashMap::new();
        headers.insert("Content-Type".to_string(), "video/mp4".to_string());
        gateway.update_metadata("c", "obj", &headers).await.unwrap();

        let metadata = gateway.object_metadata("c", "obj").unwrap();
        assert_eq!(metadata.get("Content-Type").unwrap(), "video/mp4");
    }

    #[tokio::test]
    async fn test_cascade_delete_removes_referenced_chunks() {
        let gateway = MemoryGateway::new();
        gateway.ensure_container("segs").await.unwrap();
        gateway.ensure_container("dest").await.unwrap();
        gateway.upload("segs", "f-1", b"a", None).await.unwrap();
        gateway.upload("segs", "f-2", b"b", None).await.unwrap();
        let entries = vec![
            ManifestEntry {
                path: "/segs/f-1".to_string(),
                etag: hash_bytes(b"a"),
                size_bytes: 1,
            },
            ManifestEntry {
                path: "/segs/f-2".to_string(),
                etag: hash_bytes(b"b"),
                size_bytes: 1,
            },
        ];
        gateway.commit_manifest("dest", "f", &entries).await.unwrap();

        gateway.delete_object("dest", "f", true).await.unwrap();
        assert!(gateway.probe("dest", "f").await.unwrap().is_none());
        assert!(gateway.probe("segs", "f-1").await.unwrap().is_none());
        assert!(gateway.probe("segs", "f-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_plain_delete_leaves_chunks_in_place() {
        let gateway = MemoryGateway::new();
        gateway.ensure_container("segs").await.unwrap();
        gateway.ensure_container("dest").await.unwrap();
        gateway.upload("segs", "f-1", b"a", None).await.unwrap();
        let entries = vec![ManifestEntry {
            path: "/segs/f-1".to_string(),
            etag: hash_bytes(b"a"),
            size_bytes: 1,
        }];
        gateway.commit_manifest("dest", "f", &entries).await.unwrap();

        gateway.delete_object("dest", "f", false).await.unwrap();
        assert!(gateway.probe("segs", "f-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_container_requires_empty() {
        let gateway = MemoryGateway::new();
        gateway.ensure_container("c").await.unwrap();
        gateway.upload("c", "obj", b"x", None).await.unwrap();

        assert!(gateway.delete_container("c").await.is_err());
        gateway.delete_object("c", "obj", false).await.unwrap();
        gateway.delete_container("c").await.unwrap();
        assert!(gateway.list_containers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_listings_are_sorted() {
        let gateway = MemoryGateway::new();
        gateway.ensure_container("beta").await.unwrap();
        gateway.ensure_container("alpha").await.unwrap();
        gateway.upload("alpha", "z", b"1", None).await.unwrap();
        gateway.upload("alpha", "a", b"22", None).await.unwrap();

        assert_eq!(gateway.list_containers().await.unwrap(), vec!["alpha", "beta"]);
        let objects = gateway.list_objects("alpha").await.unwrap();
        assert_eq!(objects[0].name, "a");
        assert_eq!(objects[0].size, 2);
        assert_eq!(objects[1].name, "z");
    }
}
