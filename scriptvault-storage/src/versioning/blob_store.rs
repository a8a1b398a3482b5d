// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Blob Store - Path-Addressed Version Content
//!
//! Version content lives outside the index, one blob per version at a
//! deterministic [`BlobPath`]. The remote API is consumed through the
//! [`BlobStore`] trait; two local implementations are provided:
//!
//! - [`MemoryBlobStore`]: concurrent map, for tests and offline use
//! - [`FsBlobStore`]: one file per blob under a root directory

use async_trait::async_trait;
use dashmap::DashMap;
use scriptvault_core::BlobPath;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Blob store errors
#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Blob already exists: {0}")]
    AlreadyExists(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl BlobStoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, BlobStoreError::NotFound(_))
    }
}

/// Path-addressed content store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `data` at `path`, replacing any existing blob.
    async fn put(&self, path: &BlobPath, data: Vec<u8>) -> Result<(), BlobStoreError>;

    /// Fails with [`BlobStoreError::NotFound`] if nothing is stored at `path`.
    async fn get(&self, path: &BlobPath) -> Result<Vec<u8>, BlobStoreError>;

    /// Fails with [`BlobStoreError::NotFound`] if nothing is stored at `path`.
    async fn delete(&self, path: &BlobPath) -> Result<(), BlobStoreError>;

    /// Move a blob. The target must not exist.
    async fn rename(&self, from: &BlobPath, to: &BlobPath) -> Result<(), BlobStoreError>;

    /// All stored paths starting with `prefix`, in no particular order.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, BlobStoreError>;

    async fn exists(&self, path: &BlobPath) -> Result<bool, BlobStoreError> {
        match self.get(path).await {
            Ok(_) => Ok(true),
            Err(BlobStoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Blob store statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobStoreStats {
    pub blob_count: u64,
    pub total_size_bytes: u64,
    pub writes: u64,
    pub deletes: u64,
    pub renames: u64,
}

/// In-memory blob store
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<String, Vec<u8>>,
    writes: AtomicU64,
    deletes: AtomicU64,
    renames: AtomicU64,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    pub fn contains(&self, path: &BlobPath) -> bool {
        self.blobs.contains_key(path.as_str())
    }

    pub fn stats(&self) -> BlobStoreStats {
        BlobStoreStats {
            blob_count: self.blobs.len() as u64,
            total_size_bytes: self.blobs.iter().map(|r| r.value().len() as u64).sum(),
            writes: self.writes.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            renames: self.renames.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, path: &BlobPath, data: Vec<u8>) -> Result<(), BlobStoreError> {
        self.blobs.insert(path.as_str().to_string(), data);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn get(&self, path: &BlobPath) -> Result<Vec<u8>, BlobStoreError> {
        self.blobs
            .get(path.as_str())
            .map(|r| r.value().clone())
            .ok_or_else(|| BlobStoreError::NotFound(path.to_string()))
    }

    async fn delete(&self, path: &BlobPath) -> Result<(), BlobStoreError> {
        self.blobs
            .remove(path.as_str())
            .ok_or_else(|| BlobStoreError::NotFound(path.to_string()))?;
        self.deletes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn rename(&self, from: &BlobPath, to: &BlobPath) -> Result<(), BlobStoreError> {
        if self.blobs.contains_key(to.as_str()) {
            return Err(BlobStoreError::AlreadyExists(to.to_string()));
        }

        let (_, data) = self
            .blobs
            .remove(from.as_str())
            .ok_or_else(|| BlobStoreError::NotFound(from.to_string()))?;

        self.blobs.insert(to.as_str().to_string(), data);
        self.renames.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, BlobStoreError> {
        Ok(self
            .blobs
            .iter()
            .filter(|r| r.key().starts_with(prefix))
            .map(|r| r.key().clone())
            .collect())
    }
}

/// Filesystem blob store
///
/// Blob paths map directly onto files below `root`. Writes go through a
/// temporary sibling file and a rename so a reader never sees half a blob.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, BlobStoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, path: &BlobPath) -> PathBuf {
        self.root.join(path.as_str())
    }

    async fn ensure_parent(file: &Path) -> Result<(), BlobStoreError> {
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

fn map_not_found(err: io::Error, path: &BlobPath) -> BlobStoreError {
    if err.kind() == io::ErrorKind::NotFound {
        BlobStoreError::NotFound(path.to_string())
    } else {
        BlobStoreError::Io(err)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, path: &BlobPath, data: Vec<u8>) -> Result<(), BlobStoreError> {
        let file = self.path_for(path);
        Self::ensure_parent(&file).await?;

        let mut tmp = file.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, &file).await?;
        Ok(())
    }

    async fn get(&self, path: &BlobPath) -> Result<Vec<u8>, BlobStoreError> {
        tokio::fs::read(self.path_for(path))
            .await
            .map_err(|e| map_not_found(e, path))
    }

    async fn delete(&self, path: &BlobPath) -> Result<(), BlobStoreError> {
        tokio::fs::remove_file(self.path_for(path))
            .await
            .map_err(|e| map_not_found(e, path))
    }

    async fn rename(&self, from: &BlobPath, to: &BlobPath) -> Result<(), BlobStoreError> {
        let target = self.path_for(to);
        if tokio::fs::try_exists(&target).await? {
            return Err(BlobStoreError::AlreadyExists(to.to_string()));
        }
        Self::ensure_parent(&target).await?;

        tokio::fs::rename(self.path_for(from), &target)
            .await
            .map_err(|e| map_not_found(e, from))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, BlobStoreError> {
        // Split into the directory to scan and a file-name filter.
        let (dir_part, name_prefix) = match prefix.rsplit_once('/') {
            Some((dir, name)) => (dir, name),
            None => ("", prefix),
        };

        let dir = self.root.join(dir_part);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with(name_prefix) {
                continue;
            }
            if dir_part.is_empty() {
                paths.push(name);
            } else {
                paths.push(format!("{}/{}", dir_part, name));
            }
        }

        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptvault_core::{ScriptRef, VersionId};

    fn script() -> ScriptRef {
        ScriptRef::new("owner", "zone-1").unwrap()
    }

    fn path(tenths: u32) -> BlobPath {
        BlobPath::new(&script(), VersionId::from_tenths(tenths))
    }

    #[tokio::test]
    async fn test_memory_put_get_delete() {
        let store = MemoryBlobStore::new();

        store.put(&path(10), b"{}".to_vec()).await.unwrap();
        assert_eq!(store.get(&path(10)).await.unwrap(), b"{}");
        assert!(store.exists(&path(10)).await.unwrap());

        store.delete(&path(10)).await.unwrap();
        assert!(store.get(&path(10)).await.unwrap_err().is_not_found());
        assert!(store.delete(&path(10)).await.unwrap_err().is_not_found());
        assert!(!store.exists(&path(10)).await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_rename() {
        let store = MemoryBlobStore::new();
        store.put(&path(20), b"two".to_vec()).await.unwrap();
        store.put(&path(30), b"three".to_vec()).await.unwrap();

        store.rename(&path(20), &path(25)).await.unwrap();
        assert!(!store.contains(&path(20)));
        assert_eq!(store.get(&path(25)).await.unwrap(), b"two");

        // Target taken
        assert!(matches!(
            store.rename(&path(25), &path(30)).await,
            Err(BlobStoreError::AlreadyExists(_))
        ));
        // Source missing
        assert!(store
            .rename(&path(20), &path(40))
            .await
            .unwrap_err()
            .is_not_found());

        let stats = store.stats();
        assert_eq!(stats.blob_count, 2);
        assert_eq!(stats.renames, 1);
        assert_eq!(stats.total_size_bytes, 8);
    }

    #[tokio::test]
    async fn test_memory_list_by_prefix() {
        let store = MemoryBlobStore::new();
        let other = ScriptRef::new("owner", "zone-2").unwrap();

        store.put(&path(10), Vec::new()).await.unwrap();
        store.put(&path(20), Vec::new()).await.unwrap();
        store
            .put(&BlobPath::new(&other, VersionId::FIRST), Vec::new())
            .await
            .unwrap();

        let mut listed = store.list(&BlobPath::script_prefix(&script())).await.unwrap();
        listed.sort();
        assert_eq!(
            listed,
            vec![
                "owner/script/zone-1/v1.0.json".to_string(),
                "owner/script/zone-1/v2.0.json".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_fs_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).await.unwrap();

        store.put(&path(10), b"{\"a\":1}".to_vec()).await.unwrap();
        assert_eq!(store.get(&path(10)).await.unwrap(), b"{\"a\":1}");
        assert!(dir.path().join("owner/script/zone-1/v1.0.json").is_file());

        store.rename(&path(10), &path(15)).await.unwrap();
        assert!(store.get(&path(10)).await.unwrap_err().is_not_found());
        assert_eq!(store.get(&path(15)).await.unwrap(), b"{\"a\":1}");

        store.put(&path(20), b"x".to_vec()).await.unwrap();
        assert!(matches!(
            store.rename(&path(15), &path(20)).await,
            Err(BlobStoreError::AlreadyExists(_))
        ));

        let mut listed = store.list(&BlobPath::script_prefix(&script())).await.unwrap();
        listed.sort();
        assert_eq!(
            listed,
            vec![
                "owner/script/zone-1/v1.5.json".to_string(),
                "owner/script/zone-1/v2.0.json".to_string()
            ]
        );

        store.delete(&path(15)).await.unwrap();
        assert!(store.delete(&path(15)).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_fs_list_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).await.unwrap();
        assert!(store.list("nobody/script/none/").await.unwrap().is_empty());
    }
}
