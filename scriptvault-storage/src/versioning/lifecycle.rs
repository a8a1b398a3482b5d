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

//! Version Lifecycle - Create, Rename, Delete
//!
//! The only writer of the {index, blob} pair. Every mutation is a two-step
//! sequence, blob first and index second, so a failure between the steps
//! leaves at worst an orphaned blob (repairable with [`reconcile`]) instead of
//! an index entry pointing at nothing.
//!
//! Mutations on one script are serialized through [`ScriptLocks`] and run in
//! a spawned task: a caller that stops waiting cannot interrupt a sequence
//! between its two steps.
//!
//! [`reconcile`]: VersionLifecycleManager::reconcile

use super::blob_store::{BlobStore, BlobStoreError};
use super::content::{validate_content, ContentError};
use super::diff::{Comparison, DiffEngine};
use super::index::{IndexError, VersionIndex};
use super::locks::ScriptLocks;
use super::metadata::{MetadataError, ScriptMetadataService};
use scriptvault_core::{BlobPath, ReconcilePolicy, ScriptRef, VersionId, VersioningConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn, Instrument};

/// Coarse classification of a [`LifecycleError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    StorageWriteFailed,
    StorageDeleteFailed,
    StorageReadFailed,
    IndexReadFailed,
    IndexUpdateFailed,
    VersionNotFound,
    VersionCollision,
    InvalidContent,
    Interrupted,
}

/// Individual remote step of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleStep {
    ReadIndex,
    UploadBlob,
    RenameBlob,
    DeleteBlob,
    ReadBlob,
    ListBlobs,
    PersistIndex,
}

impl fmt::Display for LifecycleStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleStep::ReadIndex => "read index",
            LifecycleStep::UploadBlob => "upload blob",
            LifecycleStep::RenameBlob => "rename blob",
            LifecycleStep::DeleteBlob => "delete blob",
            LifecycleStep::ReadBlob => "read blob",
            LifecycleStep::ListBlobs => "list blobs",
            LifecycleStep::PersistIndex => "persist index",
        };
        f.write_str(name)
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Invalid content: {0}")]
    InvalidContent(#[from] ContentError),

    #[error("Failed to {step} {path}: {source}")]
    StorageWriteFailed {
        step: LifecycleStep,
        path: BlobPath,
        source: BlobStoreError,
    },

    /// `replacement` is set when a default version was already persisted
    /// because `path` held the last version.
    #[error("Failed to delete blob {path}: {source}")]
    StorageDeleteFailed {
        path: BlobPath,
        replacement: Option<VersionId>,
        source: BlobStoreError,
    },

    #[error("Failed to {step} {path}: {source}")]
    StorageReadFailed {
        step: LifecycleStep,
        path: String,
        source: BlobStoreError,
    },

    #[error("Failed to read version index of {script}: {source}")]
    IndexReadFailed {
        script: ScriptRef,
        source: MetadataError,
    },

    /// The blob step finished; only the index write needs repeating.
    #[error("Index update for {script} failed after {completed}: {source}")]
    IndexUpdateFailed {
        script: ScriptRef,
        completed: LifecycleStep,
        version: Option<VersionId>,
        source: MetadataError,
    },

    #[error("Version {0} not found")]
    VersionNotFound(VersionId),

    #[error("Version {0} already exists")]
    VersionCollision(VersionId),

    #[error("Operation interrupted: {0}")]
    Interrupted(String),
}

impl LifecycleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LifecycleError::InvalidContent(_) => ErrorKind::InvalidContent,
            LifecycleError::StorageWriteFailed { .. } => ErrorKind::StorageWriteFailed,
            LifecycleError::StorageDeleteFailed { .. } => ErrorKind::StorageDeleteFailed,
            LifecycleError::StorageReadFailed { .. } => ErrorKind::StorageReadFailed,
            LifecycleError::IndexReadFailed { .. } => ErrorKind::IndexReadFailed,
            LifecycleError::IndexUpdateFailed { .. } => ErrorKind::IndexUpdateFailed,
            LifecycleError::VersionNotFound(_) => ErrorKind::VersionNotFound,
            LifecycleError::VersionCollision(_) => ErrorKind::VersionCollision,
            LifecycleError::Interrupted(_) => ErrorKind::Interrupted,
        }
    }

    /// The remote step that failed, if a remote call failed
    pub fn step(&self) -> Option<LifecycleStep> {
        match self {
            LifecycleError::StorageWriteFailed { step, .. }
            | LifecycleError::StorageReadFailed { step, .. } => Some(*step),
            LifecycleError::StorageDeleteFailed { .. } => Some(LifecycleStep::DeleteBlob),
            LifecycleError::IndexReadFailed { .. } => Some(LifecycleStep::ReadIndex),
            LifecycleError::IndexUpdateFailed { .. } => Some(LifecycleStep::PersistIndex),
            _ => None,
        }
    }
}

impl From<IndexError> for LifecycleError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::NotFound(v) => LifecycleError::VersionNotFound(v),
            IndexError::Duplicate(v) | IndexError::Collision(v) | IndexError::Exhausted(v) => {
                LifecycleError::VersionCollision(v)
            }
        }
    }
}

/// Result of [`VersionLifecycleManager::delete_version`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub deleted: VersionId,
    /// Default version created because `deleted` was the last one
    pub replacement: Option<VersionId>,
}

/// Repairs made by [`VersionLifecycleManager::reconcile`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Orphan blobs added back to the index
    pub adopted: Vec<VersionId>,
    /// Orphan blobs deleted
    pub purged: Vec<VersionId>,
    /// Index entries removed because their blob was missing
    pub dropped: Vec<VersionId>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.adopted.is_empty() && self.purged.is_empty() && self.dropped.is_empty()
    }
}

/// Orchestrates version changes across the blob store and metadata service
#[derive(Clone)]
pub struct VersionLifecycleManager {
    blobs: Arc<dyn BlobStore>,
    metadata: Arc<dyn ScriptMetadataService>,
    locks: Arc<ScriptLocks>,
    config: Arc<VersioningConfig>,
    diff: DiffEngine,
}

impl VersionLifecycleManager {
    /// Create a manager with default config
    pub fn new(blobs: Arc<dyn BlobStore>, metadata: Arc<dyn ScriptMetadataService>) -> Self {
        Self::with_config(blobs, metadata, VersioningConfig::default())
    }

    /// Create with custom config
    pub fn with_config(
        blobs: Arc<dyn BlobStore>,
        metadata: Arc<dyn ScriptMetadataService>,
        config: VersioningConfig,
    ) -> Self {
        let diff = DiffEngine::with_config(config.diff.clone());
        Self {
            blobs,
            metadata,
            locks: Arc::new(ScriptLocks::new()),
            config: Arc::new(config),
            diff,
        }
    }

    pub fn config(&self) -> &VersioningConfig {
        &self.config
    }

    pub fn locks(&self) -> &ScriptLocks {
        &self.locks
    }

    pub fn diff_engine(&self) -> &DiffEngine {
        &self.diff
    }

    // === Mutations ===

    /// Store `content` as a new version and return its identifier.
    #[instrument(skip(self, content), fields(script = %script, bytes = content.len()))]
    pub async fn create_version(
        &self,
        script: &ScriptRef,
        content: Vec<u8>,
    ) -> Result<VersionId, LifecycleError> {
        validate_content(&content, &self.config)?;

        self.run_serialized(script, move |manager, script| async move {
            manager.create_locked(&script, content).await
        })
        .await
    }

    /// Move version `old` to identifier `new`.
    #[instrument(skip(self), fields(script = %script, from = %old, to = %new))]
    pub async fn rename_version(
        &self,
        script: &ScriptRef,
        old: VersionId,
        new: VersionId,
    ) -> Result<(), LifecycleError> {
        self.run_serialized(script, move |manager, script| async move {
            manager.rename_locked(&script, old, new).await
        })
        .await
    }

    /// Delete a version. Deleting the last version first creates an empty
    /// default version so the script always keeps one.
    #[instrument(skip(self), fields(script = %script, version = %id))]
    pub async fn delete_version(
        &self,
        script: &ScriptRef,
        id: VersionId,
    ) -> Result<DeleteOutcome, LifecycleError> {
        self.run_serialized(script, move |manager, script| async move {
            manager.delete_locked(&script, id).await
        })
        .await
    }

    /// Bring the index and the stored blobs back in line after partial
    /// failures. Index entries without a blob are dropped; blobs without an
    /// entry are adopted or purged according to the configured policy.
    #[instrument(skip(self), fields(script = %script))]
    pub async fn reconcile(&self, script: &ScriptRef) -> Result<ReconcileReport, LifecycleError> {
        self.run_serialized(script, |manager, script| async move {
            manager.reconcile_locked(&script).await
        })
        .await
    }

    // === Reads ===

    /// Current versions, newest first
    pub async fn list_versions(
        &self,
        script: &ScriptRef,
    ) -> Result<Vec<VersionId>, LifecycleError> {
        Ok(self.load_index(script).await?.descending().collect())
    }

    /// Content of one version
    pub async fn read_version(
        &self,
        script: &ScriptRef,
        id: VersionId,
    ) -> Result<Vec<u8>, LifecycleError> {
        let index = self.load_index(script).await?;
        if !index.contains(id) {
            return Err(LifecycleError::VersionNotFound(id));
        }
        self.fetch_blob(script, id).await
    }

    /// Fetch two versions and diff them. Does not take the script lock, so it
    /// may observe an index that is about to change.
    #[instrument(skip(self), fields(script = %script, before = %before, after = %after))]
    pub async fn compare_versions(
        &self,
        script: &ScriptRef,
        before: VersionId,
        after: VersionId,
    ) -> Result<Comparison, LifecycleError> {
        let index = self.load_index(script).await?;
        for id in [before, after] {
            if !index.contains(id) {
                return Err(LifecycleError::VersionNotFound(id));
            }
        }

        let (old, new) = tokio::try_join!(
            self.fetch_blob(script, before),
            self.fetch_blob(script, after)
        )?;

        let comparison = self.diff.compare(
            &String::from_utf8_lossy(&old),
            &String::from_utf8_lossy(&new),
        );
        debug!(
            removed = comparison.stats.lines_removed,
            added = comparison.stats.lines_added,
            "Compared versions"
        );
        Ok(comparison)
    }

    // === Internals ===

    /// Run `op` under the script lock in its own task. The caller only awaits
    /// the task, so dropping the caller does not stop `op`.
    async fn run_serialized<T, F, Fut>(
        &self,
        script: &ScriptRef,
        op: F,
    ) -> Result<T, LifecycleError>
    where
        T: Send + 'static,
        F: FnOnce(Self, ScriptRef) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, LifecycleError>> + Send + 'static,
    {
        let manager = self.clone();
        let script = script.clone();

        let task = tokio::spawn(
            async move {
                let locks = manager.locks.clone();
                let guard = locks.acquire(&script).await;
                debug!(script = %script, "Acquired script lock");

                let result = op(manager, script.clone()).await;

                drop(guard);
                locks.release(&script);
                result
            }
            .in_current_span(),
        );

        task.await
            .map_err(|e| LifecycleError::Interrupted(e.to_string()))?
    }

    async fn load_index(&self, script: &ScriptRef) -> Result<VersionIndex, LifecycleError> {
        let versions = self
            .metadata
            .read_versions(script)
            .await
            .map_err(|source| LifecycleError::IndexReadFailed {
                script: script.clone(),
                source,
            })?;
        Ok(VersionIndex::from_remote(versions))
    }

    async fn persist_index(
        &self,
        script: &ScriptRef,
        index: &VersionIndex,
        completed: LifecycleStep,
        version: Option<VersionId>,
    ) -> Result<(), LifecycleError> {
        self.metadata
            .write_versions(script, &index.to_vec())
            .await
            .map_err(|source| {
                warn!(
                    script = %script,
                    completed = %completed,
                    error = %source,
                    "Index update failed after blob step; run reconcile to repair"
                );
                LifecycleError::IndexUpdateFailed {
                    script: script.clone(),
                    completed,
                    version,
                    source,
                }
            })
    }

    async fn fetch_blob(
        &self,
        script: &ScriptRef,
        id: VersionId,
    ) -> Result<Vec<u8>, LifecycleError> {
        let path = BlobPath::new(script, id);
        self.blobs.get(&path).await.map_err(|source| {
            if source.is_not_found() {
                warn!(path = %path, "Indexed version has no blob");
                LifecycleError::VersionNotFound(id)
            } else {
                LifecycleError::StorageReadFailed {
                    step: LifecycleStep::ReadBlob,
                    path: path.to_string(),
                    source,
                }
            }
        })
    }

    /// `content` must already have passed [`validate_content`].
    async fn create_locked(
        &self,
        script: &ScriptRef,
        content: Vec<u8>,
    ) -> Result<VersionId, LifecycleError> {
        let mut index = self.load_index(script).await?;
        let next = index.next_allocation()?;
        let path = BlobPath::new(script, next);

        self.blobs
            .put(&path, content)
            .await
            .map_err(|source| LifecycleError::StorageWriteFailed {
                step: LifecycleStep::UploadBlob,
                path: path.clone(),
                source,
            })?;

        index.insert(next)?;
        self.persist_index(script, &index, LifecycleStep::UploadBlob, Some(next))
            .await?;

        info!(script = %script, version = %next, "Created version");
        Ok(next)
    }

    async fn rename_locked(
        &self,
        script: &ScriptRef,
        old: VersionId,
        new: VersionId,
    ) -> Result<(), LifecycleError> {
        let mut index = self.load_index(script).await?;
        if !index.contains(old) {
            return Err(LifecycleError::VersionNotFound(old));
        }
        if index.contains(new) {
            return Err(LifecycleError::VersionCollision(new));
        }

        let from = BlobPath::new(script, old);
        let to = BlobPath::new(script, new);
        self.blobs
            .rename(&from, &to)
            .await
            .map_err(|source| LifecycleError::StorageWriteFailed {
                step: LifecycleStep::RenameBlob,
                path: from.clone(),
                source,
            })?;

        index.replace(old, new)?;
        self.persist_index(script, &index, LifecycleStep::RenameBlob, Some(new))
            .await?;

        info!(script = %script, from = %old, to = %new, "Renamed version");
        Ok(())
    }

    async fn delete_locked(
        &self,
        script: &ScriptRef,
        id: VersionId,
    ) -> Result<DeleteOutcome, LifecycleError> {
        let mut index = self.load_index(script).await?;
        if !index.contains(id) {
            return Err(LifecycleError::VersionNotFound(id));
        }

        // Never leave the script without a version: add the replacement
        // before anything is removed.
        let replacement = if index.len() == 1 {
            let content = self.config.default_content.clone().into_bytes();
            validate_content(&content, &self.config)?;
            let created = self.create_locked(script, content).await?;
            index.insert(created)?;
            info!(
                script = %script,
                replacement = %created,
                "Created default version before deleting the last one"
            );
            Some(created)
        } else {
            None
        };

        let path = BlobPath::new(script, id);
        match self.blobs.delete(&path).await {
            Ok(()) => {}
            Err(source) if source.is_not_found() => {
                warn!(path = %path, "Blob already gone, removing index entry only");
            }
            Err(source) => {
                return Err(LifecycleError::StorageDeleteFailed {
                    path,
                    replacement,
                    source,
                });
            }
        }

        index.remove(id)?;
        self.persist_index(script, &index, LifecycleStep::DeleteBlob, Some(id))
            .await?;

        info!(script = %script, version = %id, "Deleted version");
        Ok(DeleteOutcome {
            deleted: id,
            replacement,
        })
    }

    async fn reconcile_locked(
        &self,
        script: &ScriptRef,
    ) -> Result<ReconcileReport, LifecycleError> {
        let index = self.load_index(script).await?;

        let prefix = BlobPath::script_prefix(script);
        let listed = self
            .blobs
            .list(&prefix)
            .await
            .map_err(|source| LifecycleError::StorageReadFailed {
                step: LifecycleStep::ListBlobs,
                path: prefix.clone(),
                source,
            })?;

        let stored: BTreeSet<VersionId> = listed
            .iter()
            .filter_map(|path| BlobPath::parse(path))
            .filter(|(owner, _)| owner == script)
            .map(|(_, version)| version)
            .collect();

        let mut repaired = index.clone();
        let mut report = ReconcileReport::default();

        for version in index.ascending() {
            if !stored.contains(&version) {
                repaired.remove(version)?;
                report.dropped.push(version);
            }
        }

        for &version in stored.iter().filter(|v| !index.contains(**v)) {
            match self.config.reconcile_policy {
                ReconcilePolicy::Adopt => {
                    repaired.insert(version)?;
                    report.adopted.push(version);
                }
                ReconcilePolicy::Purge => {
                    let path = BlobPath::new(script, version);
                    self.blobs
                        .delete(&path)
                        .await
                        .map_err(|source| LifecycleError::StorageDeleteFailed {
                            path,
                            replacement: None,
                            source,
                        })?;
                    report.purged.push(version);
                }
            }
        }

        if repaired != index {
            self.persist_index(script, &repaired, LifecycleStep::ListBlobs, None)
                .await?;
        }

        if report.is_clean() {
            debug!(script = %script, "Index and blobs already consistent");
        } else {
            warn!(
                script = %script,
                adopted = ?report.adopted,
                purged = ?report.purged,
                dropped = ?report.dropped,
                "Reconciled version index"
            );
        }

        Ok(report)
    }
}
