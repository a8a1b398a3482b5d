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

//! # Scriptvault Storage
//!
//! Version lifecycle and comparison for irrigation scripts.
//!
//! Each script owns a sparse, ordered set of version identifiers held by a
//! metadata service, and one content blob per version in a path-addressed
//! blob store. [`VersionLifecycleManager`] is the only component that changes
//! either side; [`DiffEngine`] compares two versions for side-by-side display.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scriptvault_core::SessionContext;
//! use scriptvault_storage::{MemoryBlobStore, MemoryMetadataService, VersionLifecycleManager};
//! use std::sync::Arc;
//!
//! let manager = VersionLifecycleManager::new(
//!     Arc::new(MemoryBlobStore::new()),
//!     Arc::new(MemoryMetadataService::new()),
//! );
//!
//! let session = SessionContext::new("grower-7")?;
//! let script = session.script("north-field")?;
//!
//! let v1 = manager.create_version(&script, br#"{"zones":[]}"#.to_vec()).await?;
//! let v2 = manager.create_version(&script, br#"{"zones":[1]}"#.to_vec()).await?;
//! let comparison = manager.compare_versions(&script, v1, v2).await?;
//! ```

pub mod versioning;

pub use scriptvault_core::{
    BlobPath, DiffAlgorithm, DiffConfig, ReconcilePolicy, ScriptRef, SessionContext, VersionId,
    VersioningConfig,
};
pub use versioning::{
    compute_diff, map_to_decorations, normalize, BlobStore, BlobStoreError, Comparison,
    DecorationRange, Decorations, DeleteOutcome, DiffEngine, DiffHunk, DiffStats, ErrorKind,
    FsBlobStore, HunkKind, LifecycleError, LifecycleStep, MemoryBlobStore, MemoryMetadataService,
    MetadataError, ReconcileReport, ScriptLocks, ScriptMetadataService, Side, VersionIndex,
    VersionLifecycleManager,
};
