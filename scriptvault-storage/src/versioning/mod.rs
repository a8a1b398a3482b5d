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

//! Script Version Control
//!
//! Keeps a script's version index and its per-version blobs consistent, and
//! compares any two versions line by line.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   VersionLifecycleManager                       │
//! │        create / rename / delete / reconcile (per-script lock)   │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐     ┌─────────────────┐     ┌─────────────┐    │
//! │  │ BlobStore   │     │ ScriptMetadata  │     │ DiffEngine  │    │
//! │  │ (content)   │     │ (versions[])    │     │ (pure)      │    │
//! │  └─────────────┘     └─────────────────┘     └─────────────┘    │
//! │   step 1: blob        step 2: index            read-only        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Properties
//!
//! - **Blob before index**: a failure between the steps leaves an orphaned
//!   blob, never an index entry without content
//! - **Serialized per script**: concurrent creates never allocate the same id
//! - **Uninterruptible sequences**: dropping a caller does not split a write
//! - **Noise-free diffs**: formatting-only changes are normalized away

pub mod blob_store;
pub mod content;
pub mod diff;
pub mod index;
pub mod lifecycle;
pub mod locks;
pub mod metadata;

pub use blob_store::{BlobStore, BlobStoreError, BlobStoreStats, FsBlobStore, MemoryBlobStore};
pub use content::{validate_content, ContentError};
pub use diff::{
    compute_diff, map_to_decorations, normalize, split_lines, Comparison, DecorationRange,
    Decorations, DiffEngine, DiffHunk, DiffStats, HunkKind, Side,
};
pub use index::{IndexError, VersionIndex};
pub use lifecycle::{
    DeleteOutcome, ErrorKind, LifecycleError, LifecycleStep, ReconcileReport,
    VersionLifecycleManager,
};
pub use locks::ScriptLocks;
pub use metadata::{MemoryMetadataService, MetadataError, ScriptMetadataService};
