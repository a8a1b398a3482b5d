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

//! Script metadata service
//!
//! The authoritative copy of each script's `versions` array. The remote
//! surface only supports reading the array and replacing it wholesale.

use async_trait::async_trait;
use dashmap::DashMap;
use scriptvault_core::{ScriptRef, VersionId};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Metadata service errors
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Metadata service unavailable: {0}")]
    Unavailable(String),

    #[error("Conflicting metadata update: {0}")]
    Conflict(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Holds the `versions` index of every script.
#[async_trait]
pub trait ScriptMetadataService: Send + Sync {
    /// Current versions of a script. A script the service has never seen has
    /// no versions.
    async fn read_versions(&self, script: &ScriptRef) -> Result<Vec<VersionId>, MetadataError>;

    /// Replace the whole `versions` array.
    async fn write_versions(
        &self,
        script: &ScriptRef,
        versions: &[VersionId],
    ) -> Result<(), MetadataError>;
}

/// Wire form of a script's metadata record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ScriptDocument {
    versions: Vec<VersionId>,
}

/// In-memory metadata service
///
/// Records are kept as JSON documents, the same shape the remote API
/// returns, so every read and write crosses the float boundary.
#[derive(Default)]
pub struct MemoryMetadataService {
    documents: DashMap<ScriptRef, String>,
    writes: AtomicU64,
}

impl MemoryMetadataService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a script with a raw JSON document, e.g. `{"versions":[1.0,2.0]}`.
    pub fn insert_raw(&self, script: ScriptRef, document: impl Into<String>) {
        self.documents.insert(script, document.into());
    }

    /// Raw JSON document for a script
    pub fn raw(&self, script: &ScriptRef) -> Option<String> {
        self.documents.get(script).map(|r| r.value().clone())
    }

    /// Number of successful `write_versions` calls
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ScriptMetadataService for MemoryMetadataService {
    async fn read_versions(&self, script: &ScriptRef) -> Result<Vec<VersionId>, MetadataError> {
        let Some(raw) = self.documents.get(script).map(|r| r.value().clone()) else {
            return Ok(Vec::new());
        };

        let document: ScriptDocument = serde_json::from_str(&raw)
            .map_err(|e| MetadataError::Serialization(e.to_string()))?;
        Ok(document.versions)
    }

    async fn write_versions(
        &self,
        script: &ScriptRef,
        versions: &[VersionId],
    ) -> Result<(), MetadataError> {
        let document = ScriptDocument {
            versions: versions.to_vec(),
        };
        let raw = serde_json::to_string(&document)
            .map_err(|e| MetadataError::Serialization(e.to_string()))?;

        self.documents.insert(script.clone(), raw);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
