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

//! # Scriptvault Core
//!
//! Domain types shared by the script versioning crates. Nothing in here does
//! I/O; the storage crate builds the lifecycle and diff engine on top.
//!
//! - [`VersionId`]: one-decimal version numbers, stored as tenths
//! - [`BlobPath`]: canonical `{owner}/script/{script}/v{version}.json` paths
//! - [`ScriptRef`] / [`SessionContext`]: explicit caller and script identity
//! - [`VersioningConfig`]: lifecycle and diff settings

pub mod config;
pub mod script;
pub mod version;

pub use config::{DiffAlgorithm, DiffConfig, ReconcilePolicy, VersioningConfig};
pub use script::{ScriptRef, ScriptRefError, SessionContext};
pub use version::{BlobPath, VersionId, VersionIdError};
