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

//! Configuration for script versioning and comparison
//!
//! Every field has a default, so a TOML file only needs to name what it
//! overrides:
//!
//! ```toml
//! validate_json = false
//! reconcile_policy = "purge"
//!
//! [diff]
//! algorithm = "patience"
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What a reconciliation pass does with a blob that no index entry points to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcilePolicy {
    /// Add the orphan's version back into the index
    #[default]
    Adopt,
    /// Delete the orphan blob
    Purge,
}

/// Line matching algorithm used by the diff engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffAlgorithm {
    /// Longest common subsequence
    #[default]
    Lcs,
    Myers,
    Patience,
}

/// Configuration for the diff engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    pub algorithm: DiffAlgorithm,
    /// Strip one trailing comma per line during normalization
    pub strip_trailing_commas: bool,
    /// Largest `lines_before * lines_after` product diffed with `Lcs`, whose
    /// table grows with that product. Larger inputs are diffed with `Myers`,
    /// which finds an edit script of the same length in linear space.
    pub lcs_cell_limit: usize,
}

impl DiffConfig {
    /// 2000 x 2000 lines
    pub const DEFAULT_LCS_CELL_LIMIT: usize = 4_000_000;
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            algorithm: DiffAlgorithm::Lcs,
            strip_trailing_commas: true,
            lcs_cell_limit: Self::DEFAULT_LCS_CELL_LIMIT,
        }
    }
}

/// Configuration for the version lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersioningConfig {
    /// Require non-empty version content to parse as JSON
    pub validate_json: bool,

    /// Content of the version created when the last one is deleted
    pub default_content: String,

    pub reconcile_policy: ReconcilePolicy,

    pub diff: DiffConfig,
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            validate_json: true,
            default_content: String::new(),
            reconcile_policy: ReconcilePolicy::Adopt,
            diff: DiffConfig::default(),
        }
    }
}

impl VersioningConfig {
    /// JSON validation on, orphans adopted
    pub fn strict() -> Self {
        Self::default()
    }

    /// Accepts any content
    ///
    /// Useful for free-form text scripts and for tests that store plain lines.
    pub fn permissive() -> Self {
        Self {
            validate_json: false,
            ..Self::default()
        }
    }

    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&source)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = VersioningConfig::default();
        assert!(config.validate_json);
        assert!(config.default_content.is_empty());
        assert_eq!(config.reconcile_policy, ReconcilePolicy::Adopt);
        assert_eq!(config.diff.algorithm, DiffAlgorithm::Lcs);
        assert!(config.diff.strip_trailing_commas);
        assert_eq!(config.diff.lcs_cell_limit, DiffConfig::DEFAULT_LCS_CELL_LIMIT);
    }

    #[test]
    fn test_permissive_config() {
        let config = VersioningConfig::permissive();
        assert!(!config.validate_json);
        assert_eq!(config.diff, DiffConfig::default());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = VersioningConfig::from_toml_str(
            r#"
            reconcile_policy = "purge"

            [diff]
            algorithm = "patience"
            lcs_cell_limit = 10000
            "#,
        )
        .unwrap();

        assert_eq!(config.diff.lcs_cell_limit, 10_000);
        assert!(config.validate_json);
        assert_eq!(config.reconcile_policy, ReconcilePolicy::Purge);
        assert_eq!(config.diff.algorithm, DiffAlgorithm::Patience);
        assert!(config.diff.strip_trailing_commas);
    }

    #[test]
    fn test_unknown_enum_value_is_rejected() {
        assert!(VersioningConfig::from_toml_str("reconcile_policy = \"ignore\"").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "validate_json = false").unwrap();
        writeln!(file, "default_content = \"{{}}\"").unwrap();

        let config = VersioningConfig::load_from_file(file.path()).unwrap();
        assert!(!config.validate_json);
        assert_eq!(config.default_content, "{}");
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let err = VersioningConfig::load_from_file("/nonexistent/scriptvault.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/scriptvault.toml"));
    }
}
