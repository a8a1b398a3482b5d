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

//! Integration tests for identifiers, paths and configuration

use scriptvault_core::{
    BlobPath, DiffAlgorithm, ReconcilePolicy, ScriptRefError, SessionContext, VersionId,
    VersioningConfig,
};
use std::io::Write;

/// A session scopes every path to its user
#[test]
fn test_session_paths() {
    let session = SessionContext::new("grower-7").unwrap();
    let script = session.script("north-field").unwrap();

    let path = BlobPath::new(&script, VersionId::from_tenths(21));
    assert_eq!(path.as_str(), "grower-7/script/north-field/v2.1.json");
    assert!(path.as_str().starts_with(&BlobPath::script_prefix(&script)));
    assert_eq!(
        BlobPath::parse(path.as_str()),
        Some((script, VersionId::from_tenths(21)))
    );
}

/// Identifiers that could escape the owner's namespace are refused
#[test]
fn test_session_rejects_traversal() {
    let session = SessionContext::new("grower-7").unwrap();

    assert!(matches!(
        session.script("../other"),
        Err(ScriptRefError::InvalidCharacter { .. })
    ));
    assert!(matches!(
        session.script(".."),
        Err(ScriptRefError::Reserved { .. })
    ));
    assert!(SessionContext::new("").is_err());
}

/// Version numbers survive the metadata wire format
#[test]
fn test_versions_array_wire_format() {
    let versions: Vec<VersionId> = serde_json::from_str("[1, 2.0, 2.1, 10.5]").unwrap();
    assert_eq!(
        versions.iter().map(|v| v.to_string()).collect::<Vec<_>>(),
        vec!["1.0", "2.0", "2.1", "10.5"]
    );
    assert_eq!(serde_json::to_string(&versions).unwrap(), "[1.0,2.0,2.1,10.5]");

    assert!(serde_json::from_str::<Vec<VersionId>>("[2.15]").is_err());
    assert!(serde_json::from_str::<Vec<VersionId>>("[-1.0]").is_err());
}

/// Configuration files only need the keys they change
#[test]
fn test_load_partial_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "default_content = \"{{}}\"\nreconcile_policy = \"purge\"\n\n[diff]\n\
         algorithm = \"patience\""
    )
    .unwrap();

    let config = VersioningConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config.default_content, "{}");
    assert_eq!(config.reconcile_policy, ReconcilePolicy::Purge);
    assert_eq!(config.diff.algorithm, DiffAlgorithm::Patience);
    assert!(config.validate_json);
    assert!(config.diff.strip_trailing_commas);
}

#[test]
fn test_missing_config_file_names_the_path() {
    let err = VersioningConfig::load_from_file("/nonexistent/scriptvault.toml").unwrap_err();
    assert!(err.to_string().contains("/nonexistent/scriptvault.toml"));
}
