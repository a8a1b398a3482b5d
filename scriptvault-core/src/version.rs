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

//! Version identifiers and blob paths
//!
//! A script version is a non-negative number with exactly one decimal digit
//! (`1.0`, `2.0`, `2.1`). It is stored as an integer count of tenths so that
//! ordering, allocation and formatting never go through floating point.
//! Floats only appear at the serde boundary, where the metadata service
//! speaks `number[]`.

use crate::script::ScriptRef;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Tolerance applied after scaling a float by ten.
const SCALE_EPSILON: f64 = 1e-6;

/// Version identifier errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VersionIdError {
    #[error("Version must be a finite number, got {0}")]
    NotFinite(f64),

    #[error("Version must be non-negative, got {0}")]
    Negative(f64),

    #[error("Version {0} has more than one decimal digit")]
    TooPrecise(String),

    #[error("Version {0} is out of range")]
    Overflow(String),

    #[error("Invalid version string: {0:?}")]
    Malformed(String),
}

/// Identifier of one revision of a script, scaled by ten.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionId(u32);

impl VersionId {
    /// Number of internal units per whole version.
    pub const SCALE: u32 = 10;

    /// The identifier given to the first version of a script.
    pub const FIRST: VersionId = VersionId(Self::SCALE);

    /// Build from a raw count of tenths (`21` is `2.1`).
    pub const fn from_tenths(tenths: u32) -> Self {
        Self(tenths)
    }

    /// Build a whole version (`major(3)` is `3.0`).
    pub fn major(whole: u32) -> Result<Self, VersionIdError> {
        whole
            .checked_mul(Self::SCALE)
            .map(Self)
            .ok_or_else(|| VersionIdError::Overflow(whole.to_string()))
    }

    /// Convert a boundary float, rejecting anything that is not a
    /// non-negative one-decimal value.
    pub fn from_f64(value: f64) -> Result<Self, VersionIdError> {
        if !value.is_finite() {
            return Err(VersionIdError::NotFinite(value));
        }
        if value < 0.0 {
            return Err(VersionIdError::Negative(value));
        }

        let scaled = value * Self::SCALE as f64;
        let rounded = scaled.round();
        if (scaled - rounded).abs() > SCALE_EPSILON {
            return Err(VersionIdError::TooPrecise(value.to_string()));
        }
        if rounded > u32::MAX as f64 {
            return Err(VersionIdError::Overflow(value.to_string()));
        }

        Ok(Self(rounded as u32))
    }

    /// Raw count of tenths.
    pub const fn tenths(self) -> u32 {
        self.0
    }

    /// Integer part (`floor`).
    pub const fn whole(self) -> u32 {
        self.0 / Self::SCALE
    }

    /// Decimal digit.
    pub const fn fraction(self) -> u32 {
        self.0 % Self::SCALE
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }

    /// `floor(self) + 1.0`
    pub fn next_major(self) -> Result<Self, VersionIdError> {
        self.whole()
            .checked_add(1)
            .ok_or_else(|| VersionIdError::Overflow(self.to_string()))
            .and_then(Self::major)
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.whole(), self.fraction())
    }
}

impl FromStr for VersionId {
    type Err = VersionIdError;

    /// Accepts `2`, `2.1` and `v2.1`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || VersionIdError::Malformed(s.to_string());

        let trimmed = s.trim();
        let body = trimmed.strip_prefix('v').unwrap_or(trimmed);

        let (whole, fraction) = match body.split_once('.') {
            Some((whole, fraction)) => (whole, Some(fraction)),
            None => (body, None),
        };

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let whole: u32 = whole
            .parse()
            .map_err(|_| VersionIdError::Overflow(s.to_string()))?;

        let tenths = match fraction {
            None => 0,
            Some(digits) if digits.len() == 1 && digits.bytes().all(|b| b.is_ascii_digit()) => {
                u32::from(digits.as_bytes()[0] - b'0')
            }
            Some(digits) if digits.len() > 1 && digits.bytes().all(|b| b.is_ascii_digit()) => {
                return Err(VersionIdError::TooPrecise(s.to_string()));
            }
            Some(_) => return Err(malformed()),
        };

        Self::major(whole)?
            .0
            .checked_add(tenths)
            .map(Self)
            .ok_or_else(|| VersionIdError::Overflow(s.to_string()))
    }
}

impl Serialize for VersionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for VersionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Self::from_f64(value).map_err(serde::de::Error::custom)
    }
}

/// Canonical location of a version blob:
/// `{owner}/script/{script}/v{version}.json`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobPath(String);

impl BlobPath {
    pub fn new(script: &ScriptRef, version: VersionId) -> Self {
        Self(format!("{}v{}.json", Self::script_prefix(script), version))
    }

    /// Directory-like prefix shared by every version of a script.
    pub fn script_prefix(script: &ScriptRef) -> String {
        format!("{}/script/{}/", script.owner_id(), script.script_id())
    }

    /// Map a canonical path back to its script and version. Non-canonical
    /// spellings (`v2.json`, `v2.10.json`) are rejected.
    pub fn parse(path: &str) -> Option<(ScriptRef, VersionId)> {
        let stem = path.strip_suffix(".json")?;
        let (dir, file) = stem.rsplit_once('/')?;
        let (owner, script_id) = dir.rsplit_once("/script/")?;
        let version: VersionId = file.strip_prefix('v')?.parse().ok()?;
        let script = ScriptRef::new(owner, script_id).ok()?;

        let canonical = Self::new(&script, version);
        (canonical.as_str() == path).then_some((script, version))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for BlobPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BlobPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_display_has_one_decimal() {
        assert_eq!(VersionId::FIRST.to_string(), "1.0");
        assert_eq!(VersionId::from_tenths(21).to_string(), "2.1");
        assert_eq!(VersionId::from_tenths(0).to_string(), "0.0");
        assert_eq!(VersionId::major(12).unwrap().to_string(), "12.0");
    }

    #[test]
    fn test_from_f64() {
        assert_eq!(VersionId::from_f64(2.1).unwrap(), VersionId::from_tenths(21));
        assert_eq!(VersionId::from_f64(3.0).unwrap(), VersionId::from_tenths(30));
        assert_eq!(VersionId::from_f64(0.3).unwrap(), VersionId::from_tenths(3));

        assert!(matches!(
            VersionId::from_f64(-1.0),
            Err(VersionIdError::Negative(_))
        ));
        assert!(matches!(
            VersionId::from_f64(f64::NAN),
            Err(VersionIdError::NotFinite(_))
        ));
        assert!(matches!(
            VersionId::from_f64(2.15),
            Err(VersionIdError::TooPrecise(_))
        ));
        assert!(matches!(
            VersionId::from_f64(1e12),
            Err(VersionIdError::Overflow(_))
        ));
    }

    #[test]
    fn test_parse() {
        assert_eq!("2".parse::<VersionId>().unwrap(), VersionId::from_tenths(20));
        assert_eq!("2.1".parse::<VersionId>().unwrap(), VersionId::from_tenths(21));
        assert_eq!("v2.5".parse::<VersionId>().unwrap(), VersionId::from_tenths(25));
        assert_eq!(" 10.0 ".parse::<VersionId>().unwrap(), VersionId::from_tenths(100));

        assert!(matches!(
            "2.15".parse::<VersionId>(),
            Err(VersionIdError::TooPrecise(_))
        ));
        assert!("".parse::<VersionId>().is_err());
        assert!("-1".parse::<VersionId>().is_err());
        assert!("2.".parse::<VersionId>().is_err());
        assert!(".5".parse::<VersionId>().is_err());
        assert!("two".parse::<VersionId>().is_err());
    }

    #[test]
    fn test_next_major_floors() {
        let v = VersionId::from_tenths(25);
        assert_eq!(v.next_major().unwrap(), VersionId::from_tenths(30));
        assert_eq!(
            VersionId::from_tenths(0).next_major().unwrap(),
            VersionId::FIRST
        );
        assert!(VersionId::from_tenths(u32::MAX).next_major().is_err());
    }

    #[test]
    fn test_ordering_is_numeric() {
        let mut versions = vec![
            VersionId::from_tenths(100),
            VersionId::from_tenths(21),
            VersionId::from_tenths(9),
        ];
        versions.sort();
        assert_eq!(
            versions,
            vec![
                VersionId::from_tenths(9),
                VersionId::from_tenths(21),
                VersionId::from_tenths(100)
            ]
        );
    }

    #[test]
    fn test_serde_uses_numbers() {
        let versions = vec![VersionId::FIRST, VersionId::from_tenths(21)];
        let json = serde_json::to_string(&versions).unwrap();
        assert_eq!(json, "[1.0,2.1]");

        let parsed: Vec<VersionId> = serde_json::from_str("[1, 2.1, 3.0]").unwrap();
        assert_eq!(
            parsed,
            vec![
                VersionId::FIRST,
                VersionId::from_tenths(21),
                VersionId::from_tenths(30)
            ]
        );

        assert!(serde_json::from_str::<Vec<VersionId>>("[2.25]").is_err());
        assert!(serde_json::from_str::<Vec<VersionId>>("[-1]").is_err());
    }

    #[test]
    fn test_blob_path_format() {
        let script = ScriptRef::new("owner-1", "script-9").unwrap();
        let path = BlobPath::new(&script, VersionId::from_tenths(21));
        assert_eq!(path.as_str(), "owner-1/script/script-9/v2.1.json");
        assert_eq!(BlobPath::script_prefix(&script), "owner-1/script/script-9/");
    }

    #[test]
    fn test_blob_path_parse() {
        let (script, version) = BlobPath::parse("owner-1/script/script-9/v3.0.json").unwrap();
        assert_eq!(script.owner_id(), "owner-1");
        assert_eq!(script.script_id(), "script-9");
        assert_eq!(version, VersionId::from_tenths(30));

        assert!(BlobPath::parse("owner-1/script/script-9/v3.json").is_none());
        assert!(BlobPath::parse("owner-1/script/script-9/v3.0.txt").is_none());
        assert!(BlobPath::parse("owner-1/model/script-9/v3.0.json").is_none());
        assert!(BlobPath::parse("owner-1/script/script-9/notes.json").is_none());
    }

    proptest! {
        #[test]
        fn prop_display_parse_round_trip(tenths in 0u32..1_000_000) {
            let version = VersionId::from_tenths(tenths);
            let parsed: VersionId = version.to_string().parse().unwrap();
            prop_assert_eq!(parsed, version);
            prop_assert_eq!(VersionId::from_f64(version.as_f64()).unwrap(), version);
        }
    }
}
