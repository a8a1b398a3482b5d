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

//! Version Index
//!
//! Validated in-memory view of a script's version set. Identifiers are unique
//! and kept in ascending order; display order is the reverse.

use scriptvault_core::VersionId;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::warn;

/// Index errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("Duplicate version: {0}")]
    Duplicate(VersionId),

    #[error("Version not found: {0}")]
    NotFound(VersionId),

    #[error("Version already exists: {0}")]
    Collision(VersionId),

    #[error("No version identifier left after {0}")]
    Exhausted(VersionId),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionIndex {
    versions: BTreeSet<VersionId>,
}

impl VersionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from identifiers that must already be unique.
    pub fn from_versions(
        versions: impl IntoIterator<Item = VersionId>,
    ) -> Result<Self, IndexError> {
        let mut index = Self::new();
        for version in versions {
            if !index.versions.insert(version) {
                return Err(IndexError::Duplicate(version));
            }
        }
        Ok(index)
    }

    /// Build from the metadata service's array. Duplicates are collapsed,
    /// since they all resolve to the same blob path.
    pub fn from_remote(versions: Vec<VersionId>) -> Self {
        let total = versions.len();
        let index = Self {
            versions: versions.into_iter().collect(),
        };
        if index.len() != total {
            warn!(
                listed = total,
                unique = index.len(),
                "Collapsed duplicate versions in remote index"
            );
        }
        index
    }

    pub fn contains(&self, version: VersionId) -> bool {
        self.versions.contains(&version)
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Highest version
    pub fn latest(&self) -> Option<VersionId> {
        self.versions.last().copied()
    }

    /// `floor(max) + 1.0`, or `1.0` for an empty index
    pub fn next_allocation(&self) -> Result<VersionId, IndexError> {
        match self.latest() {
            Some(latest) => latest
                .next_major()
                .map_err(|_| IndexError::Exhausted(latest)),
            None => Ok(VersionId::FIRST),
        }
    }

    pub fn insert(&mut self, version: VersionId) -> Result<(), IndexError> {
        if !self.versions.insert(version) {
            return Err(IndexError::Collision(version));
        }
        Ok(())
    }

    pub fn remove(&mut self, version: VersionId) -> Result<(), IndexError> {
        if !self.versions.remove(&version) {
            return Err(IndexError::NotFound(version));
        }
        Ok(())
    }

    /// Swap `old` for `new`. Renaming onto itself counts as a collision.
    pub fn replace(&mut self, old: VersionId, new: VersionId) -> Result<(), IndexError> {
        if !self.contains(old) {
            return Err(IndexError::NotFound(old));
        }
        if self.contains(new) {
            return Err(IndexError::Collision(new));
        }
        self.versions.remove(&old);
        self.versions.insert(new);
        Ok(())
    }

    pub fn ascending(&self) -> impl DoubleEndedIterator<Item = VersionId> + '_ {
        self.versions.iter().copied()
    }

    /// Display order
    pub fn descending(&self) -> impl Iterator<Item = VersionId> + '_ {
        self.ascending().rev()
    }

    /// Persisted form (ascending)
    pub fn to_vec(&self) -> Vec<VersionId> {
        self.ascending().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn v(tenths: u32) -> VersionId {
        VersionId::from_tenths(tenths)
    }

    #[test]
    fn test_allocation() {
        assert_eq!(VersionIndex::new().next_allocation().unwrap(), v(10));

        let index = VersionIndex::from_versions([v(10), v(20)]).unwrap();
        assert_eq!(index.next_allocation().unwrap(), v(30));

        let index = VersionIndex::from_versions([v(10), v(25)]).unwrap();
        assert_eq!(index.next_allocation().unwrap(), v(30));

        let index = VersionIndex::from_versions([v(3)]).unwrap();
        assert_eq!(index.next_allocation().unwrap(), v(10));
    }

    #[test]
    fn test_exhausted() {
        let index = VersionIndex::from_versions([v(u32::MAX)]).unwrap();
        assert_eq!(
            index.next_allocation(),
            Err(IndexError::Exhausted(v(u32::MAX)))
        );
    }

    #[test]
    fn test_duplicates() {
        assert_eq!(
            VersionIndex::from_versions([v(10), v(20), v(10)]),
            Err(IndexError::Duplicate(v(10)))
        );

        let index = VersionIndex::from_remote(vec![v(20), v(10), v(20)]);
        assert_eq!(index.to_vec(), vec![v(10), v(20)]);
    }

    #[test]
    fn test_ordering() {
        let index = VersionIndex::from_versions([v(20), v(100), v(21), v(10)]).unwrap();
        assert_eq!(index.to_vec(), vec![v(10), v(20), v(21), v(100)]);
        assert_eq!(
            index.descending().collect::<Vec<_>>(),
            vec![v(100), v(21), v(20), v(10)]
        );
        assert_eq!(index.latest(), Some(v(100)));
    }

    #[test]
    fn test_mutations() {
        let mut index = VersionIndex::from_versions([v(10), v(20)]).unwrap();

        assert_eq!(index.insert(v(20)), Err(IndexError::Collision(v(20))));
        index.insert(v(30)).unwrap();

        index.replace(v(20), v(25)).unwrap();
        assert_eq!(index.to_vec(), vec![v(10), v(25), v(30)]);

        assert_eq!(index.replace(v(20), v(26)), Err(IndexError::NotFound(v(20))));
        assert_eq!(index.replace(v(25), v(30)), Err(IndexError::Collision(v(30))));
        assert_eq!(index.replace(v(25), v(25)), Err(IndexError::Collision(v(25))));

        index.remove(v(10)).unwrap();
        assert_eq!(index.remove(v(10)), Err(IndexError::NotFound(v(10))));
        assert_eq!(index.len(), 2);
    }

    proptest! {
        #[test]
        fn prop_index_never_holds_duplicates(raw in prop::collection::vec(0u32..50, 0..40)) {
            let index = VersionIndex::from_remote(raw.iter().copied().map(v).collect());
            let listed = index.to_vec();

            let mut deduped = listed.clone();
            deduped.dedup();
            prop_assert_eq!(&listed, &deduped);
            prop_assert!(listed.windows(2).all(|w| w[0] < w[1]));

            let next = index.next_allocation().unwrap();
            prop_assert!(!index.contains(next));
            prop_assert_eq!(next.fraction(), 0);
        }
    }
}
