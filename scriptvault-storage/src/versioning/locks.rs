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

//! Per-script write serialization

use dashmap::DashMap;
use scriptvault_core::ScriptRef;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per script. Different scripts never contend.
#[derive(Default)]
pub struct ScriptLocks {
    locks: DashMap<ScriptRef, Arc<Mutex<()>>>,
}

impl ScriptLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `script`. The guard owns its mutex, so it
    /// can be held across a spawned task.
    pub async fn acquire(&self, script: &ScriptRef) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(script.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Drop the entry for `script` if nobody holds or waits on it. Call after
    /// the guard is dropped. Returns whether the entry was removed.
    pub fn release(&self, script: &ScriptRef) -> bool {
        self.locks
            .remove_if(script, |_, lock| Arc::strong_count(lock) == 1)
            .is_some()
    }

    /// Drop entries nobody holds or waits on. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - self.locks.len()
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn script(id: &str) -> ScriptRef {
        ScriptRef::new("owner", id).unwrap()
    }

    #[tokio::test]
    async fn test_same_script_is_exclusive() {
        let locks = ScriptLocks::new();
        let a = script("a");
        let guard = locks.acquire(&a).await;

        let blocked = tokio::time::timeout(Duration::from_millis(20), locks.acquire(&a));
        assert!(blocked.await.is_err());

        drop(guard);
        let reacquired = tokio::time::timeout(Duration::from_millis(20), locks.acquire(&a));
        assert!(reacquired.await.is_ok());
    }

    #[tokio::test]
    async fn test_different_scripts_do_not_contend() {
        let locks = ScriptLocks::new();
        let _a = locks.acquire(&script("a")).await;

        let b = script("b");
        let other = tokio::time::timeout(Duration::from_millis(20), locks.acquire(&b));
        assert!(other.await.is_ok());
    }

    #[tokio::test]
    async fn test_release_only_drops_idle_entry() {
        let locks = ScriptLocks::new();
        let a = script("a");
        let held = locks.acquire(&a).await;

        assert!(!locks.release(&a));
        assert_eq!(locks.len(), 1);

        drop(held);
        assert!(locks.release(&a));
        assert!(locks.is_empty());
        assert!(!locks.release(&a));
    }

    #[tokio::test]
    async fn test_prune_keeps_held_locks() {
        let locks = ScriptLocks::new();
        let held = locks.acquire(&script("a")).await;
        drop(locks.acquire(&script("b")).await);

        assert_eq!(locks.len(), 2);
        assert_eq!(locks.prune(), 1);
        assert_eq!(locks.len(), 1);

        drop(held);
        assert_eq!(locks.prune(), 1);
        assert!(locks.is_empty());
    }
}
