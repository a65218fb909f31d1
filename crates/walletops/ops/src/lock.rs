//! Named mutual-exclusion locks keyed by operation kind.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crate::error::{OperationError, Result};

/// Registry of async locks, one per name, created on first use.
#[derive(Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, name: &str) -> Result<Arc<AsyncMutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| OperationError::Lock("lock registry poisoned".to_string()))?;
        Ok(locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone())
    }

    /// Wait for the lock called `name`. It is held until the guard drops.
    pub async fn acquire(&self, name: &str) -> Result<NamedGuard> {
        let lock = self.entry(name)?;
        debug!(lock = name, "waiting for lock");
        let guard = lock.lock_owned().await;
        debug!(lock = name, "lock acquired");
        Ok(NamedGuard {
            name: name.to_string(),
            _guard: guard,
        })
    }
}

/// Held lock; released on drop.
pub struct NamedGuard {
    name: String,
    _guard: OwnedMutexGuard<()>,
}

impl NamedGuard {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for NamedGuard {
    fn drop(&mut self) {
        debug!(lock = %self.name, "lock released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_name_serializes() {
        let registry = Arc::new(LockRegistry::new());
        let first = registry.acquire("fund").await.unwrap();

        let contender = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.acquire("fund").await.map(|g| g.name().to_string()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(first);
        assert_eq!(contender.await.unwrap().unwrap(), "fund");
    }

    #[tokio::test]
    async fn different_names_are_independent() {
        let registry = LockRegistry::new();
        let _fund = registry.acquire("fund").await.unwrap();
        let other = tokio::time::timeout(Duration::from_millis(50), registry.acquire("drain")).await;
        assert!(other.is_ok());
    }
}
