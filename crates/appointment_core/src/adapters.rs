//! crates/appointment_core/src/adapters.rs
//!
//! Storage and clock adapters that need nothing beyond the standard library:
//! an in-memory blob store, a key-prefixing wrapper that gives each client its
//! own namespace, and the system clock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::CoreError;
use crate::ports::{BlobStore, Clock, PortError, PortResult};

//=========================================================================================
// In-memory blob store
//=========================================================================================

/// A `BlobStore` held entirely in process memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> PortError {
    PortError::Unexpected("in-memory store lock poisoned".to_string())
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> PortResult<Option<Vec<u8>>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> PortResult<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> PortResult<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.remove(key);
        Ok(())
    }
}

//=========================================================================================
// Scoped blob store
//=========================================================================================

/// Prefixes every key with `<scope>/`, so several clients can share one
/// backing store without seeing each other's values.
#[derive(Clone)]
pub struct ScopedBlobStore {
    inner: Arc<dyn BlobStore>,
    scope: String,
}

impl ScopedBlobStore {
    pub fn new(inner: Arc<dyn BlobStore>, scope: impl Into<String>) -> Self {
        Self {
            inner,
            scope: scope.into(),
        }
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}/{}", self.scope, key)
    }
}

#[async_trait]
impl BlobStore for ScopedBlobStore {
    async fn get(&self, key: &str) -> PortResult<Option<Vec<u8>>> {
        self.inner.get(&self.scoped(key)).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> PortResult<()> {
        self.inner.set(&self.scoped(key), value).await
    }

    async fn remove(&self, key: &str) -> PortResult<()> {
        self.inner.remove(&self.scoped(key)).await
    }
}

//=========================================================================================
// Clock
//=========================================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Next id in the time-based scheme: the current epoch milliseconds, bumped
/// past `last` so ids stay unique and increasing within one store.
pub(crate) fn next_id(now: DateTime<Utc>, last: Option<u64>) -> u64 {
    let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
    match last {
        Some(last) if last >= millis => last + 1,
        _ => millis,
    }
}

/// Puts `key` back to `before`, or removes it if it did not exist, after
/// `cause` aborted a two-key write.
///
/// A failed undo comes back as `PortError::Inconsistent` naming both failures.
pub async fn roll_back(
    store: &dyn BlobStore,
    key: &str,
    before: Option<Vec<u8>>,
    cause: &CoreError,
) -> PortResult<()> {
    let restored = match before {
        Some(bytes) => store.set(key, bytes).await,
        None => store.remove(key).await,
    };
    restored.map_err(|e| PortError::Inconsistent {
        key: key.to_string(),
        reason: format!("{}; rollback failed: {}", cause, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn scopes_do_not_leak_into_each_other() {
        let shared: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
        let alice = ScopedBlobStore::new(shared.clone(), "alice");
        let bob = ScopedBlobStore::new(shared.clone(), "bob");

        alice.set("user", b"a".to_vec()).await.unwrap();
        assert_eq!(bob.get("user").await.unwrap(), None);
        assert_eq!(shared.get("alice/user").await.unwrap(), Some(b"a".to_vec()));

        bob.remove("user").await.unwrap();
        assert_eq!(alice.get("user").await.unwrap(), Some(b"a".to_vec()));
    }

    #[test]
    fn next_id_never_repeats_within_one_millisecond() {
        let now = Utc.timestamp_millis_opt(1_000).unwrap();
        assert_eq!(next_id(now, None), 1_000);
        assert_eq!(next_id(now, Some(1_000)), 1_001);
        assert_eq!(next_id(now, Some(5_000)), 5_001);
        assert_eq!(next_id(now, Some(10)), 1_000);
    }
}
