use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use thiserror::Error;

/// Errors produced by durable store implementations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Underlying storage failure.
    #[error("storage failure: {reason}")]
    Storage { reason: String },
}

/// Contract for the durable key-value text storage used for tasks, settings,
/// and reminder bookkeeping. Absent keys read as `None`, not as an error.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Retrieve the value for a key, or `None` if the key has never been set.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Persist a value under a key, overwriting any existing entry.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a key and its value (idempotent).
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-memory store for tests and smoke runs. Production code uses the
/// file-backed implementation in `taskpad-storage`.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DurableStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let map = self.inner.lock().map_err(|err| StoreError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;
        Ok(map.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut map = self.inner.lock().map_err(|err| StoreError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut map = self.inner.lock().map_err(|err| StoreError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;
        map.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let store = InMemoryStore::new();
        store.set("tasks", "[]").await.expect("set should succeed");
        let value = store.get("tasks").await.expect("get should succeed");
        assert_eq!(value.as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn missing_key_reads_as_none() {
        let store = InMemoryStore::new();
        let value = store.get("absent").await.expect("get should succeed");
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let store = InMemoryStore::new();
        store.set("k", "v").await.expect("set should succeed");
        store.remove("k").await.expect("remove should succeed");
        store
            .remove("k")
            .await
            .expect("remove again should still succeed");
        assert_eq!(store.get("k").await.expect("get"), None);
    }
}
