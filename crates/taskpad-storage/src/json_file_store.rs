use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use taskpad_core::storage::{DurableStore, StoreError};
use tempfile::NamedTempFile;
use tracing::instrument;

/// File-per-key store implementing the shared `DurableStore` contract.
/// Values are written through a temp file and renamed into place so a crash
/// mid-write never leaves a truncated entry behind.
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(sanitize_key(key))
    }
}

#[async_trait]
impl DurableStore for JsonFileStore {
    #[instrument(skip_all, fields(key))]
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(storage_err(err)),
        }
    }

    #[instrument(skip_all, fields(key))]
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).map_err(storage_err)?;
        let path = self.path_for(key);
        write_atomic(&path, value)
    }

    #[instrument(skip_all, fields(key))]
    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        match fs::remove_file(path) {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(storage_err(err)),
        }
    }
}

fn write_atomic(path: &Path, value: &str) -> Result<(), StoreError> {
    let parent = path.parent().ok_or_else(|| StoreError::Storage {
        reason: "invalid storage path".to_string(),
    })?;
    fs::create_dir_all(parent).map_err(storage_err)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(storage_err)?;
    tmp.write_all(value.as_bytes()).map_err(storage_err)?;
    tmp.flush().map_err(storage_err)?;
    tmp.persist(path).map_err(|e| storage_err(e.error))?;
    Ok(())
}

// Keys may contain separators ("health/probe"); encode them so every key maps
// to a single flat file name.
fn sanitize_key(key: &str) -> String {
    URL_SAFE_NO_PAD.encode(key)
}

fn storage_err<E: ToString>(err: E) -> StoreError {
    StoreError::Storage {
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path());

        store.set("tasks", "[{\"id\":\"1\"}]").await.expect("set");
        let value = store.get("tasks").await.expect("get");
        assert_eq!(value.as_deref(), Some("[{\"id\":\"1\"}]"));
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path());
        assert_eq!(store.get("nope").await.expect("get"), None);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path());
        store.set("k", "v").await.expect("set");
        store.remove("k").await.expect("remove");
        store.remove("k").await.expect("remove again");
        assert_eq!(store.get("k").await.expect("get"), None);
    }

    #[tokio::test]
    async fn overwrite_replaces_previous_value() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path());
        store.set("k", "old").await.expect("set");
        store.set("k", "new").await.expect("set");
        assert_eq!(store.get("k").await.expect("get").as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn keys_with_separators_map_to_flat_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path());
        store.set("health/probe", "ok").await.expect("set");
        assert_eq!(
            store.get("health/probe").await.expect("get").as_deref(),
            Some("ok")
        );
        // no nested directory was created
        let entries: Vec<_> = fs::read_dir(dir.path())
            .expect("read_dir")
            .map(|e| e.expect("entry").file_type().expect("file_type"))
            .collect();
        assert!(entries.iter().all(|t| t.is_file()));
    }
}
