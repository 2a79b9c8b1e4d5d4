//! services/app/src/adapters/store.rs
//!
//! Concrete implementations of the `KeyValueStore` port: a JSON-file-backed
//! store for the binary, and a pure in-memory store used as a test double and
//! as a fallback when no durable location is available.

use async_trait::async_trait;
use gpdf_core::ports::{KeyValueStore, PortError, PortResult};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::Mutex;

//=========================================================================================
// JSON File Store
//=========================================================================================

/// A `KeyValueStore` persisted as a single JSON object on disk.
///
/// The whole map is read and rewritten on every mutation. That is acceptable
/// here: the store holds a handful of small bookkeeping keys and is accessed
/// by a single client context.
pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    async fn read_map(&self) -> PortResult<HashMap<String, serde_json::Value>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| PortError::Storage(format!("corrupt store file: {}", e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(PortError::Storage(e.to_string())),
        }
    }

    async fn write_map(&self, map: &HashMap<String, serde_json::Value>) -> PortResult<()> {
        let bytes = serde_json::to_vec_pretty(map)
            .map_err(|e| PortError::Storage(e.to_string()))?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| PortError::Storage(e.to_string()))
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, keys: &[&str]) -> PortResult<HashMap<String, serde_json::Value>> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        Ok(keys
            .iter()
            .filter_map(|k| map.remove(*k).map(|v| (k.to_string(), v)))
            .collect())
    }

    async fn set(&self, entries: HashMap<String, serde_json::Value>) -> PortResult<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        map.extend(entries);
        self.write_map(&map).await
    }

    async fn remove(&self, keys: &[&str]) -> PortResult<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        for key in keys {
            map.remove(*key);
        }
        self.write_map(&map).await
    }
}

//=========================================================================================
// In-Memory Store
//=========================================================================================

/// A pure in-memory `KeyValueStore`, used in tests and as a last-resort
/// stand-in when no file location is writable.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> PortResult<HashMap<String, serde_json::Value>> {
        let entries = self.entries.lock().await;
        Ok(keys
            .iter()
            .filter_map(|k| entries.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, new_entries: HashMap<String, serde_json::Value>) -> PortResult<()> {
        let mut entries = self.entries.lock().await;
        entries.extend(new_entries);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> PortResult<()> {
        let mut entries = self.entries.lock().await;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = JsonFileStore::new(path.clone());
        store
            .set(HashMap::from([("sessionId".to_string(), json!("session_1"))]))
            .await
            .unwrap();
        drop(store);

        let reopened = JsonFileStore::new(path);
        let values = reopened.get(&["sessionId"]).await.unwrap();
        assert_eq!(values["sessionId"], json!("session_1"));
    }

    #[tokio::test]
    async fn file_store_treats_missing_file_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("absent.json"));
        let values = store.get(&["sessionId", "usageInfo"]).await.unwrap();
        assert!(values.is_empty());
    }

    #[tokio::test]
    async fn remove_deletes_only_named_keys() {
        let store = MemoryStore::new();
        store
            .set(HashMap::from([
                ("sessionId".to_string(), json!("session_1")),
                ("settings".to_string(), json!({"theme": "dark"})),
            ]))
            .await
            .unwrap();

        store.remove(&["sessionId", "neverStored"]).await.unwrap();

        let values = store.get(&["sessionId", "settings"]).await.unwrap();
        assert!(!values.contains_key("sessionId"));
        assert_eq!(values["settings"], json!({"theme": "dark"}));
    }
}
