//! Key-value persistence for client state (cart contents, browse filters).
//!
//! Values are flat JSON documents stored under named keys.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{Result, StorefrontError};

pub const CART_KEY: &str = "cart";
pub const BROWSE_FILTERS_KEY: &str = "browse-filters";

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn put(&self, key: &str, value: String) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

pub(crate) async fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub(crate) async fn save_json<T: Serialize + Sync>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    store.put(key, serde_json::to_string(value)?).await
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

    fn path(&self, key: &str) -> PathBuf { self.dir.join(format!("{key}.json")) }
}

fn storage_err(e: std::io::Error) -> StorefrontError { StorefrontError::Storage(e.to_string()) }

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.path(key)).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(storage_err)?;
        let path = self.path(key);
        let tmp = path.with_extension(format!("json.{}.tmp", Uuid::new_v4()));
        tokio::fs::write(&tmp, value).await.map_err(storage_err)?;
        tokio::fs::rename(&tmp, &path).await.map_err(storage_err)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path(key)).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(storage_err(e)),
            _ => Ok(()),
        }
    }
}

/// Process-local store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> { Ok(self.values.lock().await.get(key).cloned()) }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        self.values.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.values.lock().await.remove(key);
        Ok(())
    }
}
