//! In-memory storage backend.
//!
//! Holds JSON documents in a key-value map, the same shape a browser
//! key-value store would. Useful for tests and headless runs.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::warn;

use super::{playable, sort_newest_first, validate_id, ReplayMeta, Settings, Stats, Storage, StorageError};
use crate::replay::codec::ReplayData;

const SETTINGS_KEY: &str = "settings";
const STATS_KEY: &str = "stats";
const REPLAY_PREFIX: &str = "replay:";

/// Key-value storage held in memory. Clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    docs: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a raw document under `key`.
    pub async fn put_raw(&self, key: impl Into<String>, value: impl Into<String>) {
        self.docs.write().await.insert(key.into(), value.into());
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    /// True if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let docs = self.docs.read().await;
        let raw = docs.get(key)?;
        match serde_json::from_str(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "corrupt document, ignoring");
                None
            }
        }
    }

    async fn write_json<T: serde::Serialize>(&self, key: String, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)?;
        self.docs.write().await.insert(key, raw);
        Ok(())
    }
}

fn replay_key(id: &str) -> String {
    format!("{REPLAY_PREFIX}{id}")
}

impl Storage for MemoryStorage {
    async fn save_replay(&self, id: &str, replay: &ReplayData) -> Result<(), StorageError> {
        validate_id(id)?;
        self.write_json(replay_key(id), replay).await
    }

    async fn load_replay(&self, id: &str) -> Option<ReplayData> {
        validate_id(id).ok()?;
        let replay: ReplayData = self.read_json(&replay_key(id)).await?;
        playable(id, replay)
    }

    async fn list_replays(&self) -> Vec<ReplayMeta> {
        let docs = self.docs.read().await;
        let mut metas: Vec<ReplayMeta> = docs
            .iter()
            .filter_map(|(key, raw)| {
                let id = key.strip_prefix(REPLAY_PREFIX)?;
                let replay: ReplayData = serde_json::from_str(raw).ok()?;
                Some(ReplayMeta::from_replay(id, &replay))
            })
            .collect();
        sort_newest_first(&mut metas);
        metas
    }

    async fn delete_replay(&self, id: &str) -> Result<bool, StorageError> {
        validate_id(id)?;
        Ok(self.docs.write().await.remove(&replay_key(id)).is_some())
    }

    async fn load_settings(&self) -> Settings {
        self.read_json::<Settings>(SETTINGS_KEY)
            .await
            .unwrap_or_default()
            .sanitized()
    }

    async fn save_settings(&self, settings: &Settings) -> Result<(), StorageError> {
        self.write_json(SETTINGS_KEY.to_string(), settings).await
    }

    async fn load_stats(&self) -> Stats {
        self.read_json(STATS_KEY).await.unwrap_or_default()
    }

    async fn save_stats(&self, stats: &Stats) -> Result<(), StorageError> {
        self.write_json(STATS_KEY.to_string(), stats).await
    }
}
