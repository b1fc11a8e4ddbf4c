//! JSON-file storage backend.
//!
//! Layout under the root directory:
//!
//! ```text
//! settings.json
//! stats.json
//! replays/<id>.json
//! ```
//!
//! Writes go to a temporary file first and are renamed into place.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tracing::{debug, warn};

use super::{playable, sort_newest_first, validate_id, ReplayMeta, Settings, Stats, Storage, StorageError};
use crate::replay::codec::ReplayData;

const SETTINGS_FILE: &str = "settings.json";
const STATS_FILE: &str = "stats.json";
const REPLAY_DIR: &str = "replays";

/// Storage rooted at a directory on disk.
#[derive(Clone, Debug)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Use `root` as the storage directory. Nothing is created until the
    /// first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Storage directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn replay_path(&self, id: &str) -> PathBuf {
        self.root.join(REPLAY_DIR).join(format!("{id}.json"))
    }

    async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Option<T> {
        let raw = match fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "read failed");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt document, ignoring");
                None
            }
        }
    }

    async fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_vec_pretty(value)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, raw).await?;
        fs::rename(&tmp, path).await?;
        debug!(path = %path.display(), "saved");
        Ok(())
    }
}

impl Storage for FileStorage {
    async fn save_replay(&self, id: &str, replay: &ReplayData) -> Result<(), StorageError> {
        validate_id(id)?;
        self.write_json(&self.replay_path(id), replay).await
    }

    async fn load_replay(&self, id: &str) -> Option<ReplayData> {
        validate_id(id).ok()?;
        let replay: ReplayData = self.read_json(&self.replay_path(id)).await?;
        playable(id, replay)
    }

    async fn list_replays(&self) -> Vec<ReplayMeta> {
        let dir = self.root.join(REPLAY_DIR);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let mut metas = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "replay listing interrupted");
                    break;
                }
            };

            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if validate_id(id).is_err() {
                continue;
            }
            if let Some(replay) = self.read_json::<ReplayData>(&path).await {
                metas.push(ReplayMeta::from_replay(id, &replay));
            }
        }

        sort_newest_first(&mut metas);
        metas
    }

    async fn delete_replay(&self, id: &str) -> Result<bool, StorageError> {
        validate_id(id)?;
        match fs::remove_file(self.replay_path(id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn load_settings(&self) -> Settings {
        self.read_json::<Settings>(&self.root.join(SETTINGS_FILE))
            .await
            .unwrap_or_default()
            .sanitized()
    }

    async fn save_settings(&self, settings: &Settings) -> Result<(), StorageError> {
        self.write_json(&self.root.join(SETTINGS_FILE), settings).await
    }

    async fn load_stats(&self) -> Stats {
        self.read_json(&self.root.join(STATS_FILE)).await.unwrap_or_default()
    }

    async fn save_stats(&self, stats: &Stats) -> Result<(), StorageError> {
        self.write_json(&self.root.join(STATS_FILE), stats).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::input::{InputState, RecordedFrame};
    use crate::game::track::GameMode;
    use crate::replay::codec::ReplaySettings;

    fn replay(start_time: i64) -> ReplayData {
        let mut r = ReplayData::new(
            11,
            GameMode::Classic,
            ReplaySettings::default(),
            (1..=120)
                .map(|t| RecordedFrame::new(t, InputState::new(t % 3 == 0, false, t % 50 == 0)))
                .collect(),
            "Ada",
        );
        r.start_time = start_time;
        r
    }

    #[tokio::test]
    async fn test_replays_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        storage.save_replay("first", &replay(1_000)).await.unwrap();
        let second = storage.store_replay(&replay(2_000)).await.unwrap();

        assert!(dir.path().join("replays").join("first.json").exists());
        assert_eq!(storage.load_replay("first").await, Some(replay(1_000)));

        let listed = storage.list_replays().await;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second);
        assert_eq!(listed[1].frame_count, 120);

        assert!(storage.delete_replay("first").await.unwrap());
        assert!(!storage.delete_replay("first").await.unwrap());
        assert_eq!(storage.list_replays().await.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_root_reads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nowhere"));

        assert_eq!(storage.load_settings().await, Settings::default());
        assert_eq!(storage.load_stats().await, Stats::default());
        assert!(storage.list_replays().await.is_empty());
        assert!(storage.load_replay("nope").await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_files_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        std::fs::create_dir_all(dir.path().join("replays")).unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "{\"match_length\": ").unwrap();
        std::fs::write(dir.path().join(STATS_FILE), "\"stats\"").unwrap();
        std::fs::write(dir.path().join("replays").join("bad.json"), "garbage").unwrap();
        storage.save_replay("good", &replay(5)).await.unwrap();

        assert_eq!(storage.load_settings().await, Settings::default());
        assert_eq!(storage.load_stats().await, Stats::default());
        let ids: Vec<String> = storage.list_replays().await.into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["good".to_string()]);
    }

    #[tokio::test]
    async fn test_unplayable_replay_on_disk_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        let mut bad = replay(9);
        bad.settings.match_length = 5_000.0;
        storage.save_replay("bad", &bad).await.unwrap();
        storage.save_replay("good", &replay(10)).await.unwrap();

        assert!(storage.load_replay("bad").await.is_none());
        assert_eq!(storage.load_replay("good").await, Some(replay(10)));
    }

    #[tokio::test]
    async fn test_settings_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        let settings = Settings {
            match_length: 60.0,
            show_ghost: false,
            ..Settings::default()
        };
        storage.save_settings(&settings).await.unwrap();
        assert_eq!(storage.load_settings().await, settings);

        let mut stats = storage.load_stats().await;
        stats.races = 2;
        storage.save_stats(&stats).await.unwrap();
        assert_eq!(storage.load_stats().await.races, 2);
    }
}
