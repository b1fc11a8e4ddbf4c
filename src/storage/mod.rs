//! Persistence services.
//!
//! Settings, stats and saved replays behind an async `Storage` trait. The
//! simulation never waits on storage mid-race; callers persist after a race
//! concludes.
//!
//! Reads never fail: corrupt or missing data comes back as defaults (or
//! `None` for a replay). Writes return errors so callers can log them, but
//! nothing in the game treats a failed write as fatal.

pub mod file;
pub mod memory;
pub mod settings;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::track::GameMode;
use crate::replay::codec::ReplayData;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use settings::{Settings, Stats};

/// Longest accepted replay id
pub const MAX_ID_LEN: usize = 64;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Document did not (de)serialize
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Id is empty, too long or has characters outside `[A-Za-z0-9_-]`
    #[error("invalid replay id: {0:?}")]
    InvalidId(String),
}

/// Summary of a saved replay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayMeta {
    /// Replay id
    pub id: String,
    /// Race seed
    pub seed: u32,
    /// Game mode
    pub mode: GameMode,
    /// Human's name
    pub player_name: String,
    /// Wall-clock start, Unix millis
    pub start_time: i64,
    /// Recorded duration in seconds
    pub duration: f64,
    /// Number of recorded frames
    pub frame_count: usize,
}

impl ReplayMeta {
    /// Summarize a replay stored under `id`.
    pub fn from_replay(id: impl Into<String>, replay: &ReplayData) -> Self {
        Self {
            id: id.into(),
            seed: replay.seed,
            mode: replay.mode,
            player_name: replay.player_name.clone(),
            start_time: replay.start_time,
            duration: replay.duration(),
            frame_count: replay.frames.len(),
        }
    }
}

/// Newest first; ties by id.
pub(crate) fn sort_newest_first(metas: &mut [ReplayMeta]) {
    metas.sort_by(|a, b| b.start_time.cmp(&a.start_time).then_with(|| a.id.cmp(&b.id)));
}

/// Drop a stored replay whose settings could not be raced.
pub(crate) fn playable(id: &str, replay: ReplayData) -> Option<ReplayData> {
    match replay.validate() {
        Ok(()) => Some(replay),
        Err(e) => {
            tracing::warn!(id, error = %e, "stored replay is unplayable, ignoring");
            None
        }
    }
}

/// Fresh replay id.
pub fn new_replay_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Check an id is safe to use as a key or file name.
pub fn validate_id(id: &str) -> Result<(), StorageError> {
    let ok = !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(StorageError::InvalidId(id.to_string()))
    }
}

/// Async persistence backend.
#[allow(async_fn_in_trait)]
pub trait Storage {
    /// Save (or overwrite) a replay.
    async fn save_replay(&self, id: &str, replay: &ReplayData) -> Result<(), StorageError>;

    /// Load a replay; `None` if missing or corrupt.
    async fn load_replay(&self, id: &str) -> Option<ReplayData>;

    /// Summaries of every readable replay, newest first.
    async fn list_replays(&self) -> Vec<ReplayMeta>;

    /// Delete a replay. Returns whether it existed.
    async fn delete_replay(&self, id: &str) -> Result<bool, StorageError>;

    /// Load settings; defaults if missing or corrupt.
    async fn load_settings(&self) -> Settings;

    /// Save settings.
    async fn save_settings(&self, settings: &Settings) -> Result<(), StorageError>;

    /// Load stats; defaults if missing or corrupt.
    async fn load_stats(&self) -> Stats;

    /// Save stats.
    async fn save_stats(&self, stats: &Stats) -> Result<(), StorageError>;

    /// Save a replay under a fresh id and return the id.
    async fn store_replay(&self, replay: &ReplayData) -> Result<String, StorageError> {
        let id = new_replay_id();
        self.save_replay(&id, replay).await?;
        Ok(id)
    }
}
