//! Replay Transport Codec
//!
//! A replay travels as one URL-safe token: the replay packed with bincode
//! (varint integers, inputs folded into a 3-bit mask, ticks delta-coded)
//! and wrapped in unpadded URL-safe base64.
//!
//! Decoding fails closed. `decode` returns `None` for anything malformed;
//! `try_decode` says why.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bincode::Options;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ai::profile::BotPersonality;
use crate::game::input::{InputState, RecordedFrame};
use crate::game::track::GameMode;
use crate::storage::settings::{MAX_BOTS, MAX_MATCH_LENGTH, MIN_MATCH_LENGTH};

/// Current replay format version
pub const REPLAY_VERSION: u16 = 1;

/// Upper bound on the packed replay size
pub const MAX_REPLAY_BYTES: u64 = 1 << 20;

// =============================================================================
// REPLAY DATA
// =============================================================================

/// Race parameters stored with a replay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplaySettings {
    /// Match length in seconds
    pub match_length: f64,
    /// Bot roster in join order
    pub bots: Vec<BotPersonality>,
    /// Whether a human raced (and the frames are theirs)
    pub has_human: bool,
    /// Human's skin
    pub skin_index: u8,
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            match_length: crate::game::tick::DEFAULT_MATCH_LENGTH,
            bots: Vec::new(),
            has_human: true,
            skin_index: 0,
        }
    }
}

/// A recorded race: seed, mode, settings and the human's input frames.
///
/// Re-running the frames with the same seed and bot roster reproduces the
/// original outcome exactly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayData {
    /// Format version
    pub version: u16,
    /// Race seed
    pub seed: u32,
    /// Game mode
    pub mode: GameMode,
    /// Race parameters
    pub settings: ReplaySettings,
    /// Human input, in tick order
    pub frames: Vec<RecordedFrame>,
    /// Wall-clock start, Unix millis
    pub start_time: i64,
    /// Human's name
    pub player_name: String,
}

impl ReplayData {
    /// Create a replay stamped with the current version and time.
    pub fn new(
        seed: u32,
        mode: GameMode,
        settings: ReplaySettings,
        frames: Vec<RecordedFrame>,
        player_name: impl Into<String>,
    ) -> Self {
        Self {
            version: REPLAY_VERSION,
            seed,
            mode,
            settings,
            frames,
            start_time: chrono::Utc::now().timestamp_millis(),
            player_name: player_name.into(),
        }
    }

    /// Last recorded tick (0 if empty).
    pub fn last_tick(&self) -> u32 {
        self.frames.last().map_or(0, |f| f.tick)
    }

    /// Recorded duration in seconds.
    pub fn duration(&self) -> f64 {
        self.last_tick() as f64 * crate::DT
    }

    /// Check the race parameters are playable: a finite match length in
    /// `[MIN_MATCH_LENGTH, MAX_MATCH_LENGTH]` and at most `MAX_BOTS` bots.
    pub fn validate(&self) -> Result<(), ReplayError> {
        let length = self.settings.match_length;
        if !(MIN_MATCH_LENGTH..=MAX_MATCH_LENGTH).contains(&length) {
            return Err(ReplayError::InvalidSettings(format!("match length {length}")));
        }
        if self.settings.bots.len() > MAX_BOTS {
            return Err(ReplayError::InvalidSettings(format!(
                "{} bots, at most {MAX_BOTS}",
                self.settings.bots.len()
            )));
        }
        Ok(())
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Why a replay could not be packed or unpacked.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Empty token
    #[error("empty replay token")]
    Empty,

    /// Not URL-safe base64
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Payload did not unpack
    #[error("invalid replay payload: {0}")]
    Payload(#[from] bincode::Error),

    /// Unknown format version
    #[error("unsupported replay version {0}")]
    UnsupportedVersion(u16),

    /// Input mask with undefined bits
    #[error("invalid input mask {mask:#04x} at frame {index}")]
    InvalidMask {
        /// Frame index
        index: usize,
        /// Offending mask
        mask: u8,
    },

    /// Match length or roster out of range
    #[error("invalid replay settings: {0}")]
    InvalidSettings(String),

    /// Frame ticks must strictly increase
    #[error("frame ticks not increasing at frame {index}")]
    NonMonotonicTicks {
        /// Frame index
        index: usize,
    },
}

// =============================================================================
// WIRE FORMAT
// =============================================================================

/// Packed layout. Frames are (tick delta, input mask); the first delta is
/// from tick 0.
#[derive(Serialize, Deserialize)]
struct WireReplay {
    version: u16,
    seed: u32,
    mode: GameMode,
    match_length: f64,
    bots: Vec<BotPersonality>,
    has_human: bool,
    skin_index: u8,
    start_time: i64,
    player_name: String,
    frames: Vec<(u32, u8)>,
}

fn wire_options() -> impl Options {
    bincode::DefaultOptions::new().with_limit(MAX_REPLAY_BYTES)
}

fn to_wire(replay: &ReplayData) -> Result<WireReplay, ReplayError> {
    let mut frames = Vec::with_capacity(replay.frames.len());
    let mut prev: Option<u32> = None;
    for (index, frame) in replay.frames.iter().enumerate() {
        let delta = match prev {
            None => frame.tick,
            Some(p) if frame.tick > p => frame.tick - p,
            Some(_) => return Err(ReplayError::NonMonotonicTicks { index }),
        };
        frames.push((delta, frame.inputs.to_bits()));
        prev = Some(frame.tick);
    }

    Ok(WireReplay {
        version: replay.version,
        seed: replay.seed,
        mode: replay.mode,
        match_length: replay.settings.match_length,
        bots: replay.settings.bots.clone(),
        has_human: replay.settings.has_human,
        skin_index: replay.settings.skin_index,
        start_time: replay.start_time,
        player_name: replay.player_name.clone(),
        frames,
    })
}

fn from_wire(wire: WireReplay) -> Result<ReplayData, ReplayError> {
    if wire.version != REPLAY_VERSION {
        return Err(ReplayError::UnsupportedVersion(wire.version));
    }

    let mut frames = Vec::with_capacity(wire.frames.len());
    let mut tick: u32 = 0;
    for (index, (delta, mask)) in wire.frames.into_iter().enumerate() {
        if index > 0 && delta == 0 {
            return Err(ReplayError::NonMonotonicTicks { index });
        }
        tick = tick
            .checked_add(delta)
            .ok_or(ReplayError::NonMonotonicTicks { index })?;
        let inputs = InputState::from_bits(mask).ok_or(ReplayError::InvalidMask { index, mask })?;
        frames.push(RecordedFrame::new(tick, inputs));
    }

    let replay = ReplayData {
        version: wire.version,
        seed: wire.seed,
        mode: wire.mode,
        settings: ReplaySettings {
            match_length: wire.match_length,
            bots: wire.bots,
            has_human: wire.has_human,
            skin_index: wire.skin_index,
        },
        frames,
        start_time: wire.start_time,
        player_name: wire.player_name,
    };
    replay.validate()?;
    Ok(replay)
}

// =============================================================================
// ENCODE / DECODE
// =============================================================================

/// Pack a replay into a URL-safe token.
///
/// Fails only if frame ticks do not strictly increase or the replay is
/// larger than `MAX_REPLAY_BYTES`.
pub fn encode(replay: &ReplayData) -> Result<String, ReplayError> {
    let wire = to_wire(replay)?;
    let bytes = wire_options().serialize(&wire)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Unpack a token, reporting what was wrong with it.
pub fn try_decode(token: &str) -> Result<ReplayData, ReplayError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ReplayError::Empty);
    }

    let bytes = URL_SAFE_NO_PAD.decode(token)?;
    let wire: WireReplay = wire_options().deserialize(&bytes)?;
    from_wire(wire)
}

/// Unpack a token. Anything malformed yields `None`, meaning "no replay".
pub fn decode(token: &str) -> Option<ReplayData> {
    match try_decode(token) {
        Ok(replay) => Some(replay),
        Err(e) => {
            tracing::warn!(error = %e, "rejected replay token");
            None
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(frame_count: u32) -> ReplayData {
        let frames = (1..=frame_count)
            .map(|tick| RecordedFrame::new(tick, InputState::from_bits((tick % 8) as u8).unwrap()))
            .collect();
        ReplayData {
            version: REPLAY_VERSION,
            seed: 0xDEAD_BEEF,
            mode: GameMode::Chaos,
            settings: ReplaySettings {
                match_length: 45.0,
                bots: vec![BotPersonality::Casual, BotPersonality::Speedster],
                has_human: true,
                skin_index: 3,
            },
            frames,
            start_time: 1_700_000_000_000,
            player_name: "Ada".to_string(),
        }
    }

    #[test]
    fn test_roundtrip_all_masks() {
        let replay = sample(64);
        let decoded = decode(&encode(&replay).unwrap()).unwrap();
        assert_eq!(decoded, replay);

        let masks: std::collections::BTreeSet<u8> = decoded.frames.iter().map(|f| f.inputs.to_bits()).collect();
        assert_eq!(masks.len(), 8);
    }

    #[test]
    fn test_full_race_is_compact() {
        let token = encode(&sample(2700)).unwrap();
        assert!(token.len() < 100_000, "token is {} chars", token.len());
        assert_eq!(decode(&token).unwrap().frames.len(), 2700);
    }

    #[test]
    fn test_sparse_and_large_ticks() {
        let mut replay = sample(0);
        replay.frames = vec![
            RecordedFrame::new(0, InputState::steer_left()),
            RecordedFrame::new(40_000, InputState::new(true, true, true)),
            RecordedFrame::new(u32::MAX, InputState::NEUTRAL),
        ];
        assert_eq!(decode(&encode(&replay).unwrap()).unwrap(), replay);
    }

    #[test]
    fn test_token_is_url_safe() {
        let token = encode(&sample(500)).unwrap();
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_malformed_tokens_decode_to_none() {
        assert!(decode("").is_none());
        assert!(decode("   ").is_none());
        assert!(decode("not-valid-base64!!!").is_none());
        assert!(decode("AAAA").is_none());

        let token = encode(&sample(100)).unwrap();
        assert!(decode(&token[..token.len() / 2]).is_none());
    }

    #[test]
    fn test_rejects_bad_version() {
        let mut replay = sample(3);
        replay.version = 99;
        let token = encode(&replay).unwrap();
        assert!(matches!(try_decode(&token), Err(ReplayError::UnsupportedVersion(99))));
    }

    #[test]
    fn test_rejects_bad_mask() {
        let mut wire = to_wire(&sample(3)).unwrap();
        wire.frames[1].1 = 0x08;
        let token = URL_SAFE_NO_PAD.encode(wire_options().serialize(&wire).unwrap());
        assert!(matches!(
            try_decode(&token),
            Err(ReplayError::InvalidMask { index: 1, mask: 0x08 })
        ));
    }

    #[test]
    fn test_rejects_repeated_ticks() {
        let mut replay = sample(3);
        replay.frames[2].tick = 2;
        assert!(matches!(encode(&replay), Err(ReplayError::NonMonotonicTicks { index: 2 })));

        let mut wire = to_wire(&sample(3)).unwrap();
        wire.frames[2].0 = 0;
        let token = URL_SAFE_NO_PAD.encode(wire_options().serialize(&wire).unwrap());
        assert!(matches!(try_decode(&token), Err(ReplayError::NonMonotonicTicks { index: 2 })));
    }

    #[test]
    fn test_rejects_unplayable_match_length() {
        for length in [f64::INFINITY, f64::NAN, 1e12, 0.0, -45.0] {
            let mut replay = sample(3);
            replay.mode = GameMode::Random;
            replay.settings.match_length = length;
            let token = encode(&replay).unwrap();
            assert!(
                matches!(try_decode(&token), Err(ReplayError::InvalidSettings(_))),
                "{length}"
            );
            assert!(decode(&token).is_none());
        }
    }

    #[test]
    fn test_rejects_oversized_roster() {
        let mut replay = sample(3);
        replay.settings.bots = vec![BotPersonality::Casual; 300];
        let token = encode(&replay).unwrap();
        assert!(matches!(try_decode(&token), Err(ReplayError::InvalidSettings(_))));

        replay.settings.bots.truncate(MAX_BOTS);
        assert_eq!(decode(&encode(&replay).unwrap()), Some(replay));
    }

    #[test]
    fn test_json_settings_default_missing_fields() {
        let settings: ReplaySettings = serde_json::from_str(r#"{"match_length": 30.0}"#).unwrap();
        assert_eq!(settings.match_length, 30.0);
        assert!(settings.has_human);
        assert!(settings.bots.is_empty());
    }
}
