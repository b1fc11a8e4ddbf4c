//! Persisted player settings and career stats.
//!
//! Both load with `#[serde(default)]`, so documents written by older
//! versions (or partially corrupted ones) still come back usable.

use serde::{Deserialize, Serialize};

use crate::ai::profile::BotPersonality;
use crate::game::tick::{Standing, DEFAULT_MATCH_LENGTH};
use crate::game::track::GameMode;

/// Shortest allowed match (seconds)
pub const MIN_MATCH_LENGTH: f64 = 10.0;

/// Longest allowed match (seconds)
pub const MAX_MATCH_LENGTH: f64 = 300.0;

/// Most bots a race can hold alongside the human
pub const MAX_BOTS: usize = 15;

/// Player-facing settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Match length in seconds
    pub match_length: f64,
    /// Game mode
    pub mode: GameMode,
    /// Bot roster
    pub bots: Vec<BotPersonality>,
    /// Display name
    pub player_name: String,
    /// Cosmetic skin
    pub skin_index: u8,
    /// Music volume (0-1)
    pub music_volume: f32,
    /// Effects volume (0-1)
    pub sfx_volume: f32,
    /// Master sound toggle
    pub sound_enabled: bool,
    /// Show the best-run ghost
    pub show_ghost: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            match_length: DEFAULT_MATCH_LENGTH,
            mode: GameMode::Classic,
            bots: vec![BotPersonality::Casual, BotPersonality::Speedster],
            player_name: "Player".to_string(),
            skin_index: 0,
            music_volume: 0.6,
            sfx_volume: 0.8,
            sound_enabled: true,
            show_ghost: true,
        }
    }
}

impl Settings {
    /// Clamp out-of-range values back into range.
    pub fn sanitized(mut self) -> Self {
        self.match_length = if self.match_length.is_finite() {
            self.match_length.clamp(MIN_MATCH_LENGTH, MAX_MATCH_LENGTH)
        } else {
            DEFAULT_MATCH_LENGTH
        };
        self.music_volume = clamp_volume(self.music_volume);
        self.sfx_volume = clamp_volume(self.sfx_volume);
        self.bots.truncate(MAX_BOTS);
        if self.player_name.trim().is_empty() {
            self.player_name = Settings::default().player_name;
        }
        self
    }
}

fn clamp_volume(v: f32) -> f32 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Career statistics.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    /// Races completed
    pub races: u32,
    /// First places
    pub wins: u32,
    /// Top-three finishes
    pub podiums: u32,
    /// Fastest finish (seconds)
    pub best_time: Option<f64>,
    /// Highest single-race score
    pub best_score: u32,
    /// Sum of all race scores
    pub total_score: u64,
}

impl Stats {
    /// Fold one race result into the totals.
    pub fn record_race(&mut self, result: &Standing) {
        self.races += 1;
        if result.position == 1 {
            self.wins += 1;
        }
        if result.position <= 3 {
            self.podiums += 1;
        }
        self.best_time = Some(match self.best_time {
            Some(best) => best.min(result.finish_time),
            None => result.finish_time,
        });
        self.best_score = self.best_score.max(result.score);
        self.total_score += u64::from(result.score);
    }

    /// Mean score per race.
    pub fn average_score(&self) -> f64 {
        if self.races == 0 {
            0.0
        } else {
            self.total_score as f64 / self.races as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::PlayerId;

    fn standing(position: u8, finish_time: f64, score: u32) -> Standing {
        Standing {
            id: PlayerId::new(0),
            name: "Ada".to_string(),
            is_bot: false,
            position,
            finish_time,
            score,
        }
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"player_name": "Ada", "mode": "chaos"}"#).unwrap();
        assert_eq!(settings.player_name, "Ada");
        assert_eq!(settings.mode, GameMode::Chaos);
        assert_eq!(settings.match_length, DEFAULT_MATCH_LENGTH);
        assert_eq!(settings.bots, Settings::default().bots);
    }

    #[test]
    fn test_sanitized_clamps() {
        let settings = Settings {
            match_length: 5000.0,
            music_volume: 3.0,
            sfx_volume: f32::NAN,
            player_name: "  ".to_string(),
            bots: vec![BotPersonality::Casual; 40],
            ..Settings::default()
        }
        .sanitized();

        assert_eq!(settings.match_length, MAX_MATCH_LENGTH);
        assert_eq!(settings.music_volume, 1.0);
        assert_eq!(settings.sfx_volume, 0.0);
        assert_eq!(settings.player_name, "Player");
        assert_eq!(settings.bots.len(), MAX_BOTS);
    }

    #[test]
    fn test_record_race() {
        let mut stats = Stats::default();
        stats.record_race(&standing(2, 30.0, 350));
        stats.record_race(&standing(1, 25.0, 500));
        stats.record_race(&standing(4, 45.0, 100));

        assert_eq!(stats.races, 3);
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.podiums, 2);
        assert_eq!(stats.best_time, Some(25.0));
        assert_eq!(stats.best_score, 500);
        assert_eq!(stats.total_score, 950);
        assert!((stats.average_score() - 950.0 / 3.0).abs() < 1e-9);
    }
}
