//! Bot personality presets
//!
//! Each personality names an immutable tuning template. Controllers take
//! a private copy at construction; adaptive tuning only ever touches
//! that copy.

use serde::{Deserialize, Serialize};

/// Named bot personality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotPersonality {
    /// Relaxed, slow to react, makes mistakes
    Casual,
    /// Seeks contact with other racers
    Aggressive,
    /// Holds the racing line, hunts boosts
    Speedster,
    /// Jumps at everything
    Trickster,
    /// Adapts to keep up with the human
    Rival,
}

impl BotPersonality {
    /// Every personality, in declaration order.
    pub const ALL: [BotPersonality; 5] = [
        BotPersonality::Casual,
        BotPersonality::Aggressive,
        BotPersonality::Speedster,
        BotPersonality::Trickster,
        BotPersonality::Rival,
    ];

    /// Lowercase tag used in config and replays.
    pub fn as_str(&self) -> &'static str {
        match self {
            BotPersonality::Casual => "casual",
            BotPersonality::Aggressive => "aggressive",
            BotPersonality::Speedster => "speedster",
            BotPersonality::Trickster => "trickster",
            BotPersonality::Rival => "rival",
        }
    }

    /// Name shown in the HUD.
    pub fn display_name(&self) -> &'static str {
        match self {
            BotPersonality::Casual => "Casual",
            BotPersonality::Aggressive => "Aggressive",
            BotPersonality::Speedster => "Speedster",
            BotPersonality::Trickster => "Trickster",
            BotPersonality::Rival => "Rival",
        }
    }

    /// Parse a tag (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
    }

    /// A fresh copy of this personality's template.
    pub fn profile(&self) -> BotProfile {
        match self {
            BotPersonality::Casual => CASUAL,
            BotPersonality::Aggressive => AGGRESSIVE,
            BotPersonality::Speedster => SPEEDSTER,
            BotPersonality::Trickster => TRICKSTER,
            BotPersonality::Rival => RIVAL,
        }
    }
}

impl std::fmt::Display for BotPersonality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tuning parameters for one bot.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BotProfile {
    /// How hard the bot chases speed (0-1)
    pub target_speed_factor: f64,
    /// Chance to chase nearby racers; above 0.5 steers into them
    pub collision_aggression: f64,
    /// Weight of obstacle danger in lane choice
    pub collision_avoidance: f64,
    /// Steady-state jump tendency
    pub jump_frequency: f64,
    /// Jump tendency on ramps
    pub jump_timing_precision: f64,
    /// Willingness to jump over trouble instead of steering round it
    pub risk_tolerance: f64,
    /// Per-tick chance to flip a steering bit
    pub steering_jitter: f64,
    /// Input delay in ticks
    pub reaction_delay: usize,
    /// Mistakes per second
    pub mistake_chance: f64,
    /// Above 0.5 the bot tunes itself up while the human leads
    pub adaptiveness: f64,
    /// Weight of the center line in lane choice
    pub optimal_line_weight: f64,
    /// Weight of reachable powerups in lane choice
    pub boost_seek_range: f64,
    /// How far ahead the bot looks for track objects
    pub lookahead: f64,
}

impl BotProfile {
    /// Does this profile self-tune during a race?
    pub fn is_adaptive(&self) -> bool {
        self.adaptiveness > 0.5
    }
}

impl Default for BotProfile {
    fn default() -> Self {
        CASUAL
    }
}

// =============================================================================
// PRESETS
// =============================================================================

const CASUAL: BotProfile = BotProfile {
    target_speed_factor: 0.8,
    collision_aggression: 0.1,
    collision_avoidance: 0.6,
    jump_frequency: 0.3,
    jump_timing_precision: 0.5,
    risk_tolerance: 0.3,
    steering_jitter: 0.08,
    reaction_delay: 12,
    mistake_chance: 0.5,
    adaptiveness: 0.0,
    optimal_line_weight: 0.4,
    boost_seek_range: 0.3,
    lookahead: 120.0,
};

const AGGRESSIVE: BotProfile = BotProfile {
    target_speed_factor: 0.9,
    collision_aggression: 0.8,
    collision_avoidance: 0.3,
    jump_frequency: 0.4,
    jump_timing_precision: 0.6,
    risk_tolerance: 0.7,
    steering_jitter: 0.04,
    reaction_delay: 6,
    mistake_chance: 0.3,
    adaptiveness: 0.2,
    optimal_line_weight: 0.3,
    boost_seek_range: 0.5,
    lookahead: 100.0,
};

const SPEEDSTER: BotProfile = BotProfile {
    target_speed_factor: 1.0,
    collision_aggression: 0.2,
    collision_avoidance: 0.8,
    jump_frequency: 0.2,
    jump_timing_precision: 0.8,
    risk_tolerance: 0.5,
    steering_jitter: 0.02,
    reaction_delay: 4,
    mistake_chance: 0.15,
    adaptiveness: 0.3,
    optimal_line_weight: 0.8,
    boost_seek_range: 0.8,
    lookahead: 180.0,
};

const TRICKSTER: BotProfile = BotProfile {
    target_speed_factor: 0.85,
    collision_aggression: 0.4,
    collision_avoidance: 0.5,
    jump_frequency: 0.9,
    jump_timing_precision: 0.9,
    risk_tolerance: 0.8,
    steering_jitter: 0.1,
    reaction_delay: 8,
    mistake_chance: 0.4,
    adaptiveness: 0.1,
    optimal_line_weight: 0.2,
    boost_seek_range: 0.6,
    lookahead: 140.0,
};

const RIVAL: BotProfile = BotProfile {
    target_speed_factor: 0.9,
    collision_aggression: 0.5,
    collision_avoidance: 0.7,
    jump_frequency: 0.4,
    jump_timing_precision: 0.7,
    risk_tolerance: 0.5,
    steering_jitter: 0.03,
    reaction_delay: 5,
    mistake_chance: 0.2,
    adaptiveness: 0.8,
    optimal_line_weight: 0.6,
    boost_seek_range: 0.6,
    lookahead: 160.0,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        for p in BotPersonality::ALL {
            assert_eq!(BotPersonality::parse(p.as_str()), Some(p));
        }
        assert_eq!(BotPersonality::parse(" Speedster "), Some(BotPersonality::Speedster));
        assert_eq!(BotPersonality::parse("pro"), None);
    }

    #[test]
    fn test_only_rival_adapts() {
        let adaptive: Vec<_> = BotPersonality::ALL
            .into_iter()
            .filter(|p| p.profile().is_adaptive())
            .collect();
        assert_eq!(adaptive, vec![BotPersonality::Rival]);
    }

    #[test]
    fn test_presets_in_range() {
        for p in BotPersonality::ALL {
            let prof = p.profile();
            for v in [
                prof.target_speed_factor,
                prof.collision_aggression,
                prof.collision_avoidance,
                prof.jump_frequency,
                prof.jump_timing_precision,
                prof.risk_tolerance,
                prof.steering_jitter,
                prof.adaptiveness,
                prof.optimal_line_weight,
                prof.boost_seek_range,
            ] {
                assert!((0.0..=1.0).contains(&v), "{p}: {v}");
            }
            assert!(prof.lookahead > 0.0);
        }
    }

    #[test]
    fn test_serde_tag() {
        let json = serde_json::to_string(&BotPersonality::Trickster).unwrap();
        assert_eq!(json, "\"trickster\"");
    }
}
