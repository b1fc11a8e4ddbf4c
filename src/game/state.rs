//! Race State Definitions
//!
//! Player and race state for one simulation. The roster is a flat
//! ordered list addressed by stable id, never by position.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ai::profile::BotPersonality;
use crate::core::hash::{compute_state_hash, StateHash, StateHasher};
use crate::core::rng::SeededRng;
use crate::game::events::RaceEvent;
use crate::game::track::{GameMode, ObjectKey, Track, DEFAULT_LANES, LANE_WIDTH, TRACK_CENTER_X};

/// Distance between staggered starting rows.
pub const START_ROW_GAP: f64 = 40.0;

// =============================================================================
// PLAYER ID
// =============================================================================

/// Stable player identifier within one race.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

impl PlayerId {
    /// Create from a raw id.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P{}", self.0)
    }
}

// =============================================================================
// PLAYER STATE
// =============================================================================

/// State of a single racer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Stable id
    pub id: PlayerId,
    /// Display name
    pub name: String,
    /// Driven by a bot controller?
    pub is_bot: bool,
    /// Bot personality, if a bot
    pub bot_profile: Option<BotPersonality>,
    /// Cosmetic skin
    pub skin_index: u8,

    /// Lateral position
    pub x: f64,
    /// Lane index derived from `x`
    pub lane: usize,
    /// Forward speed (units/s)
    pub forward_speed: f64,
    /// Lateral speed (units/s)
    pub lateral_speed: f64,
    /// Distance from the start line
    pub distance_traveled: f64,

    /// Seconds of stun remaining
    pub stun_timer: f64,
    /// Seconds of shield remaining
    pub shield_timer: f64,
    /// Shield active
    pub has_shield: bool,
    /// Seconds of speed boost remaining
    pub speed_boost_timer: f64,
    /// Seconds of jump boost remaining
    pub jump_boost_timer: f64,
    /// Airborne
    pub is_jumping: bool,
    /// Seconds of airtime remaining
    pub jump_timer: f64,

    /// Crossed the line (or force-finished)
    pub finished: bool,
    /// Race time at finish, seconds
    pub finish_time: Option<f64>,
    /// 1-based finishing position
    pub finish_position: Option<u8>,
    /// Final score
    pub score: u32,
}

impl PlayerState {
    /// Create a racer at rest at the given spot.
    pub fn new(id: PlayerId, name: impl Into<String>, x: f64, distance: f64) -> Self {
        Self {
            id,
            name: name.into(),
            is_bot: false,
            bot_profile: None,
            skin_index: 0,
            x,
            lane: 0,
            forward_speed: 0.0,
            lateral_speed: 0.0,
            distance_traveled: distance,
            stun_timer: 0.0,
            shield_timer: 0.0,
            has_shield: false,
            speed_boost_timer: 0.0,
            jump_boost_timer: 0.0,
            is_jumping: false,
            jump_timer: 0.0,
            finished: false,
            finish_time: None,
            finish_position: None,
            score: 0,
        }
    }

    /// Mark as bot-driven with a personality.
    pub fn as_bot(mut self, personality: BotPersonality) -> Self {
        self.is_bot = true;
        self.bot_profile = Some(personality);
        self
    }

    /// Set the cosmetic skin.
    pub fn with_skin(mut self, skin_index: u8) -> Self {
        self.skin_index = skin_index;
        self
    }

    /// Stunned this tick?
    #[inline]
    pub fn is_stunned(&self) -> bool {
        self.stun_timer > 0.0
    }

    /// Speed boost active?
    #[inline]
    pub fn is_speed_boosted(&self) -> bool {
        self.speed_boost_timer > 0.0
    }

    /// Jump boost active?
    #[inline]
    pub fn is_jump_boosted(&self) -> bool {
        self.jump_boost_timer > 0.0
    }

    /// Any powerup effect running?
    #[inline]
    pub fn has_powerup_effect(&self) -> bool {
        self.has_shield || self.is_speed_boosted() || self.is_jump_boosted()
    }

    /// Can collide or hit track objects?
    #[inline]
    pub fn is_grounded_racer(&self) -> bool {
        !self.finished && !self.is_jumping
    }

    /// Hash this player's state for verification.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.write_u32(self.id.0);
        hasher.write_f64(self.x);
        hasher.write_u32(self.lane as u32);
        hasher.write_f64(self.forward_speed);
        hasher.write_f64(self.lateral_speed);
        hasher.write_f64(self.distance_traveled);
        hasher.write_f64(self.stun_timer);
        hasher.write_f64(self.shield_timer);
        hasher.write_bool(self.has_shield);
        hasher.write_f64(self.speed_boost_timer);
        hasher.write_f64(self.jump_boost_timer);
        hasher.write_bool(self.is_jumping);
        hasher.write_f64(self.jump_timer);
        hasher.write_bool(self.finished);
        hasher.write_opt_f64(self.finish_time);
        hasher.write_u8(self.finish_position.unwrap_or(0));
        hasher.write_u32(self.score);
    }
}

/// Starting spot for roster slot `index`: lane `index % 5`, rows of five
/// staggered back from the line.
pub fn grid_position(index: usize) -> (f64, f64) {
    let lane = index % DEFAULT_LANES;
    let row = index / DEFAULT_LANES;
    let left_rail = TRACK_CENTER_X - DEFAULT_LANES as f64 * LANE_WIDTH / 2.0;
    let x = left_rail + LANE_WIDTH * (lane as f64 + 0.5);
    (x, -(row as f64) * START_ROW_GAP)
}

// =============================================================================
// RACE PHASE
// =============================================================================

/// Current phase of the race.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RacePhase {
    /// Ticking
    #[default]
    Racing,
    /// Everyone finished or time ran out
    Finished,
}

// =============================================================================
// RACE STATE
// =============================================================================

/// Complete state of one race. One instance per race; nothing global.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RaceState {
    /// Ticks simulated so far
    pub tick: u32,
    /// Current phase
    pub phase: RacePhase,
    /// Seed the race was built from
    pub seed: u32,
    /// Game mode
    pub mode: GameMode,
    /// Match length in seconds
    pub match_length: f64,
    /// Shared RNG (track generation, then every bot)
    pub rng: SeededRng,
    /// The track
    pub track: Track,
    /// Flat roster, in join order
    pub players: Vec<PlayerState>,
    /// Id of the human racer, if any
    pub human_id: Option<PlayerId>,
    /// Next finishing position to hand out
    pub next_finish_position: u8,
    /// Powerups already picked up (by anyone)
    pub consumed_powerups: BTreeSet<ObjectKey>,
    /// Obstacles that already hit a given player
    pub obstacle_hits: BTreeSet<(PlayerId, ObjectKey)>,
    /// Events generated this tick
    #[serde(skip)]
    pub pending_events: Vec<RaceEvent>,
}

impl RaceState {
    /// Create a race with an empty roster.
    ///
    /// For procedural modes the track consumes the head of the RNG stream.
    pub fn new(seed: u32, mode: GameMode, match_length: f64) -> Self {
        let mut rng = SeededRng::new(seed);
        let settings = crate::game::track::TrackSettings { match_length };
        let track = Track::for_mode(mode, &mut rng, &settings);
        Self::with_track(seed, mode, match_length, track, rng)
    }

    /// Create a race on an explicit track.
    pub fn with_track(seed: u32, mode: GameMode, match_length: f64, track: Track, rng: SeededRng) -> Self {
        Self {
            tick: 0,
            phase: RacePhase::Racing,
            seed,
            mode,
            match_length,
            rng,
            track,
            players: Vec::new(),
            human_id: None,
            next_finish_position: 1,
            consumed_powerups: BTreeSet::new(),
            obstacle_hits: BTreeSet::new(),
            pending_events: Vec::new(),
        }
    }

    /// Add a racer at the next grid slot and return its id.
    pub fn add_player(&mut self, mut player: PlayerState) -> PlayerId {
        let id = PlayerId::new(self.players.len() as u32);
        let (x, distance) = grid_position(self.players.len());
        let segment = self.track.segment_at(distance);
        let (min_x, max_x) = segment.lane_bounds();
        player.id = id;
        player.x = x.clamp(min_x, max_x);
        player.distance_traveled = distance;
        player.lane = segment.lane_at(player.x);
        self.players.push(player);
        id
    }

    /// Add the human racer.
    pub fn add_human(&mut self, name: impl Into<String>, skin_index: u8) -> PlayerId {
        let player = PlayerState::new(PlayerId::default(), name, 0.0, 0.0).with_skin(skin_index);
        let id = self.add_player(player);
        self.human_id = Some(id);
        id
    }

    /// Add a bot racer.
    pub fn add_bot(&mut self, personality: BotPersonality) -> PlayerId {
        let name = format!("{} Bot", personality.display_name());
        let skin = (self.players.len() % 8) as u8;
        let player = PlayerState::new(PlayerId::default(), name, 0.0, 0.0)
            .as_bot(personality)
            .with_skin(skin);
        self.add_player(player)
    }

    /// Get a player by id.
    pub fn player(&self, id: PlayerId) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Get a player mutably by id.
    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut PlayerState> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Seconds of race time elapsed.
    pub fn elapsed(&self) -> f64 {
        self.tick as f64 * crate::DT
    }

    /// Number of racers still going.
    pub fn active_count(&self) -> usize {
        self.players.iter().filter(|p| !p.finished).count()
    }

    /// Has the race ended?
    pub fn is_finished(&self) -> bool {
        self.phase == RacePhase::Finished
    }

    /// Roster sorted by finishing position (unplaced last, then by id).
    pub fn standings(&self) -> Vec<&PlayerState> {
        let mut sorted: Vec<&PlayerState> = self.players.iter().collect();
        sorted.sort_by_key(|p| (p.finish_position.unwrap_or(u8::MAX), p.id));
        sorted
    }

    /// Compute hash of current state for verification.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.tick, self.seed, |hasher| {
            hasher.write_bytes(self.mode.as_str().as_bytes());
            for player in &self.players {
                player.hash_into(hasher);
            }
            hasher.write_u32(self.rng.state());
            hasher.write_u32(self.consumed_powerups.len() as u32);
            hasher.write_u32(self.obstacle_hits.len() as u32);
            hasher.write_bool(self.is_finished());
        })
    }

    /// Take pending events (consumes them).
    pub fn take_events(&mut self) -> Vec<RaceEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Push a race event.
    pub fn push_event(&mut self, event: RaceEvent) {
        self.pending_events.push(event);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_positions_do_not_overlap() {
        let spots: Vec<(f64, f64)> = (0..16).map(grid_position).collect();
        for i in 0..spots.len() {
            for j in (i + 1)..spots.len() {
                let dx = spots[i].0 - spots[j].0;
                let dd = spots[i].1 - spots[j].1;
                assert!((dx * dx + dd * dd).sqrt() >= START_ROW_GAP);
            }
        }
        assert_eq!(grid_position(0), (240.0, 0.0));
        assert_eq!(grid_position(2), (400.0, 0.0));
        assert_eq!(grid_position(5), (240.0, -START_ROW_GAP));
    }

    #[test]
    fn test_grid_clamped_to_narrow_first_segment() {
        use crate::game::track::{SegmentKind, TrackSegment};

        let track = Track::from_segments(vec![
            TrackSegment::new(SegmentKind::Narrow, 300.0, 3, 0.984, 0.0),
            TrackSegment::new(SegmentKind::Straight, 300.0, 5, 0.985, 0.0),
        ]);
        let mut state = RaceState::with_track(3, GameMode::Random, 45.0, track, SeededRng::new(3));
        state.add_human("Ada", 0);
        for p in BotPersonality::ALL.iter().cycle().take(15) {
            state.add_bot(*p);
        }

        let first = &state.track.segments()[0];
        let (min_x, max_x) = first.lane_bounds();
        assert_eq!((min_x, max_x), (290.0, 510.0));
        for player in &state.players {
            assert!(player.x >= min_x && player.x <= max_x, "{} at {}", player.id, player.x);
            assert!(player.lane < first.lanes);
            assert_eq!(player.lane, first.lane_at(player.x));
        }
    }

    #[test]
    fn test_random_tracks_start_everyone_in_bounds() {
        for seed in [3_964_193_037u32, 1, 2, 3, 42, 1234] {
            let mut state = RaceState::new(seed, GameMode::Random, 45.0);
            for p in BotPersonality::ALL {
                state.add_bot(p);
            }
            for player in &state.players {
                let (min_x, max_x) = state.track.segment_at(player.distance_traveled).lane_bounds();
                assert!(player.x >= min_x && player.x <= max_x, "seed {seed}: {} at {}", player.id, player.x);
            }
        }
    }

    #[test]
    fn test_roster_addressed_by_id() {
        let mut state = RaceState::new(42, GameMode::Classic, 45.0);
        let human = state.add_human("Ada", 3);
        let bot = state.add_bot(BotPersonality::Speedster);

        assert_eq!(state.human_id, Some(human));
        assert_eq!(state.player(human).unwrap().skin_index, 3);
        assert!(!state.player(human).unwrap().is_bot);

        let b = state.player(bot).unwrap();
        assert!(b.is_bot);
        assert_eq!(b.bot_profile, Some(BotPersonality::Speedster));
        assert_eq!(b.lane, 1);
        assert!(state.player(PlayerId::new(99)).is_none());
    }

    #[test]
    fn test_state_hash_determinism() {
        let build = || {
            let mut state = RaceState::new(7, GameMode::Random, 30.0);
            state.add_human("A", 0);
            state.add_bot(BotPersonality::Casual);
            state
        };
        assert_eq!(build().compute_hash(), build().compute_hash());

        let mut moved = build();
        moved.players[0].x += 1.0;
        assert_ne!(build().compute_hash(), moved.compute_hash());
    }

    #[test]
    fn test_standings_order() {
        let mut state = RaceState::new(1, GameMode::Classic, 45.0);
        let a = state.add_human("A", 0);
        let b = state.add_bot(BotPersonality::Casual);
        let c = state.add_bot(BotPersonality::Aggressive);
        state.player_mut(c).unwrap().finish_position = Some(1);
        state.player_mut(a).unwrap().finish_position = Some(2);

        let order: Vec<PlayerId> = state.standings().iter().map(|p| p.id).collect();
        assert_eq!(order, vec![c, a, b]);
    }

    #[test]
    fn test_powerup_effect_flags() {
        let mut p = PlayerState::new(PlayerId::new(0), "x", 400.0, 0.0);
        assert!(!p.has_powerup_effect());
        p.jump_boost_timer = 1.0;
        assert!(p.has_powerup_effect());
        assert!(p.is_grounded_racer());
        p.is_jumping = true;
        assert!(!p.is_grounded_racer());
    }
}
