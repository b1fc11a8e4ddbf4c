//! Bot Controller
//!
//! Finite-state machine that turns a read-only view of the race into the
//! same `InputState` a human produces. One controller per bot; all
//! randomness comes from the race's shared RNG.
//!
//! Per tick:
//! 1. `transition` picks the next state (stun and recovery first, then the
//!    adaptive ratchet, then state-specific rules, then the ceiling)
//! 2. the state's synthesis function builds a raw input
//! 3. the human-likeness layer adds jitter and mistakes, then delays the
//!    result through the reaction buffer

use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::ai::profile::{BotPersonality, BotProfile};
use crate::core::rng::SeededRng;
use crate::game::input::InputState;
use crate::game::state::{PlayerId, PlayerState};
use crate::game::track::{ObjectKey, SegmentKind, Track, TrackSegment, LANE_WIDTH, TRACK_CENTER_X};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Longitudinal reach of the "nearby racer" window
pub const PROXIMITY_LONGITUDINAL: f64 = 60.0;

/// Lateral reach of the "nearby racer" window
pub const PROXIMITY_LATERAL: f64 = 100.0;

/// Longest a chase lasts (ticks)
pub const CHASE_MAX_TICKS: u32 = 90;

/// Any state held this long reverts to racing (ticks)
pub const STATE_CEILING_TICKS: u32 = 300;

/// Human lead that triggers adaptive tuning
pub const ADAPTIVE_LEAD: f64 = 150.0;

/// Adaptive tuning step per tick
pub const ADAPTIVE_STEP: f64 = 0.001;

/// Per-tick chance to switch to powerup use while an effect runs
pub const POWERUP_USE_CHANCE: f64 = 0.02;

/// Steering dead zone around the target x
pub const STEER_DEAD_ZONE: f64 = 8.0;

/// Amplitude of random lane-score jitter
pub const LANE_JITTER: f64 = 0.2;

/// Ramp jump chance at full precision
pub const RAMP_JUMP_CHANCE: f64 = 0.25;

/// Flat-track jump chance at full frequency
pub const BASE_JUMP_CHANCE: f64 = 0.01;

/// Jump chance while dodging, at full risk tolerance
pub const AVOID_JUMP_CHANCE: f64 = 0.15;

/// Jump chance while chasing
pub const CHASE_JUMP_CHANCE: f64 = 0.02;

/// Jump chance while spending a jump boost
pub const BOOST_JUMP_CHANCE: f64 = 0.1;

// =============================================================================
// WORLD VIEW
// =============================================================================

/// Read-only view of the race handed to a controller for one call.
#[derive(Clone, Copy, Debug)]
pub struct WorldView<'a> {
    /// The track
    pub track: &'a Track,
    /// Every racer
    pub players: &'a [PlayerState],
    /// The human racer, if any
    pub human_id: Option<PlayerId>,
    /// Powerups already taken
    pub consumed_powerups: &'a BTreeSet<ObjectKey>,
}

impl<'a> WorldView<'a> {
    /// Look up a racer by id.
    pub fn player(&self, id: PlayerId) -> Option<&'a PlayerState> {
        let players: &'a [PlayerState] = self.players;
        players.iter().find(|p| p.id == id)
    }

    /// The human racer, if present.
    pub fn human(&self) -> Option<&'a PlayerState> {
        self.human_id.and_then(|id| self.player(id))
    }

    /// Other unfinished racers inside the proximity window around `me`.
    pub fn nearby(&self, me: &PlayerState) -> impl Iterator<Item = &'a PlayerState> + 'a {
        let players: &'a [PlayerState] = self.players;
        let (id, x, d) = (me.id, me.x, me.distance_traveled);
        players.iter().filter(move |p| {
            p.id != id
                && !p.finished
                && (p.distance_traveled - d).abs() < PROXIMITY_LONGITUDINAL
                && (p.x - x).abs() < PROXIMITY_LATERAL
        })
    }

    /// Nearest other unfinished racer by |dx| + |dd|. Ties go to the lower id.
    pub fn nearest_rival(&self, me: &PlayerState) -> Option<&'a PlayerState> {
        let players: &'a [PlayerState] = self.players;
        let mut best: Option<(&'a PlayerState, f64)> = None;
        for p in players.iter().filter(|p| p.id != me.id && !p.finished) {
            let d = (p.x - me.x).abs() + (p.distance_traveled - me.distance_traveled).abs();
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((p, d));
            }
        }
        best.map(|(p, _)| p)
    }

    /// Danger of `lane` over the next `lookahead` units: each obstacle
    /// counts more the closer it is.
    pub fn lane_danger(&self, me: &PlayerState, lane: usize, lookahead: f64) -> f64 {
        let d = me.distance_traveled;
        self.track
            .obstacles_between(d, d + lookahead)
            .iter()
            .filter(|o| o.lane == lane)
            .map(|o| 1.0 - (o.distance - d) / lookahead)
            .sum()
    }

    /// Attraction of `lane` from untaken powerups within `lookahead`.
    pub fn lane_bonus(&self, me: &PlayerState, lane: usize, lookahead: f64) -> f64 {
        let d = me.distance_traveled;
        self.track
            .powerups_between(d, d + lookahead)
            .iter()
            .filter(|p| p.lane == lane && !self.consumed_powerups.contains(&p.key))
            .map(|p| 1.0 - (p.distance - d) / lookahead)
            .sum()
    }
}

// =============================================================================
// STATE MACHINE
// =============================================================================

/// Controller state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BotState {
    /// Pick the best lane and drive
    #[default]
    Race,
    /// Dodge an obstacle in our lane
    AvoidObstacle,
    /// Go after (or away from) a nearby racer
    Chase,
    /// Spend an active powerup
    UsePowerup,
    /// Sit out a stun
    Recover,
}

/// One bot's decision layer.
#[derive(Clone, Debug)]
pub struct BotController {
    player_id: PlayerId,
    personality: BotPersonality,
    profile: BotProfile,
    state: BotState,
    state_ticks: u32,
    ticks: u64,
    reaction_buffer: VecDeque<InputState>,
}

impl BotController {
    /// Create a controller driving `player_id` with its own copy of the
    /// personality's profile.
    pub fn new(player_id: PlayerId, personality: BotPersonality) -> Self {
        Self::with_profile(player_id, personality, personality.profile())
    }

    /// Create a controller with an explicit profile.
    pub fn with_profile(player_id: PlayerId, personality: BotPersonality, profile: BotProfile) -> Self {
        let reaction_buffer = std::iter::repeat(InputState::NEUTRAL)
            .take(profile.reaction_delay)
            .collect();

        Self {
            player_id,
            personality,
            profile,
            state: BotState::Race,
            state_ticks: 0,
            ticks: 0,
            reaction_buffer,
        }
    }

    /// Player this controller drives.
    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    /// Personality tag.
    pub fn personality(&self) -> BotPersonality {
        self.personality
    }

    /// This controller's working profile.
    pub fn profile(&self) -> &BotProfile {
        &self.profile
    }

    /// Current state.
    pub fn state(&self) -> BotState {
        self.state
    }

    /// Ticks this controller has run.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Ticks spent in the current state.
    pub fn state_ticks(&self) -> u32 {
        self.state_ticks
    }

    /// Decide this tick's input.
    pub fn update(&mut self, world: &WorldView<'_>, rng: &mut SeededRng) -> InputState {
        self.ticks += 1;

        let Some(me) = world.player(self.player_id) else {
            return InputState::NEUTRAL;
        };

        let next = self.transition(me, world, rng);
        if next != self.state || (next == BotState::Recover && me.is_stunned()) {
            #[cfg(feature = "debug-tracing")]
            tracing::debug!(bot = %self.player_id, from = ?self.state, to = ?next, "bot state change");
            self.state = next;
            self.state_ticks = 0;
        } else {
            self.state_ticks += 1;
        }

        let raw = self.generate_input(me, world, rng);
        self.humanize(raw, rng)
    }

    /// Pick the next state. Rules in precedence order; the first that
    /// fires wins.
    fn transition(&mut self, me: &PlayerState, world: &WorldView<'_>, rng: &mut SeededRng) -> BotState {
        if me.is_stunned() {
            return BotState::Recover;
        }
        if self.state == BotState::Recover {
            return BotState::Race;
        }

        self.adapt(me, world);

        let next = match self.state {
            BotState::Race => {
                if self.obstacle_ahead(me, world) {
                    BotState::AvoidObstacle
                } else if world.nearby(me).next().is_some() && rng.next() < self.profile.collision_aggression {
                    BotState::Chase
                } else if me.has_powerup_effect() && rng.next() < POWERUP_USE_CHANCE {
                    BotState::UsePowerup
                } else {
                    BotState::Race
                }
            }
            BotState::AvoidObstacle if !self.obstacle_ahead(me, world) => BotState::Race,
            BotState::Chase if world.nearby(me).next().is_none() || self.state_ticks >= CHASE_MAX_TICKS => {
                BotState::Race
            }
            BotState::UsePowerup if !me.has_powerup_effect() => BotState::Race,
            held => held,
        };

        if next == self.state && self.state_ticks >= STATE_CEILING_TICKS {
            return BotState::Race;
        }
        next
    }

    /// One-way ratchet for adaptive profiles while the human leads.
    fn adapt(&mut self, me: &PlayerState, world: &WorldView<'_>) {
        if !self.profile.is_adaptive() {
            return;
        }
        let Some(human) = world.human() else {
            return;
        };
        if human.distance_traveled - me.distance_traveled > ADAPTIVE_LEAD {
            self.profile.target_speed_factor = (self.profile.target_speed_factor + ADAPTIVE_STEP).min(1.0);
            self.profile.risk_tolerance = (self.profile.risk_tolerance + ADAPTIVE_STEP).min(1.0);
        }
    }

    fn obstacle_ahead(&self, me: &PlayerState, world: &WorldView<'_>) -> bool {
        world.lane_danger(me, me.lane, self.profile.lookahead) > 0.0
    }

    // =========================================================================
    // INPUT SYNTHESIS
    // =========================================================================

    /// Raw input for the current state, before the human-likeness layer.
    fn generate_input(&self, me: &PlayerState, world: &WorldView<'_>, rng: &mut SeededRng) -> InputState {
        let segment = world.track.segment_at(me.distance_traveled);
        match self.state {
            BotState::Race => self.race_input(me, segment, world, rng),
            BotState::AvoidObstacle => self.avoid_input(me, segment, world, rng),
            BotState::Chase => self.chase_input(me, world, rng),
            BotState::UsePowerup => self.powerup_input(me, rng),
            BotState::Recover => InputState::NEUTRAL,
        }
    }

    fn race_input(
        &self,
        me: &PlayerState,
        segment: &TrackSegment,
        world: &WorldView<'_>,
        rng: &mut SeededRng,
    ) -> InputState {
        let p = &self.profile;
        let center = segment.center_lane() as f64;

        let mut best_lane = me.lane.min(segment.lanes - 1);
        let mut best_score = f64::NEG_INFINITY;
        for lane in 0..segment.lanes {
            let line = -p.optimal_line_weight * (lane as f64 - center).abs();
            let danger = -p.collision_avoidance * world.lane_danger(me, lane, p.lookahead);
            let bonus = p.boost_seek_range * world.lane_bonus(me, lane, p.lookahead);
            let jitter = rng.next_float(-LANE_JITTER, LANE_JITTER);
            let score = line + danger + bonus + jitter;
            if score > best_score {
                best_score = score;
                best_lane = lane;
            }
        }

        let jump = if segment.kind == SegmentKind::Ramp {
            rng.chance(RAMP_JUMP_CHANCE * p.jump_timing_precision)
        } else {
            rng.chance(BASE_JUMP_CHANCE * p.jump_frequency * p.target_speed_factor)
        };

        steer_toward(me.x, segment.lane_center(best_lane), jump)
    }

    fn avoid_input(
        &self,
        me: &PlayerState,
        segment: &TrackSegment,
        world: &WorldView<'_>,
        rng: &mut SeededRng,
    ) -> InputState {
        let lookahead = self.profile.lookahead;
        let here = me.lane.min(segment.lanes - 1);

        // Least danger, then closest to our lane, then lowest index
        let safest = (0..segment.lanes)
            .map(|lane| (lane, world.lane_danger(me, lane, lookahead)))
            .fold((here, f64::INFINITY), |best, (lane, danger)| {
                let closer = lane.abs_diff(here) < best.0.abs_diff(here);
                if danger < best.1 || (danger == best.1 && closer) {
                    (lane, danger)
                } else {
                    best
                }
            })
            .0;

        let jump = rng.chance(AVOID_JUMP_CHANCE * self.profile.risk_tolerance);
        steer_toward(me.x, segment.lane_center(safest), jump)
    }

    fn chase_input(&self, me: &PlayerState, world: &WorldView<'_>, rng: &mut SeededRng) -> InputState {
        let Some(target) = world.nearest_rival(me) else {
            return InputState::NEUTRAL;
        };

        let jump = rng.chance(CHASE_JUMP_CHANCE);
        if self.profile.collision_aggression > 0.5 {
            steer_toward(me.x, target.x, jump)
        } else {
            let away = if target.x > me.x { me.x - LANE_WIDTH } else { me.x + LANE_WIDTH };
            steer_toward(me.x, away, jump)
        }
    }

    fn powerup_input(&self, me: &PlayerState, rng: &mut SeededRng) -> InputState {
        let mut input = InputState::NEUTRAL;
        if me.is_jump_boosted() {
            input.jump = rng.chance(BOOST_JUMP_CHANCE);
        }
        if me.is_speed_boosted() {
            input = steer_toward(me.x, TRACK_CENTER_X, input.jump);
        }
        input
    }

    // =========================================================================
    // HUMAN-LIKENESS
    // =========================================================================

    /// Jitter, mistakes, then the reaction delay.
    fn humanize(&mut self, raw: InputState, rng: &mut SeededRng) -> InputState {
        let mut input = raw;

        if rng.chance(self.profile.steering_jitter) {
            if rng.chance(0.5) {
                input.left = !input.left;
            } else {
                input.right = !input.right;
            }
        }

        if rng.chance(self.profile.mistake_chance / crate::TICK_RATE as f64) {
            let left = rng.chance(0.5);
            input = input.with_steering(left, !left);
        }

        self.reaction_buffer.push_back(input);
        self.reaction_buffer.pop_front().unwrap_or_default()
    }
}

/// Steer toward `target_x` with a small dead zone.
fn steer_toward(x: f64, target_x: f64, jump: bool) -> InputState {
    let dx = target_x - x;
    InputState::new(dx < -STEER_DEAD_ZONE, dx > STEER_DEAD_ZONE, jump)
}

// =============================================================================
// TESTS
// =============================================================================
