//! Simulation Driver
//!
//! Owns one race and advances it one fixed tick at a time. Each tick runs
//! the same sequence:
//!
//! 1. collect input (human from the caller, each bot from its controller)
//! 2. physics for every racer still going
//! 3. player-vs-player collisions
//! 4. obstacle and powerup contacts
//! 5. finish line
//! 6. race termination (time up or everyone home)
//!
//! Every human input frame is recorded verbatim for replay sharing.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ai::controller::{BotController, WorldView};
use crate::ai::profile::BotPersonality;
use crate::core::hash::StateHash;
use crate::game::collision::{process_track_objects, resolve_player_collisions};
use crate::game::events::{sort_events, RaceEvent};
use crate::game::input::{InputSource, InputState, ReplayInput, ReplayRecorder};
use crate::game::physics::advance;
use crate::game::scoring::compute_score;
use crate::game::state::{PlayerId, RacePhase, RaceState};
use crate::game::track::GameMode;
use crate::replay::codec::{ReplayData, ReplaySettings, REPLAY_VERSION};
use crate::storage::Settings;
use crate::{DT, TICK_RATE};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Default seed when none is configured
pub const DEFAULT_SEED: u32 = 42;

/// Default match length (seconds)
pub const DEFAULT_MATCH_LENGTH: f64 = 45.0;

/// The human racer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanSpec {
    /// Display name
    pub name: String,
    /// Cosmetic skin
    pub skin_index: u8,
}

impl Default for HumanSpec {
    fn default() -> Self {
        Self {
            name: "Player".to_string(),
            skin_index: 0,
        }
    }
}

/// Configuration for one race.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RaceConfig {
    /// RNG seed (track generation and bots)
    pub seed: u32,
    /// Game mode
    pub mode: GameMode,
    /// Match length in seconds
    pub match_length: f64,
    /// The human racer; joins first
    pub human: Option<HumanSpec>,
    /// Bots, in join order
    pub bots: Vec<BotPersonality>,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            mode: GameMode::Classic,
            match_length: DEFAULT_MATCH_LENGTH,
            human: Some(HumanSpec::default()),
            bots: vec![BotPersonality::Casual, BotPersonality::Speedster],
        }
    }
}

impl RaceConfig {
    /// Load config from environment variables, falling back to defaults.
    ///
    /// `RACE_SEED`, `RACE_MODE`, `RACE_MATCH_LENGTH`, `RACE_BOTS`
    /// (comma separated) and `RACE_PLAYER_NAME`.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let seed = std::env::var("RACE_SEED")
            .ok()
            .and_then(|v| parse_seed(&v))
            .unwrap_or(defaults.seed);

        let mode = match std::env::var("RACE_MODE") {
            Ok(v) => GameMode::parse(&v).unwrap_or_else(|| {
                warn!(value = %v, "unknown RACE_MODE, using classic");
                GameMode::Classic
            }),
            Err(_) => defaults.mode,
        };

        let match_length = std::env::var("RACE_MATCH_LENGTH")
            .ok()
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v > 0.0)
            .unwrap_or(defaults.match_length);

        let bots = std::env::var("RACE_BOTS")
            .map(|v| parse_bots(&v))
            .unwrap_or(defaults.bots);

        let human = Some(HumanSpec {
            name: std::env::var("RACE_PLAYER_NAME").unwrap_or_else(|_| HumanSpec::default().name),
            skin_index: 0,
        });

        Self {
            seed,
            mode,
            match_length,
            human,
            bots,
        }
    }

    /// Build a config from persisted player settings.
    pub fn from_settings(settings: &Settings, seed: u32) -> Self {
        Self {
            seed,
            mode: settings.mode,
            match_length: settings.match_length,
            human: Some(HumanSpec {
                name: settings.player_name.clone(),
                skin_index: settings.skin_index,
            }),
            bots: settings.bots.clone(),
        }
    }

    /// Config that reproduces a recorded race.
    pub fn from_replay(replay: &ReplayData) -> Self {
        Self {
            seed: replay.seed,
            mode: replay.mode,
            match_length: replay.settings.match_length,
            human: replay.settings.has_human.then(|| HumanSpec {
                name: replay.player_name.clone(),
                skin_index: replay.settings.skin_index,
            }),
            bots: replay.settings.bots.clone(),
        }
    }

    /// Tick budget for the match length.
    pub fn total_ticks(&self) -> u32 {
        let ticks = (self.match_length * TICK_RATE as f64).round();
        if ticks.is_finite() && ticks > 0.0 {
            ticks.min(u32::MAX as f64) as u32
        } else {
            0
        }
    }

    /// Number of racers.
    pub fn player_count(&self) -> usize {
        self.bots.len() + usize::from(self.human.is_some())
    }
}

/// Seeds are coerced to 32 bits, so negative and oversized values wrap.
fn parse_seed(value: &str) -> Option<u32> {
    value.trim().parse::<i64>().ok().map(|v| v as u32)
}

fn parse_bots(value: &str) -> Vec<BotPersonality> {
    value
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .filter_map(|s| {
            let parsed = BotPersonality::parse(s);
            if parsed.is_none() {
                warn!(value = %s.trim(), "unknown bot personality, skipping");
            }
            parsed
        })
        .collect()
}

// =============================================================================
// RESULTS
// =============================================================================

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Tick just simulated
    pub tick: u32,
    /// Events generated this tick, in reporting order
    pub events: Vec<RaceEvent>,
    /// Whether the race is over
    pub race_ended: bool,
}

/// One racer's final result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    /// Player id
    pub id: PlayerId,
    /// Display name
    pub name: String,
    /// Bot-driven?
    pub is_bot: bool,
    /// Finishing position (1-based)
    pub position: u8,
    /// Finish time in seconds
    pub finish_time: f64,
    /// Final score
    pub score: u32,
}

/// Summary of a finished (or abandoned) race.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RaceOutcome {
    /// Seed
    pub seed: u32,
    /// Mode
    pub mode: GameMode,
    /// Ticks simulated
    pub ticks: u32,
    /// Racers ordered by finishing position
    pub standings: Vec<Standing>,
    /// State hash at the end
    pub final_hash: StateHash,
}

impl RaceOutcome {
    /// Winner, if anyone was placed.
    pub fn winner(&self) -> Option<&Standing> {
        self.standings.iter().find(|s| s.position == 1)
    }

    /// The human racer's result, if there was one.
    pub fn human(&self) -> Option<&Standing> {
        self.standings.iter().find(|s| !s.is_bot)
    }
}

// =============================================================================
// DRIVER
// =============================================================================

/// One race: state, bot controllers and the human input recording.
pub struct Race {
    state: RaceState,
    bots: Vec<BotController>,
    recorder: ReplayRecorder,
    config: RaceConfig,
    total_ticks: u32,
    start_time: i64,
}

impl Race {
    /// Set up a race: track, human first, then bots in order.
    pub fn new(config: RaceConfig) -> Self {
        let mut state = RaceState::new(config.seed, config.mode, config.match_length);

        if let Some(human) = &config.human {
            state.add_human(human.name.clone(), human.skin_index);
        }

        let bots = config
            .bots
            .iter()
            .map(|&personality| {
                let id = state.add_bot(personality);
                BotController::new(id, personality)
            })
            .collect();

        info!(
            seed = config.seed,
            mode = config.mode.as_str(),
            players = state.players.len(),
            track_length = state.track.total_length(),
            "race started"
        );

        Self {
            total_ticks: config.total_ticks(),
            state,
            bots,
            recorder: ReplayRecorder::new(),
            config,
            start_time: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Set up a race that reproduces a replay.
    pub fn from_replay(replay: &ReplayData) -> Self {
        let mut race = Self::new(RaceConfig::from_replay(replay));
        race.start_time = replay.start_time;
        race
    }

    /// Current race state.
    pub fn state(&self) -> &RaceState {
        &self.state
    }

    /// Config the race was built from.
    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    /// Human input recorded so far.
    pub fn recorder(&self) -> &ReplayRecorder {
        &self.recorder
    }

    /// Bot controllers, in join order.
    pub fn bots(&self) -> &[BotController] {
        &self.bots
    }

    /// Tick budget.
    pub fn total_ticks(&self) -> u32 {
        self.total_ticks
    }

    /// Has the race ended?
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Run one tick with the human's input for it.
    pub fn step(&mut self, human_input: InputState) -> TickResult {
        if self.state.is_finished() {
            return TickResult {
                tick: self.state.tick,
                events: Vec::new(),
                race_ended: true,
            };
        }

        self.state.tick += 1;
        let tick = self.state.tick;

        let inputs = self.collect_inputs(tick, human_input);
        self.update_physics(&inputs);
        resolve_player_collisions(&mut self.state);
        process_track_objects(&mut self.state);
        self.process_finishes();
        self.check_race_end();

        let mut events = self.state.take_events();
        sort_events(&mut events);

        TickResult {
            tick,
            events,
            race_ended: self.state.is_finished(),
        }
    }

    /// Run to completion, pulling human input from `source`.
    pub fn run<S: InputSource + ?Sized>(&mut self, source: &mut S) -> RaceOutcome {
        while !self.state.is_finished() {
            let input = source.input_for_tick(self.state.tick + 1);
            self.step(input);
        }
        self.outcome()
    }

    /// Summary of the race so far (final once finished).
    pub fn outcome(&self) -> RaceOutcome {
        let standings = self
            .state
            .standings()
            .into_iter()
            .filter_map(|p| {
                Some(Standing {
                    id: p.id,
                    name: p.name.clone(),
                    is_bot: p.is_bot,
                    position: p.finish_position?,
                    finish_time: p.finish_time?,
                    score: p.score,
                })
            })
            .collect();

        RaceOutcome {
            seed: self.state.seed,
            mode: self.state.mode,
            ticks: self.state.tick,
            standings,
            final_hash: self.state.compute_hash(),
        }
    }

    /// Package the recorded human input as a shareable replay.
    pub fn to_replay(&self) -> ReplayData {
        let (player_name, skin_index) = match &self.config.human {
            Some(h) => (h.name.clone(), h.skin_index),
            None => (String::new(), 0),
        };

        ReplayData {
            version: REPLAY_VERSION,
            seed: self.config.seed,
            mode: self.config.mode,
            settings: ReplaySettings {
                match_length: self.config.match_length,
                bots: self.config.bots.clone(),
                has_human: self.config.human.is_some(),
                skin_index,
            },
            frames: self.recorder.frames().to_vec(),
            start_time: self.start_time,
            player_name,
        }
    }

    fn collect_inputs(&mut self, tick: u32, human_input: InputState) -> Vec<InputState> {
        let state = &mut self.state;
        let mut inputs = vec![InputState::NEUTRAL; state.players.len()];

        if let Some(human_id) = state.human_id {
            self.recorder.record(tick, human_input);
            if let Some(idx) = state.players.iter().position(|p| p.id == human_id) {
                inputs[idx] = human_input;
            }
        }

        for bot in &mut self.bots {
            let Some(idx) = state.players.iter().position(|p| p.id == bot.player_id()) else {
                continue;
            };
            if state.players[idx].finished {
                continue;
            }
            let world = WorldView {
                track: &state.track,
                players: &state.players,
                human_id: state.human_id,
                consumed_powerups: &state.consumed_powerups,
            };
            inputs[idx] = bot.update(&world, &mut state.rng);
        }

        inputs
    }

    fn update_physics(&mut self, inputs: &[InputState]) {
        let state = &mut self.state;
        for (player, input) in state.players.iter_mut().zip(inputs) {
            if player.finished {
                continue;
            }
            let segment = state.track.segment_at(player.distance_traveled);
            advance(player, *input, segment, DT);
        }
    }

    /// Place everyone who crossed the line this tick. Same-tick finishers
    /// are ordered by distance, then id.
    fn process_finishes(&mut self) {
        let total_length = self.state.track.total_length();
        let mut crossed: Vec<usize> = self
            .state
            .players
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.finished && p.distance_traveled >= total_length)
            .map(|(idx, _)| idx)
            .collect();

        self.sort_by_progress(&mut crossed);
        for idx in crossed {
            self.place(idx, false);
        }
    }

    /// End the race on time-out or when nobody is left racing.
    fn check_race_end(&mut self) {
        let timed_out = self.state.tick >= self.total_ticks;
        if !timed_out && self.state.active_count() > 0 {
            return;
        }

        let mut remaining: Vec<usize> = self
            .state
            .players
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.finished)
            .map(|(idx, _)| idx)
            .collect();

        self.sort_by_progress(&mut remaining);
        for idx in remaining {
            self.place(idx, true);
        }

        self.state.phase = RacePhase::Finished;
        let winner = self
            .state
            .players
            .iter()
            .find(|p| p.finish_position == Some(1))
            .map(|p| p.id);
        let tick = self.state.tick;
        self.state.push_event(RaceEvent::race_ended(tick, winner));

        info!(
            tick,
            timed_out,
            winner = ?winner,
            "race finished"
        );
    }

    fn sort_by_progress(&self, indices: &mut [usize]) {
        let players = &self.state.players;
        indices.sort_by(|&a, &b| {
            let (pa, pb) = (&players[a], &players[b]);
            pb.distance_traveled
                .total_cmp(&pa.distance_traveled)
                .then(pa.id.cmp(&pb.id))
        });
    }

    fn place(&mut self, idx: usize, forced: bool) {
        let state = &mut self.state;
        let total_players = state.players.len();
        let position = state.next_finish_position;
        let finish_time = state.elapsed();
        let score = compute_score(total_players, position, state.match_length, finish_time);
        state.next_finish_position = position.saturating_add(1);

        let player = &mut state.players[idx];
        player.finished = true;
        player.finish_time = Some(finish_time);
        player.finish_position = Some(position);
        player.score = score;
        let id = player.id;

        debug!(tick = state.tick, player = %id, position, finish_time, score, forced, "player finished");
        let tick = state.tick;
        state.push_event(RaceEvent::player_finished(tick, id, position, finish_time, score, forced));
    }
}

/// Re-run a recorded race. The returned driver has finished and holds a
/// fresh recording of the same frames.
pub fn replay_race(replay: &ReplayData) -> Race {
    let mut race = Race::from_replay(replay);
    let mut source = ReplayInput::new(&replay.frames);
    race.run(&mut source);
    race
}

// =============================================================================
// TESTS
// =============================================================================
