//! Track Model
//!
//! Ordered segments with embedded obstacle and powerup placements.
//! Tracks are immutable once built: either the hand-authored classic
//! layout or procedurally generated from the shared RNG.

use serde::{Deserialize, Serialize};

use crate::core::rng::SeededRng;

/// Lateral centre of the track in world units.
pub const TRACK_CENTER_X: f64 = 400.0;

/// Width of a single lane.
pub const LANE_WIDTH: f64 = 80.0;

/// Inset from each rail that players can never cross.
pub const RAIL_MARGIN: f64 = 10.0;

/// Lane count for regular segments.
pub const DEFAULT_LANES: usize = 5;

/// Lane count for narrow segments.
pub const NARROW_LANES: usize = 3;

/// Track units generated per second of match length.
pub const UNITS_PER_SECOND: f64 = 80.0;

/// Length of the obstacle-free straight appended to generated tracks.
pub const FINISH_STRAIGHT_LENGTH: f64 = 300.0;

// =============================================================================
// MODES
// =============================================================================

/// Game mode; selects how the track is built.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    /// Hand-authored preset track
    #[default]
    Classic,
    /// Procedural track
    Random,
    /// Procedural track with more variety and obstacles
    Chaos,
}

impl GameMode {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Classic => "classic",
            GameMode::Random => "random",
            GameMode::Chaos => "chaos",
        }
    }

    /// Parse a lowercase name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "classic" => Some(GameMode::Classic),
            "random" => Some(GameMode::Random),
            "chaos" => Some(GameMode::Chaos),
            _ => None,
        }
    }
}

// =============================================================================
// TRACK OBJECTS
// =============================================================================

/// Kind of track segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    /// Plain straight
    Straight,
    /// Bends left
    CurveLeft,
    /// Bends right
    CurveRight,
    /// Jump ramp; bots jump eagerly here
    Ramp,
    /// Gap in the surface
    Gap,
    /// Lane splitter
    Splitter,
    /// Three-lane squeeze
    Narrow,
}

/// Obstacle type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstacleKind {
    /// Halves forward speed and stuns
    Barrel,
    /// Slows and reverses lateral motion
    Ring,
    /// Pushes away from track centre and stuns
    Bumper,
}

impl ObstacleKind {
    const ALL: [ObstacleKind; 3] = [ObstacleKind::Barrel, ObstacleKind::Ring, ObstacleKind::Bumper];
}

/// Powerup type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerupKind {
    /// Raises acceleration and top speed
    SpeedBoost,
    /// Blocks collisions and obstacles
    Shield,
    /// Lengthens jumps
    JumpBoost,
}

impl PowerupKind {
    const ALL: [PowerupKind; 3] = [PowerupKind::SpeedBoost, PowerupKind::Shield, PowerupKind::JumpBoost];
}

/// Obstacle placement within a segment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObstacleData {
    /// Obstacle type
    pub kind: ObstacleKind,
    /// Lane index within the owning segment
    pub lane: usize,
    /// Fraction (0-1) along the segment
    pub position: f64,
    /// Sways sideways when rendered; physics uses the nominal lane
    pub moving: bool,
    /// Sway amplitude for rendering
    pub move_range: f64,
}

impl ObstacleData {
    /// Static obstacle.
    pub const fn fixed(kind: ObstacleKind, lane: usize, position: f64) -> Self {
        Self {
            kind,
            lane,
            position,
            moving: false,
            move_range: 0.0,
        }
    }
}

/// Powerup placement within a segment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PowerupData {
    /// Powerup type
    pub kind: PowerupKind,
    /// Lane index within the owning segment
    pub lane: usize,
    /// Fraction (0-1) along the segment
    pub position: f64,
}

impl PowerupData {
    /// Create a placement.
    pub const fn new(kind: PowerupKind, lane: usize, position: f64) -> Self {
        Self { kind, lane, position }
    }
}

/// Stable identity of a placed object: (segment index, object index).
pub type ObjectKey = (usize, usize);

/// Obstacle resolved to absolute track distance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedObstacle {
    /// Identity for hit bookkeeping
    pub key: ObjectKey,
    /// Obstacle type
    pub kind: ObstacleKind,
    /// Lane index
    pub lane: usize,
    /// Absolute distance from the start line
    pub distance: f64,
}

/// Powerup resolved to absolute track distance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedPowerup {
    /// Identity for pickup bookkeeping
    pub key: ObjectKey,
    /// Powerup type
    pub kind: PowerupKind,
    /// Lane index
    pub lane: usize,
    /// Absolute distance from the start line
    pub distance: f64,
}

// =============================================================================
// SEGMENT
// =============================================================================

/// One piece of track.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackSegment {
    /// Segment type
    pub kind: SegmentKind,
    /// Length in world units
    pub length: f64,
    /// Lane count
    pub lanes: usize,
    /// Multiplicative forward-speed decay per tick
    pub friction: f64,
    /// Negative = downhill (accelerates)
    pub slope: f64,
    /// Obstacle placements
    pub obstacles: Vec<ObstacleData>,
    /// Powerup placements
    pub powerups: Vec<PowerupData>,
}

impl TrackSegment {
    /// Empty segment with the given geometry.
    pub fn new(kind: SegmentKind, length: f64, lanes: usize, friction: f64, slope: f64) -> Self {
        Self {
            kind,
            length,
            lanes: lanes.max(1),
            friction,
            slope,
            obstacles: Vec::new(),
            powerups: Vec::new(),
        }
    }

    /// Attach obstacles.
    pub fn with_obstacles(mut self, obstacles: Vec<ObstacleData>) -> Self {
        self.obstacles = obstacles;
        self
    }

    /// Attach powerups.
    pub fn with_powerups(mut self, powerups: Vec<PowerupData>) -> Self {
        self.powerups = powerups;
        self
    }

    /// Half the drivable width.
    #[inline]
    pub fn half_width(&self) -> f64 {
        self.lanes as f64 * LANE_WIDTH / 2.0
    }

    /// Leftmost and rightmost legal x, inset from the rails.
    #[inline]
    pub fn lane_bounds(&self) -> (f64, f64) {
        let half = self.half_width();
        (TRACK_CENTER_X - half + RAIL_MARGIN, TRACK_CENTER_X + half - RAIL_MARGIN)
    }

    /// Centre x of a lane (lane clamped into range).
    #[inline]
    pub fn lane_center(&self, lane: usize) -> f64 {
        let lane = lane.min(self.lanes - 1);
        TRACK_CENTER_X - self.half_width() + LANE_WIDTH * (lane as f64 + 0.5)
    }

    /// Discrete lane index for an x position, clamped to the lane range.
    #[inline]
    pub fn lane_at(&self, x: f64) -> usize {
        let offset = (x - (TRACK_CENTER_X - self.half_width())) / LANE_WIDTH;
        if offset <= 0.0 {
            0
        } else {
            (offset.floor() as usize).min(self.lanes - 1)
        }
    }

    /// Index of the middle lane (lower middle for even counts).
    #[inline]
    pub fn center_lane(&self) -> usize {
        (self.lanes - 1) / 2
    }
}

// =============================================================================
// TRACK
// =============================================================================

/// Inputs to procedural generation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackSettings {
    /// Match length in seconds; drives the generated track length
    pub match_length: f64,
}

impl Default for TrackSettings {
    fn default() -> Self {
        Self { match_length: 45.0 }
    }
}

/// An immutable ordered sequence of segments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    segments: Vec<TrackSegment>,
    /// Cumulative start distance of each segment
    starts: Vec<f64>,
    total_length: f64,
}

impl Track {
    /// Build from segments. An empty list gets a single straight.
    pub fn from_segments(mut segments: Vec<TrackSegment>) -> Self {
        if segments.is_empty() {
            segments.push(finish_straight());
        }

        let mut starts = Vec::with_capacity(segments.len());
        let mut total_length = 0.0;
        for segment in &segments {
            starts.push(total_length);
            total_length += segment.length.max(0.0);
        }

        Self {
            segments,
            starts,
            total_length,
        }
    }

    /// Build the track for a mode. Classic ignores the RNG.
    pub fn for_mode(mode: GameMode, rng: &mut SeededRng, settings: &TrackSettings) -> Self {
        match mode {
            GameMode::Classic => Self::classic(),
            GameMode::Random | GameMode::Chaos => Self::generate(rng, mode, settings),
        }
    }

    /// The hand-authored classic track.
    pub fn classic() -> Self {
        use ObstacleKind::*;
        use PowerupKind::*;
        use SegmentKind::*;

        let segments = vec![
            TrackSegment::new(Straight, 300.0, 5, 0.985, 0.0)
                .with_powerups(vec![PowerupData::new(SpeedBoost, 2, 0.7)]),
            TrackSegment::new(CurveLeft, 250.0, 5, 0.982, 0.0)
                .with_obstacles(vec![ObstacleData::fixed(Barrel, 1, 0.5)]),
            TrackSegment::new(Straight, 200.0, 5, 0.985, -0.1)
                .with_obstacles(vec![ObstacleData::fixed(Ring, 3, 0.4)])
                .with_powerups(vec![PowerupData::new(Shield, 0, 0.6)]),
            TrackSegment::new(Ramp, 150.0, 5, 0.986, -0.2),
            TrackSegment::new(CurveRight, 250.0, 5, 0.982, 0.0).with_obstacles(vec![
                ObstacleData::fixed(Bumper, 4, 0.3),
                ObstacleData::fixed(Barrel, 2, 0.7),
            ]),
            TrackSegment::new(Narrow, 200.0, 3, 0.984, 0.0)
                .with_obstacles(vec![ObstacleData::fixed(Ring, 1, 0.5)]),
            TrackSegment::new(Splitter, 250.0, 5, 0.985, 0.0)
                .with_obstacles(vec![ObstacleData::fixed(Barrel, 2, 0.4)])
                .with_powerups(vec![
                    PowerupData::new(JumpBoost, 0, 0.5),
                    PowerupData::new(SpeedBoost, 4, 0.5),
                ]),
            TrackSegment::new(Gap, 150.0, 5, 0.985, 0.1),
            TrackSegment::new(Straight, 300.0, 5, 0.985, -0.1).with_obstacles(vec![
                ObstacleData::fixed(Bumper, 0, 0.3),
                ObstacleData::fixed(Bumper, 4, 0.6),
            ]),
            TrackSegment::new(CurveLeft, 250.0, 5, 0.982, 0.0)
                .with_obstacles(vec![ObstacleData::fixed(Barrel, 3, 0.5)])
                .with_powerups(vec![PowerupData::new(Shield, 1, 0.3)]),
            TrackSegment::new(Straight, 300.0, 5, 0.988, 0.0),
        ];

        Self::from_segments(segments)
    }

    /// Procedurally generate a track.
    ///
    /// Segments are drawn until the accumulated length reaches
    /// `match_length * 80`, then an obstacle-free finishing straight is
    /// appended. Every draw comes from `rng` in a fixed order, so the same
    /// seed, mode and settings always produce the same track.
    pub fn generate(rng: &mut SeededRng, mode: GameMode, settings: &TrackSettings) -> Self {
        let target = if settings.match_length.is_finite() {
            settings.match_length.max(0.0) * UNITS_PER_SECOND
        } else {
            0.0
        };
        let chaos = mode == GameMode::Chaos;

        let mut segments = Vec::new();
        let mut length = 0.0;
        while length < target {
            let segment = generate_segment(rng, chaos);
            length += segment.length;
            segments.push(segment);
        }
        segments.push(finish_straight());

        Self::from_segments(segments)
    }

    /// All segments in order.
    pub fn segments(&self) -> &[TrackSegment] {
        &self.segments
    }

    /// Number of segments.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Sum of segment lengths.
    pub fn total_length(&self) -> f64 {
        self.total_length
    }

    /// Start distance of a segment.
    pub fn segment_start(&self, index: usize) -> f64 {
        self.starts
            .get(index)
            .copied()
            .unwrap_or(self.total_length)
    }

    /// Index of the segment containing `distance`.
    ///
    /// Negative distances map to the first segment, distances at or past
    /// the end map to the last.
    pub fn segment_index_at(&self, distance: f64) -> usize {
        let idx = self.starts.partition_point(|start| *start <= distance);
        idx.saturating_sub(1).min(self.segments.len() - 1)
    }

    /// Segment containing `distance` (clamped, never out of bounds).
    pub fn segment_at(&self, distance: f64) -> &TrackSegment {
        &self.segments[self.segment_index_at(distance)]
    }

    /// Obstacles whose absolute position lies in `[from, to]`.
    pub fn obstacles_between(&self, from: f64, to: f64) -> Vec<PlacedObstacle> {
        let mut placed = Vec::new();
        for (seg_idx, segment) in self.segments_overlapping(from, to) {
            let start = self.starts[seg_idx];
            for (obj_idx, obstacle) in segment.obstacles.iter().enumerate() {
                let distance = start + obstacle.position * segment.length;
                if distance >= from && distance <= to {
                    placed.push(PlacedObstacle {
                        key: (seg_idx, obj_idx),
                        kind: obstacle.kind,
                        lane: obstacle.lane,
                        distance,
                    });
                }
            }
        }
        placed
    }

    /// Powerups whose absolute position lies in `[from, to]`.
    pub fn powerups_between(&self, from: f64, to: f64) -> Vec<PlacedPowerup> {
        let mut placed = Vec::new();
        for (seg_idx, segment) in self.segments_overlapping(from, to) {
            let start = self.starts[seg_idx];
            for (obj_idx, powerup) in segment.powerups.iter().enumerate() {
                let distance = start + powerup.position * segment.length;
                if distance >= from && distance <= to {
                    placed.push(PlacedPowerup {
                        key: (seg_idx, obj_idx),
                        kind: powerup.kind,
                        lane: powerup.lane,
                        distance,
                    });
                }
            }
        }
        placed
    }

    fn segments_overlapping(&self, from: f64, to: f64) -> impl Iterator<Item = (usize, &TrackSegment)> {
        let first = self.segment_index_at(from);
        let last = self.segment_index_at(to);
        (first..=last.max(first)).map(move |idx| (idx, &self.segments[idx]))
    }
}

fn finish_straight() -> TrackSegment {
    TrackSegment::new(SegmentKind::Straight, FINISH_STRAIGHT_LENGTH, DEFAULT_LANES, 0.988, 0.0)
}

/// Segment type weights: (kind, normal weight, chaos weight).
const SEGMENT_WEIGHTS: [(SegmentKind, f64, f64); 7] = [
    (SegmentKind::Straight, 30.0, 10.0),
    (SegmentKind::CurveLeft, 15.0, 15.0),
    (SegmentKind::CurveRight, 15.0, 15.0),
    (SegmentKind::Ramp, 10.0, 15.0),
    (SegmentKind::Gap, 5.0, 15.0),
    (SegmentKind::Splitter, 10.0, 15.0),
    (SegmentKind::Narrow, 15.0, 15.0),
];

fn pick_segment_kind(rng: &mut SeededRng, chaos: bool) -> SegmentKind {
    let weight = |&(_, normal, wild): &(SegmentKind, f64, f64)| if chaos { wild } else { normal };
    let total: f64 = SEGMENT_WEIGHTS.iter().map(weight).sum();
    let mut roll = rng.next() * total;
    for entry in &SEGMENT_WEIGHTS {
        roll -= weight(entry);
        if roll < 0.0 {
            return entry.0;
        }
    }
    SegmentKind::Straight
}

/// Draw order: kind, length, friction, slope, obstacle count, each
/// obstacle (kind, lane, position, moving, range if moving), powerup
/// count, each powerup (kind, lane, position).
fn generate_segment(rng: &mut SeededRng, chaos: bool) -> TrackSegment {
    let kind = pick_segment_kind(rng, chaos);
    let length = rng.next_int(200, 401) as f64;
    let lanes = if kind == SegmentKind::Narrow { NARROW_LANES } else { DEFAULT_LANES };
    let friction = rng.next_float(0.98, 0.988);
    let slope = rng.next_float(-0.2, 0.2);

    let max_obstacles = if chaos { 4 } else { 2 };
    let moving_chance = if chaos { 0.5 } else { 0.15 };
    let obstacle_count = rng.next_int(0, max_obstacles + 1);
    let mut obstacles = Vec::with_capacity(obstacle_count as usize);
    for _ in 0..obstacle_count {
        let obstacle_kind = ObstacleKind::ALL[rng.next_index(ObstacleKind::ALL.len())];
        let lane = rng.next_index(lanes);
        let position = rng.next_float(0.2, 0.9);
        let moving = rng.chance(moving_chance);
        let move_range = if moving { rng.next_float(20.0, 60.0) } else { 0.0 };
        obstacles.push(ObstacleData {
            kind: obstacle_kind,
            lane,
            position,
            moving,
            move_range,
        });
    }

    let powerup_count = rng.next_int(0, 2);
    let mut powerups = Vec::with_capacity(powerup_count as usize);
    for _ in 0..powerup_count {
        let powerup_kind = PowerupKind::ALL[rng.next_index(PowerupKind::ALL.len())];
        let lane = rng.next_index(lanes);
        let position = rng.next_float(0.1, 0.9);
        powerups.push(PowerupData::new(powerup_kind, lane, position));
    }

    TrackSegment::new(kind, length, lanes, friction, slope)
        .with_obstacles(obstacles)
        .with_powerups(powerups)
}

// =============================================================================
// TESTS
// =============================================================================
