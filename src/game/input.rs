//! Input Capture and Recording
//!
//! The per-tick input shape shared by humans, bots and replays, plus
//! the recorder that captures the human stream for replay sharing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// =============================================================================
// INPUT TYPES
// =============================================================================

/// Input for a single player on a single tick.
///
/// Bots and humans produce exactly this shape; the physics layer cannot
/// tell them apart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputState {
    /// Steer left held
    pub left: bool,
    /// Steer right held
    pub right: bool,
    /// Jump pressed
    pub jump: bool,
}

impl InputState {
    /// Left steering bit
    pub const FLAG_LEFT: u8 = 0x01;

    /// Right steering bit
    pub const FLAG_RIGHT: u8 = 0x02;

    /// Jump bit
    pub const FLAG_JUMP: u8 = 0x04;

    /// All defined bits
    pub const FLAG_MASK: u8 = Self::FLAG_LEFT | Self::FLAG_RIGHT | Self::FLAG_JUMP;

    /// Neutral input (nothing pressed).
    pub const NEUTRAL: Self = Self {
        left: false,
        right: false,
        jump: false,
    };

    /// Create an input from its three buttons.
    pub const fn new(left: bool, right: bool, jump: bool) -> Self {
        Self { left, right, jump }
    }

    /// Steer left only.
    pub const fn steer_left() -> Self {
        Self::new(true, false, false)
    }

    /// Steer right only.
    pub const fn steer_right() -> Self {
        Self::new(false, true, false)
    }

    /// Pack into a bitmask (bit0 = left, bit1 = right, bit2 = jump).
    #[inline]
    pub fn to_bits(self) -> u8 {
        (if self.left { Self::FLAG_LEFT } else { 0 })
            | (if self.right { Self::FLAG_RIGHT } else { 0 })
            | (if self.jump { Self::FLAG_JUMP } else { 0 })
    }

    /// Unpack from a bitmask. Returns `None` if undefined bits are set.
    #[inline]
    pub fn from_bits(bits: u8) -> Option<Self> {
        if bits & !Self::FLAG_MASK != 0 {
            return None;
        }
        Some(Self {
            left: bits & Self::FLAG_LEFT != 0,
            right: bits & Self::FLAG_RIGHT != 0,
            jump: bits & Self::FLAG_JUMP != 0,
        })
    }

    /// True if either steering input is held.
    #[inline]
    pub fn is_steering(&self) -> bool {
        self.left || self.right
    }

    /// True if nothing is pressed.
    #[inline]
    pub fn is_neutral(&self) -> bool {
        !self.left && !self.right && !self.jump
    }

    /// Replace both steering bits, keeping jump.
    #[inline]
    pub fn with_steering(self, left: bool, right: bool) -> Self {
        Self { left, right, ..self }
    }
}

// =============================================================================
// INPUT SOURCES
// =============================================================================

/// Producer of the human player's input, one frame per tick.
///
/// Buffering and debouncing are the implementor's concern; the driver
/// pulls exactly once per tick.
pub trait InputSource {
    /// Input for the given tick (1-based, the tick being simulated).
    fn input_for_tick(&mut self, tick: u32) -> InputState;
}

impl<F> InputSource for F
where
    F: FnMut(u32) -> InputState,
{
    fn input_for_tick(&mut self, tick: u32) -> InputState {
        self(tick)
    }
}

/// Input source that always returns neutral input.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdleInput;

impl InputSource for IdleInput {
    fn input_for_tick(&mut self, _tick: u32) -> InputState {
        InputState::NEUTRAL
    }
}

/// Plays back a recorded frame list by tick number.
///
/// Ticks with no recorded frame yield neutral input.
#[derive(Clone, Debug, Default)]
pub struct ReplayInput {
    frames: BTreeMap<u32, InputState>,
}

impl ReplayInput {
    /// Build from recorded frames.
    pub fn new(frames: &[RecordedFrame]) -> Self {
        Self {
            frames: frames.iter().map(|f| (f.tick, f.inputs)).collect(),
        }
    }

    /// Number of distinct recorded ticks.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl InputSource for ReplayInput {
    fn input_for_tick(&mut self, tick: u32) -> InputState {
        self.frames.get(&tick).copied().unwrap_or_default()
    }
}

// =============================================================================
// RECORDING
// =============================================================================

/// One recorded tick of human input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedFrame {
    /// Tick the input was applied on
    pub tick: u32,
    /// The input
    pub inputs: InputState,
}

impl RecordedFrame {
    /// Create a new frame.
    pub const fn new(tick: u32, inputs: InputState) -> Self {
        Self { tick, inputs }
    }
}

/// Verbatim recording of the human input stream for one race.
///
/// Every tick is stored, including ticks replayed from an earlier
/// recording, so a replay of a replay can be shared again.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReplayRecorder {
    frames: Vec<RecordedFrame>,
}

impl ReplayRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self {
            // 45 seconds at 60 Hz
            frames: Vec::with_capacity(2700),
        }
    }

    /// Record input for a tick.
    pub fn record(&mut self, tick: u32, inputs: InputState) {
        self.frames.push(RecordedFrame::new(tick, inputs));
    }

    /// All recorded frames in tick order.
    pub fn frames(&self) -> &[RecordedFrame] {
        &self.frames
    }

    /// Number of recorded frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Consume the recorder, returning its frames.
    pub fn into_frames(self) -> Vec<RecordedFrame> {
        self.frames
    }
}

// =============================================================================
// TESTS
// =============================================================================
