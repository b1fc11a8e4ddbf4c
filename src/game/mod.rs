//! Game Logic Module
//!
//! All race simulation code. Deterministic for a given seed and input
//! stream on the same build.
//!
//! ## Module Structure
//!
//! - `input`: Input shape, input sources, recording
//! - `track`: Segments, the classic preset and the procedural generator
//! - `state`: Player state and race state
//! - `physics`: Per-tick player kinematics
//! - `collision`: Player bumps, obstacle and powerup contacts
//! - `scoring`: Position and time scoring
//! - `events`: Race events for rendering/HUD/audio
//! - `tick`: Simulation driver

pub mod collision;
pub mod events;
pub mod input;
pub mod physics;
pub mod scoring;
pub mod state;
pub mod tick;
pub mod track;

// Re-export key types
pub use events::{RaceEvent, RaceEventData};
pub use input::{IdleInput, InputSource, InputState, RecordedFrame, ReplayInput, ReplayRecorder};
pub use state::{PlayerId, PlayerState, RacePhase, RaceState};
pub use tick::{replay_race, HumanSpec, Race, RaceConfig, RaceOutcome, Standing, TickResult};
pub use track::{GameMode, Track, TrackSegment};
