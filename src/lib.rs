//! # Lane Rush
//!
//! Deterministic simulation core for Lane Rush, a lane-based arcade racer:
//! seeded tracks, fixed-timestep physics, state-machine bots and
//! shareable replays.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         LANE RUSH                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── rng.rs      - 32-bit LCG PRNG                           │
//! │  └── hash.rs     - State hashing for verification            │
//! │                                                              │
//! │  game/           - Race simulation (deterministic)           │
//! │  ├── input.rs    - Input shape, sources, recording           │
//! │  ├── track.rs    - Classic and procedural tracks             │
//! │  ├── state.rs    - Player and race state                     │
//! │  ├── physics.rs  - Per-tick kinematics                       │
//! │  ├── collision.rs- Bumps, obstacles, powerups                │
//! │  ├── scoring.rs  - Position + time scoring                   │
//! │  ├── events.rs   - Race events                               │
//! │  └── tick.rs     - Simulation driver                         │
//! │                                                              │
//! │  ai/             - Bot AI (deterministic)                    │
//! │  ├── profile.rs  - Personality presets                       │
//! │  └── controller.rs - FSM + human-likeness layer              │
//! │                                                              │
//! │  replay/         - Sharing and verification                  │
//! │  ├── codec.rs    - URL-safe replay token                     │
//! │  └── verify.rs   - Verify by re-simulation                   │
//! │                                                              │
//! │  storage/        - Persistence (async, best-effort)          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/`, `game/` and `ai/` modules hold no global state, and no
//! simulation state depends on the clock (the only clock read is the
//! replay's wall-clock start stamp, which never reaches the tick path):
//! - One `Race` owns everything a race mutates
//! - The roster is an ordered list; every scan runs in roster order
//! - Track sets use BTreeSet for sorted iteration
//! - All randomness comes from the race's seeded LCG
//!
//! Given the same seed, bot roster and human input stream, the same build
//! produces **identical results**.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod ai;
pub mod core;
pub mod game;
pub mod replay;
pub mod storage;

// Re-export commonly used types
pub use ai::{BotController, BotPersonality, BotProfile};
pub use core::rng::SeededRng;
pub use game::input::{InputSource, InputState};
pub use game::state::{PlayerId, PlayerState, RaceState};
pub use game::tick::{replay_race, Race, RaceConfig, RaceOutcome};
pub use game::track::{GameMode, Track};
pub use replay::codec::{decode, encode, ReplayData};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;

/// Fixed timestep (seconds)
pub const DT: f64 = 1.0 / TICK_RATE as f64;
