//! Replays.
//!
//! The transport codec for sharing a race as a single URL-safe token, and
//! verification of a claimed result by re-simulation.

pub mod codec;
pub mod verify;

pub use codec::{decode, encode, try_decode, ReplayData, ReplayError, ReplaySettings, REPLAY_VERSION};
pub use verify::{verify_replay, verify_token, VerificationError};
