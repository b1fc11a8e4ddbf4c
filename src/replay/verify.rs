//! Replay Verification
//!
//! Verify a claimed race result by deterministic re-simulation.

use thiserror::Error;

use crate::core::hash::StateHash;
use crate::game::tick::{replay_race, RaceOutcome};
use crate::replay::codec::{try_decode, ReplayData, ReplayError};

/// Errors that can occur during verification.
#[derive(Debug, Error)]
pub enum VerificationError {
    /// Token did not decode
    #[error("replay did not decode: {0}")]
    Decode(#[from] ReplayError),

    /// Seed differs from the claimed result
    #[error("seed mismatch: expected {expected}, got {got}")]
    SeedMismatch {
        /// Claimed seed
        expected: u32,
        /// Replay seed
        got: u32,
    },

    /// Race ran a different number of ticks
    #[error("tick count mismatch: expected {expected}, got {got}")]
    TickMismatch {
        /// Claimed ticks
        expected: u32,
        /// Replayed ticks
        got: u32,
    },

    /// Finish order, times or scores differ
    #[error("standings mismatch")]
    StandingsMismatch,

    /// Everything above matched but the final state did not
    #[error("final state hash mismatch: expected {}, computed {}", hex::encode(.expected), hex::encode(.computed))]
    FinalStateMismatch {
        /// Claimed hash
        expected: StateHash,
        /// Replayed hash
        computed: StateHash,
    },
}

/// Re-run `replay` and check it lands on `expected`.
///
/// Returns the recomputed outcome on success.
pub fn verify_replay(replay: &ReplayData, expected: &RaceOutcome) -> Result<RaceOutcome, VerificationError> {
    if replay.seed != expected.seed {
        return Err(VerificationError::SeedMismatch {
            expected: expected.seed,
            got: replay.seed,
        });
    }

    replay.validate()?;
    let computed = replay_race(replay).outcome();

    if computed.ticks != expected.ticks {
        return Err(VerificationError::TickMismatch {
            expected: expected.ticks,
            got: computed.ticks,
        });
    }
    if computed.standings != expected.standings {
        return Err(VerificationError::StandingsMismatch);
    }
    if computed.final_hash != expected.final_hash {
        return Err(VerificationError::FinalStateMismatch {
            expected: expected.final_hash,
            computed: computed.final_hash,
        });
    }

    tracing::debug!(seed = replay.seed, ticks = computed.ticks, "replay verified");
    Ok(computed)
}

/// Decode a transport token and verify it.
pub fn verify_token(token: &str, expected: &RaceOutcome) -> Result<RaceOutcome, VerificationError> {
    let replay = try_decode(token)?;
    verify_replay(&replay, expected)
}
