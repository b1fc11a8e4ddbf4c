//! Core deterministic primitives.
//!
//! The seeded RNG and the state hasher. Everything the simulation draws
//! or digests goes through these two types.

pub mod rng;
pub mod hash;

// Re-export core types
pub use rng::SeededRng;
pub use hash::{compute_state_hash, StateHash, StateHasher};
