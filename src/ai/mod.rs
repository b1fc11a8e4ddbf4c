//! Bot AI.
//!
//! Personality presets and the per-bot state machine that drives a racer
//! through the same input shape as the human.

pub mod controller;
pub mod profile;

pub use controller::{BotController, BotState, WorldView};
pub use profile::{BotPersonality, BotProfile};
