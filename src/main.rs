//! Lane Rush headless runner
//!
//! Runs one race from environment configuration with a scripted human,
//! prints the standings, then round-trips the replay token and verifies it
//! by re-simulation.

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lane_rush::{
    game::{events::RaceEventData, input::InputState, tick::RaceOutcome},
    replay::{codec, verify::verify_replay},
    storage::{FileStorage, Storage},
    Race, RaceConfig, TICK_RATE, VERSION,
};

/// Directory for saved replays and stats. Unset means nothing is persisted.
const DATA_DIR_ENV: &str = "LANE_RUSH_DATA_DIR";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Lane Rush v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);

    let config = RaceConfig::from_env();
    info!(
        "Seed {} | mode {} | {:.0}s | {} racers",
        config.seed,
        config.mode.as_str(),
        config.match_length,
        config.player_count()
    );

    let (outcome, replay) = demo_race(config)?;

    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        persist(FileStorage::new(dir), &outcome, &replay).await;
    }

    Ok(())
}

/// Scripted human: weaves between lanes and hops every couple of seconds.
fn weave(tick: u32) -> InputState {
    let phase = (tick / 45) % 4;
    let jump = tick % 120 == 0;
    match phase {
        0 => InputState::new(true, false, jump),
        2 => InputState::new(false, true, jump),
        _ => InputState::new(false, false, jump),
    }
}

fn demo_race(config: RaceConfig) -> anyhow::Result<(RaceOutcome, lane_rush::ReplayData)> {
    info!("=== Starting Race ===");

    let mut race = Race::new(config);
    let mut total_events = 0usize;

    while !race.is_finished() {
        let tick = race.state().tick + 1;
        let result = race.step(weave(tick));
        total_events += result.events.len();

        for event in &result.events {
            match &event.data {
                RaceEventData::PlayerFinished { player_id, position, finish_time, forced, .. } => {
                    info!(
                        "{} finished #{} at {:.2}s{}",
                        player_id,
                        position,
                        finish_time,
                        if *forced { " (time up)" } else { "" }
                    );
                }
                RaceEventData::RaceEnded { winner_id, duration_ticks } => {
                    info!("Race ended after {} ticks, winner {:?}", duration_ticks, winner_id);
                }
                _ => {}
            }
        }
    }

    let outcome = race.outcome();
    info!("=== Standings ===");
    for s in &outcome.standings {
        info!(
            "#{}: {} ({}) - {:.2}s, score {}",
            s.position,
            s.name,
            if s.is_bot { "bot" } else { "human" },
            s.finish_time,
            s.score
        );
    }
    info!("Total events: {}", total_events);
    info!("Final State Hash: {}", hex::encode(outcome.final_hash));

    info!("=== Verifying Replay ===");
    let replay = race.to_replay();
    let token = codec::encode(&replay).context("encoding replay")?;
    info!("Replay token: {} chars, {} frames", token.len(), replay.frames.len());

    let decoded = codec::try_decode(&token).context("decoding replay")?;
    let verified = verify_replay(&decoded, &outcome).context("verifying replay")?;
    info!("Replay State Hash: {}", hex::encode(verified.final_hash));
    info!("REPLAY VERIFIED: Hashes match!");

    Ok((outcome, replay))
}

async fn persist(storage: FileStorage, outcome: &RaceOutcome, replay: &lane_rush::ReplayData) {
    match storage.store_replay(replay).await {
        Ok(id) => info!("Saved replay {} under {}", id, storage.root().display()),
        Err(e) => warn!(error = %e, "could not save replay"),
    }

    if let Some(human) = outcome.human() {
        let mut stats = storage.load_stats().await;
        stats.record_race(human);
        if let Err(e) = storage.save_stats(&stats).await {
            warn!(error = %e, "could not save stats");
        } else {
            info!("Races: {} | wins: {} | average score {:.0}", stats.races, stats.wins, stats.average_score());
        }
    }
}
