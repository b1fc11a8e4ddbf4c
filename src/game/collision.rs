//! Collision Detection
//!
//! Player-vs-player bumps and player-vs-track-object contacts, plus the
//! effects each contact applies. Pair checks read a snapshot and apply
//! afterwards, so roster order never changes the outcome.

use crate::game::events::RaceEvent;
use crate::game::physics::clamp_to_segment;
use crate::game::state::{PlayerId, PlayerState, RaceState};
use crate::game::track::{ObjectKey, ObstacleKind, PowerupKind, TrackSegment, TRACK_CENTER_X};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Player collision radius
pub const COLLISION_RADIUS: f64 = 15.0;

/// Lateral displacement applied to each bumped player
pub const COLLISION_PUSH: f64 = 40.0;

/// Stun applied by a player bump (seconds)
pub const COLLISION_STUN: f64 = 0.5;

/// Longitudinal window for touching a track object
pub const OBJECT_PROXIMITY: f64 = 15.0;

/// Barrel: forward speed multiplier
pub const BARREL_SPEED_MULT: f64 = 0.5;

/// Barrel: stun (seconds)
pub const BARREL_STUN: f64 = 0.8;

/// Ring: forward speed multiplier
pub const RING_SPEED_MULT: f64 = 0.7;

/// Ring: lateral speed is reversed and scaled by this
pub const RING_LATERAL_DAMPING: f64 = 0.5;

/// Bumper: lateral displacement away from center
pub const BUMPER_PUSH: f64 = 60.0;

/// Bumper: stun (seconds)
pub const BUMPER_STUN: f64 = 0.4;

/// Speed boost duration (seconds)
pub const SPEED_BOOST_DURATION: f64 = 3.0;

/// Shield duration (seconds)
pub const SHIELD_DURATION: f64 = 5.0;

/// Jump boost duration (seconds)
pub const JUMP_BOOST_DURATION: f64 = 5.0;

// =============================================================================
// PLAYER VS PLAYER
// =============================================================================

/// Two players that touched this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerCollision {
    /// Lower id
    pub a: PlayerId,
    /// Higher id
    pub b: PlayerId,
}

/// Check if two players collide.
///
/// Both must be on the ground and still racing, and closer than two radii
/// in (lateral, distance) space.
pub fn players_collide(a: &PlayerState, b: &PlayerState) -> bool {
    if !a.is_grounded_racer() || !b.is_grounded_racer() {
        return false;
    }

    let dx = a.x - b.x;
    let dd = a.distance_traveled - b.distance_traveled;
    let threshold = COLLISION_RADIUS * 2.0;
    dx * dx + dd * dd < threshold * threshold
}

/// Check all player pairs in roster order.
pub fn check_all_player_collisions(players: &[PlayerState]) -> Vec<PlayerCollision> {
    let mut collisions = Vec::new();

    for i in 0..players.len() {
        for j in (i + 1)..players.len() {
            let (a, b) = (&players[i], &players[j]);
            if players_collide(a, b) {
                let (a, b) = if a.id < b.id { (a.id, b.id) } else { (b.id, a.id) };
                collisions.push(PlayerCollision { a, b });
            }
        }
    }

    collisions
}

/// Push direction for `me` away from `other`: -1 left, +1 right.
///
/// Exactly aligned players split by id, lower id to the left.
fn push_direction(me: &PlayerState, other: &PlayerState) -> f64 {
    let dx = me.x - other.x;
    if dx > 0.0 {
        1.0
    } else if dx < 0.0 {
        -1.0
    } else if me.id < other.id {
        -1.0
    } else {
        1.0
    }
}

/// Detect and resolve all player bumps for this tick.
///
/// Every pair is judged against positions from before any push. Each
/// unshielded participant is shoved sideways, loses lateral speed and is
/// stunned; a shielded one is unaffected.
pub fn resolve_player_collisions(state: &mut RaceState) -> Vec<PlayerCollision> {
    let collisions = check_all_player_collisions(&state.players);
    if collisions.is_empty() {
        return collisions;
    }

    let mut pushes = vec![0.0f64; state.players.len()];
    let mut bumped = vec![false; state.players.len()];

    for collision in &collisions {
        let ia = index_of(&state.players, collision.a);
        let ib = index_of(&state.players, collision.b);
        let (Some(ia), Some(ib)) = (ia, ib) else {
            continue;
        };
        let (a, b) = (&state.players[ia], &state.players[ib]);

        if a.has_shield && b.has_shield {
            continue;
        }
        if !a.has_shield {
            pushes[ia] += push_direction(a, b) * COLLISION_PUSH;
            bumped[ia] = true;
        }
        if !b.has_shield {
            pushes[ib] += push_direction(b, a) * COLLISION_PUSH;
            bumped[ib] = true;
        }
    }

    let tick = state.tick;
    for (idx, player) in state.players.iter_mut().enumerate() {
        if !bumped[idx] {
            continue;
        }
        player.x += pushes[idx];
        player.lateral_speed = 0.0;
        player.stun_timer = COLLISION_STUN;
        clamp_to_segment(player, state.track.segment_at(player.distance_traveled));
    }

    for collision in &collisions {
        tracing::debug!(tick, a = %collision.a, b = %collision.b, "players collided");
        state.push_event(RaceEvent::collision(tick, collision.a, collision.b));
    }

    collisions
}

fn index_of(players: &[PlayerState], id: PlayerId) -> Option<usize> {
    players.iter().position(|p| p.id == id)
}

// =============================================================================
// TRACK OBJECT EFFECTS
// =============================================================================

/// Apply an obstacle hit. Returns false if a shield absorbed it.
pub fn apply_obstacle(player: &mut PlayerState, kind: ObstacleKind, segment: &TrackSegment) -> bool {
    if player.has_shield {
        return false;
    }

    match kind {
        ObstacleKind::Barrel => {
            player.forward_speed *= BARREL_SPEED_MULT;
            player.stun_timer = BARREL_STUN;
        }
        ObstacleKind::Ring => {
            player.forward_speed *= RING_SPEED_MULT;
            player.lateral_speed = -player.lateral_speed * RING_LATERAL_DAMPING;
        }
        ObstacleKind::Bumper => {
            let away = if player.x < TRACK_CENTER_X { -1.0 } else { 1.0 };
            player.x += away * BUMPER_PUSH;
            player.stun_timer = BUMPER_STUN;
            clamp_to_segment(player, segment);
        }
    }
    true
}

/// Apply a powerup pickup. Timers are reset, never stacked.
pub fn apply_powerup(player: &mut PlayerState, kind: PowerupKind) {
    match kind {
        PowerupKind::SpeedBoost => player.speed_boost_timer = SPEED_BOOST_DURATION,
        PowerupKind::Shield => {
            player.has_shield = true;
            player.shield_timer = SHIELD_DURATION;
        }
        PowerupKind::JumpBoost => player.jump_boost_timer = JUMP_BOOST_DURATION,
    }
}

// =============================================================================
// TRACK OBJECT CONTACTS
// =============================================================================

/// A player touching a track object this tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TrackContact {
    /// Obstacle in the player's lane, not yet hit by this player
    Obstacle {
        player_id: PlayerId,
        key: ObjectKey,
        kind: ObstacleKind,
    },
    /// Powerup in the player's lane, not yet taken by anyone
    Powerup {
        player_id: PlayerId,
        key: ObjectKey,
        kind: PowerupKind,
    },
}

/// Objects a single player is touching: same lane, within the proximity
/// window, not already spent.
pub fn contacts_for(state: &RaceState, player: &PlayerState) -> Vec<TrackContact> {
    let mut contacts = Vec::new();
    if !player.is_grounded_racer() {
        return contacts;
    }

    let d = player.distance_traveled;
    let (from, to) = (d - OBJECT_PROXIMITY, d + OBJECT_PROXIMITY);

    for obstacle in state.track.obstacles_between(from, to) {
        if obstacle.lane == player.lane
            && (obstacle.distance - d).abs() < OBJECT_PROXIMITY
            && !state.obstacle_hits.contains(&(player.id, obstacle.key))
        {
            contacts.push(TrackContact::Obstacle {
                player_id: player.id,
                key: obstacle.key,
                kind: obstacle.kind,
            });
        }
    }

    for powerup in state.track.powerups_between(from, to) {
        if powerup.lane == player.lane
            && (powerup.distance - d).abs() < OBJECT_PROXIMITY
            && !state.consumed_powerups.contains(&powerup.key)
        {
            contacts.push(TrackContact::Powerup {
                player_id: player.id,
                key: powerup.key,
                kind: powerup.kind,
            });
        }
    }

    contacts
}

/// Resolve every track-object contact for this tick, in roster order.
///
/// A powerup reached by two players on the same tick goes to the one
/// earlier in the roster.
pub fn process_track_objects(state: &mut RaceState) {
    let tick = state.tick;

    for idx in 0..state.players.len() {
        let contacts = contacts_for(state, &state.players[idx]);

        for contact in contacts {
            match contact {
                TrackContact::Obstacle { player_id, key, kind } => {
                    state.obstacle_hits.insert((player_id, key));
                    let player = &mut state.players[idx];
                    let segment = state.track.segment_at(player.distance_traveled);
                    let applied = apply_obstacle(player, kind, segment);
                    tracing::debug!(tick, player = %player_id, ?kind, blocked = !applied, "obstacle hit");
                    state.push_event(RaceEvent::obstacle_hit(tick, player_id, key, kind, !applied));
                }
                TrackContact::Powerup { player_id, key, kind } => {
                    if !state.consumed_powerups.insert(key) {
                        continue;
                    }
                    apply_powerup(&mut state.players[idx], kind);
                    tracing::debug!(tick, player = %player_id, ?kind, "powerup collected");
                    state.push_event(RaceEvent::powerup_collected(tick, player_id, key, kind));
                }
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::track::{GameMode, SegmentKind};

    fn flat() -> TrackSegment {
        TrackSegment::new(SegmentKind::Straight, 1000.0, 5, 0.985, 0.0)
    }

    fn racer(id: u32, x: f64, d: f64) -> PlayerState {
        PlayerState::new(PlayerId::new(id), format!("p{id}"), x, d)
    }

    fn race_with(players: Vec<PlayerState>) -> RaceState {
        let mut state = RaceState::new(1, GameMode::Classic, 45.0);
        for p in players {
            let (x, d) = (p.x, p.distance_traveled);
            let id = state.add_player(p);
            let placed = state.player_mut(id).unwrap();
            placed.x = x;
            placed.distance_traveled = d;
            placed.lane = flat().lane_at(x);
        }
        state
    }

    #[test]
    fn test_far_players_never_collide() {
        let a = racer(0, 400.0, 0.0);
        let b = racer(1, 400.0, 200.0);
        assert!(!players_collide(&a, &b));

        let c = racer(2, 200.0, 0.0);
        let d = racer(3, 400.0, 0.0);
        assert!(!players_collide(&c, &d));
    }

    #[test]
    fn test_jumping_or_finished_never_collide() {
        let a = racer(0, 400.0, 100.0);
        let mut b = racer(1, 405.0, 100.0);
        assert!(players_collide(&a, &b));

        b.is_jumping = true;
        assert!(!players_collide(&a, &b));

        b.is_jumping = false;
        b.finished = true;
        assert!(!players_collide(&a, &b));
    }

    #[test]
    fn test_bump_pushes_apart_and_stuns() {
        let mut state = race_with(vec![racer(0, 390.0, 100.0), racer(1, 410.0, 100.0)]);
        state.players[0].lateral_speed = 50.0;

        let collisions = resolve_player_collisions(&mut state);
        assert_eq!(collisions.len(), 1);

        assert_eq!(state.players[0].x, 390.0 - COLLISION_PUSH);
        assert_eq!(state.players[1].x, 410.0 + COLLISION_PUSH);
        assert_eq!(state.players[0].lateral_speed, 0.0);
        assert_eq!(state.players[0].stun_timer, COLLISION_STUN);
        assert_eq!(state.players[1].stun_timer, COLLISION_STUN);
        assert_eq!(state.take_events().len(), 1);
    }

    #[test]
    fn test_aligned_bump_splits_by_id() {
        let mut state = race_with(vec![racer(0, 400.0, 100.0), racer(1, 400.0, 110.0)]);
        resolve_player_collisions(&mut state);
        assert!(state.players[0].x < state.players[1].x);
    }

    #[test]
    fn test_shield_blocks_bump() {
        let mut state = race_with(vec![racer(0, 390.0, 100.0), racer(1, 410.0, 100.0)]);
        state.players[0].has_shield = true;
        state.players[0].shield_timer = 2.0;

        resolve_player_collisions(&mut state);
        assert_eq!(state.players[0].x, 390.0);
        assert_eq!(state.players[0].stun_timer, 0.0);
        assert!(state.players[1].stun_timer > 0.0);

        let mut both = race_with(vec![racer(0, 390.0, 100.0), racer(1, 410.0, 100.0)]);
        for p in &mut both.players {
            p.has_shield = true;
        }
        let before = both.players.clone();
        resolve_player_collisions(&mut both);
        assert_eq!(both.players, before);
    }

    #[test]
    fn test_bump_outcome_independent_of_roster_order() {
        let spots = [(380.0, 100.0), (400.0, 105.0), (420.0, 100.0)];
        let forward = race_with(spots.iter().enumerate().map(|(i, &(x, d))| racer(i as u32, x, d)).collect());
        let mut a = forward.clone();
        let mut b = forward.clone();
        b.players.reverse();

        resolve_player_collisions(&mut a);
        resolve_player_collisions(&mut b);
        for p in &a.players {
            let q = b.player(p.id).unwrap();
            assert_eq!(p.x, q.x);
            assert_eq!(p.stun_timer, q.stun_timer);
        }
    }

    #[test]
    fn test_bump_respects_rails() {
        let mut state = race_with(vec![racer(0, 210.0, 100.0), racer(1, 220.0, 100.0)]);
        resolve_player_collisions(&mut state);
        assert_eq!(state.players[0].x, 210.0);
        assert_eq!(state.players[0].lane, 0);
    }

    #[test]
    fn test_obstacle_effects() {
        let segment = flat();

        let mut p = racer(0, 400.0, 0.0);
        p.forward_speed = 100.0;
        assert!(apply_obstacle(&mut p, ObstacleKind::Barrel, &segment));
        assert_eq!(p.forward_speed, 50.0);
        assert_eq!(p.stun_timer, BARREL_STUN);

        let mut p = racer(0, 400.0, 0.0);
        p.forward_speed = 100.0;
        p.lateral_speed = 40.0;
        apply_obstacle(&mut p, ObstacleKind::Ring, &segment);
        assert_eq!(p.forward_speed, 70.0);
        assert_eq!(p.lateral_speed, -20.0);

        let mut p = racer(0, 300.0, 0.0);
        apply_obstacle(&mut p, ObstacleKind::Bumper, &segment);
        assert_eq!(p.x, 240.0);
        assert_eq!(p.stun_timer, BUMPER_STUN);
    }

    #[test]
    fn test_shield_blocks_obstacles() {
        let segment = flat();
        for kind in [ObstacleKind::Barrel, ObstacleKind::Ring, ObstacleKind::Bumper] {
            let mut p = racer(0, 300.0, 0.0);
            p.has_shield = true;
            p.forward_speed = 120.0;
            p.lateral_speed = 30.0;
            let before = p.clone();
            assert!(!apply_obstacle(&mut p, kind, &segment));
            assert_eq!(p, before);
        }
    }

    #[test]
    fn test_powerups_reset_timers() {
        let mut p = racer(0, 400.0, 0.0);
        apply_powerup(&mut p, PowerupKind::SpeedBoost);
        p.speed_boost_timer = 1.0;
        apply_powerup(&mut p, PowerupKind::SpeedBoost);
        assert_eq!(p.speed_boost_timer, SPEED_BOOST_DURATION);

        apply_powerup(&mut p, PowerupKind::Shield);
        assert!(p.has_shield);
        assert_eq!(p.shield_timer, SHIELD_DURATION);

        apply_powerup(&mut p, PowerupKind::JumpBoost);
        assert_eq!(p.jump_boost_timer, JUMP_BOOST_DURATION);
    }

    #[test]
    fn test_track_objects_hit_once() {
        // Classic track: barrel in lane 1 at 425, speed boost in lane 2 at 210
        let mut state = race_with(vec![racer(0, 280.0, 420.0), racer(1, 400.0, 205.0), racer(2, 400.0, 212.0)]);
        state.players[0].forward_speed = 100.0;

        process_track_objects(&mut state);
        assert_eq!(state.players[0].forward_speed, 50.0);
        assert!(state.players[1].is_speed_boosted());
        assert!(!state.players[2].is_speed_boosted());
        assert_eq!(state.take_events().len(), 2);

        // Same spot next tick: nothing left to touch
        state.players[0].stun_timer = 0.0;
        process_track_objects(&mut state);
        assert_eq!(state.players[0].forward_speed, 50.0);
        assert!(state.take_events().is_empty());
    }

    #[test]
    fn test_jumping_player_clears_objects() {
        let mut state = race_with(vec![racer(0, 280.0, 420.0)]);
        state.players[0].is_jumping = true;
        process_track_objects(&mut state);
        assert!(state.obstacle_hits.is_empty());
    }
}
