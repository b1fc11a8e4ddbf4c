//! Player Kinematics
//!
//! `advance` is the single per-tick transform of a player's motion.
//! It is a pure function of (player, input, segment, dt); the step
//! order below changes numeric outcomes and must not be rearranged.

use crate::game::input::InputState;
use crate::game::state::PlayerState;
use crate::game::track::TrackSegment;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Forward acceleration on flat track (units/s²)
pub const BASE_ACCEL: f64 = 150.0;

/// Forward speed cap without boost (units/s)
pub const MAX_FORWARD_SPEED: f64 = 200.0;

/// Multiplier on acceleration and cap while speed-boosted
pub const SPEED_BOOST_MULT: f64 = 1.5;

/// Slope to acceleration factor (negative slope = downhill)
pub const SLOPE_FACTOR: f64 = 50.0;

/// Lateral acceleration while steering (units/s²)
pub const LATERAL_ACCEL: f64 = 600.0;

/// Lateral speed cap (units/s)
pub const MAX_LATERAL_SPEED: f64 = 240.0;

/// Lateral decay when not steering (units/s²)
pub const LATERAL_FRICTION: f64 = 900.0;

/// Base airtime (seconds)
pub const JUMP_DURATION: f64 = 0.5;

/// Airtime multiplier while jump-boosted
pub const JUMP_BOOST_MULT: f64 = 1.6;

/// Forward speed added on landing (units/s)
pub const LANDING_BOOST: f64 = 20.0;

// =============================================================================
// ADVANCE
// =============================================================================

/// Advance one player by one tick.
///
/// Steps, in order:
/// 1. finished players are untouched
/// 2. modifier timers count down (shield flag clears at zero)
/// 3. stunned players stop here
/// 4. forward speed: accelerate, boost-scale, clamp, friction
/// 5. lateral speed: steer or decay toward zero
/// 6. jump start / airtime countdown / landing boost
/// 7. integrate position
/// 8. clamp `x` to the segment's lane bounds
/// 9. recompute `lane`
pub fn advance(player: &mut PlayerState, input: InputState, segment: &TrackSegment, dt: f64) {
    if player.finished {
        return;
    }

    tick_timers(player, dt);

    if player.is_stunned() {
        return;
    }

    update_forward_speed(player, segment, dt);
    update_lateral_speed(player, input, dt);
    update_jump(player, input, dt);

    player.x += player.lateral_speed * dt;
    player.distance_traveled += player.forward_speed * dt;

    clamp_to_segment(player, segment);
}

/// Clamp `x` into the segment's lane bounds and recompute `lane`.
///
/// Hard wall: lateral speed is left as is.
pub fn clamp_to_segment(player: &mut PlayerState, segment: &TrackSegment) {
    let (min_x, max_x) = segment.lane_bounds();
    player.x = player.x.clamp(min_x, max_x);
    player.lane = segment.lane_at(player.x);
}

fn tick_timers(player: &mut PlayerState, dt: f64) {
    player.stun_timer = countdown(player.stun_timer, dt);
    player.shield_timer = countdown(player.shield_timer, dt);
    player.speed_boost_timer = countdown(player.speed_boost_timer, dt);
    player.jump_boost_timer = countdown(player.jump_boost_timer, dt);

    if player.shield_timer <= 0.0 {
        player.has_shield = false;
    }
}

#[inline]
fn countdown(timer: f64, dt: f64) -> f64 {
    if timer > 0.0 {
        (timer - dt).max(0.0)
    } else {
        timer
    }
}

fn update_forward_speed(player: &mut PlayerState, segment: &TrackSegment, dt: f64) {
    let slope_boost = -segment.slope * SLOPE_FACTOR;
    let mut increment = (BASE_ACCEL + slope_boost) * dt;
    let mut cap = MAX_FORWARD_SPEED;

    if player.is_speed_boosted() {
        increment *= SPEED_BOOST_MULT;
        cap *= SPEED_BOOST_MULT;
    }

    let speed = (player.forward_speed + increment).clamp(0.0, cap);
    player.forward_speed = speed * segment.friction;
}

fn update_lateral_speed(player: &mut PlayerState, input: InputState, dt: f64) {
    let direction = input.right as i8 - input.left as i8;

    if direction != 0 {
        let speed = player.lateral_speed + f64::from(direction) * LATERAL_ACCEL * dt;
        player.lateral_speed = speed.clamp(-MAX_LATERAL_SPEED, MAX_LATERAL_SPEED);
    } else if player.lateral_speed > 0.0 {
        player.lateral_speed = (player.lateral_speed - LATERAL_FRICTION * dt).max(0.0);
    } else if player.lateral_speed < 0.0 {
        player.lateral_speed = (player.lateral_speed + LATERAL_FRICTION * dt).min(0.0);
    }
}

fn update_jump(player: &mut PlayerState, input: InputState, dt: f64) {
    if !player.is_jumping {
        if input.jump {
            player.is_jumping = true;
            player.jump_timer = if player.is_jump_boosted() {
                JUMP_DURATION * JUMP_BOOST_MULT
            } else {
                JUMP_DURATION
            };
        }
        return;
    }

    player.jump_timer -= dt;
    if player.jump_timer <= 0.0 {
        player.jump_timer = 0.0;
        player.is_jumping = false;
        player.forward_speed += LANDING_BOOST;
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::PlayerId;
    use crate::game::track::{SegmentKind, TrackSegment, TRACK_CENTER_X};
    use crate::DT;
    use proptest::prelude::*;

    fn flat() -> TrackSegment {
        TrackSegment::new(SegmentKind::Straight, 1000.0, 5, 0.985, 0.0)
    }

    fn racer() -> PlayerState {
        PlayerState::new(PlayerId::new(0), "test", TRACK_CENTER_X, 0.0)
    }

    #[test]
    fn test_advance_determinism() {
        let segment = flat();
        let run = || {
            let mut p = racer();
            for i in 0..120 {
                let input = InputState::new(i % 7 == 0, i % 5 == 0, i % 30 == 0);
                advance(&mut p, input, &segment, DT);
            }
            p
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_stun_freezes_motion() {
        let segment = flat();
        let mut p = racer();
        p.lateral_speed = -100.0;
        p.forward_speed = 150.0;
        p.stun_timer = 0.5;

        let before = p.clone();
        advance(&mut p, InputState::steer_left(), &segment, DT);

        assert_eq!(p.x, before.x);
        assert_eq!(p.distance_traveled, before.distance_traveled);
        assert!(p.stun_timer < before.stun_timer);
    }

    #[test]
    fn test_finished_player_is_inert() {
        let segment = flat();
        let mut p = racer();
        p.finished = true;
        p.forward_speed = 180.0;
        p.stun_timer = 1.0;

        let before = p.clone();
        advance(&mut p, InputState::new(true, false, true), &segment, DT);
        assert_eq!(p, before);
    }

    #[test]
    fn test_speed_boost_raises_speed() {
        let segment = flat();
        let mut plain = racer();
        let mut boosted = racer();
        boosted.speed_boost_timer = 100.0;

        for _ in 0..600 {
            advance(&mut plain, InputState::NEUTRAL, &segment, DT);
            advance(&mut boosted, InputState::NEUTRAL, &segment, DT);
        }

        assert!(boosted.forward_speed > plain.forward_speed);
        assert!(boosted.distance_traveled > plain.distance_traveled);
    }

    #[test]
    fn test_downhill_is_faster() {
        let mut downhill = flat();
        downhill.slope = -0.2;
        let mut a = racer();
        let mut b = racer();
        for _ in 0..60 {
            advance(&mut a, InputState::NEUTRAL, &flat(), DT);
            advance(&mut b, InputState::NEUTRAL, &downhill, DT);
        }
        assert!(b.forward_speed > a.forward_speed);
    }

    #[test]
    fn test_lateral_decay_stops_at_zero() {
        let segment = flat();
        let mut p = racer();
        p.lateral_speed = 10.0;
        advance(&mut p, InputState::NEUTRAL, &segment, DT);
        assert_eq!(p.lateral_speed, 0.0);

        p.lateral_speed = -10.0;
        advance(&mut p, InputState::NEUTRAL, &segment, DT);
        assert_eq!(p.lateral_speed, 0.0);
    }

    #[test]
    fn test_lateral_speed_capped() {
        let segment = flat();
        let mut p = racer();
        for _ in 0..120 {
            advance(&mut p, InputState::steer_right(), &segment, DT);
        }
        assert_eq!(p.lateral_speed, MAX_LATERAL_SPEED);
    }

    #[test]
    fn test_jump_lands_with_boost() {
        let segment = flat();
        let mut p = racer();
        p.forward_speed = 100.0;

        advance(&mut p, InputState::new(false, false, true), &segment, DT);
        assert!(p.is_jumping);
        assert_eq!(p.jump_timer, JUMP_DURATION);

        let mut ticks = 0;
        while p.is_jumping {
            let before = p.forward_speed;
            advance(&mut p, InputState::NEUTRAL, &segment, DT);
            ticks += 1;
            if !p.is_jumping {
                let no_landing = (before + BASE_ACCEL * DT).min(MAX_FORWARD_SPEED) * segment.friction;
                assert!((p.forward_speed - (no_landing + LANDING_BOOST)).abs() < 1e-9);
            }
        }
        // 0.5 s of airtime, give or take float accumulation
        assert!((30..=31).contains(&ticks));
    }

    #[test]
    fn test_jump_boost_extends_airtime() {
        let segment = flat();
        let mut p = racer();
        p.jump_boost_timer = 5.0;
        advance(&mut p, InputState::new(false, false, true), &segment, DT);
        assert_eq!(p.jump_timer, JUMP_DURATION * JUMP_BOOST_MULT);
    }

    #[test]
    fn test_shield_expires() {
        let segment = flat();
        let mut p = racer();
        p.has_shield = true;
        p.shield_timer = DT / 2.0;
        advance(&mut p, InputState::NEUTRAL, &segment, DT);
        assert_eq!(p.shield_timer, 0.0);
        assert!(!p.has_shield);
    }

    #[test]
    fn test_rail_is_hard_wall() {
        let segment = flat();
        let (min_x, _) = segment.lane_bounds();
        let mut p = racer();
        for _ in 0..300 {
            advance(&mut p, InputState::steer_left(), &segment, DT);
        }
        assert_eq!(p.x, min_x);
        assert_eq!(p.lane, 0);
    }

    proptest! {
        #[test]
        fn prop_x_stays_in_lane_bounds(
            masks in proptest::collection::vec(0u8..8, 1..400),
            lanes in prop_oneof![Just(3usize), Just(5usize)],
        ) {
            let segment = TrackSegment::new(SegmentKind::Straight, 1000.0, lanes, 0.985, 0.0);
            let (min_x, max_x) = segment.lane_bounds();
            let mut p = racer();
            for mask in masks {
                let input = InputState::from_bits(mask).unwrap();
                advance(&mut p, input, &segment, DT);
                prop_assert!(p.x >= min_x && p.x <= max_x);
                prop_assert!(p.lane < lanes);
            }
        }
    }
}
