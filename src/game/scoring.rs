//! Scoring
//!
//! Position points plus a time bonus for finishing early.

/// Points per place above last
pub const POSITION_POINTS: u32 = 100;

/// Bonus points per second under the match length
pub const TIME_BONUS_PER_SECOND: f64 = 10.0;

/// Points for finishing position `position` (1-based) out of `total_players`.
pub fn position_score(total_players: usize, position: u8) -> u32 {
    let places = total_players as i64 - i64::from(position) + 1;
    (places.max(0) as u32).saturating_mul(POSITION_POINTS)
}

/// Bonus for finishing `finish_time` seconds into a `match_length` race.
pub fn time_bonus(match_length: f64, finish_time: f64) -> u32 {
    let bonus = ((match_length - finish_time) * TIME_BONUS_PER_SECOND).floor();
    if bonus.is_finite() && bonus > 0.0 {
        bonus.min(u32::MAX as f64) as u32
    } else {
        0
    }
}

/// Total score. Never negative.
pub fn compute_score(total_players: usize, position: u8, match_length: f64, finish_time: f64) -> u32 {
    position_score(total_players, position).saturating_add(time_bonus(match_length, finish_time))
}
