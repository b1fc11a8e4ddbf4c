//! Race Events
//!
//! Discrete events emitted per tick for rendering, HUD and audio
//! collaborators. Events never feed back into the simulation.

use serde::{Deserialize, Serialize};

use crate::game::state::PlayerId;
use crate::game::track::{ObjectKey, ObstacleKind, PowerupKind};

/// Priority for event ordering within a tick.
///
/// Lower value = reported first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventPriority {
    /// Player-vs-player contact
    Collision = 0,
    /// Obstacle contact
    ObstacleHit = 1,
    /// Powerup pickups
    PowerupCollected = 2,
    /// Crossing the line
    PlayerFinished = 3,
    /// Lowest priority
    RaceEnded = 255,
}

/// Race event payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RaceEventData {
    /// Two players bumped
    Collision {
        a: PlayerId,
        b: PlayerId,
    },

    /// A player hit an obstacle
    ObstacleHit {
        player_id: PlayerId,
        obstacle: ObjectKey,
        kind: ObstacleKind,
        /// Shield absorbed the hit
        blocked: bool,
    },

    /// A player picked up a powerup
    PowerupCollected {
        player_id: PlayerId,
        powerup: ObjectKey,
        kind: PowerupKind,
    },

    /// A player finished (or was force-finished)
    PlayerFinished {
        player_id: PlayerId,
        position: u8,
        finish_time: f64,
        score: u32,
        /// Placed by the time limit rather than crossing the line
        forced: bool,
    },

    /// The race is over
    RaceEnded {
        winner_id: Option<PlayerId>,
        duration_ticks: u32,
    },
}

/// A race event with timing and priority.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RaceEvent {
    /// Tick when the event occurred
    pub tick: u32,

    /// Ordering priority
    pub priority: EventPriority,

    /// Player involved (for tie-breaking)
    pub player_id: Option<PlayerId>,

    /// Event data
    pub data: RaceEventData,
}

impl RaceEvent {
    /// Create a new event.
    pub fn new(tick: u32, priority: EventPriority, data: RaceEventData) -> Self {
        let player_id = match &data {
            RaceEventData::Collision { a, .. } => Some(*a),
            RaceEventData::ObstacleHit { player_id, .. } => Some(*player_id),
            RaceEventData::PowerupCollected { player_id, .. } => Some(*player_id),
            RaceEventData::PlayerFinished { player_id, .. } => Some(*player_id),
            RaceEventData::RaceEnded { winner_id, .. } => *winner_id,
        };

        Self {
            tick,
            priority,
            player_id,
            data,
        }
    }

    /// Create collision event. The lower id is reported first.
    pub fn collision(tick: u32, a: PlayerId, b: PlayerId) -> Self {
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        Self::new(tick, EventPriority::Collision, RaceEventData::Collision { a, b })
    }

    /// Create obstacle hit event.
    pub fn obstacle_hit(
        tick: u32,
        player_id: PlayerId,
        obstacle: ObjectKey,
        kind: ObstacleKind,
        blocked: bool,
    ) -> Self {
        Self::new(
            tick,
            EventPriority::ObstacleHit,
            RaceEventData::ObstacleHit {
                player_id,
                obstacle,
                kind,
                blocked,
            },
        )
    }

    /// Create powerup collected event.
    pub fn powerup_collected(tick: u32, player_id: PlayerId, powerup: ObjectKey, kind: PowerupKind) -> Self {
        Self::new(
            tick,
            EventPriority::PowerupCollected,
            RaceEventData::PowerupCollected {
                player_id,
                powerup,
                kind,
            },
        )
    }

    /// Create player finished event.
    pub fn player_finished(
        tick: u32,
        player_id: PlayerId,
        position: u8,
        finish_time: f64,
        score: u32,
        forced: bool,
    ) -> Self {
        Self::new(
            tick,
            EventPriority::PlayerFinished,
            RaceEventData::PlayerFinished {
                player_id,
                position,
                finish_time,
                score,
                forced,
            },
        )
    }

    /// Create race ended event.
    pub fn race_ended(tick: u32, winner_id: Option<PlayerId>) -> Self {
        Self::new(
            tick,
            EventPriority::RaceEnded,
            RaceEventData::RaceEnded {
                winner_id,
                duration_ticks: tick,
            },
        )
    }

    /// Sort key: tick, then priority, then player.
    pub fn order_key(&self) -> (u32, EventPriority, Option<PlayerId>) {
        (self.tick, self.priority, self.player_id)
    }
}

/// Sort events into reporting order. Stable, so same-key events keep
/// the order they were generated in.
pub fn sort_events(events: &mut [RaceEvent]) {
    events.sort_by_key(RaceEvent::order_key);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_ordering() {
        let p1 = PlayerId::new(1);
        let p2 = PlayerId::new(2);

        let mut events = vec![
            RaceEvent::powerup_collected(10, p1, (0, 0), PowerupKind::Shield),
            RaceEvent::race_ended(10, Some(p1)),
            RaceEvent::obstacle_hit(10, p2, (1, 0), ObstacleKind::Barrel, false),
            RaceEvent::obstacle_hit(10, p1, (1, 0), ObstacleKind::Barrel, true),
            RaceEvent::collision(9, p2, p1),
        ];
        sort_events(&mut events);

        assert!(matches!(events[0].data, RaceEventData::Collision { .. }));
        assert_eq!(events[1].player_id, Some(p1));
        assert_eq!(events[2].player_id, Some(p2));
        assert!(matches!(events[3].data, RaceEventData::PowerupCollected { .. }));
        assert!(matches!(events[4].data, RaceEventData::RaceEnded { .. }));
    }

    #[test]
    fn test_collision_normalizes_pair() {
        let event = RaceEvent::collision(5, PlayerId::new(3), PlayerId::new(1));
        assert_eq!(
            event.data,
            RaceEventData::Collision {
                a: PlayerId::new(1),
                b: PlayerId::new(3)
            }
        );
        assert_eq!(event.player_id, Some(PlayerId::new(1)));
    }
}
