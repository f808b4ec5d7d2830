//! Player entity, control resolution and the per-tick movement step.

use crate::config::Arena;
use shared::{PlayerControl, PlayerState};
use std::collections::BTreeSet;

/// Authoritative state of one connected participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: String,
    pub color: String,
    /// Top-left corner of the bounding box
    pub position: (u32, u32),
    /// Change in position per tick
    pub velocity: (i32, i32),
    /// Seconds since the game session started
    pub age: u64,
}

impl Player {
    pub fn new(id: impl Into<String>, color: impl Into<String>, position: (u32, u32)) -> Self {
        Self {
            id: id.into(),
            color: color.into(),
            position,
            velocity: (0, 0),
            age: 0,
        }
    }

    /// Public view of the player, without velocity
    pub fn state(&self) -> PlayerState {
        PlayerState {
            id: self.id.clone(),
            color: self.color.clone(),
            x: self.position.0,
            y: self.position.1,
            age: self.age,
        }
    }
}

/// Resolves a set of pressed controls into a velocity.
///
/// Duplicates are ignored. Controls are examined in `PlayerControl` order and
/// the last one touching an axis wins, so `Down` beats `Up` and `Right`
/// beats `Left` no matter how the client listed them.
pub fn velocity_for(pressed: &[PlayerControl], speed: i32) -> (i32, i32) {
    let controls: BTreeSet<PlayerControl> = pressed.iter().copied().collect();
    let mut velocity = (0, 0);

    for control in controls {
        match control {
            PlayerControl::Up => velocity.1 = -speed,
            PlayerControl::Down => velocity.1 = speed,
            PlayerControl::Left => velocity.0 = -speed,
            PlayerControl::Right => velocity.0 = speed,
        }
    }
    velocity
}

/// Moves the player by its velocity.
///
/// Each axis moves only if the whole bounding box stays inside the arena;
/// otherwise that axis keeps its position for this tick.
pub fn advance(player: &mut Player, arena: &Arena) {
    if let Some(x) = step_axis(player.position.0, player.velocity.0, arena.max_x()) {
        player.position.0 = x;
    }
    if let Some(y) = step_axis(player.position.1, player.velocity.1, arena.max_y()) {
        player.position.1 = y;
    }
}

fn step_axis(position: u32, velocity: i32, max: u32) -> Option<u32> {
    let next = i64::from(position) + i64::from(velocity);
    if (0..=i64::from(max)).contains(&next) {
        u32::try_from(next).ok()
    } else {
        None
    }
}
