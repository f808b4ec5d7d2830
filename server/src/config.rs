//! Runtime configuration for the arena server.
//!
//! Values are fixed for the lifetime of the process. The binary fills them
//! from command-line flags or environment variables; tests build them
//! directly.

use shared::{
    ARENA_HEIGHT, ARENA_WIDTH, DEFAULT_PORT, IDLE_TIMEOUT_SECS, PLAYER_HEIGHT, PLAYER_SPEED,
    PLAYER_WIDTH, TICK_RATE, TIME_LIMIT_SECS,
};
use std::time::Duration;

/// Geometry and movement rules of the play field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arena {
    pub width: u32,
    pub height: u32,
    pub player_width: u32,
    pub player_height: u32,
    /// Pixels moved per tick along an axis while a control is held
    pub speed: i32,
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            width: ARENA_WIDTH,
            height: ARENA_HEIGHT,
            player_width: PLAYER_WIDTH,
            player_height: PLAYER_HEIGHT,
            speed: PLAYER_SPEED,
        }
    }
}

impl Arena {
    /// Largest x a player may occupy
    pub fn max_x(&self) -> u32 {
        self.width.saturating_sub(self.player_width)
    }

    /// Largest y a player may occupy
    pub fn max_y(&self) -> u32 {
        self.height.saturating_sub(self.player_height)
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Ticks simulated per second
    pub tick_rate: u32,
    /// Session length after which the game loop ends on its own
    pub time_limit: Duration,
    /// How long the server stays up with no connections
    pub idle_timeout: Duration,
    pub arena: Arena,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            tick_rate: TICK_RATE,
            time_limit: Duration::from_secs(TIME_LIMIT_SECS),
            idle_timeout: Duration::from_secs(IDLE_TIMEOUT_SECS),
            arena: Arena::default(),
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Delay between two ticks. A zero tick rate is treated as one tick per
    /// second, and the delay never drops below one nanosecond.
    pub fn tick_delay(&self) -> Duration {
        (Duration::from_secs(1) / self.tick_rate.max(1)).max(Duration::from_nanos(1))
    }

    pub fn time_limit_secs(&self) -> u64 {
        self.time_limit.as_secs()
    }
}
