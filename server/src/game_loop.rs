//! Fixed-tick game loop.
//!
//! The loop is split in two parts: [`GameLoop`] is a synchronous state
//! machine that knows what one tick does, and [`TickScheduler`] is the only
//! place where the loop suspends between ticks. The server's event loop
//! awaits the scheduler and then runs exactly one tick, so a tick never
//! overlaps message handling.

use crate::game::GameRepository;
use log::info;
use shared::{SocketMessage, ALL_PLAYERS_LEFT, TIME_LIMIT_REACHED};
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Stopped,
    Running,
}

/// Result of one tick, to be broadcast to every client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The session goes on; carries the fresh `gameUpdate`
    Update(SocketMessage),
    /// The session ended; carries the `gameOverUpdate`
    Finished(SocketMessage),
}

pub struct GameLoop {
    ticks_per_second: u32,
    time_limit_secs: u64,
    /// Ticks since the last whole second
    tick_count: u32,
    state: LoopState,
}

impl GameLoop {
    pub fn new(ticks_per_second: u32, time_limit_secs: u64) -> Self {
        Self {
            ticks_per_second: ticks_per_second.max(1),
            time_limit_secs,
            tick_count: 0,
            state: LoopState::Stopped,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// `true` while ticks are being scheduled
    pub fn is_active(&self) -> bool {
        self.state == LoopState::Running
    }

    /// Running and not asked to stop
    pub fn is_running(&self, game: &dyn GameRepository) -> bool {
        self.is_active() && game.is_running()
    }

    /// Starts a new session. Returns `false` if one is already running.
    ///
    /// A stop request that has not been observed by a tick yet is cancelled
    /// by a start; the session then continues with a reset clock.
    pub fn start(&mut self, game: &mut dyn GameRepository) -> bool {
        if self.is_running(game) {
            return false;
        }
        info!("Starting game loop");
        game.set_age(0);
        game.set_running(true);
        self.tick_count = 0;
        self.state = LoopState::Running;
        true
    }

    /// Requests a stop. The loop finishes at its next tick.
    pub fn stop(&self, game: &mut dyn GameRepository) {
        game.set_running(false);
    }

    /// Runs one tick. Returns `None` when the loop is stopped.
    pub fn tick(&mut self, game: &mut dyn GameRepository) -> Option<TickOutcome> {
        if !self.is_active() {
            return None;
        }

        if !game.is_running() {
            return Some(self.finish(game, ALL_PLAYERS_LEFT));
        }
        if game.age() >= self.time_limit_secs {
            return Some(self.finish(game, TIME_LIMIT_REACHED));
        }

        self.tick_count = (self.tick_count + 1) % self.ticks_per_second;
        if self.tick_count == 0 {
            game.set_age(game.age() + 1);
        }
        game.advance_players();

        Some(TickOutcome::Update(game.game_update()))
    }

    fn finish(&mut self, game: &mut dyn GameRepository, reason: &str) -> TickOutcome {
        game.set_running(false);
        self.state = LoopState::Stopped;
        self.tick_count = 0;
        info!("Game loop closed after {}s: {}", game.age(), reason);
        TickOutcome::Finished(SocketMessage::game_over(reason))
    }
}

/// Fixed-interval tick source. Late ticks are skipped rather than bunched.
pub struct TickScheduler {
    period: Duration,
    interval: Interval,
}

impl TickScheduler {
    /// Must be called inside a tokio runtime
    pub fn new(period: Duration) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { period, interval }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Re-phases the schedule so the next tick is one period from now
    pub fn restart(&mut self) {
        self.interval.reset();
    }

    /// Suspends until the next tick is due
    pub async fn next_tick(&mut self) -> Instant {
        self.interval.tick().await
    }
}
