//! Starts the game loop when clients arrive and shuts an idle server down.

use crate::game::GameRepository;
use crate::game_loop::GameLoop;
use log::info;
use std::time::Duration;
use tokio::time::Instant;

/// A single cancellable deadline.
///
/// Arming replaces any previous deadline, so the timer can be armed and
/// cancelled any number of times without piling up pending timers.
#[derive(Debug)]
pub struct IdleTimer {
    timeout: Duration,
    deadline: Option<Instant>,
}

impl IdleTimer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: None,
        }
    }

    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.timeout);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

pub struct Lifecycle {
    idle: IdleTimer,
}

impl Lifecycle {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            idle: IdleTimer::new(idle_timeout),
        }
    }

    /// Arms the idle timer for a server nobody has connected to yet
    pub fn on_listening(&mut self, now: Instant) {
        self.idle.arm(now);
    }

    /// Cancels a pending shutdown and starts the loop if it is not running.
    /// Returns `true` if a new session was started.
    pub fn on_client_connected(
        &mut self,
        game_loop: &mut GameLoop,
        game: &mut dyn GameRepository,
    ) -> bool {
        if self.idle.is_armed() {
            info!("Client connected, idle shutdown cancelled");
            self.idle.cancel();
        }
        game_loop.start(game)
    }

    /// Arms the idle timer once the last connection is gone
    pub fn on_client_disconnected(&mut self, remaining: usize, now: Instant) {
        if remaining == 0 {
            info!(
                "No clients left, shutting down in {}s unless someone connects",
                self.idle.timeout().as_secs()
            );
            self.idle.arm(now);
        }
    }

    pub fn idle_deadline(&self) -> Option<Instant> {
        self.idle.deadline()
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle.timeout()
    }

    /// Drops a pending shutdown without touching the game loop
    pub fn disarm(&mut self) {
        self.idle.cancel();
    }

    /// The idle deadline has passed with nobody connected
    pub fn should_shut_down(&self, now: Instant, connections: usize) -> bool {
        connections == 0 && self.idle.deadline().is_some_and(|deadline| now >= deadline)
    }
}
