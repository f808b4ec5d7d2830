//! Authoritative game state: the player repository and session clock.

use crate::config::Arena;
use crate::player::{advance, Player};
use crate::utils::{random_color, random_grid_coordinate, IdGenerator};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{PlayerState, SocketMessage};
use std::collections::HashMap;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Connection {0} already has a player")]
    DuplicateConnection(String),
}

/// Capability interface over the game state.
///
/// The game loop, lifecycle manager and dispatcher only talk to this trait,
/// so the in-memory store can be swapped for a double in tests.
pub trait GameRepository {
    /// Whole seconds since the current session started
    fn age(&self) -> u64;

    /// Also updates every player's `age`
    fn set_age(&mut self, age: u64);

    /// `true` while the game loop is scheduling ticks
    fn is_running(&self) -> bool;

    fn set_running(&mut self, running: bool);

    fn arena(&self) -> Arena;

    /// Creates a player bound to the connection. Never overwrites an existing one.
    fn create_player(&mut self, client_id: &str) -> Result<Player, RepositoryError>;

    /// Returns `true` if a player existed and was removed
    fn delete_player(&mut self, client_id: &str) -> bool;

    fn player(&self, client_id: &str) -> Option<&Player>;

    fn player_mut(&mut self, client_id: &str) -> Option<&mut Player>;

    /// Live players in connection order
    fn players(&self) -> Vec<&Player>;

    /// Runs one movement step for every player
    fn advance_players(&mut self);

    fn player_count(&self) -> usize;

    fn players_state(&self) -> Vec<PlayerState> {
        self.players().into_iter().map(Player::state).collect()
    }

    /// Snapshot of the whole game, ready to send
    fn game_update(&self) -> SocketMessage {
        SocketMessage::GameUpdate {
            server_age: self.age(),
            players: self.players_state(),
        }
    }
}

/// In-memory repository.
///
/// Players live in a dense slot vector indexed through a map keyed by
/// connection id. Removing a player empties its slot; slots are never reused
/// while other players are live, and the storage is compacted once empty.
pub struct LocalGameRepository {
    arena: Arena,
    slots: Vec<Option<Player>>,
    index: HashMap<String, usize>,
    ids: IdGenerator,
    rng: StdRng,
    age: u64,
    running: bool,
}

impl LocalGameRepository {
    pub fn new(arena: Arena) -> Self {
        Self::with_parts(arena, IdGenerator::new(), StdRng::from_entropy())
    }

    /// Builds a repository with explicit id and randomness sources
    pub fn with_parts(arena: Arena, ids: IdGenerator, rng: StdRng) -> Self {
        Self {
            arena,
            slots: Vec::new(),
            index: HashMap::new(),
            ids,
            rng,
            age: 0,
            running: false,
        }
    }

    /// Number of slots in the backing arena, live or not
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

impl Default for LocalGameRepository {
    fn default() -> Self {
        Self::new(Arena::default())
    }
}

impl GameRepository for LocalGameRepository {
    fn age(&self) -> u64 {
        self.age
    }

    fn set_age(&mut self, age: u64) {
        self.age = age;
        for player in self.slots.iter_mut().flatten() {
            player.age = age;
        }
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    fn arena(&self) -> Arena {
        self.arena
    }

    fn create_player(&mut self, client_id: &str) -> Result<Player, RepositoryError> {
        if self.index.contains_key(client_id) {
            return Err(RepositoryError::DuplicateConnection(client_id.to_string()));
        }

        let position = (
            random_grid_coordinate(&mut self.rng, self.arena.max_x(), self.arena.player_width),
            random_grid_coordinate(&mut self.rng, self.arena.max_y(), self.arena.player_height),
        );
        let player = Player::new(
            self.ids.next_id().to_string(),
            random_color(&mut self.rng),
            position,
        );

        info!(
            "Added player {} for client {} at ({}, {})",
            player.id, client_id, position.0, position.1
        );
        self.index.insert(client_id.to_string(), self.slots.len());
        self.slots.push(Some(player.clone()));
        Ok(player)
    }

    fn delete_player(&mut self, client_id: &str) -> bool {
        let Some(slot) = self.index.remove(client_id) else {
            return false;
        };
        if let Some(player) = self.slots[slot].take() {
            info!("Removed player {} for client {}", player.id, client_id);
        }
        if self.index.is_empty() {
            debug!("Repository empty, compacting {} slots", self.slots.len());
            self.slots.clear();
        }
        true
    }

    fn player(&self, client_id: &str) -> Option<&Player> {
        let slot = *self.index.get(client_id)?;
        self.slots[slot].as_ref()
    }

    fn player_mut(&mut self, client_id: &str) -> Option<&mut Player> {
        let slot = *self.index.get(client_id)?;
        self.slots[slot].as_mut()
    }

    fn players(&self) -> Vec<&Player> {
        self.slots.iter().flatten().collect()
    }

    fn advance_players(&mut self) {
        let arena = self.arena;
        for player in self.slots.iter_mut().flatten() {
            advance(player, &arena);
        }
    }

    fn player_count(&self) -> usize {
        self.index.len()
    }
}
