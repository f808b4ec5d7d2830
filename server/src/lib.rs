//! # Arena Server Library
//!
//! Authoritative server for a small real-time multiplayer arena. It owns the
//! canonical player state, advances the simulation on a fixed tick, and keeps
//! every connected client in sync over WebSocket.
//!
//! ## Architecture
//!
//! ### Single-Writer Event Loop
//! All game state is owned by one task ([`network::Server::run`]). Socket
//! tasks never touch it directly; they forward connection events over a
//! channel. The event loop interleaves those events with game ticks and the
//! idle-shutdown deadline, running each to completion, so no two mutations
//! ever overlap and no locks are needed.
//!
//! ### Session Lifecycle
//! The first connection starts a game session (the clock resets to zero).
//! The session ends when every player has left or when the configured time
//! limit is reached. With no connections left, an idle timer is armed and
//! the server stops listening if nobody reconnects in time.
//!
//! ## Module Organization
//!
//! - [`player`]: player entity, control-to-velocity resolution, movement step
//! - [`game`]: the `GameRepository` capability and its in-memory store
//! - [`client_manager`]: connection registry with unicast and broadcast
//! - [`dispatcher`]: inbound message parsing and the resulting state changes
//! - [`game_loop`]: tick state machine and the fixed-interval scheduler
//! - [`lifecycle`]: loop start on connect, idle shutdown on empty server
//! - [`network`]: WebSocket accept loop, per-connection tasks, event loop
//! - [`config`]: arena geometry and server settings
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind(ServerConfig::default()).await?;
//!     // Runs until the server has been idle for the configured timeout
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod config;
pub mod dispatcher;
pub mod game;
pub mod game_loop;
pub mod lifecycle;
pub mod network;
pub mod player;
pub mod utils;
