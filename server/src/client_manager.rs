//! Connection registry for the arena server
//!
//! The client bridge tracks every live connection and is the only way the
//! rest of the server talks to clients:
//! - Registration and removal of connections under opaque client ids
//! - Unicast delivery to a single client
//! - Broadcast delivery to all clients, tolerant of individual failures
//!
//! Connections are represented by the sending half of their outbound frame
//! channel. The socket writer task on the other end owns the actual WebSocket.

use crate::utils::ClientIdGenerator;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_tungstenite::tungstenite::Message;

/// Opaque identifier of a connection
pub type ClientId = String;

/// Outbound frame channel of a connection
pub type ClientSender = mpsc::Sender<Message>;

/// Frames a connection may have queued before new ones are dropped.
/// About five seconds of updates at the default tick rate.
pub const OUTBOUND_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Client {0} doesn't exist")]
    UnknownClient(ClientId),
    #[error("Connection to client {0} is closed")]
    Closed(ClientId),
    #[error("Outbound queue of client {0} is full")]
    Backlogged(ClientId),
    #[error("Failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Registry of live connections
pub struct ClientBridge {
    /// Live connections indexed by client id
    clients: HashMap<ClientId, ClientSender>,
    /// Source of fresh client ids
    ids: ClientIdGenerator,
}

impl ClientBridge {
    pub fn new(ids: ClientIdGenerator) -> Self {
        info!("Client bridge using instance tag {}", ids.instance());
        Self {
            clients: HashMap::new(),
            ids,
        }
    }

    /// Registers a connection and returns its new id
    pub fn add_client(&mut self, sender: ClientSender) -> ClientId {
        let client_id = self.ids.next_id();
        self.clients.insert(client_id.clone(), sender);
        info!("Client {} registered ({} connected)", client_id, self.clients.len());
        client_id
    }

    /// Removes a connection. Returns false if it was already gone.
    pub fn remove_client(&mut self, client_id: &str) -> bool {
        if self.clients.remove(client_id).is_some() {
            info!("Client {} removed ({} connected)", client_id, self.clients.len());
            true
        } else {
            false
        }
    }

    /// Serializes `message` and delivers it to exactly one client
    pub fn send<T: Serialize>(&self, message: &T, client_id: &str) -> Result<(), BridgeError> {
        let sender = self
            .clients
            .get(client_id)
            .ok_or_else(|| BridgeError::UnknownClient(client_id.to_string()))?;
        let text = serde_json::to_string(message)?;

        sender
            .try_send(Message::text(text))
            .map_err(|e| queue_error(e, client_id))
    }

    /// Delivers `message` to every registered client.
    ///
    /// The message is serialized once. A client whose connection has gone
    /// away, or whose queue is full, is logged and skipped. Every update is
    /// a full snapshot, so a skipped frame is superseded by the next one.
    /// Returns the number of successful deliveries.
    pub fn broadcast<T: Serialize>(&self, message: &T) -> Result<usize, BridgeError> {
        let text = serde_json::to_string(message)?;
        let mut delivered = 0;

        for (client_id, sender) in &self.clients {
            match sender.try_send(Message::text(text.clone())) {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Broadcast skipped: {}", queue_error(e, client_id)),
            }
        }
        Ok(delivered)
    }

    /// Asks every connection to close. Clients stay registered until their
    /// socket tasks report the disconnect.
    pub fn disconnect_all(&self) {
        for (client_id, sender) in &self.clients {
            debug!("Closing connection to client {}", client_id);
            if let Err(e) = sender.try_send(Message::Close(None)) {
                warn!("Could not close connection: {}", queue_error(e, client_id));
            }
        }
    }

    pub fn contains(&self, client_id: &str) -> bool {
        self.clients.contains_key(client_id)
    }

    /// Returns the number of currently connected clients
    pub fn size(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

fn queue_error(error: TrySendError<Message>, client_id: &str) -> BridgeError {
    match error {
        TrySendError::Full(_) => BridgeError::Backlogged(client_id.to_string()),
        TrySendError::Closed(_) => BridgeError::Closed(client_id.to_string()),
    }
}
