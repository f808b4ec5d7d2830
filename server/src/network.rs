//! Server network layer handling WebSocket connections and game loop coordination

use crate::client_manager::{ClientBridge, ClientId, ClientSender, OUTBOUND_CAPACITY};
use crate::config::ServerConfig;
use crate::dispatcher::{
    handle_binary_message, handle_client_disconnect, handle_client_message, join_update,
};
use crate::game::{GameRepository, LocalGameRepository};
use crate::game_loop::{GameLoop, TickOutcome, TickScheduler};
use crate::lifecycle::Lifecycle;
use crate::utils::ClientIdGenerator;
use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use serde::Serialize;
use shared::SocketMessage;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Messages sent from connection tasks to the main server loop
#[derive(Debug)]
pub enum ServerEvent {
    Connected {
        addr: SocketAddr,
        sender: ClientSender,
        reply: oneshot::Sender<ClientId>,
    },
    Text {
        client_id: ClientId,
        text: String,
    },
    Binary {
        client_id: ClientId,
        data: Vec<u8>,
    },
    Disconnected {
        client_id: ClientId,
    },
}

/// Main server coordinating networking and game simulation.
///
/// All game state lives here and is only touched from [`Server::run`].
/// Socket tasks talk to it through the event channel.
pub struct Server {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    game: Box<dyn GameRepository + Send>,
    bridge: ClientBridge,
    game_loop: GameLoop,
    scheduler: TickScheduler,
    lifecycle: Lifecycle,

    event_tx: mpsc::UnboundedSender<ServerEvent>,
    event_rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl Server {
    /// Binds the listening socket with the in-memory repository
    pub async fn bind(config: ServerConfig) -> Result<Self, NetworkError> {
        let game = LocalGameRepository::new(config.arena);
        Self::with_repository(config, Box::new(game)).await
    }

    pub async fn with_repository(
        config: ServerConfig,
        game: Box<dyn GameRepository + Send>,
    ) -> Result<Self, NetworkError> {
        let listener = TcpListener::bind(config.address()).await?;
        let local_addr = listener.local_addr()?;
        info!("Listening on {}", local_addr);

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener: Some(listener),
            local_addr,
            game,
            bridge: ClientBridge::new(ClientIdGenerator::new()),
            game_loop: GameLoop::new(config.tick_rate, config.time_limit_secs()),
            scheduler: TickScheduler::new(config.tick_delay()),
            lifecycle: Lifecycle::new(config.idle_timeout),
            event_tx,
            event_rx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Spawns task that accepts connections and hands each one to its own task
    fn spawn_listener(&mut self) -> Option<JoinHandle<()>> {
        let listener = self.listener.take()?;
        let event_tx = self.event_tx.clone();

        Some(tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        debug!("Accepted TCP connection from {}", addr);
                        tokio::spawn(handle_connection(stream, addr, event_tx.clone()));
                    }
                    Err(e) => error!("Accept error: {}", e),
                }
            }
        }))
    }

    /// Main server loop. Returns once the idle timeout fires.
    pub async fn run(mut self) -> Result<(), NetworkError> {
        let listener_handle = self.spawn_listener();
        self.lifecycle.on_listening(Instant::now());
        info!("Server started successfully");

        loop {
            let idle_deadline = self.lifecycle.idle_deadline();

            tokio::select! {
                event = self.event_rx.recv() => {
                    match event {
                        Some(event) => self.handle_event(event),
                        None => break,
                    }
                },

                _ = self.scheduler.next_tick(), if self.game_loop.is_active() => {
                    self.handle_tick();
                },

                _ = sleep_until(idle_deadline.unwrap_or_else(Instant::now)), if idle_deadline.is_some() => {
                    if self.lifecycle.should_shut_down(Instant::now(), self.bridge.size()) {
                        info!(
                            "Idle time limit reached ({}s). Shutting down server...",
                            self.lifecycle.idle_timeout().as_secs()
                        );
                        break;
                    }
                    self.lifecycle.disarm();
                },
            }
        }

        if let Some(handle) = listener_handle {
            handle.abort();
        }
        Ok(())
    }

    fn handle_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Connected {
                addr,
                sender,
                reply,
            } => {
                let client_id = self.on_connect(addr, sender);
                if reply.send(client_id.clone()).is_err() {
                    // connection task died during registration
                    self.on_disconnect(&client_id);
                }
            }
            ServerEvent::Text { client_id, text } => {
                let response = handle_client_message(&client_id, &text, self.game.as_mut());
                self.deliver(&client_id, response);
            }
            ServerEvent::Binary { client_id, data } => {
                let response = handle_binary_message(&client_id, &data, self.game.as_mut());
                self.deliver(&client_id, response);
            }
            ServerEvent::Disconnected { client_id } => self.on_disconnect(&client_id),
        }
    }

    /// Registers the connection, creates its player and announces it
    fn on_connect(&mut self, addr: SocketAddr, sender: ClientSender) -> ClientId {
        let client_id = self.bridge.add_client(sender);
        info!("New connection - {} from {}", client_id, addr);

        let player = match self.game.create_player(&client_id) {
            Ok(player) => player,
            Err(e) => {
                error!("{}", e);
                self.send(&SocketMessage::server_error(e.to_string()), &client_id);
                return client_id;
            }
        };

        if self.lifecycle.on_client_connected(&mut self.game_loop, self.game.as_mut()) {
            self.scheduler.restart();
        }

        self.send(&join_update(&player.id, self.game.as_ref()), &client_id);
        self.broadcast(&self.game.game_update());
        client_id
    }

    fn on_disconnect(&mut self, client_id: &str) {
        if !self.bridge.remove_client(client_id) {
            error!("Client {} does not exist", client_id);
        }
        info!("Client {} disconnected", client_id);

        let announcement = handle_client_disconnect(client_id, self.game.as_mut());
        self.broadcast(&announcement);
        self.lifecycle
            .on_client_disconnected(self.bridge.size(), Instant::now());
    }

    fn handle_tick(&mut self) {
        match self.game_loop.tick(self.game.as_mut()) {
            Some(TickOutcome::Update(update)) => self.broadcast(&update),
            Some(TickOutcome::Finished(game_over)) => {
                self.broadcast(&game_over);
                self.bridge.disconnect_all();
            }
            None => {}
        }
    }

    /// Errors go back to the sender only, everything else to all clients
    fn deliver(&self, client_id: &str, response: SocketMessage) {
        if response.is_error() {
            warn!("Client {} sent a bad message: {:?}", client_id, response);
            self.send(&response, client_id);
        } else {
            self.broadcast(&response);
        }
    }

    fn send<T: Serialize>(&self, message: &T, client_id: &str) {
        if let Err(e) = self.bridge.send(message, client_id) {
            error!("Failed to send to client {}: {}", client_id, e);
        }
    }

    fn broadcast<T: Serialize>(&self, message: &T) {
        if let Err(e) = self.bridge.broadcast(message) {
            error!("Failed to broadcast: {}", e);
        }
    }
}

/// Runs one WebSocket connection: handshake, registration, then forwarding
/// frames both ways until either side closes.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    event_tx: mpsc::UnboundedSender<ServerEvent>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake failed for {}: {}", addr, e);
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (msg_tx, mut msg_rx) = mpsc::channel::<Message>(OUTBOUND_CAPACITY);

    let (reply_tx, reply_rx) = oneshot::channel();
    let registration = ServerEvent::Connected {
        addr,
        sender: msg_tx,
        reply: reply_tx,
    };
    if event_tx.send(registration).is_err() {
        return;
    }
    let Ok(client_id) = reply_rx.await else {
        return;
    };

    // Outbound frames
    let writer = tokio::spawn(async move {
        while let Some(message) = msg_rx.recv().await {
            let closing = matches!(message, Message::Close(_));
            if ws_sender.send(message).await.is_err() || closing {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    // Inbound frames, forwarded in arrival order
    while let Some(frame) = ws_receiver.next().await {
        let event = match frame {
            Ok(Message::Text(text)) => ServerEvent::Text {
                client_id: client_id.clone(),
                text: text.to_string(),
            },
            Ok(Message::Binary(data)) => ServerEvent::Binary {
                client_id: client_id.clone(),
                data: data.to_vec(),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!("WebSocket error for client {}: {}", client_id, e);
                break;
            }
        };
        if event_tx.send(event).is_err() {
            break;
        }
    }

    let _ = event_tx.send(ServerEvent::Disconnected {
        client_id: client_id.clone(),
    });
    writer.abort();
    debug!("Connection task for client {} finished", client_id);
}
