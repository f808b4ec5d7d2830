//! Integration tests for the arena server
//!
//! These tests run a real server on an ephemeral port and talk to it over
//! WebSocket the same way a browser client would.

use futures::{SinkExt, StreamExt};
use server::config::{Arena, ServerConfig};
use server::network::{NetworkError, Server};
use shared::{PlayerControl, PlayerState, SocketMessage, TIME_LIMIT_REACHED};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const READ_TIMEOUT: Duration = Duration::from_secs(5);

fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        tick_rate: 20,
        time_limit: Duration::from_secs(60),
        idle_timeout: Duration::from_secs(60),
        arena: Arena::default(),
    }
}

async fn start_server(config: ServerConfig) -> (SocketAddr, JoinHandle<Result<(), NetworkError>>) {
    let server = Server::bind(config).await.unwrap();
    let addr = server.local_addr();
    (addr, tokio::spawn(server.run()))
}

async fn connect(addr: SocketAddr) -> Client {
    let (ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
    ws
}

/// Next protocol message, or `None` once the server closed the connection
async fn next_message(ws: &mut Client) -> Option<SocketMessage> {
    loop {
        let frame = timeout(READ_TIMEOUT, ws.next())
            .await
            .expect("Timed out waiting for the server");
        match frame {
            Some(Ok(Message::Text(text))) => return Some(serde_json::from_str(&text).unwrap()),
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return None,
            Some(Ok(_)) => continue,
        }
    }
}

async fn wait_for<F>(ws: &mut Client, mut predicate: F) -> SocketMessage
where
    F: FnMut(&SocketMessage) -> bool,
{
    loop {
        match next_message(ws).await {
            Some(message) if predicate(&message) => return message,
            Some(_) => continue,
            None => panic!("Connection closed before the expected message arrived"),
        }
    }
}

async fn send_text(ws: &mut Client, text: &str) {
    ws.send(Message::text(text.to_string())).await.unwrap();
}

async fn join(ws: &mut Client) -> (String, Vec<PlayerState>) {
    match next_message(ws).await {
        Some(SocketMessage::GameJoinUpdate {
            player_id,
            server_age,
            players,
        }) => {
            assert!(server_age <= 1);
            (player_id, players)
        }
        other => panic!("Expected gameJoinUpdate first, got {:?}", other),
    }
}

/// CONNECTION TESTS
mod connection_tests {
    use super::*;

    /// The first message on a fresh connection is the join snapshot
    #[tokio::test]
    async fn join_update_comes_first() {
        let (addr, _server) = start_server(test_config()).await;
        let mut ws = connect(addr).await;

        let (player_id, players) = join(&mut ws).await;
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].id, player_id);
        assert!(players[0].color.starts_with('#'));
        assert!(players[0].x <= Arena::default().max_x());
        assert!(players[0].y <= Arena::default().max_y());
    }

    /// A second player shows up in the first player's updates
    #[tokio::test]
    async fn second_client_is_announced() {
        let (addr, _server) = start_server(test_config()).await;
        let mut first = connect(addr).await;
        let (first_id, _) = join(&mut first).await;

        let mut second = connect(addr).await;
        let (second_id, players) = join(&mut second).await;
        assert_ne!(first_id, second_id);
        assert_eq!(players.len(), 2);

        wait_for(&mut first, |message| {
            matches!(message, SocketMessage::GameUpdate { players, .. } if players.len() == 2)
        })
        .await;
    }

    /// Leaving removes the player from everyone else's view
    #[tokio::test]
    async fn disconnect_is_announced() {
        let (addr, _server) = start_server(test_config()).await;
        let mut first = connect(addr).await;
        join(&mut first).await;
        let mut second = connect(addr).await;
        let (second_id, _) = join(&mut second).await;

        second.close(None).await.unwrap();

        wait_for(&mut first, |message| match message {
            SocketMessage::GameUpdate { players, .. } => {
                players.len() == 1 && players.iter().all(|p| p.id != second_id)
            }
            _ => false,
        })
        .await;
    }
}

/// PROTOCOL TESTS
mod protocol_tests {
    use super::*;

    /// Holding a control moves the player on subsequent ticks
    #[tokio::test]
    async fn control_update_moves_player() {
        let (addr, _server) = start_server(test_config()).await;
        let mut ws = connect(addr).await;
        let (player_id, players) = join(&mut ws).await;
        let start_x = players[0].x;

        let control = if start_x < Arena::default().max_x() {
            PlayerControl::Right
        } else {
            PlayerControl::Left
        };
        let update = SocketMessage::PlayerControlUpdate {
            pressed_controls: vec![control],
        };
        send_text(&mut ws, &serde_json::to_string(&update).unwrap()).await;

        wait_for(&mut ws, |message| match message {
            SocketMessage::GameUpdate { players, .. } => players
                .iter()
                .any(|p| p.id == player_id && p.x != start_x),
            _ => false,
        })
        .await;
    }

    /// Controls use the camelCase wire format
    #[tokio::test]
    async fn raw_json_control_update_is_accepted() {
        let (addr, _server) = start_server(test_config()).await;
        let mut ws = connect(addr).await;
        join(&mut ws).await;

        send_text(&mut ws, r#"{"type":"playerControlUpdate","pressedControls":[]}"#).await;

        for _ in 0..5 {
            let message = next_message(&mut ws).await.unwrap();
            assert!(matches!(message, SocketMessage::GameUpdate { .. }), "Got {:?}", message);
        }
    }

    /// Malformed input is reported to the sender only
    #[tokio::test]
    async fn bad_message_gets_unicast_error() {
        let (addr, _server) = start_server(test_config()).await;
        let mut sender = connect(addr).await;
        join(&mut sender).await;
        let mut bystander = connect(addr).await;
        join(&mut bystander).await;

        send_text(&mut sender, "not json at all").await;
        let error = wait_for(&mut sender, SocketMessage::is_error).await;
        match error {
            SocketMessage::ServerError { message } => assert!(message.contains("JSON")),
            other => panic!("Unexpected message {:?}", other),
        }

        send_text(&mut sender, r#"{"type":"gameUpdate"}"#).await;
        let error = wait_for(&mut sender, SocketMessage::is_error).await;
        assert_eq!(
            error,
            SocketMessage::server_error("Unsupported message type: gameUpdate")
        );

        // the bystander keeps receiving ticks but no errors
        for _ in 0..10 {
            let message = next_message(&mut bystander).await.unwrap();
            assert!(!message.is_error(), "Bystander received {:?}", message);
        }
    }
}

/// LIFECYCLE TESTS
mod lifecycle_tests {
    use super::*;

    /// Reaching the time limit ends the session and closes the connection
    #[tokio::test]
    async fn time_limit_ends_game() {
        let config = ServerConfig {
            time_limit: Duration::from_secs(1),
            ..test_config()
        };
        let (addr, _server) = start_server(config).await;
        let mut ws = connect(addr).await;
        join(&mut ws).await;

        let game_over = wait_for(&mut ws, |message| {
            matches!(message, SocketMessage::GameOverUpdate { .. })
        })
        .await;
        assert_eq!(game_over, SocketMessage::game_over(TIME_LIMIT_REACHED));

        // nothing but the close follows
        assert_eq!(next_message(&mut ws).await, None);
    }

    /// A server nobody connects to stops on its own
    #[tokio::test]
    async fn idle_server_shuts_down() {
        let config = ServerConfig {
            idle_timeout: Duration::from_millis(300),
            ..test_config()
        };
        let (_addr, server) = start_server(config).await;

        let result = timeout(READ_TIMEOUT, server)
            .await
            .expect("Server did not shut down");
        assert!(result.unwrap().is_ok());
    }

    /// The idle timer restarts once the last client leaves
    #[tokio::test]
    async fn server_shuts_down_after_last_client_leaves() {
        let config = ServerConfig {
            idle_timeout: Duration::from_millis(500),
            ..test_config()
        };
        let (addr, server) = start_server(config).await;
        let mut ws = connect(addr).await;
        join(&mut ws).await;
        ws.close(None).await.unwrap();

        let result = timeout(READ_TIMEOUT, server)
            .await
            .expect("Server did not shut down");
        assert!(result.unwrap().is_ok());
    }

    /// A new client after a finished session starts a fresh one
    #[tokio::test]
    async fn rejoin_starts_new_session() {
        let config = ServerConfig {
            time_limit: Duration::from_secs(1),
            ..test_config()
        };
        let (addr, _server) = start_server(config).await;
        let mut first = connect(addr).await;
        join(&mut first).await;
        wait_for(&mut first, |message| {
            matches!(message, SocketMessage::GameOverUpdate { .. })
        })
        .await;

        let mut second = connect(addr).await;
        let (player_id, players) = join(&mut second).await;
        assert!(players.iter().any(|p| p.id == player_id));
        assert!(matches!(
            next_message(&mut second).await,
            Some(SocketMessage::GameUpdate { .. })
        ));
    }
}
