//! Inbound protocol handling.
//!
//! Every function here maps a client event onto repository mutations and
//! returns the message to deliver. Nothing in this module talks to sockets
//! or fails across the connection boundary: bad input becomes a
//! `serverError` message.

use crate::game::GameRepository;
use crate::player::velocity_for;
use log::{debug, error};
use shared::{PlayerControl, SocketMessage};

/// Handles one text frame from `client_id`
pub fn handle_client_message(
    client_id: &str,
    raw: &str,
    game: &mut dyn GameRepository,
) -> SocketMessage {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => return SocketMessage::server_error(format!("JSON parse error: {}", e)),
    };

    let Some(message_type) = value.get("type").and_then(|t| t.as_str()).map(str::to_owned)
    else {
        return SocketMessage::server_error("Message is missing a 'type' field");
    };

    // Outbound tags are rejected without decoding their payload
    if message_type != SocketMessage::TYPES[0] {
        return unsupported(&message_type);
    }

    match serde_json::from_value(value) {
        Ok(SocketMessage::PlayerControlUpdate { pressed_controls }) => {
            player_control_update(client_id, &pressed_controls, game)
        }
        Ok(other) => unsupported(other.type_name()),
        Err(e) => SocketMessage::server_error(format!("Malformed {} message: {}", message_type, e)),
    }
}

/// Handles one binary frame. Binary frames carry the same UTF-8 JSON envelope.
pub fn handle_binary_message(
    client_id: &str,
    raw: &[u8],
    game: &mut dyn GameRepository,
) -> SocketMessage {
    match std::str::from_utf8(raw) {
        Ok(text) => handle_client_message(client_id, text, game),
        Err(e) => SocketMessage::server_error(format!("Binary frame is not valid UTF-8: {}", e)),
    }
}

/// Applies a control update to the sender's player
pub fn player_control_update(
    client_id: &str,
    pressed_controls: &[PlayerControl],
    game: &mut dyn GameRepository,
) -> SocketMessage {
    if !game.is_running() {
        return SocketMessage::server_error("Game is not running");
    }

    let speed = game.arena().speed;
    let Some(player) = game.player_mut(client_id) else {
        return SocketMessage::server_error(format!(
            "Client '{}' has no associated player",
            client_id
        ));
    };

    player.velocity = velocity_for(pressed_controls, speed);
    debug!(
        "Player {} velocity set to {:?}",
        player.id, player.velocity
    );
    game.game_update()
}

/// Removes the departing client's player.
///
/// Clears the running flag once nobody is left, which the game loop picks
/// up at its next tick.
pub fn handle_client_disconnect(client_id: &str, game: &mut dyn GameRepository) -> SocketMessage {
    if !game.delete_player(client_id) {
        error!("Error deleting player for client {}", client_id);
    }
    if game.player_count() == 0 {
        game.set_running(false);
    }
    game.game_update()
}

/// Confirmation sent only to a client that just joined
pub fn join_update(player_id: &str, game: &dyn GameRepository) -> SocketMessage {
    SocketMessage::GameJoinUpdate {
        player_id: player_id.to_string(),
        server_age: game.age(),
        players: game.players_state(),
    }
}

fn unsupported(message_type: &str) -> SocketMessage {
    SocketMessage::server_error(format!("Unsupported message type: {}", message_type))
}
