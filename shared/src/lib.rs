use serde::{Deserialize, Serialize};

pub const ARENA_WIDTH: u32 = 800;
pub const ARENA_HEIGHT: u32 = 600;
pub const PLAYER_WIDTH: u32 = 40;
pub const PLAYER_HEIGHT: u32 = 40;
pub const PLAYER_SPEED: i32 = 10;
pub const TICK_RATE: u32 = 50;
pub const TIME_LIMIT_SECS: u64 = 3600;
pub const IDLE_TIMEOUT_SECS: u64 = 15 * 60;
pub const DEFAULT_PORT: u16 = 8081;

pub const TIME_LIMIT_REACHED: &str = "Time Limit Reached";
pub const ALL_PLAYERS_LEFT: &str = "All Players Left";

/// Logical controls a client can hold down.
///
/// The derived ordering (`Up < Down < Left < Right`) is the order in which
/// pressed controls are resolved into a velocity.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PlayerControl {
    Up,
    Down,
    Left,
    Right,
}

/// Broadcastable view of a player. Velocity is never disclosed.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PlayerState {
    pub id: String,
    /// CSS compatible color string
    pub color: String,
    pub x: u32,
    pub y: u32,
    /// Seconds since the current game session started
    pub age: u64,
}

/// Every message exchanged over a connection.
///
/// "Game" updates flow from server to client, "Player" updates from client
/// to server. The `type` field carries the variant tag.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SocketMessage {
    PlayerControlUpdate {
        #[serde(rename = "pressedControls")]
        pressed_controls: Vec<PlayerControl>,
    },
    GameUpdate {
        #[serde(rename = "serverAge")]
        server_age: u64,
        players: Vec<PlayerState>,
    },
    GameJoinUpdate {
        #[serde(rename = "playerId")]
        player_id: String,
        #[serde(rename = "serverAge")]
        server_age: u64,
        players: Vec<PlayerState>,
    },
    GameOverUpdate {
        reason: String,
    },
    ServerError {
        message: String,
    },
}

impl SocketMessage {
    /// Wire tags of every variant, as they appear in the `type` field.
    pub const TYPES: [&'static str; 5] = [
        "playerControlUpdate",
        "gameUpdate",
        "gameJoinUpdate",
        "gameOverUpdate",
        "serverError",
    ];

    pub fn server_error(message: impl Into<String>) -> Self {
        SocketMessage::ServerError {
            message: message.into(),
        }
    }

    pub fn game_over(reason: impl Into<String>) -> Self {
        SocketMessage::GameOverUpdate {
            reason: reason.into(),
        }
    }

    /// The `type` tag this message is sent with.
    pub fn type_name(&self) -> &'static str {
        match self {
            SocketMessage::PlayerControlUpdate { .. } => Self::TYPES[0],
            SocketMessage::GameUpdate { .. } => Self::TYPES[1],
            SocketMessage::GameJoinUpdate { .. } => Self::TYPES[2],
            SocketMessage::GameOverUpdate { .. } => Self::TYPES[3],
            SocketMessage::ServerError { .. } => Self::TYPES[4],
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SocketMessage::ServerError { .. })
    }
}
