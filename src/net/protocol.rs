//! Wire protocol message definitions
//! These are the frames exchanged over the peer data channel

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::{GameState, InputState, Region};

/// Maximum simultaneous client connections per host
pub const MAX_CONNECTIONS: usize = 8;

/// User-facing room codes are capped at this many characters
pub const ROOM_CODE_MAX_LEN: usize = 6;

/// Namespace prefix applied before a room code becomes a public
/// connection identifier, to avoid collisions in the shared namespace
pub const CHANNEL_PREFIX: &str = "tank-arena-";

/// Public connection identifier for a room code
pub fn room_channel_id(code: &str) -> String {
    let code: String = code.chars().take(ROOM_CODE_MAX_LEN).collect();
    format!("{CHANNEL_PREFIX}{code}")
}

/// A chat line relayed through the host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender: String,
    pub text: String,
    pub color: String,
    pub timestamp: u64,
}

/// Messages exchanged over the peer data channel, tagged by `type`.
///
/// Deserialization validates the tag; frames with unrecognized tags fail
/// to parse and are dropped by the receiving session, never thrown.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NetMessage {
    /// client → host, once, immediately after connecting
    Join { name: String, region: Region },
    /// host → joining client: assigned entity id plus the full snapshot
    Welcome { player_id: String, state: GameState },
    /// client → host on every edge change of any flag
    Input { input: InputState },
    /// host → every open connection, once per tick
    StateUpdate { state: GameState },
    /// host → client, room-full or fatal condition
    Error { message: String },
    /// bidirectional, relayed through the host
    Chat { message: ChatMessage },
}
