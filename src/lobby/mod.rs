//! Lobby directory port
//!
//! The room-listing service itself is an external collaborator; the core
//! only produces advert metadata for publication and consumes advert lists
//! for display. [`InMemoryLobby`] backs the demo binary and tests.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::game::{GameState, Region, HOST_PLAYER_ID};
use crate::net::protocol::MAX_CONNECTIONS;

/// Published metadata for one hosted room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomAdvert {
    pub room_id: String,
    pub room_name: String,
    pub host_name: String,
    pub region: Region,
    /// Localized region name, the string lobby UIs actually display
    pub region_label: String,
    pub bot_count: u32,
    pub player_count: usize,
    pub max_players: usize,
}

impl RoomAdvert {
    /// Snapshot the advertisable fields out of host state
    pub fn from_state(state: &GameState) -> Self {
        let host = state.player(HOST_PLAYER_ID);
        let region = host.map(|p| p.region).unwrap_or(Region::Taipei);
        Self {
            room_id: state.room_id.clone(),
            room_name: state.room_name.clone(),
            host_name: host.map(|p| p.name.clone()).unwrap_or_default(),
            region,
            region_label: region.label().to_string(),
            bot_count: state.settings.bot_count,
            player_count: state.human_count(),
            max_players: MAX_CONNECTIONS + 1,
        }
    }
}

/// Boundary to the external room-listing service
pub trait LobbyDirectory: Send + Sync {
    fn publish(&self, advert: RoomAdvert);
    fn remove(&self, room_id: &str);
    fn list(&self) -> Vec<RoomAdvert>;
}

/// Process-local directory used by the demo binary and tests
#[derive(Default)]
pub struct InMemoryLobby {
    rooms: RwLock<HashMap<String, RoomAdvert>>,
}

impl InMemoryLobby {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LobbyDirectory for InMemoryLobby {
    fn publish(&self, advert: RoomAdvert) {
        self.rooms.write().insert(advert.room_id.clone(), advert);
    }

    fn remove(&self, room_id: &str) {
        self.rooms.write().remove(room_id);
    }

    fn list(&self) -> Vec<RoomAdvert> {
        self.rooms.read().values().cloned().collect()
    }
}
