//! Game simulation modules

pub mod audio;
pub mod geometry;
pub mod map;
pub mod region;
pub mod rng;
pub mod state;
pub mod tick;
pub mod tuning;

pub use region::Region;
pub use state::{GameSettings, GameState, Player, HOST_PLAYER_ID};
pub use tick::{advance, TickContext};

use serde::{Deserialize, Serialize};

/// Directional/fire flags for one entity, as last reported.
///
/// Clients send these edge-triggered; the host keeps the latest value per
/// entity and the tick engine reads the whole map each frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub fire: bool,
}
