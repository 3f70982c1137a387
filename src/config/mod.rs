//! Configuration module - environment variable parsing

use std::env;
use std::str::FromStr;

use crate::game::{GameSettings, Region};

/// Application configuration loaded from environment variables.
/// Every knob has a default; only malformed values are errors.
#[derive(Clone, Debug)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// User-facing room code, also the map seed
    pub room_code: String,
    /// Display name of the room
    pub room_name: String,
    /// Display name of the hosting player
    pub host_name: String,
    /// The hosting player's region affiliation
    pub host_region: Region,

    /// Number of AI tanks to field
    pub bot_count: u32,
    /// Milliseconds between item drops
    pub item_spawn_interval_ms: u64,
    /// Milliseconds a buff pickup stays active
    pub buff_duration_ms: u64,
    /// Commentary overlay toggle, forwarded to clients untouched
    pub commentary: bool,

    /// Headless demo clients to spawn alongside the host
    pub demo_clients: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            room_code: env::var("ARENA_ROOM_CODE").unwrap_or_else(|_| "000000".to_string()),
            room_name: env::var("ARENA_ROOM_NAME").unwrap_or_else(|_| "Tank Arena".to_string()),
            host_name: env::var("ARENA_HOST_NAME").unwrap_or_else(|_| "Host".to_string()),
            host_region: parse_var("ARENA_REGION", Region::Taipei)?,

            bot_count: parse_var("ARENA_BOT_COUNT", 4)?,
            item_spawn_interval_ms: parse_var("ARENA_ITEM_SPAWN_MS", 5000)?,
            buff_duration_ms: parse_var("ARENA_BUFF_MS", 8000)?,
            commentary: env::var("ARENA_COMMENTARY")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),

            demo_clients: parse_var("ARENA_DEMO_CLIENTS", 0)?,
        })
    }

    /// The host-authored match settings embedded into state
    pub fn settings(&self) -> GameSettings {
        GameSettings {
            bot_count: self.bot_count,
            item_spawn_interval_ms: self.item_spawn_interval_ms,
            buff_duration_ms: self.buff_duration_ms,
            commentary: self.commentary,
        }
    }
}

fn parse_var<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            var,
            value: raw.clone(),
        }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}
