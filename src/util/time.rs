//! Time utilities for the simulation loop

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Tick rate configuration
pub const SIMULATION_TPS: u32 = 60; // one tick per rendered frame
pub const TICK_DURATION_MICROS: u64 = 1_000_000 / SIMULATION_TPS as u64;

/// Reference frame length the game clock is normalized against
pub const FRAME_MILLIS: f64 = 1000.0 / SIMULATION_TPS as f64;

/// Normalize a measured tick duration to frame units, so a late tick
/// advances the game clock proportionally
pub fn frame_delta(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0 / FRAME_MILLIS
}
