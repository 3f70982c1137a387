//! Gameplay constants and tunable rates

/// Side length of the square play area
pub const MAP_SIZE: f32 = 2000.0;
/// Tank hitbox radius
pub const PLAYER_RADIUS: f32 = 20.0;
/// Base movement per tick (doubled under a speed buff)
pub const PLAYER_SPEED: f32 = 4.0;
/// Bullet movement per tick
pub const BULLET_SPEED: f32 = 12.0;
/// Minimum milliseconds between shots
pub const FIRE_RATE_MS: u64 = 500;
/// Pickup hitbox radius
pub const ITEM_RADIUS: f32 = 15.0;

/// Base damage per bullet (doubled at fire time under a damage buff)
pub const BULLET_DAMAGE: i32 = 20;
/// Angular offset of the two extra triple-shot bullets, radians
pub const TRIPLE_SHOT_SPREAD: f32 = 0.25;
/// HP restored by a health pickup, capped at max hp
pub const HEAL_AMOUNT: i32 = 30;
/// Absorption pool granted by a shield pickup (reset, not stacked)
pub const SHIELD_VALUE: i32 = 30;

/// Score awarded to killer and killer's region per kill
pub const KILL_SCORE: u32 = 100;
/// Region score at which the match ends
pub const WIN_SCORE: u32 = 1000;

/// Cap on simultaneously live pickups
pub const MAX_ITEMS: usize = 15;

/// Bullets are dropped once they leave the play area by this margin
pub const BULLET_BOUNDS_MARGIN: f32 = 100.0;
/// Per-tick particle life decrement
pub const PARTICLE_FADE: f32 = 0.03;

/// Number of interior obstacles per map
pub const OBSTACLE_COUNT: usize = 30;
/// Safe-position search gives up after this many draws
pub const SPAWN_ATTEMPTS: u32 = 100;
/// Extra clearance around a tank when validating a spawn point
pub const SPAWN_BUFFER: f32 = 10.0;

/// Per-tick Bernoulli rates for the probabilistic behaviors.
///
/// Exact timing is not a correctness property; "eventually respawns" and
/// "eventually acts" are. Tests pin these to 0 or 1.
#[derive(Debug, Clone, Copy)]
pub struct Tuning {
    /// Chance a bot picks a fresh heading this tick
    pub bot_turn_chance: f64,
    /// Chance a bot attempts to fire this tick
    pub bot_fire_chance: f64,
    /// Chance a dead tank revives this tick
    pub respawn_chance: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            bot_turn_chance: 0.02,
            bot_fire_chance: 0.015,
            respawn_chance: 0.01,
        }
    }
}
