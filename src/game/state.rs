//! Entity model and world state container

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::geometry::Rect;
use super::map::{generate_walls, safe_position, SPAWN_STREAM_SUFFIX};
use super::region::Region;
use super::rng::Mulberry32;
use super::tuning::PLAYER_RADIUS;

/// Reserved id of the simulation authority's own tank
pub const HOST_PLAYER_ID: &str = "host";

/// Host-chosen match configuration, set once at init and never mutated.
/// Clients receive it embedded in state but never author it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSettings {
    pub bot_count: u32,
    pub item_spawn_interval_ms: u64,
    pub buff_duration_ms: u64,
    pub commentary: bool,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            bot_count: 4,
            item_spawn_interval_ms: 5000,
            buff_duration_ms: 8000,
            commentary: false,
        }
    }
}

/// A tank entity, human- or bot-controlled
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub region: Region,
    pub x: f32,
    pub y: f32,
    /// Facing in radians
    pub rotation: f32,
    /// Can go negative transiently within a tick, before death is applied
    pub hp: i32,
    pub max_hp: i32,
    pub score: u32,
    pub color: String,
    pub is_bot: bool,
    /// Timestamp of the last shot, enforces the fire-rate cooldown
    pub last_shot_time: u64,
    pub dead: bool,
    // Buff expiries: active while now < timestamp
    pub damage_boost_until: u64,
    pub speed_boost_until: u64,
    pub triple_shot_until: u64,
    /// Absorption pool consumed before hp; value-based, not timed
    pub shield: i32,
    /// Display-only latency estimate, never computed by the core
    pub ping: u32,
}

impl Player {
    pub fn new(id: impl Into<String>, name: impl Into<String>, region: Region, x: f32, y: f32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            region,
            x,
            y,
            rotation: 0.0,
            hp: 100,
            max_hp: 100,
            score: 0,
            color: region.color().to_string(),
            is_bot: false,
            last_shot_time: 0,
            dead: false,
            damage_boost_until: 0,
            speed_boost_until: 0,
            triple_shot_until: 0,
            shield: 0,
            ping: 0,
        }
    }

    pub fn damage_boost_active(&self, now_ms: u64) -> bool {
        now_ms < self.damage_boost_until
    }

    pub fn speed_boost_active(&self, now_ms: u64) -> bool {
        now_ms < self.speed_boost_until
    }

    pub fn triple_shot_active(&self, now_ms: u64) -> bool {
        now_ms < self.triple_shot_until
    }

    pub fn set_ping(&mut self, ping_ms: u32) {
        self.ping = ping_ms;
    }
}

/// A live bullet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bullet {
    pub id: Uuid,
    /// Kill attribution and self-hit exemption, not ownership
    pub owner_id: String,
    /// Captured at fire time; later region changes never alter exemption
    pub owner_region: Region,
    pub color: String,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// A bullet reflects off exactly one wall; the second contact destroys it
    pub bounces: u8,
    /// Captured at fire time (base, doubled under an active damage buff)
    pub damage: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticleKind {
    Circle,
    Text,
}

/// Ephemeral visual entity, owned exclusively by the state container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    pub id: Uuid,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// Remaining life; removed at zero
    pub life: f32,
    pub color: String,
    pub size: f32,
    pub kind: ParticleKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemType {
    Health,
    DoubleDamage,
    DoubleSpeed,
    TripleShot,
    Shield,
}

/// A pickup on the map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub x: f32,
    pub y: f32,
    #[serde(rename = "type")]
    pub kind: ItemType,
}

/// The aggregate world snapshot.
///
/// Exactly one mutable instance exists per participant: ground truth on the
/// host, a wholesale-overwritten mirror on every client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub room_id: String,
    pub room_name: String,
    pub is_host: bool,
    pub settings: GameSettings,
    pub players: Vec<Player>,
    pub bullets: Vec<Bullet>,
    pub particles: Vec<Particle>,
    pub items: Vec<Item>,
    pub walls: Vec<Rect>,
    /// The local viewer's own entity id
    pub my_id: Option<String>,
    /// All regions present, default 0
    pub region_scores: HashMap<Region, u32>,
    /// Accumulated tick units, display clock only
    pub game_time: f64,
    pub last_item_spawn_time: u64,
    pub game_over: bool,
    pub winner_region: Option<Region>,
}

impl GameState {
    /// Build the authoritative initial state on the host.
    ///
    /// Walls come from the room's wall stream; bot regions and spawns from
    /// the independent spawn stream, so every peer could reproduce them.
    /// The host tank itself spawns from the live RNG.
    pub fn init_host<R: Rng>(
        host_name: &str,
        host_region: Region,
        room_id: &str,
        room_name: &str,
        settings: GameSettings,
        rng: &mut R,
    ) -> Self {
        let walls = generate_walls(room_id);
        let mut spawn_rand = Mulberry32::from_str_seed(&format!("{room_id}{SPAWN_STREAM_SUFFIX}"));

        let (host_x, host_y) = safe_position(&walls, &mut || rng.gen::<f64>());
        let host_player = Player::new(HOST_PLAYER_ID, host_name, host_region, host_x, host_y);

        let mut players = vec![host_player];
        for i in 0..settings.bot_count {
            let region_idx = (spawn_rand.next_f64() * Region::ALL.len() as f64) as usize;
            let region = Region::ALL[region_idx.min(Region::ALL.len() - 1)];
            let (x, y) = safe_position(&walls, &mut || spawn_rand.next_f64());
            let mut bot = Player::new(format!("bot-{i}"), format!("Bot {}", i + 1), region, x, y);
            bot.is_bot = true;
            bot.rotation = spawn_rand.next_f64() as f32 * std::f32::consts::TAU;
            players.push(bot);
        }

        let region_scores = Region::ALL.iter().map(|&r| (r, 0)).collect();

        Self {
            room_id: room_id.to_string(),
            room_name: room_name.to_string(),
            is_host: true,
            settings,
            players,
            bullets: Vec::new(),
            particles: Vec::new(),
            items: Vec::new(),
            walls,
            my_id: Some(HOST_PLAYER_ID.to_string()),
            region_scores,
            game_time: 0.0,
            last_item_spawn_time: 0,
            game_over: false,
            winner_region: None,
        }
    }

    /// Add a newly joined human player at a live-rng safe position
    pub fn add_player<R: Rng>(&mut self, id: &str, name: &str, region: Region, rng: &mut R) {
        let (x, y) = safe_position(&self.walls, &mut || rng.gen::<f64>());
        self.players.push(Player::new(id, name, region, x, y));
    }

    /// Remove a departed player and any trace of its input slot ownership
    pub fn remove_player(&mut self, id: &str) {
        self.players.retain(|p| p.id != id);
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Human (non-bot) player count, the figure advertised to the lobby
    pub fn human_count(&self) -> usize {
        self.players.iter().filter(|p| !p.is_bot).count()
    }

    /// Tank hitbox as a rect, for wall sweeps
    pub fn tank_rect(x: f32, y: f32) -> Rect {
        Rect::centered_square(x, y, PLAYER_RADIUS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha8Rng;
    use rand::SeedableRng;

    fn settings_with_bots(n: u32) -> GameSettings {
        GameSettings {
            bot_count: n,
            ..GameSettings::default()
        }
    }

    #[test]
    fn init_builds_host_and_bots() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let state = GameState::init_host(
            "Ann",
            Region::Taipei,
            "123456",
            "Ann's room",
            settings_with_bots(3),
            &mut rng,
        );
        assert_eq!(state.players.len(), 4);
        assert_eq!(state.players[0].id, HOST_PLAYER_ID);
        assert!(!state.players[0].is_bot);
        assert!(state.players[1..].iter().all(|p| p.is_bot));
        assert!(state.players.iter().all(|p| p.hp == 100 && !p.dead));
        assert_eq!(state.region_scores.len(), Region::ALL.len());
        assert!(state.region_scores.values().all(|&s| s == 0));
        assert_eq!(state.my_id.as_deref(), Some(HOST_PLAYER_ID));
        assert!(state.is_host);
    }

    #[test]
    fn bot_placement_is_reproducible_per_room() {
        let mut rng_a = ChaCha8Rng::seed_from_u64(1);
        let mut rng_b = ChaCha8Rng::seed_from_u64(2);
        let a = GameState::init_host(
            "A",
            Region::Tainan,
            "424242",
            "a",
            settings_with_bots(5),
            &mut rng_a,
        );
        let b = GameState::init_host(
            "B",
            Region::Taipei,
            "424242",
            "b",
            settings_with_bots(5),
            &mut rng_b,
        );
        // Host spawns differ (live rng), but the seeded bot stream agrees
        for (pa, pb) in a.players[1..].iter().zip(&b.players[1..]) {
            assert_eq!(pa.region, pb.region);
            assert_eq!((pa.x, pa.y), (pb.x, pb.y));
            assert_eq!(pa.rotation, pb.rotation);
        }
    }

    #[test]
    fn add_and_remove_player() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut state = GameState::init_host(
            "Host",
            Region::Hsinchu,
            "777777",
            "room",
            settings_with_bots(0),
            &mut rng,
        );
        state.add_player("peer-1", "Joiner", Region::Kaohsiung, &mut rng);
        assert_eq!(state.players.len(), 2);
        let joined = state.player("peer-1").unwrap();
        assert_eq!(joined.region, Region::Kaohsiung);
        assert_eq!(joined.color, Region::Kaohsiung.color());

        state.remove_player("peer-1");
        assert!(state.player("peer-1").is_none());
    }

    #[test]
    fn buff_windows_are_timestamp_gated() {
        let mut p = Player::new("x", "X", Region::Yilan, 0.0, 0.0);
        p.damage_boost_until = 1000;
        assert!(p.damage_boost_active(999));
        assert!(!p.damage_boost_active(1000));
    }
}
