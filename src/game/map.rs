//! Deterministic map generation and spawn placement

use tracing::debug;

use super::geometry::Rect;
use super::rng::Mulberry32;
use super::tuning::{
    MAP_SIZE, OBSTACLE_COUNT, PLAYER_RADIUS, SPAWN_ATTEMPTS, SPAWN_BUFFER,
};

/// Suffix distinguishing the spawn stream from the wall stream
pub const SPAWN_STREAM_SUFFIX: &str = "_spawns";

/// Generate the wall layout for a room code.
///
/// Four border walls enclose the play area, then a fixed number of
/// obstacles are drawn from the seeded stream. Same code, same layout, on
/// every peer that ever computes it. Obstacles may overlap each other.
pub fn generate_walls(room_id: &str) -> Vec<Rect> {
    let mut rand = Mulberry32::from_str_seed(room_id);
    let mut walls = Vec::with_capacity(4 + OBSTACLE_COUNT);

    walls.push(Rect::new(-50.0, -50.0, MAP_SIZE + 100.0, 50.0));
    walls.push(Rect::new(-50.0, MAP_SIZE, MAP_SIZE + 100.0, 50.0));
    walls.push(Rect::new(-50.0, 0.0, 50.0, MAP_SIZE));
    walls.push(Rect::new(MAP_SIZE, 0.0, 50.0, MAP_SIZE));

    for _ in 0..OBSTACLE_COUNT {
        let x = rand.next_f64() as f32 * (MAP_SIZE - 200.0) + 100.0;
        let y = rand.next_f64() as f32 * (MAP_SIZE - 200.0) + 100.0;
        let w = rand.next_f64() as f32 * 150.0 + 50.0;
        let h = rand.next_f64() as f32 * 150.0 + 50.0;
        walls.push(Rect::new(x, y, w, h));
    }

    walls
}

/// Find a position whose inflated tank box clears every wall.
///
/// Draws come from the caller (a seeded stream for reproducible placement,
/// a live RNG for respawns and item drops). After the attempt budget the
/// map center is returned; degraded but never a failure.
pub fn safe_position(walls: &[Rect], draw: &mut dyn FnMut() -> f64) -> (f32, f32) {
    for _ in 0..SPAWN_ATTEMPTS {
        let x = (draw() as f32) * (MAP_SIZE - 100.0) + 50.0;
        let y = (draw() as f32) * (MAP_SIZE - 100.0) + 50.0;
        let probe = Rect::centered_square(x, y, PLAYER_RADIUS + SPAWN_BUFFER);
        if !walls.iter().any(|w| probe.overlaps(w)) {
            return (x, y);
        }
    }
    debug!("No safe position found, falling back to map center");
    (MAP_SIZE / 2.0, MAP_SIZE / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_room_code_same_walls() {
        let a = generate_walls("482913");
        let b = generate_walls("482913");
        assert_eq!(a, b);
    }

    #[test]
    fn different_codes_differ() {
        let a = generate_walls("482913");
        let b = generate_walls("482914");
        assert_ne!(a, b);
    }

    #[test]
    fn wall_count_and_border() {
        let walls = generate_walls("000001");
        assert_eq!(walls.len(), 4 + OBSTACLE_COUNT);
        // Border walls come first and enclose the play area
        assert_eq!(walls[0], Rect::new(-50.0, -50.0, MAP_SIZE + 100.0, 50.0));
        assert_eq!(walls[3], Rect::new(MAP_SIZE, 0.0, 50.0, MAP_SIZE));
    }

    #[test]
    fn obstacles_respect_margins() {
        let walls = generate_walls("margin");
        for wall in walls.iter().skip(4) {
            assert!(wall.x >= 100.0 && wall.x <= MAP_SIZE - 100.0);
            assert!(wall.y >= 100.0 && wall.y <= MAP_SIZE - 100.0);
            assert!(wall.w >= 50.0 && wall.w <= 200.0);
            assert!(wall.h >= 50.0 && wall.h <= 200.0);
        }
    }

    #[test]
    fn safe_position_clears_walls() {
        let walls = generate_walls("555555");
        let mut rand = Mulberry32::from_str_seed("placement");
        for _ in 0..20 {
            let (x, y) = safe_position(&walls, &mut || rand.next_f64());
            let probe = Rect::centered_square(x, y, PLAYER_RADIUS + SPAWN_BUFFER);
            let clear = !walls.iter().any(|w| probe.overlaps(w));
            let center = (x, y) == (MAP_SIZE / 2.0, MAP_SIZE / 2.0);
            assert!(clear || center);
        }
    }

    #[test]
    fn exhausted_search_falls_back_to_center() {
        // One wall covering everything: no draw can succeed
        let walls = vec![Rect::new(
            -200.0,
            -200.0,
            MAP_SIZE + 400.0,
            MAP_SIZE + 400.0,
        )];
        let mut rand = Mulberry32::from_str_seed("hopeless");
        let (x, y) = safe_position(&walls, &mut || rand.next_f64());
        assert_eq!((x, y), (MAP_SIZE / 2.0, MAP_SIZE / 2.0));
    }
}
