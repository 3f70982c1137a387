//! The authoritative per-tick simulation
//!
//! `advance` maps the previous snapshot plus the current input map to the
//! next snapshot. The host runs it once per frame; clients never run it.
//! Later phases observe earlier phases' mutations within the same tick
//! (a bullet fired this tick also flies this tick). Bot decisions, fire
//! timing and particle scatter draw from the injected live RNG; nothing
//! here requires re-simulation.

use std::collections::HashMap;

use rand::{Rng, RngCore};
use uuid::Uuid;

use super::audio::AudioPort;
use super::geometry::circles_overlap;
use super::map::safe_position;
use super::region::Region;
use super::state::{Bullet, GameState, Item, ItemType, Particle, ParticleKind, Player};
use super::tuning::{
    Tuning, BULLET_BOUNDS_MARGIN, BULLET_DAMAGE, BULLET_SPEED, FIRE_RATE_MS, HEAL_AMOUNT,
    ITEM_RADIUS, KILL_SCORE, MAP_SIZE, MAX_ITEMS, PARTICLE_FADE, PLAYER_RADIUS, PLAYER_SPEED,
    SHIELD_VALUE, TRIPLE_SHOT_SPREAD, WIN_SCORE,
};
use super::InputState;

/// Everything a tick needs besides state and inputs: the wall clock, the
/// live RNG, the Bernoulli rates and the audio sink.
pub struct TickContext<'a> {
    pub now_ms: u64,
    pub rng: &'a mut dyn RngCore,
    pub tuning: &'a Tuning,
    pub audio: &'a dyn AudioPort,
}

/// Advance the world by one tick.
///
/// Returns a fresh snapshot; the previous one is never aliased. Once
/// `game_over` is set no phase runs again, ever.
pub fn advance(
    prev: &GameState,
    inputs: &HashMap<String, InputState>,
    dt: f64,
    ctx: &mut TickContext<'_>,
) -> GameState {
    if prev.game_over {
        return prev.clone();
    }

    let mut next = prev.clone();

    // Win condition freezes the match before anything else moves
    for &region in Region::ALL.iter() {
        if next.region_scores.get(&region).copied().unwrap_or(0) >= WIN_SCORE {
            next.game_over = true;
            next.winner_region = Some(region);
            return next;
        }
    }

    spawn_items(&mut next, ctx);
    drive_humans(&mut next, inputs, ctx);
    drive_bots(&mut next, ctx);
    collect_items(&mut next, ctx);
    respawn_dead(&mut next, ctx);
    update_bullets(&mut next, ctx);
    decay_particles(&mut next);

    next.game_time += dt;
    next
}

/// Timed weighted item drops, capped in live count
fn spawn_items(state: &mut GameState, ctx: &mut TickContext<'_>) {
    let now = ctx.now_ms;
    if now.saturating_sub(state.last_item_spawn_time) <= state.settings.item_spawn_interval_ms {
        return;
    }
    state.last_item_spawn_time = now;
    if state.items.len() >= MAX_ITEMS {
        return;
    }

    let (x, y) = safe_position(&state.walls, &mut || ctx.rng.gen::<f64>());
    // 40% health, 20% damage, 20% speed, 10% triple, 10% shield
    let roll = ctx.rng.gen::<f64>();
    let kind = if roll > 0.9 {
        ItemType::Shield
    } else if roll > 0.8 {
        ItemType::TripleShot
    } else if roll > 0.6 {
        ItemType::DoubleSpeed
    } else if roll > 0.4 {
        ItemType::DoubleDamage
    } else {
        ItemType::Health
    };

    state.items.push(Item {
        id: Uuid::new_v4(),
        x,
        y,
        kind,
    });
}

/// Emit one bullet (three under triple shot), damage captured at fire time
fn fire_bullet(p: &mut Player, bullets: &mut Vec<Bullet>, now: u64, audio: &dyn AudioPort) {
    p.last_shot_time = now;
    audio.shot();

    let damage = if p.damage_boost_active(now) {
        BULLET_DAMAGE * 2
    } else {
        BULLET_DAMAGE
    };

    let mut offsets = vec![0.0_f32];
    if p.triple_shot_active(now) {
        offsets.push(-TRIPLE_SHOT_SPREAD);
        offsets.push(TRIPLE_SHOT_SPREAD);
    }

    let muzzle_x = p.x + p.rotation.cos() * (PLAYER_RADIUS + 5.0);
    let muzzle_y = p.y + p.rotation.sin() * (PLAYER_RADIUS + 5.0);

    for offset in offsets {
        let angle = p.rotation + offset;
        bullets.push(Bullet {
            id: Uuid::new_v4(),
            owner_id: p.id.clone(),
            owner_region: p.region,
            color: p.color.clone(),
            x: muzzle_x,
            y: muzzle_y,
            vx: angle.cos() * BULLET_SPEED,
            vy: angle.sin() * BULLET_SPEED,
            bounces: 0,
            damage,
        });
    }
}

/// Movement and firing for every human with a present input record
fn drive_humans(
    state: &mut GameState,
    inputs: &HashMap<String, InputState>,
    ctx: &mut TickContext<'_>,
) {
    let now = ctx.now_ms;
    let GameState {
        players,
        bullets,
        walls,
        ..
    } = state;

    for p in players.iter_mut() {
        if p.is_bot || p.dead {
            continue;
        }
        let Some(input) = inputs.get(&p.id) else {
            continue;
        };

        let speed = PLAYER_SPEED * if p.speed_boost_active(now) { 2.0 } else { 1.0 };

        let mut dx = 0.0_f32;
        let mut dy = 0.0_f32;
        if input.up {
            dy = -1.0;
        }
        if input.down {
            dy = 1.0;
        }
        if input.left {
            dx = -1.0;
        }
        if input.right {
            dx = 1.0;
        }

        if dx != 0.0 || dy != 0.0 {
            let len = (dx * dx + dy * dy).sqrt();
            dx /= len;
            dy /= len;

            let next_x = p.x + dx * speed;
            let next_y = p.y + dy * speed;

            p.rotation = dy.atan2(dx);

            // Axes resolve independently so a blocked tank slides along walls
            let rect_x = GameState::tank_rect(next_x, p.y);
            let rect_y = GameState::tank_rect(p.x, next_y);
            if !walls.iter().any(|w| rect_x.overlaps(w)) {
                p.x = next_x;
            }
            if !walls.iter().any(|w| rect_y.overlaps(w)) {
                p.y = next_y;
            }
        }

        if input.fire && now.saturating_sub(p.last_shot_time) > FIRE_RATE_MS {
            fire_bullet(p, bullets, now, ctx.audio);
        }
    }
}

/// Self-driven wander-and-shoot for bots, same physics path as humans
fn drive_bots(state: &mut GameState, ctx: &mut TickContext<'_>) {
    let now = ctx.now_ms;
    let GameState {
        players,
        bullets,
        walls,
        ..
    } = state;

    for bot in players.iter_mut() {
        if !bot.is_bot || bot.dead {
            continue;
        }

        let speed = (PLAYER_SPEED * 0.5) * if bot.speed_boost_active(now) { 2.0 } else { 1.0 };

        if ctx.rng.gen::<f64>() < ctx.tuning.bot_turn_chance {
            bot.rotation = ctx.rng.gen::<f32>() * std::f32::consts::TAU;
        }

        let next_x = bot.x + bot.rotation.cos() * speed;
        let next_y = bot.y + bot.rotation.sin() * speed;
        let probe = GameState::tank_rect(next_x, next_y);
        if !walls.iter().any(|w| probe.overlaps(w)) {
            bot.x = next_x;
            bot.y = next_y;
        } else {
            // Turn away instead of grinding against the wall
            bot.rotation += std::f32::consts::FRAC_PI_2;
        }

        if ctx.rng.gen::<f64>() < ctx.tuning.bot_fire_chance
            && now.saturating_sub(bot.last_shot_time) > FIRE_RATE_MS
        {
            fire_bullet(bot, bullets, now, ctx.audio);
        }
    }
}

/// Living tanks sweep up overlapping pickups
fn collect_items(state: &mut GameState, ctx: &mut TickContext<'_>) {
    let now = ctx.now_ms;
    let buff_duration = state.settings.buff_duration_ms;
    let GameState { players, items, .. } = state;

    for p in players.iter_mut() {
        if p.dead {
            continue;
        }
        let mut i = 0;
        while i < items.len() {
            let item = &items[i];
            if !circles_overlap(p.x, p.y, PLAYER_RADIUS, item.x, item.y, ITEM_RADIUS) {
                i += 1;
                continue;
            }
            let kind = item.kind;
            items.remove(i);
            ctx.audio.pickup();

            match kind {
                ItemType::Health => p.hp = (p.hp + HEAL_AMOUNT).min(p.max_hp),
                // Buffs reset their window, they never stack
                ItemType::DoubleDamage => p.damage_boost_until = now + buff_duration,
                ItemType::DoubleSpeed => p.speed_boost_until = now + buff_duration,
                ItemType::TripleShot => p.triple_shot_until = now + buff_duration,
                ItemType::Shield => p.shield = SHIELD_VALUE,
            }
        }
    }
}

/// Probabilistic revival with a full stat reset at a fresh safe position
fn respawn_dead(state: &mut GameState, ctx: &mut TickContext<'_>) {
    let GameState {
        players, walls, ..
    } = state;

    for p in players.iter_mut() {
        if !p.dead || ctx.rng.gen::<f64>() >= ctx.tuning.respawn_chance {
            continue;
        }
        p.dead = false;
        p.hp = p.max_hp;
        p.shield = 0;
        p.damage_boost_until = 0;
        p.speed_boost_until = 0;
        p.triple_shot_until = 0;
        let (x, y) = safe_position(walls, &mut || ctx.rng.gen::<f64>());
        p.x = x;
        p.y = y;
        ctx.audio.respawn();
    }
}

/// Bullet flight, single-bounce wall reflection, hit resolution, scoring
fn update_bullets(state: &mut GameState, ctx: &mut TickContext<'_>) {
    let GameState {
        players,
        bullets,
        particles,
        walls,
        region_scores,
        ..
    } = state;

    let mut surviving = Vec::with_capacity(bullets.len());

    'bullet: for mut b in bullets.drain(..) {
        b.x += b.vx;
        b.y += b.vy;

        for w in walls.iter() {
            if w.contains_point(b.x, b.y) {
                if b.bounces < 1 {
                    b.vx = -b.vx;
                    b.vy = -b.vy;
                    b.bounces += 1;
                    break;
                }
                continue 'bullet; // second wall contact destroys it
            }
        }

        for idx in 0..players.len() {
            let target = &players[idx];
            if target.dead || target.id == b.owner_id {
                continue;
            }
            // Friendly fire immunity is decided by the region captured at
            // fire time, for the whole life of the bullet
            if target.region == b.owner_region {
                continue;
            }
            let dx = target.x - b.x;
            let dy = target.y - b.y;
            if (dx * dx + dy * dy).sqrt() < PLAYER_RADIUS {
                apply_hit(players, idx, &b, particles, region_scores, ctx);
                continue 'bullet; // consumed
            }
        }

        let in_bounds = b.x > -BULLET_BOUNDS_MARGIN
            && b.x < MAP_SIZE + BULLET_BOUNDS_MARGIN
            && b.y > -BULLET_BOUNDS_MARGIN
            && b.y < MAP_SIZE + BULLET_BOUNDS_MARGIN;
        if in_bounds {
            surviving.push(b);
        }
    }

    *bullets = surviving;
}

/// Shield-first damage, death bookkeeping and kill scoring
fn apply_hit(
    players: &mut [Player],
    target_idx: usize,
    b: &Bullet,
    particles: &mut Vec<Particle>,
    region_scores: &mut HashMap<Region, u32>,
    ctx: &mut TickContext<'_>,
) {
    let died = {
        let target = &mut players[target_idx];
        let mut remaining = b.damage;

        if target.shield > 0 {
            let absorbed = remaining.min(target.shield);
            target.shield -= absorbed;
            remaining -= absorbed;
            for _ in 0..3 {
                particles.push(circle_spark(ctx.rng, b.x, b.y, 3.0, 0.5, "#06b6d4", 1.0, 2.0));
            }
        }

        if remaining > 0 {
            target.hp -= remaining;
            let color = target.color.clone();
            for _ in 0..5 {
                particles.push(circle_spark(ctx.rng, b.x, b.y, 5.0, 1.0, &color, 2.0, 4.0));
            }
        }

        if target.hp <= 0 {
            target.dead = true;
            ctx.audio.explosion();
            for _ in 0..20 {
                particles.push(circle_spark(
                    ctx.rng, target.x, target.y, 10.0, 1.5, "#ff0000", 3.0, 5.0,
                ));
            }
            particles.push(text_particle(
                target.x,
                target.y - 20.0,
                -1.0,
                2.0,
                "#fff",
                20.0,
                "KILL",
            ));
            true
        } else {
            false
        }
    };

    if died {
        if let Some(killer) = players.iter_mut().find(|k| k.id == b.owner_id) {
            killer.score += KILL_SCORE;
            *region_scores.entry(killer.region).or_insert(0) += KILL_SCORE;
            particles.push(text_particle(
                killer.x,
                killer.y - 20.0,
                -1.5,
                1.5,
                "#fbbf24",
                14.0,
                &format!("+{KILL_SCORE}"),
            ));
        }
    }
}

/// Drift, fade, drop at zero life
fn decay_particles(state: &mut GameState) {
    state.particles.retain_mut(|p| {
        p.x += p.vx;
        p.y += p.vy;
        p.life -= PARTICLE_FADE;
        p.life > 0.0
    });
}

fn circle_spark(
    rng: &mut dyn RngCore,
    x: f32,
    y: f32,
    spread: f32,
    life: f32,
    color: &str,
    size_min: f32,
    size_span: f32,
) -> Particle {
    Particle {
        id: Uuid::new_v4(),
        x,
        y,
        vx: (rng.gen::<f32>() - 0.5) * spread,
        vy: (rng.gen::<f32>() - 0.5) * spread,
        life,
        color: color.to_string(),
        size: rng.gen::<f32>() * size_span + size_min,
        kind: ParticleKind::Circle,
        text: None,
    }
}

fn text_particle(x: f32, y: f32, vy: f32, life: f32, color: &str, size: f32, text: &str) -> Particle {
    Particle {
        id: Uuid::new_v4(),
        x,
        y,
        vx: 0.0,
        vy,
        life,
        color: color.to_string(),
        size,
        kind: ParticleKind::Text,
        text: Some(text.to_string()),
    }
}
