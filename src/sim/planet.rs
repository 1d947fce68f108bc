//! Planet body: packs an ordered ring of moons (and gaps) around its
//! circumference and fans operations out to every moon it owns.

use glam::Vec2;
use std::f64::consts::TAU;

use crate::content::{FleeConfig, SpeedConfig, SwingConfig};
use crate::geom::{central_angle, rotate_cw_around, Circle};

use super::pool::{EntityId, EntityPool, BIG_RADIUS};
use super::scheduler::Scheduler;

pub const SMALL_GAP_KEY: &str = "SMALL_GAP";
pub const SMALL_GAP_RADIUS: f32 = 0.2;
pub const MEDIUM_GAP_KEY: &str = "MEDIUM_GAP";
pub const MEDIUM_GAP_RADIUS: f32 = 0.3;
pub const BIG_GAP_KEY: &str = "BIG_GAP";
pub const BIG_GAP_RADIUS: f32 = 0.4;

fn gap_radius(key: &str) -> Option<f32> {
    match key {
        SMALL_GAP_KEY => Some(SMALL_GAP_RADIUS),
        MEDIUM_GAP_KEY => Some(MEDIUM_GAP_RADIUS),
        BIG_GAP_KEY => Some(BIG_GAP_RADIUS),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct PlanetState {
    pub pos: Vec2,
    pub radius: f32,
    /// Ring order, first placed first.
    pub moons: Vec<EntityId>,
    pub simulating: bool,
}

impl PlanetState {
    pub fn new(pos: Vec2) -> Self {
        Self {
            pos,
            radius: 0.0,
            moons: Vec::new(),
            simulating: false,
        }
    }

    /// Circle covering the planet and its moon ring, for visibility tests.
    pub fn ring_circle(&self) -> Circle {
        Circle::new(self.pos, self.radius + 2.0 * BIG_RADIUS)
    }
}

/// Place each item of `moon_keys` by accumulating the central angle its
/// chord subtends on the planet circumference. Adjacent items end up
/// tangent: each step rotates by half the previous angle plus half the
/// current one, with the first item staying at the start offset. Packing
/// halts, returning the overflowing moon to the pool, once the running
/// total would pass a full turn.
pub fn create_orbit(pool: &mut EntityPool, planet_id: EntityId, moon_keys: &[String]) {
    let Some(planet) = pool.planet(planet_id) else {
        return;
    };
    let center = planet.pos;
    let radius = planet.radius;
    let seed_pos = center + Vec2::new(radius, 0.0);

    let mut previous_angle: f64 = 0.0;
    let mut rotate_angle: f64 = 0.0;
    let mut total_angle: f64 = 0.0;

    for key in moon_keys {
        let (moon_id, angle) = if let Some(gap) = gap_radius(key) {
            (None, f64::from(central_angle(2.0 * gap, radius)))
        } else {
            let Some(id) = pool.spawn(key, seed_pos) else {
                continue;
            };
            let chord = pool.moon(id).map_or(0.0, |m| 2.0 * m.hit_radius);
            (Some(id), f64::from(central_angle(chord, radius)))
        };

        total_angle += angle;
        if total_angle <= TAU {
            if previous_angle > 0.0 {
                rotate_angle += previous_angle / 2.0 + angle / 2.0;
            }
            previous_angle = angle;

            if let Some(id) = moon_id {
                let pos = rotate_cw_around(seed_pos, center, (rotate_angle as f32).to_degrees());
                if let Some(moon) = pool.moon_mut(id) {
                    moon.pos = pos;
                    moon.attach(center);
                }
                if let Some(planet) = pool.planet_mut(planet_id) {
                    planet.moons.push(id);
                }
            }
        } else {
            if let Some(id) = moon_id {
                pool.release(id);
            }
            break;
        }
    }
}

fn moons_of(pool: &EntityPool, planet_id: EntityId) -> Vec<EntityId> {
    pool.planet(planet_id).map(|p| p.moons.clone()).unwrap_or_default()
}

pub fn start_orbiting(pool: &mut EntityPool, planet_id: EntityId, config: &SpeedConfig) {
    for id in moons_of(pool, planet_id) {
        if let Some(moon) = pool.moon_mut(id) {
            moon.orbit(config);
        }
    }
}

pub fn start_swinging(pool: &mut EntityPool, planet_id: EntityId, config: &SwingConfig) {
    for id in moons_of(pool, planet_id) {
        if let Some(moon) = pool.moon_mut(id) {
            moon.start_swinging(config);
        }
    }
}

pub fn start_swinging_with_pause(
    pool: &mut EntityPool,
    planet_id: EntityId,
    config: &SwingConfig,
    scheduler: &mut Scheduler,
) {
    for id in moons_of(pool, planet_id) {
        if let Some(moon) = pool.moon_mut(id) {
            moon.start_swinging_with_pause(config, id, scheduler);
        }
    }
}

pub fn stop_swinging(pool: &mut EntityPool, planet_id: EntityId) {
    for id in moons_of(pool, planet_id) {
        if let Some(moon) = pool.moon_mut(id) {
            moon.stop_swinging();
        }
    }
}

pub fn set_flee(pool: &mut EntityPool, planet_id: EntityId, config: &FleeConfig) {
    for id in moons_of(pool, planet_id) {
        if let Some(moon) = pool.moon_mut(id) {
            moon.set_flee(config.flee_speed, config.shrink_time);
        }
    }
}

pub fn start_flee(pool: &mut EntityPool, planet_id: EntityId, scheduler: &mut Scheduler) {
    for id in moons_of(pool, planet_id) {
        if let Some(moon) = pool.moon_mut(id) {
            moon.start_flee(id, scheduler);
        }
    }
}

pub fn slow_down(pool: &mut EntityPool, planet_id: EntityId) {
    for id in moons_of(pool, planet_id) {
        if let Some(moon) = pool.moon_mut(id) {
            moon.slow_down();
        }
    }
}

pub fn sleep_animation(pool: &mut EntityPool, planet_id: EntityId) {
    for id in moons_of(pool, planet_id) {
        if let Some(moon) = pool.moon_mut(id) {
            moon.sleep();
        }
    }
}

pub fn idle_animation(pool: &mut EntityPool, planet_id: EntityId) {
    for id in moons_of(pool, planet_id) {
        if let Some(moon) = pool.moon_mut(id) {
            moon.wake();
        }
    }
}

pub fn pause_animations(pool: &mut EntityPool, planet_id: EntityId, pause: bool) {
    for id in moons_of(pool, planet_id) {
        if let Some(moon) = pool.moon_mut(id) {
            moon.animations_paused = pause;
        }
    }
}

/// Return every moon to the pool. The planet itself goes back separately.
pub fn dispose_moons(pool: &mut EntityPool, planet_id: EntityId) {
    for id in moons_of(pool, planet_id) {
        pool.release(id);
    }
    if let Some(planet) = pool.planet_mut(planet_id) {
        planet.moons.clear();
    }
}

/// Start simulating the whole ring at once. Idempotent.
pub fn simulate_orbit(pool: &mut EntityPool, planet_id: EntityId) {
    let already = pool.planet(planet_id).is_none_or(|p| p.simulating);
    if already {
        return;
    }
    if let Some(planet) = pool.planet_mut(planet_id) {
        planet.simulating = true;
    }
    for id in moons_of(pool, planet_id) {
        if let Some(moon) = pool.moon_mut(id) {
            moon.simulate();
        }
    }
}
