//! Challenge record and the loader that materializes one from a
//! descriptor: one target pad plus its guarding planets, spawned from
//! the pool and configured to orbit, swing and eventually flee.

use glam::Vec2;
use rand::Rng;

use crate::content::{ChallengeConfig, FleeConfig, PlanetConfig};
use crate::geom::{rotate_cw_around, ScreenBounds};

use super::planet;
use super::pool::{keys, EntityId, EntityPool};
use super::scheduler::Scheduler;
use super::target::init_target;

/// A loaded challenge. Owned by the manager's active queue until
/// completed, then parked in the deallocated queue until its planets'
/// deferred disposal fires.
#[derive(Debug, Clone)]
pub struct Challenge {
    /// Unique per load, keys this challenge's deferred tasks.
    pub seq: u64,
    pub is_level: bool,
    pub name: String,
    /// Planets are returned to the pool this long after completion, which
    /// is exactly when their moons finish shrinking.
    pub dispose_planets_after: f32,
    pub target: EntityId,
    pub planets: Vec<EntityId>,
}

/// Descriptor `phi` is authored clockwise from the left of the pole, so
/// placement adds a half turn before rotating.
fn placement_angle(phi: f32) -> f32 {
    180.0 + phi
}

/// Materialize a challenge. The target lands at `pole + (rho, 0)` rotated
/// clockwise by the placement angle, clamped to the screen rect around
/// the pole; every planet spawns centered on the target.
#[allow(clippy::too_many_arguments)]
pub fn load_challenge<R: Rng + ?Sized>(
    pool: &mut EntityPool,
    scheduler: &mut Scheduler,
    rng: &mut R,
    bounds: &ScreenBounds,
    seq: u64,
    name: &str,
    config: &ChallengeConfig,
    is_level: bool,
    level_number: usize,
    max_level: usize,
    pole: Vec2,
) -> Option<Challenge> {
    let raw = pole + Vec2::new(config.polar_coords.rho, 0.0);
    let rotated = rotate_cw_around(raw, pole, placement_angle(config.polar_coords.phi));
    let pos = bounds.clamp_around(pole, rotated);

    let target = pool.spawn(keys::TARGET, pos)?;
    init_target(pool, target, name, pole, is_level, level_number, max_level, rng);

    let mut planets = Vec::with_capacity(config.planet_config_list.len());
    for planet_config in &config.planet_config_list {
        if let Some(id) = load_planet(pool, scheduler, planet_config, pos, &config.flee_config) {
            planets.push(id);
        }
    }

    Some(Challenge {
        seq,
        is_level,
        name: name.to_string(),
        dispose_planets_after: config.flee_config.shrink_time,
        target,
        planets,
    })
}

fn load_planet(
    pool: &mut EntityPool,
    scheduler: &mut Scheduler,
    config: &PlanetConfig,
    center: Vec2,
    flee: &FleeConfig,
) -> Option<EntityId> {
    let id = pool.spawn(keys::PLANET, center)?;
    if let Some(planet) = pool.planet_mut(id) {
        planet.radius = config.radius;
    }
    planet::create_orbit(pool, id, &config.moon_key_list);

    planet::start_orbiting(pool, id, &config.speed_config);

    if config.swing_config.enabled {
        if config.swing_config.swing_duration > 0.0 && config.swing_config.pause_duration > 0.0 {
            planet::start_swinging_with_pause(pool, id, &config.swing_config, scheduler);
        } else {
            planet::start_swinging(pool, id, &config.swing_config);
        }
    }

    planet::set_flee(pool, id, flee);
    Some(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{PolarCoords, SpeedConfig, SwingConfig};
    use crate::sim::MoonPhase;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn one_planet_config(rho: f32, phi: f32) -> ChallengeConfig {
        ChallengeConfig {
            polar_coords: PolarCoords { rho, phi },
            flee_config: FleeConfig {
                flee_speed: 3.0,
                shrink_time: 1.2,
            },
            planet_config_list: vec![PlanetConfig {
                radius: 1.5,
                moon_key_list: vec![
                    keys::SMALL_BLUE.to_string(),
                    keys::MEDIUM_PINK.to_string(),
                ],
                swing_config: SwingConfig::default(),
                speed_config: SpeedConfig {
                    initial_speed: 2.0,
                    clockwise: true,
                    ..Default::default()
                },
            }],
        }
    }

    fn load(
        pool: &mut EntityPool,
        scheduler: &mut Scheduler,
        config: &ChallengeConfig,
        pole: Vec2,
    ) -> Challenge {
        let mut rng = Pcg32::seed_from_u64(11);
        load_challenge(
            pool,
            scheduler,
            &mut rng,
            &ScreenBounds::design(),
            1,
            "C_1_1",
            config,
            false,
            0,
            10,
            pole,
        )
        .unwrap()
    }

    #[test]
    fn test_target_placement_below_pole_at_phi_zero() {
        // phi 0 is a half turn from (rho, 0): left of the pole
        let mut pool = EntityPool::with_defaults();
        let mut scheduler = Scheduler::new();
        let pole = Vec2::new(0.0, 10.0);
        let challenge = load(&mut pool, &mut scheduler, &one_planet_config(3.0, 0.0), pole);
        let pos = pool.pos(challenge.target).unwrap();
        assert!(pos.abs_diff_eq(Vec2::new(-3.0, 10.0), 1e-4));
    }

    #[test]
    fn test_target_placement_rotates_clockwise() {
        let mut pool = EntityPool::with_defaults();
        let mut scheduler = Scheduler::new();
        let pole = Vec2::new(0.0, 10.0);
        // 180 + 90 = 270 degrees clockwise from (rho, 0): straight up
        let challenge = load(&mut pool, &mut scheduler, &one_planet_config(3.0, 90.0), pole);
        let pos = pool.pos(challenge.target).unwrap();
        assert!(pos.abs_diff_eq(Vec2::new(0.0, 13.0), 1e-4));
    }

    #[test]
    fn test_target_clamped_to_screen_rect() {
        let mut pool = EntityPool::with_defaults();
        let mut scheduler = Scheduler::new();
        let bounds = ScreenBounds::design();
        let pole = Vec2::new(0.0, 10.0);
        let mut rng = Pcg32::seed_from_u64(2);
        let config = one_planet_config(30.0, 45.0);
        let challenge = load_challenge(
            &mut pool, &mut scheduler, &mut rng, &bounds, 1, "C", &config, false, 0, 10, pole,
        )
        .unwrap();
        let pos = pool.pos(challenge.target).unwrap();
        assert!((pos.x - pole.x).abs() <= bounds.half_width + 1e-4);
        assert!((pos.y - pole.y).abs() <= bounds.half_height + 1e-4);
    }

    #[test]
    fn test_planets_spawn_on_target() {
        let mut pool = EntityPool::with_defaults();
        let mut scheduler = Scheduler::new();
        let challenge = load(
            &mut pool,
            &mut scheduler,
            &one_planet_config(4.0, 30.0),
            Vec2::new(0.0, 10.0),
        );
        assert_eq!(challenge.planets.len(), 1);
        let target_pos = pool.pos(challenge.target).unwrap();
        let planet = pool.planet(challenge.planets[0]).unwrap();
        assert!(planet.pos.abs_diff_eq(target_pos, 1e-5));
        assert_eq!(planet.moons.len(), 2);
        // orbit already configured, motion gated on visibility
        for id in &planet.moons {
            let moon = pool.moon(*id).unwrap();
            assert_eq!(moon.phase, MoonPhase::Orbit);
            assert!(!moon.simulating);
        }
        assert!((challenge.dispose_planets_after - 1.2).abs() < 1e-6);
    }

    #[test]
    fn test_timed_swing_schedules_moon_timers() {
        let mut pool = EntityPool::with_defaults();
        let mut scheduler = Scheduler::new();
        let mut config = one_planet_config(4.0, 0.0);
        config.planet_config_list[0].swing_config = SwingConfig {
            enabled: true,
            min_radius: 1.0,
            max_radius: 2.0,
            swinging_speed: 1.0,
            swing_duration: 2.0,
            pause_duration: 1.0,
        };
        let challenge = load(&mut pool, &mut scheduler, &config, Vec2::ZERO);
        // stop + restart per moon
        assert_eq!(scheduler.pending(), 4);
        for id in &pool.planet(challenge.planets[0]).unwrap().moons {
            assert_eq!(pool.moon(*id).unwrap().phase, MoonPhase::Swing);
        }
    }

    #[test]
    fn test_untimed_swing_schedules_nothing() {
        let mut pool = EntityPool::with_defaults();
        let mut scheduler = Scheduler::new();
        let mut config = one_planet_config(4.0, 0.0);
        config.planet_config_list[0].swing_config = SwingConfig {
            enabled: true,
            min_radius: 1.0,
            max_radius: 2.0,
            swinging_speed: 1.0,
            swing_duration: 0.0,
            pause_duration: 0.0,
        };
        load(&mut pool, &mut scheduler, &config, Vec2::ZERO);
        assert_eq!(scheduler.pending(), 0);
    }
}
