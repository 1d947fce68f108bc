//! Frame orchestrator. Owns every simulation collaborator and advances
//! them through the fixed, logic and late passes, routes collisions,
//! dispatches due scheduler tasks and sequences the cross-cutting flows:
//! pause, slow motion, game over, reload and the grand finale.
//!
//! Time handling: the scheduler and all state machines run on scaled
//! game time; only the game-over freeze counts real seconds, so it works
//! while the simulation is paused.

use glam::Vec2;
use log::{error, info};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::consts::{INITIAL_POLE_Y, SIM_DT};
use crate::content::ContentSource;
use crate::geom::{Circle, ScreenBounds};
use crate::services::{AudioClip, MusicTrack, Services};
use crate::settings::DetailPreset;

use super::health::Health;
use super::manager::ChallengeManager;
use super::planet;
use super::player::{PlayerEvent, PlayerPhase, PlayerState};
use super::pool::{keys, EntityId, EntityPool, FIREWORK_KEYS, POWER_UP_KEYS};
use super::scheduler::{Scheduler, TaskKind, TaskOwner};
use super::target::PowerColor;

/// The reload pole sits this far above where the camera came to rest.
const RELOAD_OFFSET: f32 = 10.0;
const GAME_OVER_PAUSE_TIME: f32 = 1.0;
const SLOW_DOWN_FACTOR: f32 = 0.02;
const SLOW_DOWN_LENGTH: f32 = 2.0;
const FIREWORK_OFFSET_X: f32 = 2.0;
const FIREWORK_OFFSET_Y: f32 = 4.0;
const FIREWORK_MAX_DELAY: f32 = 0.2;
/// How long a spawned firework burns before going back to the pool.
const FIREWORK_LIFETIME: f32 = 2.0;
const GOAL_BOUNCE_DELAY: f32 = 3.0;

const PLAYER_HIT_RADIUS: f32 = 0.3;
const TARGET_PAD_RADIUS: f32 = 0.5;
const COLLECTIBLE_RADIUS: f32 = 0.3;

pub struct Game {
    pool: EntityPool,
    scheduler: Scheduler,
    manager: ChallengeManager,
    player: PlayerState,
    health: Health,
    services: Services,
    rng: Pcg32,
    bounds: ScreenBounds,
    preset: DetailPreset,

    time_scale: f32,
    slow_motion: bool,
    paused: bool,
    accumulator: f32,
    /// Real seconds left in the game-over freeze frame.
    freeze_remaining: Option<f32>,

    grand_finale: bool,
    goal: Option<EntityId>,
    fireworks_anchor: Vec2,
    /// Live fireworks and their remaining burn time.
    fireworks: Vec<(EntityId, f32)>,

    inside_target: Option<EntityId>,
    last_cam: Vec2,
}

impl Game {
    /// `None` when the map descriptor cannot be loaded. The run starts
    /// at the persisted progress level, already aiming at the first
    /// target.
    pub fn new(
        content: Box<dyn ContentSource>,
        mut services: Services,
        preset: DetailPreset,
        seed: u64,
    ) -> Option<Self> {
        let bounds = ScreenBounds::design();
        let mut manager = ChallengeManager::new(content, bounds)?;
        let mut pool = EntityPool::with_defaults();
        let mut scheduler = Scheduler::new();
        let mut rng = Pcg32::seed_from_u64(seed);

        let from_level = services.progress.from_level().max(1);
        let pole = Vec2::new(0.0, INITIAL_POLE_Y);
        manager.load_from_level(&mut pool, &mut scheduler, &mut rng, from_level, pole);
        // crossing the first level marker credits the level back
        manager.set_level(from_level - 1);

        let mut player = PlayerState::new(Vec2::ZERO);
        services.audio.play_music(MusicTrack::Game);
        player.aim_forward(&mut manager, &mut pool, &mut services);

        Some(Self {
            pool,
            scheduler,
            manager,
            player,
            health: Health::new(),
            services,
            rng,
            bounds,
            preset,
            time_scale: 1.0,
            slow_motion: false,
            paused: false,
            accumulator: 0.0,
            freeze_remaining: None,
            grand_finale: false,
            goal: None,
            fireworks_anchor: Vec2::ZERO,
            fireworks: Vec::new(),
            inside_target: None,
            last_cam: Vec2::ZERO,
        })
    }

    // -----------------------------------------------------------------
    // Queries

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    pub fn manager(&self) -> &ChallengeManager {
        &self.manager
    }

    pub fn pool(&self) -> &EntityPool {
        &self.pool
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_grand_finale(&self) -> bool {
        self.grand_finale
    }

    pub fn is_game_over(&self) -> bool {
        self.player.is_dead()
    }

    pub fn score(&self) -> u32 {
        self.player.score()
    }

    // -----------------------------------------------------------------
    // Frame loop

    /// Advance one frame by `real_dt` unscaled seconds.
    pub fn update(&mut self, real_dt: f32) {
        if let Some(remaining) = self.freeze_remaining {
            let left = remaining - real_dt;
            if left > 0.0 {
                self.freeze_remaining = Some(left);
                return;
            }
            self.freeze_remaining = None;
            self.services.audio.play_music(MusicTrack::GameOver);
            self.set_paused(false);
            self.do_slow_motion();
            self.player.fall(&mut self.services);
        }

        if self.paused {
            return;
        }

        if self.slow_motion {
            self.time_scale =
                (self.time_scale + real_dt / SLOW_DOWN_LENGTH).clamp(0.0, 1.0);
            self.slow_motion = self.time_scale < 1.0;
        }

        let dt = real_dt * self.time_scale;

        // fixed pass
        self.accumulator += dt;
        while self.accumulator >= SIM_DT {
            self.accumulator -= SIM_DT;
            self.fixed_step();
        }

        // collision transitions resolve before any queue bookkeeping
        self.route_collisions();

        // logic pass
        self.player.logic_update(
            dt,
            self.grand_finale,
            &mut self.manager,
            &mut self.pool,
            &mut self.scheduler,
            &mut self.services,
        );
        for planet_id in self.manager.live_planets() {
            let moons = match self.pool.planet(planet_id) {
                Some(planet) => planet.moons.clone(),
                None => continue,
            };
            for moon_id in moons {
                if let Some(moon) = self.pool.moon_mut(moon_id) {
                    moon.logic_update(dt);
                }
            }
        }
        self.dispatch_due_tasks(dt);
        self.age_fireworks(dt);

        // late pass
        self.visibility_sweep();
    }

    fn fixed_step(&mut self) {
        let event =
            self.player
                .fixed_update(SIM_DT, &self.manager, &self.pool, &mut self.services);
        if let Some(PlayerEvent::DisposeGame(cam)) = event {
            self.dispose_game(cam);
        }

        for planet_id in self.manager.live_planets() {
            let moons = match self.pool.planet(planet_id) {
                Some(planet) => planet.moons.clone(),
                None => continue,
            };
            for moon_id in moons {
                if let Some(moon) = self.pool.moon_mut(moon_id) {
                    moon.fixed_update(SIM_DT);
                }
            }
        }
    }

    fn dispatch_due_tasks(&mut self, dt: f32) {
        for (owner, kind) in self.scheduler.advance(dt) {
            match owner {
                TaskOwner::Moon(id) => match kind {
                    TaskKind::StopSwinging => {
                        if let Some(moon) = self.pool.moon_mut(id) {
                            moon.stop_swinging();
                        }
                    }
                    TaskKind::RestartSwinging => {
                        if let Some(moon) = self.pool.moon_mut(id) {
                            moon.restart_swinging(id, &mut self.scheduler);
                        }
                    }
                    _ => {}
                },
                TaskOwner::Challenge(_) => {
                    if kind == TaskKind::DisposePlanets {
                        self.manager.dispose_planets_due(&mut self.pool);
                    }
                }
                TaskOwner::Player => {
                    let event =
                        self.player
                            .handle_task(kind, &mut self.scheduler, &mut self.services);
                    if let Some(PlayerEvent::GameOver) = event {
                        self.game_over();
                    }
                }
                TaskOwner::Game => match kind {
                    TaskKind::SpawnFirework => self.spawn_firework(),
                    TaskKind::GoalBounce => self.goal_bounce(),
                    _ => {}
                },
            }
        }
    }

    // -----------------------------------------------------------------
    // Collisions

    fn route_collisions(&mut self) {
        if !self.player.colliders_enabled {
            return;
        }
        let player_circle = Circle::new(self.player.pos, PLAYER_HIT_RADIUS * self.player.scale);

        for planet_id in self.manager.live_planets() {
            let moons = match self.pool.planet(planet_id) {
                Some(planet) => planet.moons.clone(),
                None => continue,
            };
            for moon_id in moons {
                let hitbox = match self.pool.moon(moon_id) {
                    Some(moon) if moon.hitbox_enabled && moon.simulating => {
                        Circle::new(moon.pos, moon.hit_radius * moon.scale)
                    }
                    _ => continue,
                };
                if !player_circle.overlaps(&hitbox) {
                    continue;
                }
                let event = self.health.moon_collision(
                    &mut self.player,
                    &mut self.pool,
                    moon_id,
                    &mut self.services,
                );
                if let Some(PlayerEvent::GameOver) = event {
                    self.game_over();
                    return;
                }
            }
        }

        let mut collectibles: Vec<EntityId> = Vec::new();
        for key in POWER_UP_KEYS {
            collectibles.extend(self.pool.active_ids(key));
        }
        collectibles.extend(self.pool.active_ids(keys::CANDY));
        for id in collectibles {
            let hitbox = match self.pool.collectible(id) {
                Some(collectible) if !collectible.taken => {
                    Circle::new(collectible.pos, COLLECTIBLE_RADIUS)
                }
                _ => continue,
            };
            if player_circle.overlaps(&hitbox) {
                self.health.collectible_collision(
                    &mut self.player,
                    &mut self.pool,
                    id,
                    &mut self.rng,
                    &mut self.scheduler,
                    &mut self.services,
                );
            }
        }

        self.route_target_triggers(&player_circle);
    }

    fn route_target_triggers(&mut self, player_circle: &Circle) {
        let mut overlapping = None;
        for id in self.pool.active_ids(keys::TARGET) {
            if let Some(pos) = self.pool.pos(id)
                && player_circle.overlaps(&Circle::new(pos, TARGET_PAD_RADIUS))
            {
                overlapping = Some(id);
                break;
            }
        }

        if let Some(current) = self.inside_target
            && overlapping != Some(current)
        {
            self.health.target_exit();
            self.inside_target = None;
        }

        if self.inside_target.is_none()
            && let Some(id) = overlapping
            && matches!(
                self.player.phase,
                PlayerPhase::JumpForward | PlayerPhase::JumpBackward
            )
        {
            let event = self.health.target_enter(
                &mut self.player,
                &mut self.manager,
                &mut self.pool,
                id,
                &mut self.rng,
                &mut self.scheduler,
                &mut self.services,
            );
            self.inside_target = Some(id);
            if let Some(PlayerEvent::GrandFinale) = event {
                self.begin_grand_finale(id);
            }
        }
    }

    /// Planets start simulating once their moon ring touches the view
    /// rect around the camera, widened by the preset's margin.
    fn visibility_sweep(&mut self) {
        let margin = self.preset.view_margin();
        let view = ScreenBounds {
            half_width: self.bounds.half_width + margin,
            half_height: self.bounds.half_height + margin,
        };
        let anchor = self.player.cam_pos();

        for planet_id in self.manager.live_planets() {
            let ring = match self.pool.planet(planet_id) {
                Some(planet) => planet.ring_circle(),
                None => continue,
            };
            if view.intersects_circle(anchor, &ring) {
                planet::simulate_orbit(&mut self.pool, planet_id);
            }
        }
    }

    // -----------------------------------------------------------------
    // Input and store

    /// A tap anywhere outside the UI.
    pub fn jump(&mut self) {
        self.player
            .aim_forward(&mut self.manager, &mut self.pool, &mut self.services);
    }

    /// Store purchases cover the counter-based powers only.
    pub fn buy_power(&mut self, color: PowerColor, magnitude: i32) {
        self.player
            .set_awake(true, &mut self.manager, &mut self.pool, &mut self.services);
        match color {
            PowerColor::Red
            | PowerColor::Orange
            | PowerColor::Green
            | PowerColor::Yellow => {
                self.player
                    .apply_power_up(color, magnitude, &mut self.scheduler, &mut self.services);
            }
            _ => error!("power {color:?} is not for sale"),
        }
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
        self.services.audio.set_paused(paused);
    }

    pub fn pause_animations(&mut self, pause: bool) {
        self.player.pause_animations(pause);
        self.manager.pause_animations(&mut self.pool, pause);
    }

    // -----------------------------------------------------------------
    // Game over and reload

    fn game_over(&mut self) {
        self.services.hud.set_pause_enabled(false);
        self.services.hud.set_store_enabled(false);
        self.player.rip(
            &mut self.manager,
            &mut self.pool,
            &mut self.scheduler,
            &mut self.services,
        );
        self.services.lights.init();
        self.services.audio.play(AudioClip::Hit);
        self.set_paused(true);
        self.freeze_remaining = Some(GAME_OVER_PAUSE_TIME);
        info!("game over");
    }

    fn do_slow_motion(&mut self) {
        self.slow_motion = true;
        self.time_scale = SLOW_DOWN_FACTOR;
    }

    fn dispose_game(&mut self, cam: Vec2) {
        self.last_cam = cam;
        self.manager.dispose(&mut self.pool, &mut self.scheduler);
        info!("game disposed");
    }

    /// Rebuild the world under the resting camera and revive the player.
    pub fn reload(&mut self) {
        let level = self.manager.level();
        let pole = self.last_cam + Vec2::new(0.0, RELOAD_OFFSET);
        self.manager
            .load_from_level(&mut self.pool, &mut self.scheduler, &mut self.rng, level, pole);
        // the level marker at the head of the rebuilt path re-credits it
        self.manager.set_level(level.saturating_sub(1));

        self.inside_target = None;
        self.health.target_exit();
        self.player
            .reload(&mut self.manager, &mut self.pool, &mut self.services);
        self.services.hud.set_pause_enabled(true);
        self.services.audio.play_music(MusicTrack::Game);
    }

    // -----------------------------------------------------------------
    // Grand finale

    fn begin_grand_finale(&mut self, goal: EntityId) {
        self.grand_finale = true;
        self.goal = Some(goal);
        self.fireworks_anchor = self.player.pos;
        self.services.lights.endless_party();
        self.services.audio.play_music(MusicTrack::GrandFinale);
        self.spawn_firework();
        self.goal_bounce();
        info!("grand finale");
    }

    fn spawn_firework(&mut self) {
        let key = FIREWORK_KEYS[self.rng.random_range(0..FIREWORK_KEYS.len())];
        let offset = Vec2::new(
            self.rng.random_range(-FIREWORK_OFFSET_X..=FIREWORK_OFFSET_X),
            self.rng.random_range(-FIREWORK_OFFSET_Y..=FIREWORK_OFFSET_Y),
        );
        if let Some(id) = self.pool.spawn(key, self.fireworks_anchor + offset) {
            self.fireworks.push((id, FIREWORK_LIFETIME));
        }
        self.services.audio.play(AudioClip::Firework);
        let delay = self.rng.random_range(0.0..=FIREWORK_MAX_DELAY);
        self.scheduler
            .schedule(TaskOwner::Game, TaskKind::SpawnFirework, delay);
    }

    /// Burned-out fireworks go straight back to the pool.
    fn age_fireworks(&mut self, dt: f32) {
        if self.fireworks.is_empty() {
            return;
        }
        let pool = &mut self.pool;
        self.fireworks.retain_mut(|(id, left)| {
            *left -= dt;
            if *left > 0.0 {
                true
            } else {
                pool.release(*id);
                false
            }
        });
    }

    fn goal_bounce(&mut self) {
        if let Some(goal) = self.goal
            && let Some(target) = self.pool.target_mut(goal)
        {
            target.bounce();
        }
        self.scheduler
            .schedule(TaskOwner::Game, TaskKind::GoalBounce, GOAL_BOUNCE_DELAY);
    }

    /// Tear the celebration down on the way out of the scene.
    pub fn dispose_grand_finale(&mut self) {
        if !self.grand_finale {
            return;
        }
        self.scheduler.cancel_owner(TaskOwner::Game);
        for (id, _) in self.fireworks.drain(..) {
            self.pool.release(id);
        }
        self.manager.dispose(&mut self.pool, &mut self.scheduler);
        self.grand_finale = false;
    }

    #[cfg(test)]
    pub(crate) fn force_game_over(&mut self) {
        self.game_over();
    }
}
