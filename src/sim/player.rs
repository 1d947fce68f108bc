//! Player state machine: motion phases, the active power, the camera
//! anchor the platform camera follows, and the idle sleep timer.
//!
//! Motion runs in the fixed pass, timers and the camera in the logic
//! pass. The power state machine only ticks while the player stands
//! idle on a target, which is what makes one-shot power effects safe.

use glam::Vec2;
use log::debug;

use crate::consts::{
    CAM_FOLLOW_CAPTURE_RADIUS, CAM_FOLLOW_FALL_SPEED, CAM_FOLLOW_SPEED, GAME_OVER_PANNING,
    PLAYER_FALL_SPEED, PLAYER_OUT_OF_SIGHT_DISTANCE, PLAYER_SPEED, SLEEP_AFTER_IDLE,
};
use crate::geom::Circle;
use crate::services::{AudioClip, Services};

use super::manager::ChallengeManager;
use super::pool::EntityPool;
use super::scheduler::{Scheduler, TaskKind, TaskOwner};
use super::target::PowerColor;

const SHRINK_SCALE: f32 = 0.4;
const PINK_POWER_TIME: f32 = 4.0;
/// A little more than a second, so bomb beeps drift against the clock.
const BOMB_TICK_INTERVAL: f32 = 1.3;
const FINAL_POSITION_Y: f32 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerPhase {
    #[default]
    Idle,
    AimForward,
    AimBackward,
    JumpForward,
    JumpBackward,
    Dead,
    Fall,
    Dispose,
}

/// The active power. At most one at a time; applying a new one tears
/// the previous down first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerState {
    #[default]
    Normal,
    Orange,
    Red,
    Green,
    Yellow,
    Pink,
    Blue,
}

/// Raised out of a player step for the orchestrator to act on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerEvent {
    /// Bomb ran out while the player stood idle.
    GameOver,
    /// The terminal target was reached.
    GrandFinale,
    /// The fallen player left the screen; the world can be torn down
    /// around the given camera position.
    DisposeGame(Vec2),
}

#[derive(Debug)]
pub struct PlayerState {
    pub phase: PlayerPhase,
    pub power: PowerState,
    pub pos: Vec2,
    pub velocity: Vec2,
    /// Yellow potion shrinks this; death preserves it until reload.
    pub scale: f32,
    pub colliders_enabled: bool,
    pub crown: bool,
    pub sleep_animation: bool,
    pub faint_animation: bool,
    pub animations_paused: bool,
    process_input: bool,
    score: u32,
    idle_time: f32,
    disposed: bool,

    // camera rig: local offset while attached, world position after the
    // fall detaches it
    cam_attached: bool,
    cam_local: Vec2,
    cam_world: Vec2,
    future_cam: Vec2,
    focusing: bool,
    current_target: Vec2,

    // power counters
    targets_in_a_row: i32,
    shields: i32,
    apply_slow_down: bool,
    slow_down_count: i32,
    potions: i32,
    apply_potion: bool,
    tasty_value: i32,
    apply_tasty: bool,
    apply_bomb: bool,
    bomb_count: i32,
}

impl PlayerState {
    pub fn new(pos: Vec2) -> Self {
        Self {
            phase: PlayerPhase::Idle,
            power: PowerState::Normal,
            pos,
            velocity: Vec2::ZERO,
            scale: 1.0,
            colliders_enabled: true,
            crown: false,
            sleep_animation: false,
            faint_animation: false,
            animations_paused: false,
            process_input: true,
            score: 0,
            idle_time: 0.0,
            disposed: false,
            cam_attached: true,
            cam_local: Vec2::ZERO,
            cam_world: Vec2::ZERO,
            future_cam: Vec2::ZERO,
            focusing: false,
            current_target: pos,
            targets_in_a_row: 0,
            shields: 0,
            apply_slow_down: false,
            slow_down_count: 0,
            potions: 0,
            apply_potion: false,
            tasty_value: 0,
            apply_tasty: false,
            apply_bomb: false,
            bomb_count: 0,
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn shields(&self) -> i32 {
        self.shields
    }

    pub fn process_input(&self) -> bool {
        self.process_input
    }

    pub fn set_process_input(&mut self, value: bool) {
        self.process_input = value;
    }

    pub fn is_dead(&self) -> bool {
        matches!(
            self.phase,
            PlayerPhase::Dead | PlayerPhase::Fall | PlayerPhase::Dispose
        )
    }

    /// World position the camera tracks.
    pub fn cam_pos(&self) -> Vec2 {
        if self.cam_attached {
            self.pos + self.cam_local
        } else {
            self.cam_world
        }
    }

    // -----------------------------------------------------------------
    // Per-frame passes

    /// Fixed pass: integrate motion and resolve the aim phases.
    pub fn fixed_update(
        &mut self,
        dt: f32,
        manager: &ChallengeManager,
        pool: &EntityPool,
        services: &mut Services,
    ) -> Option<PlayerEvent> {
        self.pos += self.velocity * dt;

        match self.phase {
            PlayerPhase::AimForward => {
                self.state_aim_forward(manager, pool);
                None
            }
            PlayerPhase::AimBackward => {
                self.state_aim_backward();
                None
            }
            PlayerPhase::Dispose => self.state_dispose(services),
            _ => None,
        }
    }

    /// Logic pass: sleep timer, power effects, fall panning and the
    /// camera focus movement.
    pub fn logic_update(
        &mut self,
        dt: f32,
        grand_finale: bool,
        manager: &mut ChallengeManager,
        pool: &mut EntityPool,
        scheduler: &mut Scheduler,
        services: &mut Services,
    ) {
        match self.phase {
            PlayerPhase::Idle => {
                self.sleep_time(dt, grand_finale, manager, pool, services);
                self.state_power(manager, pool, scheduler, services);
            }
            PlayerPhase::Fall => self.state_fall(dt),
            _ => {}
        }

        self.focus_step(dt);
    }

    fn state_aim_forward(&mut self, manager: &ChallengeManager, pool: &EntityPool) {
        let next = manager.peek_next_target().and_then(|id| pool.pos(id));
        match next {
            Some(target) => {
                self.focusing = false;
                self.velocity = (target - self.pos).normalize_or_zero() * PLAYER_SPEED;
                self.phase = PlayerPhase::JumpForward;
            }
            // no more targets to jump to
            None => self.phase = PlayerPhase::Idle,
        }
    }

    fn state_aim_backward(&mut self) {
        self.focusing = false;
        self.velocity = (self.current_target - self.pos).normalize_or_zero() * PLAYER_SPEED;
        self.phase = PlayerPhase::JumpBackward;
    }

    fn state_fall(&mut self, dt: f32) {
        self.cam_world.y -= CAM_FOLLOW_FALL_SPEED * dt;
        if self.future_cam.y >= self.cam_world.y {
            self.cam_world = self.future_cam;
            self.phase = PlayerPhase::Dispose;
        }
    }

    fn state_dispose(&mut self, services: &mut Services) -> Option<PlayerEvent> {
        let out_of_sight = self.cam_pos().distance(self.pos) > PLAYER_OUT_OF_SIGHT_DISTANCE;
        if out_of_sight && !self.disposed {
            self.velocity = Vec2::ZERO;
            self.disposed = true;
            services.hud.fail();
            return Some(PlayerEvent::DisposeGame(self.cam_pos()));
        }
        None
    }

    /// Move the attached camera toward its anchor until captured.
    fn focus_step(&mut self, dt: f32) {
        if !self.focusing || !self.cam_attached {
            return;
        }
        let direction = (self.future_cam - self.cam_local).normalize_or_zero();
        self.cam_local += direction * CAM_FOLLOW_SPEED * dt;
        if Circle::new(self.future_cam, CAM_FOLLOW_CAPTURE_RADIUS).contains(self.cam_local) {
            self.cam_local = self.future_cam;
            self.focusing = false;
        }
    }

    // -----------------------------------------------------------------
    // Sleep

    fn sleep_time(
        &mut self,
        dt: f32,
        grand_finale: bool,
        manager: &mut ChallengeManager,
        pool: &mut EntityPool,
        services: &mut Services,
    ) {
        if self.sleep_animation || grand_finale {
            return;
        }
        self.idle_time += dt;
        if self.idle_time >= SLEEP_AFTER_IDLE {
            self.sleep_animation = true;
            manager.sleep_animation(pool);
            services.audio.start_loop(AudioClip::Crickets);
            services.hud.hint_store(true);
        }
    }

    fn wake_up(
        &mut self,
        manager: &mut ChallengeManager,
        pool: &mut EntityPool,
        services: &mut Services,
    ) {
        self.idle_time = 0.0;
        if self.sleep_animation {
            self.sleep_animation = false;
            manager.idle_animation(pool);
            services.hud.hint_store(false);
            services.audio.stop_loop(AudioClip::Crickets);
        }
    }

    /// Force the sleep state from outside, e.g. when a menu opens.
    pub fn set_awake(
        &mut self,
        awake: bool,
        manager: &mut ChallengeManager,
        pool: &mut EntityPool,
        services: &mut Services,
    ) {
        if awake {
            self.wake_up(manager, pool, services);
        } else {
            self.idle_time = SLEEP_AFTER_IDLE;
            self.sleep_time(0.0, false, manager, pool, services);
        }
    }

    // -----------------------------------------------------------------
    // Power state machine, idle only

    fn state_power(
        &mut self,
        manager: &mut ChallengeManager,
        pool: &mut EntityPool,
        scheduler: &mut Scheduler,
        services: &mut Services,
    ) {
        match self.power {
            PowerState::Normal => {}
            PowerState::Orange => self.power_state_orange(manager, pool, scheduler, services),
            PowerState::Red => {
                if self.shields <= 0 {
                    self.powers_down(scheduler, services);
                }
            }
            PowerState::Green => {
                // just once
                if self.apply_slow_down {
                    manager.slow_down(pool);
                    self.apply_slow_down = false;
                }
            }
            PowerState::Yellow => {
                // just once
                if self.apply_potion {
                    self.scale = SHRINK_SCALE;
                    self.apply_potion = false;
                }
            }
            PowerState::Pink => {
                // just once
                if self.apply_tasty {
                    self.score += self.tasty_value.max(0) as u32;
                    services.hud.score(self.score);
                    self.apply_tasty = false;
                }
            }
            PowerState::Blue => {
                if self.apply_bomb {
                    self.apply_bomb = false;
                }
            }
        }
    }

    fn power_state_orange(
        &mut self,
        manager: &mut ChallengeManager,
        pool: &mut EntityPool,
        scheduler: &mut Scheduler,
        services: &mut Services,
    ) {
        debug!("targets in a row: {}", self.targets_in_a_row);
        if self.targets_in_a_row <= 0 {
            self.powers_down(scheduler, services);
        } else {
            services.audio.play(AudioClip::Zip);
            self.aim_forward(manager, pool, services);
            self.targets_in_a_row -= 1;
            services.hud.power_counter(self.targets_in_a_row);
        }
    }

    /// Back to normal: restore the scale unless dead, clear the HUD and
    /// cancel any pending power timers.
    pub fn powers_down(&mut self, scheduler: &mut Scheduler, services: &mut Services) {
        self.power = PowerState::Normal;
        // shrink effect is maintained during death
        if !self.is_dead() {
            self.scale = 1.0;
        }
        services.hud.powers_down();
        scheduler.cancel_owner(TaskOwner::Player);
    }

    // -----------------------------------------------------------------
    // Scheduled power timers

    pub fn handle_task(
        &mut self,
        kind: TaskKind,
        scheduler: &mut Scheduler,
        services: &mut Services,
    ) -> Option<PlayerEvent> {
        match kind {
            TaskKind::PowerHalfTime => {
                if self.power == PowerState::Pink {
                    services.hud.power_counter(self.tasty_value);
                }
                None
            }
            TaskKind::PowerExpired => {
                if self.power == PowerState::Pink {
                    debug!("pink power ends because time is up");
                    self.powers_down(scheduler, services);
                }
                None
            }
            TaskKind::BombTick => self.bomb_tick(scheduler, services),
            _ => None,
        }
    }

    fn bomb_tick(
        &mut self,
        scheduler: &mut Scheduler,
        services: &mut Services,
    ) -> Option<PlayerEvent> {
        self.bomb_count -= 1;
        services.hud.power_counter(self.bomb_count);

        if self.bomb_count > 0 {
            services.audio.play(AudioClip::Beep);
            if self.bomb_count == 1 {
                services.audio.play(AudioClip::OhOh);
            }
            scheduler.schedule(TaskOwner::Player, TaskKind::BombTick, BOMB_TICK_INTERVAL);
            None
        } else if self.phase == PlayerPhase::Idle {
            debug!("blue power ends because time is up");
            Some(PlayerEvent::GameOver)
        } else {
            None
        }
    }

    // -----------------------------------------------------------------
    // Transitions

    /// A jump request. Ignored while input is frozen.
    pub fn aim_forward(
        &mut self,
        manager: &mut ChallengeManager,
        pool: &mut EntityPool,
        services: &mut Services,
    ) {
        if self.process_input {
            self.wake_up(manager, pool, services);
            services.hud.set_store_enabled(false);
            self.phase = PlayerPhase::AimForward;
        }
    }

    /// A shield absorbed a moon hit; bounce back to the previous target.
    pub fn aim_backward(&mut self, services: &mut Services) {
        services.audio.play(AudioClip::Boing);
        self.phase = PlayerPhase::AimBackward;
        self.shields -= 1;
        services.hud.power_counter(self.shields);
        debug!("shields: {}", self.shields);
    }

    /// Landed on `target_pos`. Snaps there, retargets the camera and
    /// burns one charge of the per-landing powers.
    pub fn success(
        &mut self,
        target_pos: Vec2,
        manager: &ChallengeManager,
        pool: &EntityPool,
        scheduler: &mut Scheduler,
        services: &mut Services,
    ) -> Option<PlayerEvent> {
        self.current_target = target_pos;
        self.velocity = Vec2::ZERO;
        self.pos = target_pos;

        let next = manager.peek_next_target().and_then(|id| pool.pos(id));
        let event = match next {
            Some(next_pos) => {
                // anchor the camera halfway to the next target
                self.future_cam = (next_pos - target_pos) / 2.0;
                services.hud.set_store_enabled(true);

                self.check_green_power(scheduler, services);
                self.check_yellow_power(scheduler, services);
                self.check_pink_power(scheduler, services);
                self.check_blue_power(scheduler, services);
                None
            }
            None => {
                // last target of the map
                self.powers_down(scheduler, services);
                self.future_cam = Vec2::new(0.0, -FINAL_POSITION_Y);
                self.crown = true;
                Some(PlayerEvent::GrandFinale)
            }
        };

        self.focusing = true;
        self.phase = PlayerPhase::Idle;
        event
    }

    fn check_green_power(&mut self, scheduler: &mut Scheduler, services: &mut Services) {
        if self.power == PowerState::Green && !self.apply_slow_down {
            self.slow_down_count -= 1;
            services.hud.power_counter(self.slow_down_count);
            if self.slow_down_count <= 0 {
                self.powers_down(scheduler, services);
            } else {
                self.apply_slow_down = true;
            }
        }
    }

    fn check_yellow_power(&mut self, scheduler: &mut Scheduler, services: &mut Services) {
        if self.power == PowerState::Yellow && !self.apply_potion {
            self.potions -= 1;
            services.hud.power_counter(self.potions);
            if self.potions <= 0 {
                self.powers_down(scheduler, services);
            }
        }
    }

    fn check_pink_power(&mut self, scheduler: &mut Scheduler, services: &mut Services) {
        if self.power == PowerState::Pink && !self.apply_tasty {
            services.hud.power_counter(0);
            self.powers_down(scheduler, services);
            debug!("pink power ends for having reached another target");
        }
    }

    fn check_blue_power(&mut self, scheduler: &mut Scheduler, services: &mut Services) {
        if self.power == PowerState::Blue && !self.apply_bomb {
            services.hud.power_counter(0);
            self.powers_down(scheduler, services);
            debug!("blue power ends for having reached another target");
        }
    }

    /// Swap in a freshly taken power; the previous one goes down first.
    pub fn apply_power_up(
        &mut self,
        color: PowerColor,
        magnitude: i32,
        scheduler: &mut Scheduler,
        services: &mut Services,
    ) {
        self.powers_down(scheduler, services);
        services.audio.play(AudioClip::Take);

        match color {
            PowerColor::Orange => {
                self.power = PowerState::Orange;
                self.targets_in_a_row = magnitude;
            }
            PowerColor::Red => {
                self.power = PowerState::Red;
                self.shields = magnitude;
            }
            PowerColor::Green => {
                self.power = PowerState::Green;
                self.apply_slow_down = true;
                self.slow_down_count = magnitude;
            }
            PowerColor::Yellow => {
                self.power = PowerState::Yellow;
                self.apply_potion = true;
                self.potions = magnitude;
            }
            PowerColor::Pink => {
                self.power = PowerState::Pink;
                self.apply_tasty = true;
                self.tasty_value = magnitude;
                scheduler.schedule(
                    TaskOwner::Player,
                    TaskKind::PowerHalfTime,
                    PINK_POWER_TIME / 2.0,
                );
                scheduler.schedule(TaskOwner::Player, TaskKind::PowerExpired, PINK_POWER_TIME);
            }
            PowerColor::Blue => {
                self.power = PowerState::Blue;
                self.apply_bomb = true;
                self.bomb_count = magnitude;
                scheduler.schedule(TaskOwner::Player, TaskKind::BombTick, BOMB_TICK_INTERVAL);
            }
        }
    }

    pub fn take_candy(&mut self, services: &mut Services) {
        services.audio.play(AudioClip::Yummy);
        self.score += super::target::CANDY_SCORE;
        services.hud.score(self.score);
    }

    /// The lethal hit: dead on the spot, powers torn down.
    pub fn rip(
        &mut self,
        manager: &mut ChallengeManager,
        pool: &mut EntityPool,
        scheduler: &mut Scheduler,
        services: &mut Services,
    ) {
        self.phase = PlayerPhase::Dead;
        self.wake_up(manager, pool, services);
        self.powers_down(scheduler, services);
        self.sleep_animation = false;
        self.faint_animation = true;
    }

    /// Freefall out of the world. The camera detaches and pans down a
    /// fixed distance before the dispose phase takes over.
    pub fn fall(&mut self, services: &mut Services) {
        self.focusing = false;
        self.cam_world = self.cam_pos();
        self.cam_attached = false;
        self.future_cam = self.cam_world - Vec2::new(0.0, GAME_OVER_PANNING);
        self.velocity = Vec2::NEG_Y * PLAYER_FALL_SPEED;
        self.colliders_enabled = false;
        self.phase = PlayerPhase::Fall;
        services.audio.play(AudioClip::Fall);
    }

    /// Back to life under the camera, aiming at the next target.
    pub fn reload(
        &mut self,
        manager: &mut ChallengeManager,
        pool: &mut EntityPool,
        services: &mut Services,
    ) {
        self.scale = 1.0;
        self.pos.x = self.cam_world.x;
        self.colliders_enabled = true;
        self.sleep_animation = false;
        self.faint_animation = false;
        self.disposed = false;

        // reattach the camera where it stands
        self.cam_local = self.cam_world - self.pos;
        self.cam_attached = true;

        self.process_input = true;
        self.aim_forward(manager, pool, services);
    }

    pub fn pause_animations(&mut self, pause: bool) {
        self.animations_paused = pause;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{
        ChallengeConfig, FleeConfig, LevelConfig, MapConfig, MemoryContent, PlanetConfig,
        PolarCoords, SpeedConfig,
    };
    use crate::geom::ScreenBounds;
    use crate::services::EventLog;
    use crate::settings::DetailPreset;
    use crate::sim::pool::keys;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    struct Fixture {
        player: PlayerState,
        manager: ChallengeManager,
        pool: EntityPool,
        scheduler: Scheduler,
        rng: Pcg32,
        services: Services,
        log: EventLog,
    }

    fn fixture() -> Fixture {
        let map = MapConfig {
            level_config_list: vec![LevelConfig {
                level_debug_id: 1,
                polar_coords: PolarCoords { rho: 2.0, phi: 30.0 },
                challenge_filename_list: vec!["C_1".into(), "C_2".into(), "C_3".into()],
            }],
        };
        let mut content = MemoryContent::new(map);
        for name in ["C_1", "C_2", "C_3"] {
            content.insert(
                name,
                ChallengeConfig {
                    polar_coords: PolarCoords { rho: 2.0, phi: 45.0 },
                    flee_config: FleeConfig {
                        flee_speed: 3.0,
                        shrink_time: 1.0,
                    },
                    planet_config_list: vec![PlanetConfig {
                        radius: 1.0,
                        moon_key_list: vec![keys::SMALL_BLUE.to_string()],
                        speed_config: SpeedConfig {
                            initial_speed: 1.0,
                            clockwise: true,
                            ..Default::default()
                        },
                        ..Default::default()
                    }],
                },
            );
        }

        let mut manager =
            ChallengeManager::new(Box::new(content), ScreenBounds::design()).unwrap();
        let mut pool = EntityPool::with_defaults();
        let mut scheduler = Scheduler::new();
        let mut rng = Pcg32::seed_from_u64(9);
        let pole = Vec2::new(0.0, crate::consts::INITIAL_POLE_Y);
        manager.load_from_level(&mut pool, &mut scheduler, &mut rng, 1, pole);

        let (mut services, log) = Services::recording(DetailPreset::High);
        // move past the level marker so the head has planets
        manager.challenge_completed(&mut pool, &mut scheduler, &mut rng, &mut services);
        Fixture {
            player: PlayerState::new(pole),
            manager,
            pool,
            scheduler,
            rng,
            services,
            log,
        }
    }

    fn logic(f: &mut Fixture, dt: f32) {
        f.player.logic_update(
            dt,
            false,
            &mut f.manager,
            &mut f.pool,
            &mut f.scheduler,
            &mut f.services,
        );
    }

    fn land_on_head(f: &mut Fixture) -> Option<PlayerEvent> {
        let target = f.manager.peek_next_target().unwrap();
        let pos = f.pool.pos(target).unwrap();
        f.manager.challenge_completed(
            &mut f.pool,
            &mut f.scheduler,
            &mut f.rng,
            &mut f.services,
        );
        f.player
            .success(pos, &f.manager, &f.pool, &mut f.scheduler, &mut f.services)
    }

    #[test]
    fn test_aim_forward_jumps_at_next_target() {
        let mut f = fixture();
        f.player
            .aim_forward(&mut f.manager, &mut f.pool, &mut f.services);
        assert_eq!(f.player.phase, PlayerPhase::AimForward);

        f.player
            .fixed_update(0.02, &f.manager, &f.pool, &mut f.services);
        assert_eq!(f.player.phase, PlayerPhase::JumpForward);
        assert!((f.player.velocity.length() - PLAYER_SPEED).abs() < 1e-3);
        // velocity points at the head target
        let target = f.pool.pos(f.manager.peek_next_target().unwrap()).unwrap();
        let dir = (target - f.player.pos).normalize();
        assert!(f.player.velocity.normalize().abs_diff_eq(dir, 1e-4));
    }

    #[test]
    fn test_aim_forward_ignored_while_input_frozen() {
        let mut f = fixture();
        f.player.set_process_input(false);
        f.player
            .aim_forward(&mut f.manager, &mut f.pool, &mut f.services);
        assert_eq!(f.player.phase, PlayerPhase::Idle);
    }

    #[test]
    fn test_single_power_at_a_time() {
        let mut f = fixture();
        f.player
            .apply_power_up(PowerColor::Orange, 3, &mut f.scheduler, &mut f.services);
        assert_eq!(f.player.power, PowerState::Orange);

        f.player
            .apply_power_up(PowerColor::Pink, 12, &mut f.scheduler, &mut f.services);
        assert_eq!(f.player.power, PowerState::Pink);
        // only the pink timers survive the swap
        assert!(f.scheduler.has(TaskOwner::Player, TaskKind::PowerHalfTime));
        assert!(f.scheduler.has(TaskOwner::Player, TaskKind::PowerExpired));
        assert_eq!(f.scheduler.pending(), 2);

        f.player
            .apply_power_up(PowerColor::Blue, 5, &mut f.scheduler, &mut f.services);
        assert_eq!(f.player.power, PowerState::Blue);
        assert!(!f.scheduler.has(TaskOwner::Player, TaskKind::PowerExpired));
        assert!(f.scheduler.has(TaskOwner::Player, TaskKind::BombTick));
    }

    #[test]
    fn test_orange_auto_jumps_then_powers_down() {
        let mut f = fixture();
        f.player
            .apply_power_up(PowerColor::Orange, 2, &mut f.scheduler, &mut f.services);

        // each idle tick burns one charge and re-aims
        logic(&mut f, 0.02);
        assert_eq!(f.player.phase, PlayerPhase::AimForward);
        assert!(f.log.contains("audio: Zip"));
        assert!(f.log.contains("hud: power 1"));

        f.player.phase = PlayerPhase::Idle;
        logic(&mut f, 0.02);
        assert!(f.log.contains("hud: power 0"));

        f.player.phase = PlayerPhase::Idle;
        logic(&mut f, 0.02);
        assert_eq!(f.player.power, PowerState::Normal);
        assert!(f.log.contains("hud: powers down"));
    }

    #[test]
    fn test_green_slows_head_challenge_once() {
        let mut f = fixture();
        f.player
            .apply_power_up(PowerColor::Green, 2, &mut f.scheduler, &mut f.services);
        logic(&mut f, 0.02);

        let head = f.manager.head_challenge().unwrap();
        let moons = f.pool.planet(head.planets[0]).unwrap().moons.clone();
        assert!(f.pool.moon(moons[0]).unwrap().is_slowed_down());
        assert_eq!(f.player.power, PowerState::Green);

        // landing burns a charge and re-arms the one-shot
        land_on_head(&mut f);
        logic(&mut f, 0.02);
        assert_eq!(f.player.power, PowerState::Green);
        // second landing exhausts it
        land_on_head(&mut f);
        assert_eq!(f.player.power, PowerState::Normal);
    }

    #[test]
    fn test_yellow_shrinks_until_spent() {
        let mut f = fixture();
        f.player
            .apply_power_up(PowerColor::Yellow, 1, &mut f.scheduler, &mut f.services);
        logic(&mut f, 0.02);
        assert!((f.player.scale - SHRINK_SCALE).abs() < 1e-6);

        land_on_head(&mut f);
        assert_eq!(f.player.power, PowerState::Normal);
        assert!((f.player.scale - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_pink_scores_then_expires_on_timer() {
        let mut f = fixture();
        f.player
            .apply_power_up(PowerColor::Pink, 15, &mut f.scheduler, &mut f.services);
        logic(&mut f, 0.02);
        assert_eq!(f.player.score(), 15);
        assert!(f.log.contains("hud: score 15"));

        for (owner, kind) in f.scheduler.advance(PINK_POWER_TIME + 0.1) {
            assert_eq!(owner, TaskOwner::Player);
            f.player.handle_task(kind, &mut f.scheduler, &mut f.services);
        }
        assert_eq!(f.player.power, PowerState::Normal);
        assert!(f.log.contains("hud: power 15"));
    }

    #[test]
    fn test_bomb_counts_down_to_game_over_when_idle() {
        let mut f = fixture();
        f.player
            .apply_power_up(PowerColor::Blue, 3, &mut f.scheduler, &mut f.services);
        logic(&mut f, 0.02);

        let mut event = None;
        for _ in 0..3 {
            for (_, kind) in f.scheduler.advance(BOMB_TICK_INTERVAL + 0.01) {
                event = f.player.handle_task(kind, &mut f.scheduler, &mut f.services);
            }
        }
        assert_eq!(event, Some(PlayerEvent::GameOver));
        assert_eq!(f.log.count("audio: Beep"), 2);
        assert_eq!(f.log.count("audio: OhOh"), 1);
    }

    #[test]
    fn test_bomb_zero_while_jumping_is_survived() {
        let mut f = fixture();
        f.player
            .apply_power_up(PowerColor::Blue, 1, &mut f.scheduler, &mut f.services);
        f.player.phase = PlayerPhase::JumpForward;
        let mut event = None;
        for (_, kind) in f.scheduler.advance(BOMB_TICK_INTERVAL + 0.01) {
            event = f.player.handle_task(kind, &mut f.scheduler, &mut f.services);
        }
        assert_eq!(event, None);
    }

    #[test]
    fn test_success_retargets_camera_and_enables_store() {
        let mut f = fixture();
        let target = f.manager.peek_next_target().unwrap();
        let pos = f.pool.pos(target).unwrap();
        let event = land_on_head(&mut f);
        assert_eq!(event, None);
        assert_eq!(f.player.phase, PlayerPhase::Idle);
        assert_eq!(f.player.pos, pos);
        assert!(f.log.contains("hud: store button true"));

        let next = f.pool.pos(f.manager.peek_next_target().unwrap()).unwrap();
        assert!(f.player.future_cam.abs_diff_eq((next - pos) / 2.0, 1e-5));
        // camera drifts toward the anchor
        let before = f.player.cam_local;
        logic(&mut f, 0.1);
        let after = f.player.cam_local;
        assert!(after.distance(f.player.future_cam) < before.distance(f.player.future_cam));
    }

    #[test]
    fn test_last_target_triggers_grand_finale() {
        let mut f = fixture();
        let mut event = None;
        while f.manager.peek_next_target().is_some() {
            event = land_on_head(&mut f);
        }
        assert_eq!(event, Some(PlayerEvent::GrandFinale));
        assert!(f.player.crown);
        assert_eq!(f.player.power, PowerState::Normal);
    }

    #[test]
    fn test_sleep_after_idle_and_wake_on_jump() {
        let mut f = fixture();
        logic(&mut f, SLEEP_AFTER_IDLE + 0.1);
        assert!(f.player.sleep_animation);
        assert!(f.log.contains("audio loop start: Crickets"));
        assert!(f.log.contains("hud: store hint true"));
        let head = f.manager.head_challenge().unwrap();
        let moons = f.pool.planet(head.planets[0]).unwrap().moons.clone();
        assert!(f.pool.moon(moons[0]).unwrap().sleep_animation);

        f.player
            .aim_forward(&mut f.manager, &mut f.pool, &mut f.services);
        assert!(!f.player.sleep_animation);
        assert!(f.log.contains("audio loop stop: Crickets"));
        assert!(!f.pool.moon(moons[0]).unwrap().sleep_animation);
    }

    #[test]
    fn test_no_sleep_during_grand_finale() {
        let mut f = fixture();
        f.player.logic_update(
            SLEEP_AFTER_IDLE + 5.0,
            true,
            &mut f.manager,
            &mut f.pool,
            &mut f.scheduler,
            &mut f.services,
        );
        assert!(!f.player.sleep_animation);
    }

    #[test]
    fn test_fall_pans_down_then_disposes_out_of_sight() {
        let mut f = fixture();
        f.player.fall(&mut f.services);
        assert_eq!(f.player.phase, PlayerPhase::Fall);
        assert!(!f.player.colliders_enabled);
        assert!(f.log.contains("audio: Fall"));
        let start_cam = f.player.cam_pos();

        // pan covers the full distance, player falls faster below it
        let mut event = None;
        for _ in 0..400 {
            event = f
                .player
                .fixed_update(0.02, &f.manager, &f.pool, &mut f.services);
            logic(&mut f, 0.02);
            if event.is_some() {
                break;
            }
        }
        let Some(PlayerEvent::DisposeGame(cam)) = event else {
            panic!("never left the screen");
        };
        assert!((start_cam.y - cam.y - GAME_OVER_PANNING).abs() < 1e-3);
        assert_eq!(f.log.count("hud: fail"), 1);
        assert_eq!(f.player.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_rip_keeps_shrink_until_reload() {
        let mut f = fixture();
        f.player
            .apply_power_up(PowerColor::Yellow, 2, &mut f.scheduler, &mut f.services);
        logic(&mut f, 0.02);
        f.player
            .rip(&mut f.manager, &mut f.pool, &mut f.scheduler, &mut f.services);
        assert_eq!(f.player.phase, PlayerPhase::Dead);
        assert!(f.player.faint_animation);
        assert_eq!(f.player.power, PowerState::Normal);
        // death preserves the potion scale
        assert!((f.player.scale - SHRINK_SCALE).abs() < 1e-6);

        f.player.fall(&mut f.services);
        f.player
            .reload(&mut f.manager, &mut f.pool, &mut f.services);
        assert!((f.player.scale - 1.0).abs() < 1e-6);
        assert!(f.player.colliders_enabled);
        assert_eq!(f.player.phase, PlayerPhase::AimForward);
    }

    #[test]
    fn test_take_candy_scores() {
        let mut f = fixture();
        f.player.take_candy(&mut f.services);
        f.player.take_candy(&mut f.services);
        assert_eq!(f.player.score(), 2);
        assert!(f.log.contains("hud: score 2"));
        assert_eq!(f.log.count("audio: Yummy"), 2);
    }

    #[test]
    fn test_aim_backward_spends_a_shield() {
        let mut f = fixture();
        f.player
            .apply_power_up(PowerColor::Red, 2, &mut f.scheduler, &mut f.services);
        f.player.phase = PlayerPhase::JumpForward;
        f.player.current_target = Vec2::new(0.0, 10.0);
        f.player.pos = Vec2::new(0.0, 12.0);

        f.player.aim_backward(&mut f.services);
        assert_eq!(f.player.phase, PlayerPhase::AimBackward);
        assert_eq!(f.player.shields(), 1);
        assert!(f.log.contains("audio: Boing"));

        f.player
            .fixed_update(0.02, &f.manager, &f.pool, &mut f.services);
        assert_eq!(f.player.phase, PlayerPhase::JumpBackward);
        // heading back down to the target already stood on
        assert!(f.player.velocity.y < 0.0);

        // one shield left: still red until the idle tick after it's spent
        f.player.aim_backward(&mut f.services);
        assert_eq!(f.player.shields(), 0);
        f.player.phase = PlayerPhase::Idle;
        logic(&mut f, 0.02);
        assert_eq!(f.player.power, PowerState::Normal);
    }

    use proptest::prelude::*;

    proptest! {
        // whatever order powers are taken in, only the most recent one is
        // active and only its timers are pending
        #[test]
        fn prop_at_most_one_power_active(
            picks in proptest::collection::vec((0usize..6, 1i32..=20), 1..12),
        ) {
            let colors = [
                PowerColor::Orange,
                PowerColor::Red,
                PowerColor::Green,
                PowerColor::Yellow,
                PowerColor::Pink,
                PowerColor::Blue,
            ];
            let mut player = PlayerState::new(Vec2::ZERO);
            let mut scheduler = Scheduler::new();
            let mut services = Services::null(DetailPreset::High);

            for (index, magnitude) in &picks {
                player.apply_power_up(colors[*index], *magnitude, &mut scheduler, &mut services);
            }

            let (last, _) = picks[picks.len() - 1];
            let expected = match colors[last] {
                PowerColor::Orange => PowerState::Orange,
                PowerColor::Red => PowerState::Red,
                PowerColor::Green => PowerState::Green,
                PowerColor::Yellow => PowerState::Yellow,
                PowerColor::Pink => PowerState::Pink,
                PowerColor::Blue => PowerState::Blue,
            };
            prop_assert_eq!(player.power, expected);

            // stale timers from superseded powers were all cancelled
            let expected_pending = match expected {
                PowerState::Pink => 2,
                PowerState::Blue => 1,
                _ => 0,
            };
            prop_assert_eq!(scheduler.pending(), expected_pending);
        }
    }
}
