//! Moon hazard state machine.
//!
//! A moon circles its planet on a rope whose length the swing states
//! stretch and restore. On challenge completion it flees radially and
//! shrinks away, then waits in `Dispose` for the pool to reclaim it.
//!
//! `Initial -> Orbit -> {Swing <-> Restore} -> Flee -> Shrink -> Dispose`

use glam::Vec2;

use crate::content::{SpeedConfig, SwingConfig};
use crate::{cartesian_to_polar, polar_to_cartesian};

use super::scheduler::{Scheduler, TaskKind, TaskOwner};
use super::pool::EntityId;

/// Final scale at the end of the shrink.
pub const SHRINK_SCALE: f32 = 1.0 / 6.0;
/// Speed multiplier applied by the slow-down power (40% of original).
pub const SLOW_DOWN_SCALE: f32 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoonPhase {
    #[default]
    Initial,
    Orbit,
    Swing,
    Restore,
    Flee,
    Shrink,
    Dispose,
}

#[derive(Debug, Clone)]
pub struct MoonState {
    pub phase: MoonPhase,
    pub pos: Vec2,
    pub hit_radius: f32,
    pub scale: f32,
    pub hitbox_enabled: bool,
    /// Motion is gated until the owning planet scrolls into view.
    pub simulating: bool,

    planet_center: Vec2,
    initial_radius: f32,
    rope_len: f32,
    theta: f32,

    initial_speed: f32,
    clockwise: bool,
    acceleration_enabled: bool,
    max_speed: f32,
    acceleration: f32,
    accumulator: f32,
    acc_sign: f32,
    dir_sign: f32,
    bounce: bool,

    min_radius: f32,
    max_radius: f32,
    swinging_speed: f32,
    swing_duration: f32,
    pause_duration: f32,
    increasing: bool,

    flee_speed: f32,
    shrink_time: f32,
    flee_velocity: Vec2,
    shrink_elapsed: f32,

    pub sleep_animation: bool,
    pub faint_animation: bool,
    pub cry_animation: bool,
    pub animations_paused: bool,
    slowed_down: bool,
}

impl MoonState {
    pub fn new(pos: Vec2, hit_radius: f32) -> Self {
        Self {
            phase: MoonPhase::Initial,
            pos,
            hit_radius,
            scale: 1.0,
            hitbox_enabled: true,
            simulating: false,
            planet_center: pos,
            initial_radius: 0.0,
            rope_len: 0.0,
            theta: 0.0,
            initial_speed: 0.0,
            clockwise: true,
            acceleration_enabled: false,
            max_speed: 0.0,
            acceleration: 0.0,
            accumulator: 0.0,
            acc_sign: 1.0,
            dir_sign: 1.0,
            bounce: false,
            min_radius: 0.0,
            max_radius: 0.0,
            swinging_speed: 0.0,
            swing_duration: 0.0,
            pause_duration: 0.0,
            increasing: false,
            flee_speed: 0.0,
            shrink_time: 0.0,
            flee_velocity: Vec2::ZERO,
            shrink_elapsed: 0.0,
            sleep_animation: false,
            faint_animation: false,
            cry_animation: false,
            animations_paused: false,
            slowed_down: false,
        }
    }

    /// Attach to a planet. The rope takes the current distance as its
    /// natural length.
    pub fn attach(&mut self, planet_center: Vec2) {
        self.planet_center = planet_center;
        let (r, theta) = cartesian_to_polar(self.pos - planet_center);
        self.initial_radius = r;
        self.rope_len = r;
        self.theta = theta;
    }

    pub fn rope_len(&self) -> f32 {
        self.rope_len
    }

    pub fn initial_radius(&self) -> f32 {
        self.initial_radius
    }

    pub fn is_slowed_down(&self) -> bool {
        self.slowed_down
    }

    pub fn orbit(&mut self, config: &SpeedConfig) {
        self.initial_speed = config.initial_speed;
        self.clockwise = config.clockwise;
        if config.acceleration_config.enabled {
            self.acceleration_enabled = true;
            self.max_speed = config.acceleration_config.max_speed;
            self.acceleration = config.acceleration_config.acceleration;
            self.bounce = config.acceleration_config.bounce;
            self.accumulator = 0.0;
            self.acc_sign = 1.0;
            self.dir_sign = 1.0;
        } else {
            self.acceleration_enabled = false;
        }
        self.phase = MoonPhase::Orbit;
    }

    pub fn start_swinging(&mut self, config: &SwingConfig) {
        self.min_radius = config.min_radius.min(config.max_radius);
        self.max_radius = config.min_radius.max(config.max_radius);
        self.swinging_speed = config.swinging_speed;
        self.increasing = self.rope_len <= self.max_radius;
        self.phase = MoonPhase::Swing;
    }

    /// Swing, then auto-stop after `swing_duration` and swing again after
    /// another `pause_duration`. Both timers belong to this moon and die
    /// with it.
    pub fn start_swinging_with_pause(
        &mut self,
        config: &SwingConfig,
        id: EntityId,
        scheduler: &mut Scheduler,
    ) {
        self.swing_duration = config.swing_duration;
        self.pause_duration = config.pause_duration;
        self.start_swinging(config);
        scheduler.schedule(TaskOwner::Moon(id), TaskKind::StopSwinging, self.swing_duration);
        scheduler.schedule(
            TaskOwner::Moon(id),
            TaskKind::RestartSwinging,
            self.swing_duration + self.pause_duration,
        );
    }

    pub fn stop_swinging(&mut self) {
        self.increasing = self.rope_len <= self.initial_radius;
        self.phase = MoonPhase::Restore;
    }

    /// Re-enter the timed swing loop with the current parameters.
    pub fn restart_swinging(&mut self, id: EntityId, scheduler: &mut Scheduler) {
        let config = SwingConfig {
            enabled: true,
            min_radius: self.min_radius,
            max_radius: self.max_radius,
            swinging_speed: self.swinging_speed,
            swing_duration: self.swing_duration,
            pause_duration: self.pause_duration,
        };
        self.start_swinging_with_pause(&config, id, scheduler);
    }

    pub fn set_flee(&mut self, flee_speed: f32, shrink_time: f32) {
        self.flee_speed = flee_speed;
        self.shrink_time = shrink_time;
    }

    /// Leave orbit. Pending swing timers are cancelled so they cannot
    /// yank a fleeing moon back into a swing.
    pub fn start_flee(&mut self, id: EntityId, scheduler: &mut Scheduler) {
        scheduler.cancel_owner(TaskOwner::Moon(id));
        self.phase = MoonPhase::Flee;
    }

    /// Applied at most once per moon; repeat pickups are spent elsewhere.
    pub fn slow_down(&mut self) {
        self.swinging_speed *= SLOW_DOWN_SCALE;
        self.initial_speed *= SLOW_DOWN_SCALE;
        self.max_speed *= SLOW_DOWN_SCALE;
        self.acceleration *= SLOW_DOWN_SCALE;
        self.swing_duration /= SLOW_DOWN_SCALE;
        self.pause_duration /= SLOW_DOWN_SCALE;
        self.slowed_down = true;
        self.sleep();
    }

    pub fn sleep(&mut self) {
        self.sleep_animation = true;
    }

    /// Slowed moons keep the drowsy look.
    pub fn wake(&mut self) {
        if !self.slowed_down {
            self.sleep_animation = false;
        }
    }

    pub fn faint(&mut self) {
        self.sleep_animation = false;
        self.faint_animation = true;
    }

    pub fn cry(&mut self) {
        self.cry_animation = true;
    }

    pub fn simulate(&mut self) {
        self.simulating = true;
    }

    /// Fixed-step motion pass.
    pub fn fixed_update(&mut self, dt: f32) {
        if !self.simulating {
            return;
        }
        match self.phase {
            MoonPhase::Orbit => {
                self.go_round(dt);
            }
            MoonPhase::Swing => {
                self.go_round(dt);
                let delta = self.swinging_speed * dt;
                if self.increasing {
                    self.rope_len += delta;
                    if self.max_radius <= self.rope_len {
                        self.rope_len = self.max_radius;
                        self.increasing = false;
                    }
                } else {
                    self.rope_len -= delta;
                    if self.rope_len <= self.min_radius {
                        self.rope_len = self.min_radius;
                        self.increasing = true;
                    }
                }
                self.sync_pos();
            }
            MoonPhase::Restore => {
                self.go_round(dt);
                let delta = self.swinging_speed * dt;
                if self.increasing {
                    self.rope_len += delta;
                    if self.initial_radius <= self.rope_len {
                        self.rope_len = self.initial_radius;
                        self.phase = MoonPhase::Orbit;
                    }
                } else {
                    self.rope_len -= delta;
                    if self.rope_len <= self.initial_radius {
                        self.rope_len = self.initial_radius;
                        self.phase = MoonPhase::Orbit;
                    }
                }
                self.sync_pos();
            }
            MoonPhase::Flee => {
                self.hitbox_enabled = false;
                let outward = (self.pos - self.planet_center).normalize_or(Vec2::X);
                self.flee_velocity = outward * self.flee_speed;
                self.shrink_elapsed = 0.0;
                self.phase = MoonPhase::Shrink;
                self.faint();
            }
            MoonPhase::Shrink => {
                // the flee velocity keeps carrying the moon outward
                self.pos += self.flee_velocity * dt;
            }
            MoonPhase::Initial | MoonPhase::Dispose => {}
        }
    }

    /// Variable-step pass: the shrink lerp runs on render time.
    pub fn logic_update(&mut self, dt: f32) {
        if self.phase == MoonPhase::Shrink {
            self.shrink_elapsed += dt;
            let completed = if self.shrink_time > 0.0 {
                self.shrink_elapsed / self.shrink_time
            } else {
                1.0
            };
            self.scale = 1.0 + (SHRINK_SCALE - 1.0) * completed.min(1.0);
            if completed >= 1.0 {
                self.phase = MoonPhase::Dispose;
            }
        }
    }

    fn go_round(&mut self, dt: f32) {
        let mut speed = self.initial_speed;
        let mut dir = 1.0;
        if self.acceleration_enabled {
            self.accumulator += self.acc_sign * dt;
            let lo = self.initial_speed.min(self.max_speed);
            let hi = self.initial_speed.max(self.max_speed);
            let new_speed = (self.initial_speed + self.acceleration * self.accumulator).clamp(lo, hi);
            speed = new_speed;
            dir = self.dir_sign;
            if new_speed == hi || new_speed == lo {
                self.acc_sign = -self.acc_sign;
                if new_speed == lo && self.bounce {
                    self.dir_sign = -self.dir_sign;
                }
            }
        }
        let spin = if self.clockwise { -1.0 } else { 1.0 };
        if self.rope_len > f32::EPSILON {
            self.theta += spin * dir * (speed / self.rope_len) * dt;
        }
        self.sync_pos();
    }

    fn sync_pos(&mut self) {
        self.pos = self.planet_center + polar_to_cartesian(self.rope_len, self.theta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;

    fn orbiting_moon(clockwise: bool) -> MoonState {
        let mut moon = MoonState::new(Vec2::new(2.0, 0.0), 0.3);
        moon.attach(Vec2::ZERO);
        moon.orbit(&SpeedConfig {
            initial_speed: 1.0,
            clockwise,
            ..Default::default()
        });
        moon.simulate();
        moon
    }

    fn swing_config() -> SwingConfig {
        SwingConfig {
            enabled: true,
            min_radius: 1.0,
            max_radius: 3.0,
            swinging_speed: 2.0,
            swing_duration: 1.0,
            pause_duration: 0.5,
            ..Default::default()
        }
    }

    #[test]
    fn test_orbit_keeps_radius() {
        let mut moon = orbiting_moon(true);
        for _ in 0..500 {
            moon.fixed_update(SIM_DT);
        }
        assert!((moon.pos.length() - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_clockwise_decreases_angle() {
        let mut moon = orbiting_moon(true);
        moon.fixed_update(SIM_DT);
        let (_, theta) = cartesian_to_polar(moon.pos);
        assert!(theta < 0.0);

        let mut ccw = orbiting_moon(false);
        ccw.fixed_update(SIM_DT);
        let (_, theta) = cartesian_to_polar(ccw.pos);
        assert!(theta > 0.0);
    }

    #[test]
    fn test_not_simulating_means_frozen() {
        let mut moon = orbiting_moon(true);
        moon.simulating = false;
        let before = moon.pos;
        moon.fixed_update(SIM_DT);
        assert_eq!(moon.pos, before);
    }

    #[test]
    fn test_swing_radius_stays_in_bounds() {
        let mut moon = orbiting_moon(true);
        moon.start_swinging(&swing_config());
        for _ in 0..2000 {
            moon.fixed_update(SIM_DT);
            assert!(moon.rope_len() >= 1.0 - 1e-5);
            assert!(moon.rope_len() <= 3.0 + 1e-5);
        }
    }

    #[test]
    fn test_stop_swinging_restores_initial_radius() {
        let mut moon = orbiting_moon(true);
        moon.start_swinging(&swing_config());
        for _ in 0..30 {
            moon.fixed_update(SIM_DT);
        }
        moon.stop_swinging();
        assert_eq!(moon.phase, MoonPhase::Restore);
        for _ in 0..2000 {
            moon.fixed_update(SIM_DT);
        }
        assert_eq!(moon.phase, MoonPhase::Orbit);
        assert!((moon.rope_len() - moon.initial_radius()).abs() < 1e-3);
    }

    #[test]
    fn test_swing_with_pause_schedules_and_cancels() {
        let mut scheduler = Scheduler::new();
        let id = {
            let mut pool = super::super::pool::EntityPool::new();
            pool.register(super::super::pool::keys::SMALL_BLUE, super::super::Prefab::Moon { hit_radius: 0.2 });
            pool.spawn(super::super::pool::keys::SMALL_BLUE, Vec2::ZERO).unwrap()
        };
        let mut moon = orbiting_moon(true);
        moon.start_swinging_with_pause(&swing_config(), id, &mut scheduler);
        assert!(scheduler.has(TaskOwner::Moon(id), TaskKind::StopSwinging));
        assert!(scheduler.has(TaskOwner::Moon(id), TaskKind::RestartSwinging));

        moon.start_flee(id, &mut scheduler);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(moon.phase, MoonPhase::Flee);
    }

    #[test]
    fn test_flee_then_shrink_then_dispose() {
        let mut scheduler = Scheduler::new();
        let mut moon = orbiting_moon(true);
        moon.set_flee(4.0, 0.5);
        moon.start_flee(EntityId::from_test(7), &mut scheduler);
        moon.fixed_update(SIM_DT);
        assert_eq!(moon.phase, MoonPhase::Shrink);
        assert!(!moon.hitbox_enabled);
        assert!(moon.faint_animation);

        let start = moon.pos;
        let mut elapsed = 0.0;
        while elapsed < 0.6 {
            moon.fixed_update(SIM_DT);
            moon.logic_update(SIM_DT);
            elapsed += SIM_DT;
        }
        assert_eq!(moon.phase, MoonPhase::Dispose);
        assert!((moon.scale - SHRINK_SCALE).abs() < 1e-5);
        // kept drifting outward the whole time
        assert!(moon.pos.length() > start.length());
    }

    #[test]
    fn test_slow_down_scales_speeds_and_durations() {
        let mut moon = orbiting_moon(true);
        moon.start_swinging(&swing_config());
        moon.slow_down();
        assert!(moon.is_slowed_down());
        assert!((moon.swinging_speed - 2.0 * SLOW_DOWN_SCALE).abs() < 1e-6);
        assert!((moon.initial_speed - 1.0 * SLOW_DOWN_SCALE).abs() < 1e-6);
        assert!((moon.swing_duration - 1.0 / SLOW_DOWN_SCALE).abs() < 1e-6);
        assert!((moon.pause_duration - 0.5 / SLOW_DOWN_SCALE).abs() < 1e-6);
        // drowsy look sticks even through a wake call
        assert!(moon.sleep_animation);
        moon.wake();
        assert!(moon.sleep_animation);
    }

    #[test]
    fn test_bounce_reverses_direction_at_initial_speed() {
        let mut moon = MoonState::new(Vec2::new(1.0, 0.0), 0.2);
        moon.attach(Vec2::ZERO);
        moon.orbit(&SpeedConfig {
            initial_speed: 1.0,
            clockwise: true,
            acceleration_config: crate::content::AccelerationConfig {
                enabled: true,
                max_speed: 2.0,
                acceleration: 1.0,
                bounce: true,
            },
        });
        moon.simulate();
        // run long enough to ramp up to max and back down to initial
        let mut dirs = Vec::new();
        for _ in 0..(4.0 / SIM_DT) as usize {
            moon.fixed_update(SIM_DT);
            dirs.push(moon.dir_sign);
        }
        assert!(dirs.contains(&-1.0), "direction never bounced");
    }
}
