//! Moonhop - swing-between-planets arcade game, headless core.
//!
//! Core modules:
//! - `sim`: Deterministic gameplay simulation (entity state machines,
//!   streaming challenge manager). Pure logic, no platform dependencies.
//! - `content`: Challenge and map descriptors plus content lookup
//! - `services`: Narrow collaborator interfaces (HUD, audio, lights, progress)
//! - `geom`: Circle and central-angle geometry helpers
//! - `settings`: Detail preset chosen once at composition time

pub mod content;
pub mod geom;
pub mod services;
pub mod settings;
pub mod sim;

pub use settings::DetailPreset;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (50 Hz physics pass)
    pub const SIM_DT: f32 = 0.02;

    /// Design resolution and unit scale (pixels per world unit)
    pub const DESIGN_WIDTH_PX: f32 = 480.0;
    pub const DESIGN_HEIGHT_PX: f32 = 800.0;
    pub const SCREEN_PADDING_PX: f32 = 150.0;
    pub const PIXELS_PER_UNIT: f32 = 100.0;

    /// The first pole sits above the origin so the opening challenge is
    /// reachable from the player's spawn.
    pub const INITIAL_POLE_Y: f32 = 10.0;

    /// Player movement
    pub const PLAYER_SPEED: f32 = 9.0;
    pub const PLAYER_FALL_SPEED: f32 = 19.0;
    /// Distance below the camera anchor at which a fallen player is gone
    pub const PLAYER_OUT_OF_SIGHT_DISTANCE: f32 = 7.0;

    /// Seconds of inactivity before the sleep state kicks in
    pub const SLEEP_AFTER_IDLE: f32 = 30.0;

    /// Camera-follow anchor
    pub const CAM_FOLLOW_SPEED: f32 = 6.0;
    pub const CAM_FOLLOW_CAPTURE_RADIUS: f32 = 0.3;
    pub const CAM_FOLLOW_FALL_SPEED: f32 = 20.0;
    pub const GAME_OVER_PANNING: f32 = 20.0;
}

/// Normalize an angle to [-PI, PI)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Convert cartesian (x, y) to polar (r, theta)
#[inline]
pub fn cartesian_to_polar(pos: Vec2) -> (f32, f32) {
    (pos.length(), pos.y.atan2(pos.x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_normalize_angle() {
        assert!((normalize_angle(3.0 * PI) - (-PI)).abs() < 1e-5);
        assert!((normalize_angle(-3.0 * PI) - (-PI)).abs() < 1e-5);
        assert!((normalize_angle(0.5) - 0.5).abs() < 1e-6);
        assert!((normalize_angle(2.0 * PI + 0.1) - 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_polar_roundtrip() {
        let v = polar_to_cartesian(2.0, PI / 3.0);
        let (r, theta) = cartesian_to_polar(v);
        assert!((r - 2.0).abs() < 1e-5);
        assert!((theta - PI / 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_polar_axes() {
        assert!(polar_to_cartesian(1.0, 0.0).abs_diff_eq(Vec2::X, 1e-6));
        assert!(polar_to_cartesian(1.0, PI / 2.0).abs_diff_eq(Vec2::Y, 1e-6));
    }
}
