//! Circle math, chord/central-angle packing helpers, and the device
//! screen bounds used to keep targets reachable.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts;

/// Circle with a center and radius. Hitboxes and capture zones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f32,
}

impl Circle {
    pub fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }

    /// True when the point lies inside or on the boundary.
    pub fn contains(&self, point: Vec2) -> bool {
        self.center.distance_squared(point) <= self.radius * self.radius
    }

    /// True when the interiors of the two circles intersect.
    /// Exact tangency does not count as an overlap.
    pub fn overlaps(&self, other: &Circle) -> bool {
        let reach = self.radius + other.radius;
        self.center.distance_squared(other.center) < reach * reach
    }
}

/// Central angle (radians) subtended by a chord on a circle of the given
/// radius. Chords longer than the diameter saturate to a half turn.
pub fn central_angle(chord: f32, radius: f32) -> f32 {
    if radius <= 0.0 {
        return 0.0;
    }
    let ratio = (chord / (2.0 * radius)).clamp(-1.0, 1.0);
    2.0 * ratio.asin()
}

/// Rotate `pos` clockwise around `pivot` by `degrees`.
pub fn rotate_cw_around(pos: Vec2, pivot: Vec2, degrees: f32) -> Vec2 {
    let rad = -degrees.to_radians();
    let (sin, cos) = rad.sin_cos();
    let rel = pos - pivot;
    pivot + Vec2::new(rel.x * cos - rel.y * sin, rel.x * sin + rel.y * cos)
}

/// Playable half extents around a pole, derived from the design resolution
/// and the device aspect ratio.
///
/// The vertical span always fits the design height; wider screens gain
/// horizontal room. A fixed padding keeps spawned targets from straddling
/// the screen edge.
#[derive(Debug, Clone, Copy)]
pub struct ScreenBounds {
    pub half_width: f32,
    pub half_height: f32,
}

impl ScreenBounds {
    pub fn from_aspect(aspect_ratio: f32) -> Self {
        let height = consts::DESIGN_HEIGHT_PX / consts::PIXELS_PER_UNIT;
        let padding = consts::SCREEN_PADDING_PX / consts::PIXELS_PER_UNIT;
        Self {
            half_width: aspect_ratio * height - padding,
            half_height: height - padding,
        }
    }

    /// Bounds at the 480x800 design aspect ratio.
    pub fn design() -> Self {
        Self::from_aspect(consts::DESIGN_WIDTH_PX / consts::DESIGN_HEIGHT_PX)
    }

    /// Clamp `pos` per axis into the rect centered on `pole`.
    pub fn clamp_around(&self, pole: Vec2, pos: Vec2) -> Vec2 {
        Vec2::new(
            pos.x
                .clamp(pole.x - self.half_width, pole.x + self.half_width),
            pos.y
                .clamp(pole.y - self.half_height, pole.y + self.half_height),
        )
    }

    /// True when `circle` intersects the view rect centered on `anchor`.
    /// Drives per-planet simulation activation.
    pub fn intersects_circle(&self, anchor: Vec2, circle: &Circle) -> bool {
        let rel = circle.center - anchor;
        let dx = (rel.x.abs() - self.half_width).max(0.0);
        let dy = (rel.y.abs() - self.half_height).max(0.0);
        dx * dx + dy * dy < circle.radius * circle.radius
            || (rel.x.abs() <= self.half_width && rel.y.abs() <= self.half_height)
    }
}
