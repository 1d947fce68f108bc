//! Target pads and the collectibles that ride on them.
//!
//! A plain target makes one random draw when it materializes: a power-up
//! (20%), a candy (40%), or nothing. Level targets never carry a
//! collectible; they show the level number, or the goal marker on the
//! final level.

use glam::Vec2;
use rand::Rng;

use super::pool::{EntityId, EntityPool, POWER_UP_KEYS};
use super::pool::keys;

const POWER_UP_PROBABILITY: f32 = 0.2;
const CANDY_PROBABILITY: f32 = 0.4;
pub const CANDY_SCORE: u32 = 1;

/// The six power-up flavors. Magnitudes are rolled when taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerColor {
    /// Shields: bounce back off moons instead of dying.
    Red,
    /// Auto-jump the next N targets in a row.
    Orange,
    /// Slow every moon of the upcoming challenge.
    Green,
    /// Shrink the player.
    Yellow,
    /// Timed bonus score.
    Pink,
    /// A bomb: survive the countdown or be idle at zero and lose.
    Blue,
}

impl PowerColor {
    /// Inclusive per-flavor magnitude range.
    pub fn roll_magnitude<R: Rng + ?Sized>(&self, rng: &mut R) -> i32 {
        match self {
            PowerColor::Orange => rng.random_range(1..=6),
            PowerColor::Red => rng.random_range(1..=4),
            PowerColor::Green => rng.random_range(1..=4),
            PowerColor::Yellow => rng.random_range(1..=4),
            PowerColor::Pink => rng.random_range(10..=20),
            PowerColor::Blue => rng.random_range(3..=9),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectibleKind {
    PowerUp(PowerColor),
    Candy,
}

#[derive(Debug, Clone)]
pub struct CollectibleState {
    pub pos: Vec2,
    pub kind: CollectibleKind,
    pub taken: bool,
}

impl CollectibleState {
    pub fn power_up(pos: Vec2, color: PowerColor) -> Self {
        Self {
            pos,
            kind: CollectibleKind::PowerUp(color),
            taken: false,
        }
    }

    pub fn candy(pos: Vec2) -> Self {
        Self {
            pos,
            kind: CollectibleKind::Candy,
            taken: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TargetState {
    pub pos: Vec2,
    pub name: String,
    pub is_level: bool,
    pub level_number: usize,
    /// Final level's target shows the goal marker instead of a number.
    pub is_goal: bool,
    /// Dotted guide line from the previous pole, removed on the terminal
    /// target.
    pub dotted_line: Option<(Vec2, Vec2)>,
    pub collectible: Option<EntityId>,
    pub bounce_animation: bool,
}

impl TargetState {
    pub fn new(pos: Vec2) -> Self {
        Self {
            pos,
            name: String::new(),
            is_level: false,
            level_number: 0,
            is_goal: false,
            dotted_line: None,
            collectible: None,
            bounce_animation: false,
        }
    }

    pub fn remove_dotted_lines(&mut self) {
        self.dotted_line = None;
    }

    pub fn bounce(&mut self) {
        self.bounce_animation = true;
    }
}

/// Configure a freshly spawned target and roll its collectible.
#[allow(clippy::too_many_arguments)]
pub fn init_target<R: Rng + ?Sized>(
    pool: &mut EntityPool,
    target_id: EntityId,
    name: &str,
    pole: Vec2,
    is_level: bool,
    level_number: usize,
    max_level: usize,
    rng: &mut R,
) {
    let Some(pos) = pool.pos(target_id) else {
        return;
    };

    let collectible = if is_level {
        None
    } else {
        let roll: f32 = rng.random();
        if roll <= POWER_UP_PROBABILITY {
            let key = POWER_UP_KEYS[rng.random_range(0..POWER_UP_KEYS.len())];
            pool.spawn(key, pos)
        } else if roll <= POWER_UP_PROBABILITY + CANDY_PROBABILITY {
            pool.spawn(keys::CANDY, pos)
        } else {
            None
        }
    };

    if let Some(target) = pool.target_mut(target_id) {
        target.name = name.to_string();
        target.is_level = is_level;
        target.level_number = level_number;
        target.is_goal = is_level && level_number >= max_level;
        target.dotted_line = Some((pole, pos));
        target.collectible = collectible;
        target.bounce_animation = false;
    }
}

/// Reset the target and return its collectible to the pool. The target
/// itself goes back through the caller.
pub fn dispose_target(pool: &mut EntityPool, target_id: EntityId) {
    let collectible = pool
        .target_mut(target_id)
        .and_then(|target| target.collectible.take());
    if let Some(id) = collectible {
        pool.release(id);
    }
    if let Some(target) = pool.target_mut(target_id) {
        target.bounce_animation = false;
        target.dotted_line = None;
    }
}
