//! Keyed entity pool over a slotted arena.
//!
//! Spawning hands back the first inactive instance registered under the
//! key, or grows the arena when none is free. The arena never shrinks and
//! slots are never repurposed under a different key, so handles stay
//! stable for the life of the pool and a release-then-spawn of the same
//! key reuses the same slot.

use glam::Vec2;
use log::{error, warn};
use std::collections::HashMap;

use super::moon::MoonState;
use super::planet::PlanetState;
use super::target::{CollectibleState, PowerColor, TargetState};

/// Pool keys, matching the names used in the authored challenge files.
pub mod keys {
    pub const PLANET: &str = "PLANET";
    pub const TARGET: &str = "TARGET";

    pub const SMALL_BLUE: &str = "SMALL_BLUE";
    pub const SMALL_GREEN: &str = "SMALL_GREEN";
    pub const SMALL_ORANGE: &str = "SMALL_ORANGE";
    pub const SMALL_PINK: &str = "SMALL_PINK";
    pub const SMALL_YELLOW: &str = "SMALL_YELLOW";

    pub const MEDIUM_BLUE: &str = "MEDIUM_BLUE";
    pub const MEDIUM_GREEN: &str = "MEDIUM_GREEN";
    pub const MEDIUM_ORANGE: &str = "MEDIUM_ORANGE";
    pub const MEDIUM_PINK: &str = "MEDIUM_PINK";
    pub const MEDIUM_YELLOW: &str = "MEDIUM_YELLOW";

    pub const BIG_BLUE: &str = "BIG_BLUE";
    pub const BIG_GREEN: &str = "BIG_GREEN";
    pub const BIG_ORANGE: &str = "BIG_ORANGE";
    pub const BIG_PINK: &str = "BIG_PINK";
    pub const BIG_YELLOW: &str = "BIG_YELLOW";

    pub const POWER_UP_RED: &str = "POWER_UP_RED";
    pub const POWER_UP_ORANGE: &str = "POWER_UP_ORANGE";
    pub const POWER_UP_GREEN: &str = "POWER_UP_GREEN";
    pub const POWER_UP_YELLOW: &str = "POWER_UP_YELLOW";
    pub const POWER_UP_PINK: &str = "POWER_UP_PINK";
    pub const POWER_UP_BLUE: &str = "POWER_UP_BLUE";

    pub const CANDY: &str = "CANDY";

    pub const FIREWORK_01: &str = "FIREWORK_01";
    pub const FIREWORK_02: &str = "FIREWORK_02";
    pub const FIREWORK_03: &str = "FIREWORK_03";
    pub const FIREWORK_04: &str = "FIREWORK_04";
}

pub const POWER_UP_KEYS: [&str; 6] = [
    keys::POWER_UP_RED,
    keys::POWER_UP_ORANGE,
    keys::POWER_UP_GREEN,
    keys::POWER_UP_YELLOW,
    keys::POWER_UP_PINK,
    keys::POWER_UP_BLUE,
];

pub const FIREWORK_KEYS: [&str; 4] = [
    keys::FIREWORK_01,
    keys::FIREWORK_02,
    keys::FIREWORK_03,
    keys::FIREWORK_04,
];

/// Instances pre-created per key at startup.
pub const PREWARM_SIZE: usize = 3;

/// Hit radii per moon size. Gap markers use the same spans.
pub const SMALL_RADIUS: f32 = 0.2;
pub const MEDIUM_RADIUS: f32 = 0.3;
pub const BIG_RADIUS: f32 = 0.4;

/// Stable handle into the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u32);

impl EntityId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    #[cfg(test)]
    pub(crate) fn from_test(raw: u32) -> Self {
        Self(raw)
    }
}

/// Template an instance is built (and rebuilt on reuse) from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Prefab {
    Planet,
    Target,
    Moon { hit_radius: f32 },
    PowerUp(PowerColor),
    Candy,
    Firework,
}

impl Prefab {
    fn instantiate(&self, pos: Vec2) -> Payload {
        match *self {
            Prefab::Planet => Payload::Planet(PlanetState::new(pos)),
            Prefab::Target => Payload::Target(TargetState::new(pos)),
            Prefab::Moon { hit_radius } => Payload::Moon(MoonState::new(pos, hit_radius)),
            Prefab::PowerUp(color) => {
                Payload::Collectible(CollectibleState::power_up(pos, color))
            }
            Prefab::Candy => Payload::Collectible(CollectibleState::candy(pos)),
            Prefab::Firework => Payload::Firework { pos },
        }
    }
}

/// Per-entity state. The variant never changes for a given slot.
#[derive(Debug, Clone)]
pub enum Payload {
    Planet(PlanetState),
    Target(TargetState),
    Moon(MoonState),
    Collectible(CollectibleState),
    Firework { pos: Vec2 },
}

impl Payload {
    pub fn pos(&self) -> Vec2 {
        match self {
            Payload::Planet(p) => p.pos,
            Payload::Target(t) => t.pos,
            Payload::Moon(m) => m.pos,
            Payload::Collectible(c) => c.pos,
            Payload::Firework { pos } => *pos,
        }
    }
}

#[derive(Debug)]
struct Record {
    active: bool,
    payload: Payload,
}

#[derive(Debug)]
struct PoolEntry {
    prefab: Prefab,
    instances: Vec<EntityId>,
}

#[derive(Debug, Default)]
pub struct EntityPool {
    registry: HashMap<String, PoolEntry>,
    arena: Vec<Record>,
}

impl EntityPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pool with every gameplay key registered and pre-warmed.
    pub fn with_defaults() -> Self {
        let mut pool = Self::new();
        pool.register(keys::PLANET, Prefab::Planet);
        pool.register(keys::TARGET, Prefab::Target);

        let sizes = [
            (SMALL_RADIUS, [keys::SMALL_BLUE, keys::SMALL_GREEN, keys::SMALL_ORANGE, keys::SMALL_PINK, keys::SMALL_YELLOW]),
            (MEDIUM_RADIUS, [keys::MEDIUM_BLUE, keys::MEDIUM_GREEN, keys::MEDIUM_ORANGE, keys::MEDIUM_PINK, keys::MEDIUM_YELLOW]),
            (BIG_RADIUS, [keys::BIG_BLUE, keys::BIG_GREEN, keys::BIG_ORANGE, keys::BIG_PINK, keys::BIG_YELLOW]),
        ];
        for (hit_radius, color_keys) in sizes {
            for key in color_keys {
                pool.register(key, Prefab::Moon { hit_radius });
            }
        }

        pool.register(keys::POWER_UP_RED, Prefab::PowerUp(PowerColor::Red));
        pool.register(keys::POWER_UP_ORANGE, Prefab::PowerUp(PowerColor::Orange));
        pool.register(keys::POWER_UP_GREEN, Prefab::PowerUp(PowerColor::Green));
        pool.register(keys::POWER_UP_YELLOW, Prefab::PowerUp(PowerColor::Yellow));
        pool.register(keys::POWER_UP_PINK, Prefab::PowerUp(PowerColor::Pink));
        pool.register(keys::POWER_UP_BLUE, Prefab::PowerUp(PowerColor::Blue));
        pool.register(keys::CANDY, Prefab::Candy);

        for key in FIREWORK_KEYS {
            pool.register(key, Prefab::Firework);
        }

        pool.prewarm(PREWARM_SIZE);
        pool
    }

    pub fn register(&mut self, key: impl Into<String>, prefab: Prefab) {
        self.registry.insert(
            key.into(),
            PoolEntry {
                prefab,
                instances: Vec::new(),
            },
        );
    }

    /// Pre-instantiate `count` inactive instances for every key so the
    /// first spawns never allocate mid-frame.
    pub fn prewarm(&mut self, count: usize) {
        let keys: Vec<String> = self.registry.keys().cloned().collect();
        for key in keys {
            for _ in 0..count {
                let prefab = self.registry[&key].prefab;
                let id = EntityId(self.arena.len() as u32);
                self.arena.push(Record {
                    active: false,
                    payload: prefab.instantiate(Vec2::ZERO),
                });
                if let Some(entry) = self.registry.get_mut(&key) {
                    entry.instances.push(id);
                }
            }
        }
    }

    /// First inactive instance under `key`, or a new one. `None` only for
    /// unregistered keys, which is a programming error and logged as such.
    pub fn spawn(&mut self, key: &str, pos: Vec2) -> Option<EntityId> {
        let Some(entry) = self.registry.get(key) else {
            error!("spawn: unknown pool key {key:?}");
            return None;
        };
        let prefab = entry.prefab;
        let reusable = entry
            .instances
            .iter()
            .copied()
            .find(|id| !self.arena[id.index()].active);

        match reusable {
            Some(id) => {
                let record = &mut self.arena[id.index()];
                record.active = true;
                record.payload = prefab.instantiate(pos);
                Some(id)
            }
            None => {
                let id = EntityId(self.arena.len() as u32);
                self.arena.push(Record {
                    active: true,
                    payload: prefab.instantiate(pos),
                });
                if let Some(entry) = self.registry.get_mut(key) {
                    entry.instances.push(id);
                }
                Some(id)
            }
        }
    }

    /// Return an instance to the pool. Double release is a no-op.
    pub fn release(&mut self, id: EntityId) {
        match self.arena.get_mut(id.index()) {
            Some(record) if record.active => record.active = false,
            Some(_) => warn!("release: {id:?} already inactive"),
            None => warn!("release: {id:?} out of range"),
        }
    }

    pub fn is_active(&self, id: EntityId) -> bool {
        self.arena.get(id.index()).is_some_and(|r| r.active)
    }

    pub fn pos(&self, id: EntityId) -> Option<Vec2> {
        let record = self.arena.get(id.index())?;
        record.active.then(|| record.payload.pos())
    }

    fn payload(&self, id: EntityId) -> Option<&Payload> {
        let record = self.arena.get(id.index())?;
        record.active.then_some(&record.payload)
    }

    fn payload_mut(&mut self, id: EntityId) -> Option<&mut Payload> {
        let record = self.arena.get_mut(id.index())?;
        record.active.then_some(&mut record.payload)
    }

    pub fn moon(&self, id: EntityId) -> Option<&MoonState> {
        match self.payload(id)? {
            Payload::Moon(m) => Some(m),
            _ => None,
        }
    }

    pub fn moon_mut(&mut self, id: EntityId) -> Option<&mut MoonState> {
        match self.payload_mut(id)? {
            Payload::Moon(m) => Some(m),
            _ => None,
        }
    }

    pub fn planet(&self, id: EntityId) -> Option<&PlanetState> {
        match self.payload(id)? {
            Payload::Planet(p) => Some(p),
            _ => None,
        }
    }

    pub fn planet_mut(&mut self, id: EntityId) -> Option<&mut PlanetState> {
        match self.payload_mut(id)? {
            Payload::Planet(p) => Some(p),
            _ => None,
        }
    }

    pub fn target(&self, id: EntityId) -> Option<&TargetState> {
        match self.payload(id)? {
            Payload::Target(t) => Some(t),
            _ => None,
        }
    }

    pub fn target_mut(&mut self, id: EntityId) -> Option<&mut TargetState> {
        match self.payload_mut(id)? {
            Payload::Target(t) => Some(t),
            _ => None,
        }
    }

    pub fn collectible(&self, id: EntityId) -> Option<&CollectibleState> {
        match self.payload(id)? {
            Payload::Collectible(c) => Some(c),
            _ => None,
        }
    }

    pub fn collectible_mut(&mut self, id: EntityId) -> Option<&mut CollectibleState> {
        match self.payload_mut(id)? {
            Payload::Collectible(c) => Some(c),
            _ => None,
        }
    }

    /// Active instances under a key, in slot order.
    pub fn active_ids(&self, key: &str) -> Vec<EntityId> {
        self.registry
            .get(key)
            .map(|entry| {
                entry
                    .instances
                    .iter()
                    .copied()
                    .filter(|id| self.arena[id.index()].active)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn active_count(&self, key: &str) -> usize {
        self.active_ids(key).len()
    }

    /// Total instances ever created under a key.
    pub fn size(&self, key: &str) -> usize {
        self.registry.get(key).map_or(0, |e| e.instances.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_pool() -> EntityPool {
        let mut pool = EntityPool::new();
        pool.register(keys::TARGET, Prefab::Target);
        pool.register(keys::SMALL_BLUE, Prefab::Moon { hit_radius: 0.2 });
        pool
    }

    #[test]
    fn test_spawn_release_spawn_reuses_slot() {
        let mut pool = small_pool();
        let a = pool.spawn(keys::TARGET, Vec2::ZERO).unwrap();
        pool.release(a);
        let b = pool.spawn(keys::TARGET, Vec2::ONE).unwrap();
        assert_eq!(a, b);
        assert_eq!(pool.size(keys::TARGET), 1);
        assert_eq!(pool.pos(b), Some(Vec2::ONE));
    }

    #[test]
    fn test_grows_when_no_free_instance() {
        let mut pool = small_pool();
        let a = pool.spawn(keys::TARGET, Vec2::ZERO).unwrap();
        let b = pool.spawn(keys::TARGET, Vec2::ZERO).unwrap();
        assert_ne!(a, b);
        assert_eq!(pool.size(keys::TARGET), 2);
        pool.release(a);
        pool.release(b);
        assert_eq!(pool.size(keys::TARGET), 2);
        assert_eq!(pool.active_count(keys::TARGET), 0);
    }

    #[test]
    fn test_unknown_key_yields_none() {
        let mut pool = small_pool();
        assert!(pool.spawn("NO_SUCH_KEY", Vec2::ZERO).is_none());
    }

    #[test]
    fn test_reuse_resets_state() {
        let mut pool = small_pool();
        let id = pool.spawn(keys::SMALL_BLUE, Vec2::ZERO).unwrap();
        pool.moon_mut(id).unwrap().scale = 0.5;
        pool.release(id);
        let id2 = pool.spawn(keys::SMALL_BLUE, Vec2::ZERO).unwrap();
        assert_eq!(id, id2);
        assert_eq!(pool.moon(id2).unwrap().scale, 1.0);
    }

    #[test]
    fn test_inactive_instance_not_reachable() {
        let mut pool = small_pool();
        let id = pool.spawn(keys::TARGET, Vec2::ZERO).unwrap();
        pool.release(id);
        assert!(pool.target(id).is_none());
        assert!(pool.pos(id).is_none());
        // releasing again only warns
        pool.release(id);
    }

    #[test]
    fn test_prewarm_creates_inactive_instances() {
        let mut pool = small_pool();
        pool.prewarm(3);
        assert_eq!(pool.size(keys::TARGET), 3);
        assert_eq!(pool.active_count(keys::TARGET), 0);
        // spawns consume the pre-warmed instances before growing
        pool.spawn(keys::TARGET, Vec2::ZERO).unwrap();
        pool.spawn(keys::TARGET, Vec2::ZERO).unwrap();
        pool.spawn(keys::TARGET, Vec2::ZERO).unwrap();
        assert_eq!(pool.size(keys::TARGET), 3);
        pool.spawn(keys::TARGET, Vec2::ZERO).unwrap();
        assert_eq!(pool.size(keys::TARGET), 4);
    }

    #[test]
    fn test_default_registry_covers_gameplay_keys() {
        let mut pool = EntityPool::with_defaults();
        for key in [keys::PLANET, keys::TARGET, keys::BIG_PINK, keys::CANDY, keys::FIREWORK_04] {
            assert_eq!(pool.size(key), PREWARM_SIZE, "{key}");
            assert!(pool.spawn(key, Vec2::ZERO).is_some(), "{key}");
        }
    }
}
