//! Challenge and map descriptors plus the content source they load from.
//!
//! Both formats are JSON. Field names match the authored assets, which use
//! camelCase throughout.

use std::collections::HashMap;
use std::path::PathBuf;

use log::warn;
use serde::{Deserialize, Serialize};

/// Polar placement of a target relative to the previous one (the pole).
/// `phi` is authored in degrees, clockwise, with zero pointing left of
/// the pole; the loader adds the half turn before rotating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PolarCoords {
    pub rho: f32,
    pub phi: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SwingConfig {
    pub enabled: bool,
    pub min_radius: f32,
    pub max_radius: f32,
    pub swinging_speed: f32,
    pub swing_duration: f32,
    pub pause_duration: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccelerationConfig {
    pub enabled: bool,
    pub max_speed: f32,
    pub acceleration: f32,
    pub bounce: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpeedConfig {
    pub initial_speed: f32,
    pub clockwise: bool,
    pub acceleration_config: AccelerationConfig,
}

/// One ring of moons around a planet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlanetConfig {
    pub radius: f32,
    pub moon_key_list: Vec<String>,
    pub swing_config: SwingConfig,
    pub speed_config: SpeedConfig,
}

/// How moons leave a completed challenge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FleeConfig {
    pub flee_speed: f32,
    pub shrink_time: f32,
}

/// A single challenge: target placement, flee behavior, planets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChallengeConfig {
    pub polar_coords: PolarCoords,
    pub flee_config: FleeConfig,
    pub planet_config_list: Vec<PlanetConfig>,
}

/// One level of the map: a debug id, the level target's placement, and the
/// ordered challenge names that make up the level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LevelConfig {
    pub level_debug_id: i32,
    pub polar_coords: PolarCoords,
    pub challenge_filename_list: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapConfig {
    pub level_config_list: Vec<LevelConfig>,
}

impl MapConfig {
    pub fn level_count(&self) -> usize {
        self.level_config_list.len()
    }

    /// Levels are numbered from 1.
    pub fn level(&self, number: usize) -> Option<&LevelConfig> {
        if number == 0 {
            return None;
        }
        self.level_config_list.get(number - 1)
    }
}

/// Where challenge descriptors come from. A missing entry is a valid
/// outcome: the manager skips unknown names and keeps streaming.
pub trait ContentSource {
    fn load_map(&self) -> Option<MapConfig>;
    fn load_challenge(&self, name: &str) -> Option<ChallengeConfig>;
}

/// In-memory content, used by tests and the demo binary.
#[derive(Debug, Default)]
pub struct MemoryContent {
    map: MapConfig,
    challenges: HashMap<String, ChallengeConfig>,
}

impl MemoryContent {
    pub fn new(map: MapConfig) -> Self {
        Self {
            map,
            challenges: HashMap::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, config: ChallengeConfig) {
        self.challenges.insert(name.into(), config);
    }
}

impl ContentSource for MemoryContent {
    fn load_map(&self) -> Option<MapConfig> {
        Some(self.map.clone())
    }

    fn load_challenge(&self, name: &str) -> Option<ChallengeConfig> {
        self.challenges.get(name).cloned()
    }
}

/// Content read from a directory of JSON files, one file per descriptor.
#[derive(Debug)]
pub struct FsContent {
    root: PathBuf,
    map_name: String,
}

impl FsContent {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            map_name: "MapConfig".to_string(),
        }
    }

    fn load_json<T: for<'de> Deserialize<'de>>(&self, name: &str) -> Option<T> {
        let path = self.root.join(format!("{name}.json"));
        let text = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("can't parse {}: {err}", path.display());
                None
            }
        }
    }
}

impl ContentSource for FsContent {
    fn load_map(&self) -> Option<MapConfig> {
        self.load_json(&self.map_name)
    }

    fn load_challenge(&self, name: &str) -> Option<ChallengeConfig> {
        self.load_json(name)
    }
}
