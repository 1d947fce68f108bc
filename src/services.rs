//! Collaborator interfaces the simulation fires into: audio, HUD, light
//! show, and level progress. The core never blocks on any of these; they
//! are fire-and-forget seams the platform layer implements.
//!
//! `NullServices` is the do-nothing bundle; the recording bundle captures
//! every call as a line of text for tests and the headless demo.

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;

use crate::settings::DetailPreset;

/// One-shot sound effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioClip {
    Victory,
    Yay,
    Yipee,
    Yes,
    Yummy,
    Zip,
    Boing,
    Faint,
    MoonCry,
    Take,
    Fall,
    Hit,
    Beep,
    OhOh,
    Firework,
    Crickets,
}

/// Clips cheered when a plain target is reached; one is drawn at random.
pub const TARGET_REACHED_CLIPS: [AudioClip; 4] = [
    AudioClip::Yay,
    AudioClip::Yipee,
    AudioClip::Yes,
    AudioClip::Yummy,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MusicTrack {
    Game,
    GameOver,
    GrandFinale,
}

pub trait AudioService {
    fn play(&mut self, clip: AudioClip);
    fn play_music(&mut self, track: MusicTrack);
    fn start_loop(&mut self, clip: AudioClip);
    fn stop_loop(&mut self, clip: AudioClip);
    fn set_paused(&mut self, paused: bool);
}

pub trait HudService {
    /// Banner when a level marker is reached.
    fn show_level(&mut self, level: usize, max_level: usize);
    /// First-level tutorial overlay.
    fn show_help(&mut self);
    fn score(&mut self, total: u32);
    /// Remaining uses of the active power.
    fn power_counter(&mut self, count: i32);
    fn powers_down(&mut self);
    /// Nudge toward the store while the player sleeps.
    fn hint_store(&mut self, show: bool);
    fn fail(&mut self);
    fn set_pause_enabled(&mut self, enabled: bool);
    fn set_store_enabled(&mut self, enabled: bool);
}

/// Light show capability. The variant is picked once at composition time
/// from the detail preset; the simulation never asks which one it got.
pub trait LightService {
    fn init(&mut self);
    fn party(&mut self);
    fn endless_party(&mut self);
}

/// Integer level progress, persisted by the platform.
pub trait ProgressStore {
    fn from_level(&self) -> usize;
    fn set_from_level(&mut self, level: usize);
    fn high_level(&self) -> usize;
    fn set_high_level(&mut self, level: usize);
}

/// Everything the simulation talks to, bundled.
pub struct Services {
    pub audio: Box<dyn AudioService>,
    pub hud: Box<dyn HudService>,
    pub lights: Box<dyn LightService>,
    pub progress: Box<dyn ProgressStore>,
}

impl Services {
    pub fn null(preset: DetailPreset) -> Self {
        Self {
            audio: Box::new(NullAudio),
            hud: Box::new(NullHud),
            lights: lights_for(preset),
            progress: Box::new(MemoryProgress::default()),
        }
    }

    /// Services that append every call to a shared log. Used by tests and
    /// the demo binary.
    pub fn recording(preset: DetailPreset) -> (Self, EventLog) {
        let log = EventLog::default();
        let services = Self {
            audio: Box::new(RecordingAudio { log: log.clone() }),
            hud: Box::new(RecordingHud { log: log.clone() }),
            lights: lights_for(preset),
            progress: Box::new(MemoryProgress::default()),
        };
        (services, log)
    }
}

/// Pick the light-show implementation for a preset.
pub fn lights_for(preset: DetailPreset) -> Box<dyn LightService> {
    if preset.full_lights() {
        Box::new(FullLights::default())
    } else {
        Box::new(BasicLights)
    }
}

// ---------------------------------------------------------------------------
// Implementations

pub struct NullAudio;

impl AudioService for NullAudio {
    fn play(&mut self, _clip: AudioClip) {}
    fn play_music(&mut self, _track: MusicTrack) {}
    fn start_loop(&mut self, _clip: AudioClip) {}
    fn stop_loop(&mut self, _clip: AudioClip) {}
    fn set_paused(&mut self, _paused: bool) {}
}

pub struct NullHud;

impl HudService for NullHud {
    fn show_level(&mut self, _level: usize, _max_level: usize) {}
    fn show_help(&mut self) {}
    fn score(&mut self, _total: u32) {}
    fn power_counter(&mut self, _count: i32) {}
    fn powers_down(&mut self) {}
    fn hint_store(&mut self, _show: bool) {}
    fn fail(&mut self) {}
    fn set_pause_enabled(&mut self, _enabled: bool) {}
    fn set_store_enabled(&mut self, _enabled: bool) {}
}

/// Animated global light rig for devices that can afford it.
#[derive(Default)]
pub struct FullLights {
    partying: bool,
}

impl LightService for FullLights {
    fn init(&mut self) {
        self.partying = false;
        debug!("lights: init");
    }

    fn party(&mut self) {
        debug!("lights: party");
    }

    fn endless_party(&mut self) {
        self.partying = true;
        debug!("lights: endless party");
    }
}

/// Static lighting for low-detail devices. Celebrations are skipped.
pub struct BasicLights;

impl LightService for BasicLights {
    fn init(&mut self) {}
    fn party(&mut self) {}
    fn endless_party(&mut self) {}
}

#[derive(Debug, Default)]
pub struct MemoryProgress {
    from_level: usize,
    high_level: usize,
}

impl ProgressStore for MemoryProgress {
    fn from_level(&self) -> usize {
        self.from_level
    }

    fn set_from_level(&mut self, level: usize) {
        self.from_level = level;
    }

    fn high_level(&self) -> usize {
        self.high_level
    }

    fn set_high_level(&mut self, level: usize) {
        self.high_level = level;
    }
}

// ---------------------------------------------------------------------------
// Recording doubles

/// Shared append-only call log.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Rc<RefCell<Vec<String>>>);

impl EventLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.0.borrow().iter().any(|e| e.contains(needle))
    }

    pub fn count(&self, needle: &str) -> usize {
        self.0.borrow().iter().filter(|e| e.contains(needle)).count()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

pub struct RecordingAudio {
    log: EventLog,
}

impl AudioService for RecordingAudio {
    fn play(&mut self, clip: AudioClip) {
        self.log.push(format!("audio: {clip:?}"));
    }

    fn play_music(&mut self, track: MusicTrack) {
        self.log.push(format!("music: {track:?}"));
    }

    fn start_loop(&mut self, clip: AudioClip) {
        self.log.push(format!("audio loop start: {clip:?}"));
    }

    fn stop_loop(&mut self, clip: AudioClip) {
        self.log.push(format!("audio loop stop: {clip:?}"));
    }

    fn set_paused(&mut self, paused: bool) {
        self.log.push(format!("audio paused: {paused}"));
    }
}

pub struct RecordingHud {
    log: EventLog,
}

impl HudService for RecordingHud {
    fn show_level(&mut self, level: usize, max_level: usize) {
        self.log.push(format!("hud: level {level}/{max_level}"));
    }

    fn show_help(&mut self) {
        self.log.push("hud: help");
    }

    fn score(&mut self, total: u32) {
        self.log.push(format!("hud: score {total}"));
    }

    fn power_counter(&mut self, count: i32) {
        self.log.push(format!("hud: power {count}"));
    }

    fn powers_down(&mut self) {
        self.log.push("hud: powers down");
    }

    fn hint_store(&mut self, show: bool) {
        self.log.push(format!("hud: store hint {show}"));
    }

    fn fail(&mut self) {
        self.log.push("hud: fail");
    }

    fn set_pause_enabled(&mut self, enabled: bool) {
        self.log.push(format!("hud: pause button {enabled}"));
    }

    fn set_store_enabled(&mut self, enabled: bool) {
        self.log.push(format!("hud: store button {enabled}"));
    }
}
