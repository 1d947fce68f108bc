//! Gameplay simulation. Everything in here must be deterministic given a
//! seed and an input script: no wall-clock reads, no platform calls, all
//! randomness through the game-owned RNG.
//!
//! Per frame the orchestrator runs three passes in order: zero or more
//! fixed steps (motion), one variable-step logic pass (timers, shrink,
//! collision routing), one late pass (camera anchor, visibility sweep).

pub mod challenge;
pub mod game;
pub mod health;
pub mod manager;
pub mod moon;
pub mod planet;
pub mod player;
pub mod pool;
pub mod scheduler;
pub mod target;

pub use challenge::Challenge;
pub use game::Game;
pub use health::Health;
pub use manager::ChallengeManager;
pub use moon::{MoonPhase, MoonState};
pub use planet::PlanetState;
pub use player::{PlayerEvent, PlayerPhase, PlayerState, PowerState};
pub use pool::{EntityId, EntityPool, Payload, Prefab};
pub use scheduler::{Scheduler, TaskKind, TaskOwner};
pub use target::{CollectibleKind, CollectibleState, PowerColor, TargetState};
