//! Streaming challenge manager.
//!
//! The whole map is flattened into a token queue up front (a level marker
//! token, then that level's challenge names, per level). Challenges are
//! materialized at most `AHEAD_WINDOW` at a time, each chained to the
//! previous target's position, and completed ones are torn down on two
//! deliberately different clocks: planets after their moons' shrink time,
//! targets by a keep-the-last-`BEHIND_WINDOW` window.

use std::collections::{HashMap, VecDeque};

use glam::Vec2;
use log::{debug, info, warn};
use rand::Rng;

use crate::content::{ChallengeConfig, ContentSource, PolarCoords};
use crate::geom::ScreenBounds;
use crate::services::{AudioClip, Services, TARGET_REACHED_CLIPS};

use super::challenge::{load_challenge, Challenge};
use super::planet;
use super::pool::{EntityId, EntityPool};
use super::scheduler::{Scheduler, TaskKind, TaskOwner};
use super::target::dispose_target;

/// Most challenges materialized ahead of the player.
pub const AHEAD_WINDOW: usize = 3;
/// Previous targets kept visible behind the player, not counting the one
/// being stood on.
pub const BEHIND_WINDOW: usize = 3;

const LEVEL_FLAG: &str = "*";
const SEPARATOR: char = '_';

#[derive(Debug, Clone, Copy)]
struct LevelInfo {
    debug_id: i32,
    coords: PolarCoords,
}

pub struct ChallengeManager {
    content: Box<dyn ContentSource>,
    bounds: ScreenBounds,
    level_count: usize,
    current_level: usize,
    active: VecDeque<Challenge>,
    deallocated: VecDeque<Challenge>,
    token_queue: VecDeque<String>,
    target_deallocated: VecDeque<EntityId>,
    level_info: HashMap<usize, LevelInfo>,
    last_pole: Vec2,
    next_seq: u64,
}

impl ChallengeManager {
    /// `None` when the map descriptor itself cannot be loaded; anything
    /// else degrades per token instead.
    pub fn new(content: Box<dyn ContentSource>, bounds: ScreenBounds) -> Option<Self> {
        let map = content.load_map()?;
        Some(Self {
            content,
            bounds,
            level_count: map.level_count(),
            current_level: 0,
            active: VecDeque::new(),
            deallocated: VecDeque::new(),
            token_queue: VecDeque::new(),
            target_deallocated: VecDeque::new(),
            level_info: Self::collect_level_info(&map),
            last_pole: Vec2::ZERO,
            next_seq: 0,
        })
    }

    fn collect_level_info(map: &crate::content::MapConfig) -> HashMap<usize, LevelInfo> {
        map.level_config_list
            .iter()
            .enumerate()
            .map(|(i, level)| {
                (
                    i + 1,
                    LevelInfo {
                        debug_id: level.level_debug_id,
                        coords: level.polar_coords,
                    },
                )
            })
            .collect()
    }

    pub fn level(&self) -> usize {
        self.current_level
    }

    /// Reload sets this back one; the level marker re-credits it.
    pub fn set_level(&mut self, level: usize) {
        self.current_level = level;
    }

    pub fn level_count(&self) -> usize {
        self.level_count
    }

    pub fn last_pole(&self) -> Vec2 {
        self.last_pole
    }

    pub fn active_challenges(&self) -> impl Iterator<Item = &Challenge> {
        self.active.iter()
    }

    /// Planets still in the world: guarding active challenges or fleeing
    /// behind completed ones.
    pub fn live_planets(&self) -> Vec<EntityId> {
        self.active
            .iter()
            .chain(self.deallocated.iter())
            .flat_map(|c| c.planets.iter().copied())
            .collect()
    }

    pub fn head_challenge(&self) -> Option<&Challenge> {
        self.active.front()
    }

    /// Target the player should jump to next. Empty queue is a valid
    /// terminal state, not an error.
    pub fn peek_next_target(&self) -> Option<EntityId> {
        self.active.front().map(|c| c.target)
    }

    /// Rebuild the token path from `level` and eagerly load the first
    /// window of challenges chained from `pole`.
    pub fn load_from_level<R: Rng + ?Sized>(
        &mut self,
        pool: &mut EntityPool,
        scheduler: &mut Scheduler,
        rng: &mut R,
        level: usize,
        pole: Vec2,
    ) {
        self.load_path(level);
        self.load_first_challenges(pool, scheduler, rng, pole);
        self.remove_first_dotted_line(pool);
    }

    fn load_path(&mut self, from_level: usize) {
        self.level_info.clear();
        self.token_queue.clear();

        let map = match self.content.load_map() {
            Some(map) => map,
            None => {
                warn!("load_path: map missing");
                return;
            }
        };
        self.level_count = map.level_count();

        for number in from_level.max(1)..=self.level_count {
            let Some(level) = map.level(number) else {
                continue;
            };
            // a level is a fake challenge marked by its token
            self.token_queue
                .push_back(format!("{LEVEL_FLAG}{SEPARATOR}{number}"));
            self.level_info.insert(
                number,
                LevelInfo {
                    debug_id: level.level_debug_id,
                    coords: level.polar_coords,
                },
            );
            for name in &level.challenge_filename_list {
                self.token_queue.push_back(name.clone());
            }
        }

        info!(
            "path loaded from level {} to {}",
            from_level, self.level_count
        );
    }

    fn load_first_challenges<R: Rng + ?Sized>(
        &mut self,
        pool: &mut EntityPool,
        scheduler: &mut Scheduler,
        rng: &mut R,
        mut pole: Vec2,
    ) {
        let mut attempts = 0;
        while !self.token_queue.is_empty() && attempts < AHEAD_WINDOW {
            if let Some(pos) = self.load_next_challenge(pool, scheduler, rng, pole) {
                pole = pos;
            }
            attempts += 1;
        }
        self.last_pole = pole;
    }

    fn remove_first_dotted_line(&mut self, pool: &mut EntityPool) {
        if let Some(target) = self.peek_next_target()
            && let Some(state) = pool.target_mut(target)
        {
            state.remove_dotted_lines();
        }
    }

    /// Dequeue one token and try to materialize it. Returns the new
    /// target's position when the token produced a challenge.
    fn load_next_challenge<R: Rng + ?Sized>(
        &mut self,
        pool: &mut EntityPool,
        scheduler: &mut Scheduler,
        rng: &mut R,
        pole: Vec2,
    ) -> Option<Vec2> {
        let token = self.token_queue.pop_front()?;

        let (config, is_level, level_number, name) = if Self::is_level_token(&token) {
            let number = Self::level_number(&token)?;
            let info = match self.level_info.get(&number) {
                Some(info) => *info,
                None => {
                    warn!("level {number} missing from path cache");
                    return None;
                }
            };
            let config = ChallengeConfig {
                polar_coords: info.coords,
                ..Default::default()
            };
            let name = format!("Level{SEPARATOR}{number}{SEPARATOR}DebugId{SEPARATOR}{}", info.debug_id);
            (config, true, number, name)
        } else {
            // a missing descriptor skips the token, the path goes on
            match self.content.load_challenge(&token) {
                Some(config) => (config, false, 0, token.clone()),
                None => {
                    warn!("challenge {token:?} not found");
                    return None;
                }
            }
        };

        let seq = self.next_seq;
        self.next_seq += 1;
        let challenge = load_challenge(
            pool,
            scheduler,
            rng,
            &self.bounds,
            seq,
            &name,
            &config,
            is_level,
            level_number,
            self.level_count,
            pole,
        )?;
        let pos = pool.pos(challenge.target);
        debug!("challenge {:?} loaded", challenge.name);
        self.active.push_back(challenge);
        pos
    }

    fn is_level_token(token: &str) -> bool {
        token.starts_with(&format!("{LEVEL_FLAG}{SEPARATOR}"))
    }

    fn level_number(token: &str) -> Option<usize> {
        token.split(SEPARATOR).nth(1)?.parse().ok()
    }

    /// The player landed on the head challenge's target.
    pub fn challenge_completed<R: Rng + ?Sized>(
        &mut self,
        pool: &mut EntityPool,
        scheduler: &mut Scheduler,
        rng: &mut R,
        services: &mut Services,
    ) {
        let Some(completed) = self.active.pop_front() else {
            warn!("challenge_completed with empty queue");
            return;
        };

        for id in &completed.planets {
            planet::start_flee(pool, *id, scheduler);
        }

        self.manage_level(&completed, rng, services);
        self.release_resources(pool, scheduler, completed);

        // top up the window with at most one
        if self.token_queue.is_empty() {
            if self.active.is_empty() {
                info!("map is completed");
            }
        } else if self.active.len() < AHEAD_WINDOW {
            let pole = self.last_pole;
            if let Some(pos) = self.load_next_challenge(pool, scheduler, rng, pole) {
                self.last_pole = pos;
            }
        }
    }

    fn manage_level<R: Rng + ?Sized>(
        &mut self,
        completed: &Challenge,
        rng: &mut R,
        services: &mut Services,
    ) {
        if completed.is_level {
            services.audio.play(AudioClip::Victory);
            self.current_level += 1;

            if self.current_level > services.progress.high_level() {
                services.progress.set_high_level(self.current_level);
            }

            if self.current_level == 1 {
                services.hud.show_help();
            } else {
                services.lights.party();
            }
            services.hud.show_level(self.current_level, self.level_count);
            info!("current level: {}", self.current_level);
        } else {
            let clip = TARGET_REACHED_CLIPS[rng.random_range(0..TARGET_REACHED_CLIPS.len())];
            services.audio.play(clip);
        }
    }

    fn release_resources(
        &mut self,
        pool: &mut EntityPool,
        scheduler: &mut Scheduler,
        completed: Challenge,
    ) {
        scheduler.schedule(
            TaskOwner::Challenge(completed.seq),
            TaskKind::DisposePlanets,
            completed.dispose_planets_after,
        );
        self.target_deallocated.push_back(completed.target);
        self.deallocated.push_back(completed);

        self.dispose_targets(pool);
    }

    /// Targets are not released in sync with planets.
    fn dispose_targets(&mut self, pool: &mut EntityPool) {
        if self.peek_next_target().is_some() {
            // plus one: the target being stood on doesn't count
            if self.target_deallocated.len() > BEHIND_WINDOW + 1
                && let Some(oldest) = self.target_deallocated.pop_front()
            {
                dispose_target(pool, oldest);
                pool.release(oldest);
            }
        } else {
            // terminal state: keep only the last target, without its line
            while self.target_deallocated.len() > 1 {
                if let Some(oldest) = self.target_deallocated.pop_front() {
                    dispose_target(pool, oldest);
                    pool.release(oldest);
                }
            }
            if let Some(last) = self.target_deallocated.front()
                && let Some(target) = pool.target_mut(*last)
            {
                target.remove_dotted_lines();
            }
        }
    }

    /// Deferred planet disposal came due. Completed challenges leave in
    /// completion order.
    pub fn dispose_planets_due(&mut self, pool: &mut EntityPool) {
        let Some(challenge) = self.deallocated.pop_front() else {
            warn!("planet disposal fired with empty deallocated queue");
            return;
        };
        for id in challenge.planets {
            planet::dispose_moons(pool, id);
            pool.release(id);
        }
    }

    /// Slow-down power: only the head challenge's planets are affected.
    pub fn slow_down(&mut self, pool: &mut EntityPool) {
        if let Some(head) = self.active.front() {
            for id in head.planets.clone() {
                planet::slow_down(pool, id);
            }
        }
    }

    pub fn sleep_animation(&mut self, pool: &mut EntityPool) {
        for challenge in &self.active {
            for id in challenge.planets.clone() {
                planet::sleep_animation(pool, id);
            }
        }
    }

    pub fn idle_animation(&mut self, pool: &mut EntityPool) {
        for challenge in &self.active {
            for id in challenge.planets.clone() {
                planet::idle_animation(pool, id);
            }
        }
    }

    pub fn pause_animations(&mut self, pool: &mut EntityPool, pause: bool) {
        for challenge in self.active.iter().chain(self.deallocated.iter()) {
            for id in challenge.planets.clone() {
                planet::pause_animations(pool, id, pause);
            }
        }
    }

    /// Tear the whole map down synchronously. Pending deferred disposals
    /// are cancelled so nothing is returned twice.
    pub fn dispose(&mut self, pool: &mut EntityPool, scheduler: &mut Scheduler) {
        while let Some(challenge) = self.active.pop_front() {
            scheduler.cancel_owner(TaskOwner::Challenge(challenge.seq));
            for id in challenge.planets {
                planet::dispose_moons(pool, id);
                pool.release(id);
            }
            dispose_target(pool, challenge.target);
            pool.release(challenge.target);
        }

        while let Some(challenge) = self.deallocated.pop_front() {
            scheduler.cancel_owner(TaskOwner::Challenge(challenge.seq));
            for id in challenge.planets {
                planet::dispose_moons(pool, id);
                pool.release(id);
            }
        }

        while let Some(target) = self.target_deallocated.pop_front() {
            dispose_target(pool, target);
            pool.release(target);
        }

        info!("map disposed");
    }

    #[cfg(test)]
    pub(crate) fn counts(&self) -> (usize, usize, usize, usize) {
        (
            self.active.len(),
            self.deallocated.len(),
            self.token_queue.len(),
            self.target_deallocated.len(),
        )
    }
}
