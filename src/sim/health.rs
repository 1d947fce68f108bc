//! Centralized collision routing.
//!
//! Every gameplay collision funnels through here so the vulnerability
//! rule lives in exactly one place: the player can only be hurt while
//! jumping forward outside a target's pad.

use log::error;
use rand::Rng;

use crate::services::{AudioClip, Services};

use super::manager::ChallengeManager;
use super::player::{PlayerEvent, PlayerPhase, PlayerState, PowerState};
use super::pool::{EntityId, EntityPool};
use super::scheduler::Scheduler;
use super::target::CollectibleKind;

#[derive(Debug)]
pub struct Health {
    outside_target: bool,
}

impl Default for Health {
    fn default() -> Self {
        Self::new()
    }
}

impl Health {
    pub fn new() -> Self {
        Self {
            outside_target: true,
        }
    }

    fn is_vulnerable(&self, player: &PlayerState) -> bool {
        player.phase == PlayerPhase::JumpForward && self.outside_target
    }

    /// A moon touched the player. What happens depends entirely on the
    /// active power; only red spares the run.
    pub fn moon_collision(
        &mut self,
        player: &mut PlayerState,
        pool: &mut EntityPool,
        moon_id: EntityId,
        services: &mut Services,
    ) -> Option<PlayerEvent> {
        if !self.is_vulnerable(player) {
            return None;
        }

        match player.power {
            PowerState::Red => {
                if let Some(moon) = pool.moon_mut(moon_id) {
                    moon.cry();
                }
                services.audio.play(AudioClip::MoonCry);
                player.aim_backward(services);
                None
            }
            PowerState::Orange => {
                if let Some(moon) = pool.moon_mut(moon_id) {
                    moon.faint();
                }
                services.audio.play(AudioClip::Faint);
                None
            }
            _ => {
                if let Some(moon) = pool.moon_mut(moon_id) {
                    moon.faint();
                }
                services.audio.play(AudioClip::Faint);
                Some(PlayerEvent::GameOver)
            }
        }
    }

    /// A collectible can be taken mid-jump or while standing on its pad.
    pub fn collectible_collision<R: Rng + ?Sized>(
        &mut self,
        player: &mut PlayerState,
        pool: &mut EntityPool,
        collectible_id: EntityId,
        rng: &mut R,
        scheduler: &mut Scheduler,
        services: &mut Services,
    ) {
        if !self.is_vulnerable(player) && player.phase != PlayerPhase::Idle {
            return;
        }

        let Some(collectible) = pool.collectible_mut(collectible_id) else {
            error!("collectible collision with a non-collectible entity");
            return;
        };
        if collectible.taken {
            return;
        }
        collectible.taken = true;
        let kind = collectible.kind;

        match kind {
            CollectibleKind::PowerUp(color) => {
                let magnitude = color.roll_magnitude(rng);
                player.apply_power_up(color, magnitude, scheduler, services);
            }
            CollectibleKind::Candy => player.take_candy(services),
        }
    }

    /// The player crossed onto a target pad. A forward landing completes
    /// the head challenge; a shield bounce just re-lands.
    #[allow(clippy::too_many_arguments)]
    pub fn target_enter<R: Rng + ?Sized>(
        &mut self,
        player: &mut PlayerState,
        manager: &mut ChallengeManager,
        pool: &mut EntityPool,
        target_id: EntityId,
        rng: &mut R,
        scheduler: &mut Scheduler,
        services: &mut Services,
    ) -> Option<PlayerEvent> {
        if !self.is_vulnerable(player) && player.phase != PlayerPhase::JumpBackward {
            return None;
        }

        if player.phase != PlayerPhase::JumpBackward {
            manager.challenge_completed(pool, scheduler, rng, services);
        }

        let pos = pool.pos(target_id)?;
        let event = player.success(pos, manager, pool, scheduler, services);
        if let Some(target) = pool.target_mut(target_id) {
            target.bounce();
        }
        self.outside_target = false;
        event
    }

    pub fn target_exit(&mut self) {
        self.outside_target = true;
    }
}
