//! Owner-keyed one-shot task scheduler.
//!
//! Every timed behavior in the simulation (swing pauses, deferred planet
//! disposal, power timers, finale loops) is a task here. Tasks are keyed
//! by their owner so that disposing an owner cancels exactly its own
//! pending work and nothing fires into a recycled entity.

use super::pool::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskOwner {
    Moon(EntityId),
    /// Challenge sequence number, unique per loaded challenge.
    Challenge(u64),
    Player,
    Game,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    StopSwinging,
    RestartSwinging,
    DisposePlanets,
    PowerHalfTime,
    PowerExpired,
    BombTick,
    SpawnFirework,
    GoalBounce,
}

#[derive(Debug, Clone, Copy)]
struct Task {
    owner: TaskOwner,
    kind: TaskKind,
    at: f64,
    seq: u64,
}

/// Advanced by the scaled game clock; paused time schedules nothing.
#[derive(Debug, Default)]
pub struct Scheduler {
    now: f64,
    next_seq: u64,
    tasks: Vec<Task>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    /// Fire `kind` for `owner` after `delay` seconds of game time.
    pub fn schedule(&mut self, owner: TaskOwner, kind: TaskKind, delay: f32) {
        let task = Task {
            owner,
            kind,
            at: self.now + f64::from(delay),
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.tasks.push(task);
    }

    /// Advance the clock and drain every task that came due, ordered by
    /// due time then by scheduling order.
    pub fn advance(&mut self, dt: f32) -> Vec<(TaskOwner, TaskKind)> {
        self.now += f64::from(dt);
        let now = self.now;
        let mut due: Vec<Task> = Vec::new();
        self.tasks.retain(|task| {
            if task.at <= now {
                due.push(*task);
                false
            } else {
                true
            }
        });
        due.sort_by(|a, b| a.at.partial_cmp(&b.at).unwrap().then(a.seq.cmp(&b.seq)));
        due.into_iter().map(|t| (t.owner, t.kind)).collect()
    }

    /// Drop every pending task belonging to `owner`.
    pub fn cancel_owner(&mut self, owner: TaskOwner) {
        self.tasks.retain(|task| task.owner != owner);
    }

    pub fn cancel(&mut self, owner: TaskOwner, kind: TaskKind) {
        self.tasks.retain(|task| task.owner != owner || task.kind != kind);
    }

    pub fn has(&self, owner: TaskOwner, kind: TaskKind) -> bool {
        self.tasks
            .iter()
            .any(|task| task.owner == owner && task.kind == kind)
    }

    pub fn pending(&self) -> usize {
        self.tasks.len()
    }
}
