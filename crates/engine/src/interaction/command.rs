use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::world::{HandId, ObjectId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Pick,
    Hold,
    Throw,
    SlingshotThrow,
    QueueThrow,
}

/// A tick-stamped intent from upstream decision logic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub tick: u64,
    pub hand: HandId,
    pub kind: CommandKind,
    #[serde(default)]
    pub target: Option<ObjectId>,
    #[serde(default)]
    pub target_position: Vec3,
    #[serde(default)]
    pub direction: Vec3,
    #[serde(default)]
    pub speed: f32,
    #[serde(default)]
    pub charge_level: f32,
}

impl Command {
    fn new(tick: u64, hand: HandId, kind: CommandKind, target: ObjectId) -> Self {
        Self {
            tick,
            hand,
            kind,
            target: Some(target),
            target_position: Vec3::ZERO,
            direction: Vec3::ZERO,
            speed: 0.0,
            charge_level: 0.0,
        }
    }

    pub fn pick(tick: u64, hand: HandId, target: ObjectId, grab_point: Vec3) -> Self {
        Self {
            target_position: grab_point,
            ..Self::new(tick, hand, CommandKind::Pick, target)
        }
    }

    pub fn hold(tick: u64, hand: HandId, target: ObjectId, target_position: Vec3) -> Self {
        Self {
            target_position,
            ..Self::new(tick, hand, CommandKind::Hold, target)
        }
    }

    pub fn throw(tick: u64, hand: HandId, target: ObjectId, direction: Vec3, speed: f32) -> Self {
        Self {
            direction,
            speed,
            ..Self::new(tick, hand, CommandKind::Throw, target)
        }
    }

    /// `speed <= 0` lets the charge level pick the launch speed.
    pub fn slingshot(
        tick: u64,
        hand: HandId,
        target: ObjectId,
        direction: Vec3,
        speed: f32,
        charge_level: f32,
    ) -> Self {
        Self {
            direction,
            speed,
            charge_level,
            ..Self::new(tick, hand, CommandKind::SlingshotThrow, target)
        }
    }

    pub fn queue_throw(
        tick: u64,
        hand: HandId,
        target: ObjectId,
        direction: Vec3,
        force: f32,
    ) -> Self {
        Self {
            direction,
            speed: force,
            ..Self::new(tick, hand, CommandKind::QueueThrow, target)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandKindCounts {
    pub total: u32,
    pub pick: u32,
    pub hold: u32,
    pub throw: u32,
    pub slingshot_throw: u32,
    pub queue_throw: u32,
}

impl CommandKindCounts {
    pub fn record(&mut self, kind: CommandKind) {
        self.total = self.total.saturating_add(1);
        match kind {
            CommandKind::Pick => self.pick = self.pick.saturating_add(1),
            CommandKind::Hold => self.hold = self.hold.saturating_add(1),
            CommandKind::Throw => self.throw = self.throw.saturating_add(1),
            CommandKind::SlingshotThrow => {
                self.slingshot_throw = self.slingshot_throw.saturating_add(1)
            }
            CommandKind::QueueThrow => self.queue_throw = self.queue_throw.saturating_add(1),
        }
    }
}

/// Per-tick accounting of what happened to the commands the stages visited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandApplyStats {
    pub consumed: CommandKindCounts,
    pub rejected: CommandKindCounts,
    pub unresolved: CommandKindCounts,
    pub pruned: u32,
    pub emitted_throws: u32,
}

impl CommandApplyStats {
    pub fn record_consumed(&mut self, kind: CommandKind) {
        self.consumed.record(kind);
    }

    pub fn record_rejected(&mut self, kind: CommandKind) {
        self.rejected.record(kind);
    }

    pub fn record_unresolved(&mut self, kind: CommandKind) {
        self.unresolved.record(kind);
    }
}

/// Insertion-ordered buffer of pending commands.
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    commands: Vec<Command>,
}

impl CommandQueue {
    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Removes and returns every command of `kind` stamped for `tick`, in
    /// insertion order. Everything else stays queued.
    pub fn take_for(&mut self, tick: u64, kind: CommandKind) -> Vec<Command> {
        let mut taken = Vec::new();
        self.commands.retain(|command| {
            if command.tick == tick && command.kind == kind {
                taken.push(*command);
                false
            } else {
                true
            }
        });
        taken
    }

    /// Puts unresolved commands back; they are visited again only if their
    /// tick comes around, which for the current tick means never.
    pub fn restore(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.commands.extend(commands);
    }

    pub fn prune_stale(&mut self, current_tick: u64) -> u32 {
        let before = self.commands.len();
        self.commands.retain(|command| command.tick >= current_tick);
        (before - self.commands.len()) as u32
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }
}
