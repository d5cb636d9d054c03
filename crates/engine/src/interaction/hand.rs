use std::collections::VecDeque;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::app::ReleaseEdgeDetector;
use crate::world::ObjectId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandPhase {
    #[default]
    Idle,
    Holding,
    Cooldown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HandState {
    pub current_state: HandPhase,
    /// `Some` exactly while `current_state == Holding`.
    pub held_object: Option<ObjectId>,
    pub hold_point: Vec3,
    pub hold_distance: f32,
    pub state_timer: f32,
}

impl HandState {
    pub fn is_holding(&self, object: ObjectId) -> bool {
        self.current_state == HandPhase::Holding && self.held_object == Some(object)
    }

    pub(crate) fn begin_holding(&mut self, object: ObjectId, hold_point: Vec3, hold_distance: f32) {
        self.current_state = HandPhase::Holding;
        self.held_object = Some(object);
        self.hold_point = hold_point;
        self.hold_distance = hold_distance;
        self.state_timer = 0.0;
    }

    pub(crate) fn transition(&mut self, phase: HandPhase) {
        debug_assert!(phase != HandPhase::Holding, "use begin_holding");
        self.current_state = phase;
        self.held_object = None;
        self.state_timer = 0.0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrowQueueEntry {
    pub target: ObjectId,
    pub direction: Vec3,
    pub force: f32,
}

#[derive(Debug, Clone, Default)]
pub struct ThrowQueue {
    entries: VecDeque<ThrowQueueEntry>,
}

impl ThrowQueue {
    pub fn push(&mut self, entry: ThrowQueueEntry) {
        self.entries.push_back(entry);
    }

    pub fn pop_front(&mut self) -> Option<ThrowQueueEntry> {
        self.entries.pop_front()
    }

    pub fn drain_all(&mut self) -> Vec<ThrowQueueEntry> {
        self.entries.drain(..).collect()
    }

    pub fn remove_target(&mut self, target: ObjectId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.target != target);
        before != self.entries.len()
    }

    pub fn contains(&self, target: ObjectId) -> bool {
        self.entries.iter().any(|entry| entry.target == target)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ThrowQueueEntry> {
        self.entries.iter()
    }
}

/// Everything one controlling hand owns across ticks.
#[derive(Debug, Clone, Default)]
pub struct HandController {
    pub state: HandState,
    pub queue: ThrowQueue,
    pub release_edges: ReleaseEdgeDetector,
}
