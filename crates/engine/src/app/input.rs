use serde::{Deserialize, Serialize};

use crate::world::Ray;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandAction {
    ReleaseOne,
    ReleaseAll,
    WorldGrabModifier,
}

const ACTION_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: HandAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: HandAction) -> bool {
        self.down[action.index()]
    }
}

impl HandAction {
    const fn index(self) -> usize {
        match self {
            HandAction::ReleaseOne => 0,
            HandAction::ReleaseAll => 1,
            HandAction::WorldGrabModifier => 2,
        }
    }
}

/// Per-hand input sampled once per tick by the input layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HandInput {
    pub hover_ray: Option<Ray>,
    actions: ActionStates,
    /// Monotonic id of the device sample this input was built from.
    pub sample_id: u64,
}

impl HandInput {
    pub fn new(sample_id: u64) -> Self {
        Self {
            sample_id,
            ..Self::default()
        }
    }

    pub fn with_hover_ray(mut self, ray: Ray) -> Self {
        self.hover_ray = Some(ray);
        self
    }

    pub fn with_action(mut self, action: HandAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn is_down(&self, action: HandAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn world_grab_modifier(&self) -> bool {
        self.is_down(HandAction::WorldGrabModifier)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseTrigger {
    pub release_one: bool,
    pub release_all: bool,
}

impl ReleaseTrigger {
    pub fn any(&self) -> bool {
        self.release_one || self.release_all
    }
}

/// Turns held release buttons into single-tick press edges.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReleaseEdgeDetector {
    release_one_was_down: bool,
    release_all_was_down: bool,
    last_sample_id: Option<u64>,
}

impl ReleaseEdgeDetector {
    pub fn poll(&mut self, input: &HandInput) -> ReleaseTrigger {
        if self.last_sample_id == Some(input.sample_id) {
            return ReleaseTrigger::default();
        }
        self.last_sample_id = Some(input.sample_id);

        let release_one_down = input.is_down(HandAction::ReleaseOne);
        let release_all_down = input.is_down(HandAction::ReleaseAll);
        let trigger = ReleaseTrigger {
            release_one: release_one_down && !self.release_one_was_down,
            release_all: release_all_down && !self.release_all_was_down,
        };
        self.release_one_was_down = release_one_down;
        self.release_all_was_down = release_all_down;
        trigger
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
