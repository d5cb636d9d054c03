use glam::Vec3;

use crate::world::{HandId, ObjectId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseKind {
    Throw,
    Slingshot,
    /// Released without velocity because the object has no body.
    Drop,
    /// Moved from the hand into its throw queue.
    Staged,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactEvent {
    pub object: ObjectId,
    pub other: ObjectId,
    pub point: Vec3,
    pub normal: Vec3,
    pub tick: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionEvent {
    Picked {
        hand: HandId,
        object: ObjectId,
    },
    Released {
        hand: HandId,
        object: ObjectId,
        kind: ReleaseKind,
        velocity: Vec3,
    },
    Impact(ImpactEvent),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteractionEventCounts {
    pub total: u32,
    pub picked: u32,
    pub thrown: u32,
    pub slingshot: u32,
    pub dropped: u32,
    pub staged: u32,
    pub impacts: u32,
}

impl InteractionEventCounts {
    fn record(&mut self, event: &InteractionEvent) {
        self.total = self.total.saturating_add(1);
        match event {
            InteractionEvent::Picked { .. } => self.picked = self.picked.saturating_add(1),
            InteractionEvent::Released { kind, .. } => match kind {
                ReleaseKind::Throw => self.thrown = self.thrown.saturating_add(1),
                ReleaseKind::Slingshot => self.slingshot = self.slingshot.saturating_add(1),
                ReleaseKind::Drop => self.dropped = self.dropped.saturating_add(1),
                ReleaseKind::Staged => self.staged = self.staged.saturating_add(1),
            },
            InteractionEvent::Impact(_) => self.impacts = self.impacts.saturating_add(1),
        }
    }
}

#[derive(Debug, Default)]
pub struct InteractionEventBus {
    current_tick_events: Vec<InteractionEvent>,
    last_tick_events: Vec<InteractionEvent>,
    last_tick_counts: InteractionEventCounts,
}

impl InteractionEventBus {
    pub(crate) fn emit(&mut self, event: InteractionEvent) {
        self.current_tick_events.push(event);
    }

    pub(crate) fn finish_tick_rollover(&mut self) {
        let mut counts = InteractionEventCounts::default();
        for event in &self.current_tick_events {
            counts.record(event);
        }
        self.last_tick_counts = counts;
        self.last_tick_events = std::mem::take(&mut self.current_tick_events);
    }

    pub fn last_tick_events(&self) -> &[InteractionEvent] {
        &self.last_tick_events
    }

    pub fn last_tick_impacts(&self) -> impl Iterator<Item = &ImpactEvent> {
        self.last_tick_events.iter().filter_map(|event| match event {
            InteractionEvent::Impact(impact) => Some(impact),
            _ => None,
        })
    }

    pub fn last_tick_counts(&self) -> InteractionEventCounts {
        self.last_tick_counts
    }
}
