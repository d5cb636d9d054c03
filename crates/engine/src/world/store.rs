use tracing::debug;

use super::object::{HandId, InFlightState, ObjectDesc, ObjectId, SimObject};

/// Structural changes collected during a stage's read pass and applied by
/// [`ObjectStore::apply_pending`] once the stage has finished iterating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarkerMutation {
    AttachHeld { object: ObjectId, hand: HandId },
    DetachHeld { object: ObjectId },
    SetStaged { object: ObjectId, hand: Option<HandId> },
    SetSuppressed { object: ObjectId, enabled: bool },
    BeginFlight { object: ObjectId, state: InFlightState },
    EndFlight { object: ObjectId },
    MarkImpacted { object: ObjectId },
}

impl MarkerMutation {
    fn object(&self) -> ObjectId {
        match *self {
            Self::AttachHeld { object, .. }
            | Self::DetachHeld { object }
            | Self::SetStaged { object, .. }
            | Self::SetSuppressed { object, .. }
            | Self::BeginFlight { object, .. }
            | Self::EndFlight { object }
            | Self::MarkImpacted { object } => object,
        }
    }
}

#[derive(Debug, Default)]
pub struct ObjectIdAllocator {
    next: u64,
}

impl ObjectIdAllocator {
    pub fn allocate(&mut self) -> ObjectId {
        let id = ObjectId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyPendingStats {
    pub mutations_applied: u32,
    pub mutations_skipped: u32,
    pub despawned: u32,
    pub spawned: u32,
}

impl ApplyPendingStats {
    pub fn accumulate(&mut self, other: ApplyPendingStats) {
        self.mutations_applied = self.mutations_applied.saturating_add(other.mutations_applied);
        self.mutations_skipped = self.mutations_skipped.saturating_add(other.mutations_skipped);
        self.despawned = self.despawned.saturating_add(other.despawned);
        self.spawned = self.spawned.saturating_add(other.spawned);
    }
}

/// Arena of simulated objects, kept sorted by id so every iteration is in a
/// stable, platform-independent order.
#[derive(Debug, Default)]
pub struct ObjectStore {
    allocator: ObjectIdAllocator,
    objects: Vec<SimObject>,
    pending_spawns: Vec<SimObject>,
    pending_despawns: Vec<ObjectId>,
    pending_mutations: Vec<MarkerMutation>,
}

impl ObjectStore {
    pub fn spawn(&mut self, desc: ObjectDesc) -> ObjectId {
        let id = self.allocator.allocate();
        self.pending_spawns.push(SimObject {
            id,
            debug_name: desc.debug_name,
            pose: desc.pose,
            body: desc.body,
            collider: desc.collider,
            tags: desc.tags,
            hold: desc.hold,
            held_by: None,
            staged_by: None,
            movement_suppressed: desc.movement_suppressed,
            in_flight: None,
            impacted: false,
        });
        id
    }

    pub fn despawn(&mut self, id: ObjectId) -> bool {
        let exists_now = self.find(id).is_some();
        let pending_spawn = self.pending_spawns.iter().any(|object| object.id == id);
        if !exists_now && !pending_spawn {
            return false;
        }
        self.pending_despawns.push(id);
        true
    }

    pub fn defer(&mut self, mutation: MarkerMutation) {
        self.pending_mutations.push(mutation);
    }

    pub fn has_pending(&self) -> bool {
        !self.pending_mutations.is_empty()
            || !self.pending_despawns.is_empty()
            || !self.pending_spawns.is_empty()
    }

    pub fn apply_pending(&mut self) -> ApplyPendingStats {
        let mut stats = ApplyPendingStats::default();

        let mutations = std::mem::take(&mut self.pending_mutations);
        for mutation in mutations {
            let Some(object) = self.find_mut(mutation.object()) else {
                stats.mutations_skipped = stats.mutations_skipped.saturating_add(1);
                debug!(object = mutation.object().0, ?mutation, "mutation_target_missing");
                continue;
            };
            apply_mutation(object, mutation);
            stats.mutations_applied = stats.mutations_applied.saturating_add(1);
        }

        if !self.pending_despawns.is_empty() {
            self.pending_despawns.sort_unstable();
            self.pending_despawns.dedup();
            let pending = &self.pending_despawns;
            let before = self.objects.len();
            self.objects
                .retain(|object| pending.binary_search(&object.id).is_err());
            self.pending_spawns
                .retain(|object| pending.binary_search(&object.id).is_err());
            stats.despawned = (before - self.objects.len()) as u32;
            self.pending_despawns.clear();
        }

        if !self.pending_spawns.is_empty() {
            stats.spawned = self.pending_spawns.len() as u32;
            // Ids are allocated monotonically, so appending keeps the arena sorted.
            self.objects.append(&mut self.pending_spawns);
        }

        stats
    }

    pub fn clear(&mut self) {
        self.objects.clear();
        self.pending_spawns.clear();
        self.pending_despawns.clear();
        self.pending_mutations.clear();
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn objects(&self) -> &[SimObject] {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> &mut [SimObject] {
        &mut self.objects
    }

    pub fn find(&self, id: ObjectId) -> Option<&SimObject> {
        self.objects
            .binary_search_by_key(&id, |object| object.id)
            .ok()
            .map(|index| &self.objects[index])
    }

    pub fn find_mut(&mut self, id: ObjectId) -> Option<&mut SimObject> {
        match self.objects.binary_search_by_key(&id, |object| object.id) {
            Ok(index) => Some(&mut self.objects[index]),
            Err(_) => None,
        }
    }

    pub fn held_count(&self) -> usize {
        self.objects
            .iter()
            .filter(|object| object.held_by.is_some())
            .count()
    }

    pub fn in_flight_count(&self) -> usize {
        self.objects
            .iter()
            .filter(|object| object.in_flight.is_some())
            .count()
    }
}

fn apply_mutation(object: &mut SimObject, mutation: MarkerMutation) {
    match mutation {
        MarkerMutation::AttachHeld { hand, .. } => {
            object.held_by = Some(hand);
            object.in_flight = None;
        }
        MarkerMutation::DetachHeld { .. } => object.held_by = None,
        MarkerMutation::SetStaged { hand, .. } => object.staged_by = hand,
        MarkerMutation::SetSuppressed { enabled, .. } => {
            object.movement_suppressed = Some(enabled);
        }
        MarkerMutation::BeginFlight { state, .. } => {
            object.held_by = None;
            object.in_flight = Some(state);
        }
        MarkerMutation::EndFlight { .. } => object.in_flight = None,
        MarkerMutation::MarkImpacted { .. } => object.impacted = true,
    }
}
