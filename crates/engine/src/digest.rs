use glam::{Quat, Vec3};
use sha2::{Digest, Sha256};

use crate::interaction::{HandPhase, InteractionPipeline};
use crate::world::{ObjectStore, SimObject};

/// SHA-256 over the bit patterns of every object and hand state, in id
/// order. Two runs that agree on this are bit-for-bit identical.
pub fn world_digest(world: &ObjectStore, pipeline: &InteractionPipeline) -> String {
    let mut hasher = Sha256::new();
    hasher.update((world.len() as u64).to_le_bytes());
    for object in world.objects() {
        hash_object(&mut hasher, object);
    }
    for (hand_id, controller) in pipeline.hands() {
        let state = &controller.state;
        hasher.update(hand_id.0.to_le_bytes());
        hasher.update([phase_byte(state.current_state)]);
        hash_option_u64(&mut hasher, state.held_object.map(|id| id.0));
        hash_vec3(&mut hasher, state.hold_point);
        hasher.update(state.hold_distance.to_bits().to_le_bytes());
        hasher.update(state.state_timer.to_bits().to_le_bytes());
        hasher.update((controller.queue.len() as u64).to_le_bytes());
        for entry in controller.queue.iter() {
            hasher.update(entry.target.0.to_le_bytes());
            hash_vec3(&mut hasher, entry.direction);
            hasher.update(entry.force.to_bits().to_le_bytes());
        }
    }
    to_hex_lower(&hasher.finalize())
}

fn hash_object(hasher: &mut Sha256, object: &SimObject) {
    hasher.update(object.id.0.to_le_bytes());
    hash_vec3(hasher, object.pose.position);
    hash_quat(hasher, object.pose.rotation);
    match object.body {
        Some(body) => {
            hasher.update([1u8]);
            hash_vec3(hasher, body.linear);
            hash_vec3(hasher, body.angular);
            hasher.update(body.inv_mass.to_bits().to_le_bytes());
            match body.gravity_factor {
                Some(factor) => {
                    hasher.update([1u8]);
                    hasher.update(factor.to_bits().to_le_bytes());
                }
                None => hasher.update([0u8]),
            }
        }
        None => hasher.update([0u8]),
    }
    hash_option_u64(hasher, object.held_by.map(|hand| u64::from(hand.0)));
    hash_option_u64(hasher, object.staged_by.map(|hand| u64::from(hand.0)));
    hasher.update([match object.movement_suppressed {
        None => 0u8,
        Some(false) => 1,
        Some(true) => 2,
    }]);
    match object.in_flight {
        Some(flight) => {
            hasher.update([1u8]);
            hash_vec3(hasher, flight.initial_velocity);
            hasher.update(flight.time_since_release.to_bits().to_le_bytes());
            hash_vec3(hasher, flight.prev_position);
            hash_quat(hasher, flight.prev_rotation);
            hasher.update([u8::from(flight.fresh)]);
        }
        None => hasher.update([0u8]),
    }
    hasher.update([u8::from(object.impacted)]);
}

fn hash_vec3(hasher: &mut Sha256, value: Vec3) {
    for component in value.to_array() {
        hasher.update(component.to_bits().to_le_bytes());
    }
}

fn hash_quat(hasher: &mut Sha256, value: Quat) {
    for component in value.to_array() {
        hasher.update(component.to_bits().to_le_bytes());
    }
}

fn hash_option_u64(hasher: &mut Sha256, value: Option<u64>) {
    match value {
        Some(value) => {
            hasher.update([1u8]);
            hasher.update(value.to_le_bytes());
        }
        None => hasher.update([0u8]),
    }
}

fn phase_byte(phase: HandPhase) -> u8 {
    match phase {
        HandPhase::Idle => 0,
        HandPhase::Holding => 1,
        HandPhase::Cooldown => 2,
    }
}

fn to_hex_lower(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}
