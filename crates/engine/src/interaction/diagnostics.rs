use std::collections::BTreeSet;

use tracing::{info, warn};

use super::config::MissingComponentMode;
use crate::world::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticKind {
    MissingSuppressionMarker,
    MissingGravityFactor,
    /// Released without a body, so it drops instead of flying.
    MissingVelocity,
    /// In flight without a collider, so the sweep cannot guard it.
    MissingCollider,
}

impl DiagnosticKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::MissingSuppressionMarker => "missing_suppression_marker",
            Self::MissingGravityFactor => "missing_gravity_factor",
            Self::MissingVelocity => "missing_velocity",
            Self::MissingCollider => "missing_collider",
        }
    }
}

/// Reports each (object, kind) pair at most once for the lifetime of the log.
#[derive(Debug, Default)]
pub struct DiagnosticLog {
    reported: BTreeSet<(ObjectId, DiagnosticKind)>,
}

impl DiagnosticLog {
    /// Returns `true` when this call emitted the log line.
    pub fn report_once(
        &mut self,
        object: ObjectId,
        kind: DiagnosticKind,
        mode: MissingComponentMode,
    ) -> bool {
        if !self.reported.insert((object, kind)) {
            return false;
        }
        match mode {
            MissingComponentMode::Strict => warn!(
                object = object.0,
                diagnostic = kind.as_str(),
                "missing_component_rejected"
            ),
            MissingComponentMode::Fallback => info!(
                object = object.0,
                diagnostic = kind.as_str(),
                "missing_component_synthesized"
            ),
        }
        true
    }

    pub fn has_reported(&self, object: ObjectId, kind: DiagnosticKind) -> bool {
        self.reported.contains(&(object, kind))
    }

    pub fn len(&self) -> usize {
        self.reported.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reported.is_empty()
    }
}
