//! Event types for ModalSonic

use crate::collision::Wall;
use crate::math::Vec3;
use crate::world::BodyId;

#[derive(Debug, Clone, PartialEq)]
pub enum ModalSonicEvent {
    Impact {
        body_id: BodyId,
        vertex: usize,
        wall: Wall,
        impulse: Vec3,
    },
    CollisionIterationLimit {
        body_id: BodyId,
        iterations: usize,
    },
    OutputClipped {
        peak: f32,
    },
    QueueOverflow {
        dropped: usize,
    },
    EngineStarted,
    EngineStopped,
    EngineError {
        error: String,
    },
}

impl ModalSonicEvent {
    pub fn body_id(&self) -> Option<BodyId> {
        match self {
            Self::Impact { body_id, .. } | Self::CollisionIterationLimit { body_id, .. } => {
                Some(*body_id)
            }
            _ => None,
        }
    }

    /// Returns true for events that report degraded simulation or output.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::CollisionIterationLimit { .. }
                | Self::OutputClipped { .. }
                | Self::QueueOverflow { .. }
                | Self::EngineError { .. }
        )
    }
}
