//! Transition events - the analytics stream.

use serde::{Deserialize, Serialize};

use crate::id::{EventId, MissionId, ProgressId, StepId};
use crate::tier::Tier;
use crate::Time;

/// What kind of transition happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// A step passed verification
    StepCompleted,
    /// The final step completed
    MissionCompleted,
    /// The difficulty adjuster changed tier
    DifficultyAdjusted,
    /// The user gave up
    MissionAbandoned,
    /// The deadline passed
    MissionExpired,
}

/// A state-machine transition, emitted for analytics consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionEvent {
    /// Unique identifier
    pub id: EventId,

    /// What happened
    pub kind: TransitionKind,

    /// The mission template involved
    pub mission_id: MissionId,

    /// The progress instance involved
    pub progress_id: ProgressId,

    /// The step involved, where relevant
    pub step_id: Option<StepId>,

    /// Tier in force when the transition happened
    pub tier: Tier,

    /// When it happened
    pub timestamp: Time,
}

impl TransitionEvent {
    /// Create an event happening now.
    pub fn new(
        kind: TransitionKind,
        mission_id: MissionId,
        progress_id: ProgressId,
        step_id: Option<StepId>,
        tier: Tier,
    ) -> Self {
        Self {
            id: EventId::new(),
            kind,
            mission_id,
            progress_id,
            step_id,
            tier,
            timestamp: chrono::Utc::now(),
        }
    }
}
