//! PetQuest core data models.
//!
//! This crate defines the fundamental data structures of the mission
//! progression engine: mission templates, verification requirements,
//! per-instance progress state, difficulty tiers, and rewards.

#![warn(missing_docs)]

// Core identities
mod id;

// Mission templates and evidence
mod mission;
mod evidence;

// Per-instance progression state
mod tier;
mod progress;

// Rewards and emitted events
mod reward;
mod event;

// Error taxonomy
mod error;

// Re-exports
pub use id::*;

// Mission & evidence
pub use mission::{
    MissionDefinition, StepDefinition, StepModifier, VerificationRequirement, RequirementKind,
    QuizQuestion,
};
pub use evidence::Evidence;

// Progression
pub use tier::Tier;
pub use progress::{
    MissionProgress, MissionStatus, StepProgress, StepStatus, DifficultyAdjustment, AdjustReason,
    EFFICIENCY_CEILING,
};

// Rewards & events
pub use reward::{
    RewardBundle, ItemGrant, BonusReward, BonusCondition, RewardItem, RewardKey, RewardScope,
    RewardEvent,
};
pub use event::{TransitionEvent, TransitionKind};

// Errors
pub use error::{EngineError, Result};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
