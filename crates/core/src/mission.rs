//! Mission templates - immutable definitions supplied by the catalog.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::id::{MissionId, StepId};
use crate::reward::{BonusReward, ItemGrant, RewardBundle};
use crate::tier::Tier;

/// An immutable mission template: an ordered sequence of steps, each with
/// its own verification requirements and rewards.
///
/// Definitions are owned by an external catalog and never mutated here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionDefinition {
    /// Unique identifier
    pub id: MissionId,

    /// Mission title
    pub title: String,

    /// Detailed description
    #[serde(default)]
    pub description: String,

    /// Ordered step definitions
    pub steps: Vec<StepDefinition>,

    /// Base rewards granted when the mission completes
    pub rewards: RewardBundle,

    /// Conditional bonus rewards
    #[serde(default)]
    pub bonus_rewards: Vec<BonusReward>,

    /// Whether dynamic difficulty adjustment runs for this mission
    #[serde(default)]
    pub dda_enabled: bool,

    /// Starting tier (medium if unspecified)
    #[serde(default)]
    pub default_tier: Option<Tier>,

    /// Deadline in minutes from start, enforced by the external scheduler
    #[serde(default)]
    pub deadline_minutes: Option<u32>,
}

impl MissionDefinition {
    /// Number of steps in the mission.
    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    /// Starting tier, defaulting to medium.
    pub fn default_tier(&self) -> Tier {
        self.default_tier.unwrap_or_default()
    }

    /// Look up a step definition by id.
    pub fn step(&self, id: StepId) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.id == id)
    }
}

/// One unit of work within a mission, verified independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Unique identifier
    pub id: StepId,

    /// Position within the mission (0-based)
    pub order: usize,

    /// Step title
    #[serde(default)]
    pub title: String,

    /// Evidence requirements; all non-optional ones must pass
    pub requirements: Vec<VerificationRequirement>,

    /// Expected completion time at the base tier
    pub estimated_minutes: u32,

    /// Base XP granted on completion
    pub xp_reward: u32,

    /// Base item grants on completion
    #[serde(default)]
    pub item_rewards: Vec<ItemGrant>,

    /// Per-tier partial overrides of minutes/xp/items
    #[serde(default)]
    pub difficulty_modifiers: HashMap<Tier, StepModifier>,
}

impl StepDefinition {
    /// Effective estimated minutes for a tier, honoring partial overrides.
    pub fn estimated_minutes_for(&self, tier: Tier) -> u32 {
        self.difficulty_modifiers
            .get(&tier)
            .and_then(|m| m.estimated_minutes)
            .unwrap_or(self.estimated_minutes)
    }

    /// Effective XP for a tier, honoring partial overrides.
    pub fn xp_for(&self, tier: Tier) -> u32 {
        self.difficulty_modifiers
            .get(&tier)
            .and_then(|m| m.xp_reward)
            .unwrap_or(self.xp_reward)
    }

    /// Effective item grants for a tier, honoring partial overrides.
    pub fn items_for(&self, tier: Tier) -> &[ItemGrant] {
        self.difficulty_modifiers
            .get(&tier)
            .and_then(|m| m.item_rewards.as_deref())
            .unwrap_or(&self.item_rewards)
    }
}

/// Partial per-tier override of a step's tunable fields.
///
/// Unspecified fields keep the base value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepModifier {
    /// Override for estimated minutes
    #[serde(default)]
    pub estimated_minutes: Option<u32>,

    /// Override for XP
    #[serde(default)]
    pub xp_reward: Option<u32>,

    /// Override for item grants
    #[serde(default)]
    pub item_rewards: Option<Vec<ItemGrant>>,
}

/// A typed specification of what evidence must be submitted to pass a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRequirement {
    /// Type-specific requirement data
    #[serde(flatten)]
    pub kind: RequirementKind,

    /// Optional requirements never block step completion
    #[serde(default)]
    pub optional: bool,
}

/// Closed set of evidence types. Adding a variant is a compile-time-checked
/// change across the verifier's exhaustive dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequirementKind {
    /// Photo evidence with required detectable elements
    Photo {
        /// Tags that must appear in the photo
        required_elements: Vec<String>,
    },

    /// Checklist of items to tick off
    Checklist {
        /// Items that must all be checked
        required_items: Vec<String>,
        /// Items that raise quality but never block
        #[serde(default)]
        optional_items: Vec<String>,
    },

    /// Quiz with a passing score
    Quiz {
        /// Questions with their expected answers
        questions: Vec<QuizQuestion>,
        /// Minimum correct ratio to pass (0..1)
        passing_score: f32,
    },

    /// Logged training sessions against a target
    Training {
        /// Minimum number of sessions
        #[serde(default)]
        target_sessions: u32,
        /// Minimum accumulated minutes
        #[serde(default)]
        target_minutes: u32,
    },
}

impl RequirementKind {
    /// Short name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Photo { .. } => "photo",
            Self::Checklist { .. } => "checklist",
            Self::Quiz { .. } => "quiz",
            Self::Training { .. } => "training",
        }
    }
}

/// A single quiz question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    /// Question identifier
    pub id: String,

    /// Expected answer
    pub answer: String,
}
