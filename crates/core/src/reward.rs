//! Reward payloads, bonus conditions, and idempotency keys.

use serde::{Deserialize, Serialize};

use crate::id::{ProgressId, StepId};
use crate::Time;

/// A fixed set of rewards: XP, badges, item grants.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RewardBundle {
    /// Experience points
    #[serde(default)]
    pub xp: u32,

    /// Badge names
    #[serde(default)]
    pub badges: Vec<String>,

    /// Item grants
    #[serde(default)]
    pub items: Vec<ItemGrant>,
}

/// A grant of a catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemGrant {
    /// Catalog item id
    pub item: String,

    /// How many to grant
    pub quantity: u32,
}

/// A bonus reward gated on a condition over the final progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BonusReward {
    /// Condition that must hold when the mission completes
    pub condition: BonusCondition,

    /// Rewards granted when the condition holds
    pub rewards: RewardBundle,
}

/// Conditions a bonus reward can declare against the final progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BonusCondition {
    /// Mission completed within this many minutes of starting
    CompletedWithinMinutes {
        /// Time threshold in minutes
        minutes: u32,
    },

    /// Rolling quality score above a bar
    QualityAbove {
        /// Quality threshold (0..1)
        threshold: f32,
    },

    /// No step required a retry
    NoFailedAttempts,
}

/// A single awarded reward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RewardItem {
    /// Experience points
    Xp {
        /// Amount of XP
        amount: u32,
    },

    /// A badge
    Badge {
        /// Badge name
        name: String,
    },

    /// A catalog item
    Item {
        /// Catalog item id
        id: String,
        /// How many
        quantity: u32,
    },
}

impl RewardItem {
    /// XP carried by this item, zero for non-XP rewards.
    pub fn xp_amount(&self) -> u32 {
        match self {
            Self::Xp { amount } => *amount,
            _ => 0,
        }
    }
}

/// What a reward emission covers: a single step or the whole mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum RewardScope {
    /// Reward for one completed step
    Step {
        /// The completed step
        step_id: StepId,
    },

    /// Reward for the completed mission
    Mission,
}

/// Idempotency key for a reward emission.
///
/// Derived from `(progress_id, step_id | "mission")`; a given key is emitted
/// at most once per mission-instance lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RewardKey {
    /// Owning progress instance
    pub progress_id: ProgressId,

    /// Step or mission scope
    pub scope: RewardScope,
}

impl std::fmt::Display for RewardKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.scope {
            RewardScope::Step { step_id } => write!(f, "{}:{}", self.progress_id, step_id),
            RewardScope::Mission => write!(f, "{}:mission", self.progress_id),
        }
    }
}

/// A reward emission, consumed by the external ledger and notification
/// dispatch. The ledger dedupes on `key`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardEvent {
    /// Idempotency key
    pub key: RewardKey,

    /// Awarded items
    pub payload: Vec<RewardItem>,

    /// When the emission happened
    pub awarded_at: Time,
}

impl RewardEvent {
    /// Total XP carried by the payload.
    pub fn total_xp(&self) -> u32 {
        self.payload.iter().map(RewardItem::xp_amount).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_key_display_distinguishes_scopes() {
        let progress_id = ProgressId::new();
        let step_id = StepId::new();
        let step_key = RewardKey {
            progress_id,
            scope: RewardScope::Step { step_id },
        };
        let mission_key = RewardKey {
            progress_id,
            scope: RewardScope::Mission,
        };
        assert_ne!(step_key, mission_key);
        assert!(mission_key.to_string().ends_with(":mission"));
        assert!(step_key.to_string().contains(&step_id.to_string()));
    }

    #[test]
    fn test_total_xp_sums_only_xp_items() {
        let event = RewardEvent {
            key: RewardKey {
                progress_id: ProgressId::new(),
                scope: RewardScope::Mission,
            },
            payload: vec![
                RewardItem::Xp { amount: 100 },
                RewardItem::Badge {
                    name: "first-walk".to_string(),
                },
                RewardItem::Xp { amount: 25 },
            ],
            awarded_at: chrono::Utc::now(),
        };
        assert_eq!(event.total_xp(), 125);
    }
}
