//! Step and mission reward computation.

use petquest_core::{
    BonusCondition, MissionDefinition, MissionProgress, ProgressId, RewardEvent, RewardItem,
    RewardKey, RewardScope, StepDefinition, Tier,
};

/// Rewards for one completed step at the tier recorded when it activated.
///
/// Starts from the step's base xp/items; `difficulty_modifiers[tier]`
/// overrides field by field, unspecified fields keep the base value.
pub fn step_reward(step: &StepDefinition, tier_at_activation: Tier) -> Vec<RewardItem> {
    let mut payload = vec![RewardItem::Xp {
        amount: step.xp_for(tier_at_activation),
    }];
    for grant in step.items_for(tier_at_activation) {
        payload.push(RewardItem::Item {
            id: grant.item.clone(),
            quantity: grant.quantity,
        });
    }
    payload
}

/// Build the keyed emission for one completed step.
pub fn step_reward_event(
    progress_id: ProgressId,
    step: &StepDefinition,
    tier_at_activation: Tier,
) -> RewardEvent {
    RewardEvent {
        key: RewardKey {
            progress_id,
            scope: RewardScope::Step { step_id: step.id },
        },
        payload: step_reward(step, tier_at_activation),
        awarded_at: chrono::Utc::now(),
    }
}

/// Rewards for a completed mission: the fixed bundle plus every bonus
/// whose condition holds against the final progress.
pub fn mission_reward(def: &MissionDefinition, progress: &MissionProgress) -> Vec<RewardItem> {
    let mut payload = Vec::new();
    push_bundle(&mut payload, &def.rewards);

    for bonus in &def.bonus_rewards {
        if bonus_applies(&bonus.condition, progress) {
            tracing::debug!(progress_id = %progress.id, "bonus condition met");
            push_bundle(&mut payload, &bonus.rewards);
        }
    }
    payload
}

/// Build the keyed emission for the completed mission.
pub fn mission_reward_event(def: &MissionDefinition, progress: &MissionProgress) -> RewardEvent {
    RewardEvent {
        key: RewardKey {
            progress_id: progress.id,
            scope: RewardScope::Mission,
        },
        payload: mission_reward(def, progress),
        awarded_at: chrono::Utc::now(),
    }
}

/// Evaluate a bonus condition against the final progress.
pub fn bonus_applies(condition: &BonusCondition, progress: &MissionProgress) -> bool {
    match condition {
        BonusCondition::CompletedWithinMinutes { minutes } => {
            let elapsed = progress.last_active_at - progress.started_at;
            elapsed.num_minutes() <= i64::from(*minutes)
        }
        BonusCondition::QualityAbove { threshold } => progress.quality_score > *threshold,
        BonusCondition::NoFailedAttempts => {
            progress.step_progress.iter().all(|s| s.retry_count == 0)
        }
    }
}

fn push_bundle(payload: &mut Vec<RewardItem>, bundle: &petquest_core::RewardBundle) {
    if bundle.xp > 0 {
        payload.push(RewardItem::Xp { amount: bundle.xp });
    }
    for badge in &bundle.badges {
        payload.push(RewardItem::Badge {
            name: badge.clone(),
        });
    }
    for grant in &bundle.items {
        payload.push(RewardItem::Item {
            id: grant.item.clone(),
            quantity: grant.quantity,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petquest_core::{
        BonusReward, ItemGrant, MissionId, RewardBundle, StepId, StepModifier,
    };
    use std::collections::HashMap;

    fn step(xp: u32) -> StepDefinition {
        StepDefinition {
            id: StepId::new(),
            order: 0,
            title: String::new(),
            requirements: vec![],
            estimated_minutes: 10,
            xp_reward: xp,
            item_rewards: vec![ItemGrant {
                item: "kibble".to_string(),
                quantity: 1,
            }],
            difficulty_modifiers: HashMap::new(),
        }
    }

    #[test]
    fn test_step_reward_uses_base_without_modifier() {
        let payload = step_reward(&step(50), Tier::Medium);
        assert_eq!(payload[0], RewardItem::Xp { amount: 50 });
        assert_eq!(
            payload[1],
            RewardItem::Item {
                id: "kibble".to_string(),
                quantity: 1
            }
        );
    }

    #[test]
    fn test_step_reward_partial_override() {
        let mut s = step(50);
        s.difficulty_modifiers.insert(
            Tier::Easy,
            StepModifier {
                xp_reward: Some(30),
                ..Default::default()
            },
        );
        // xp overridden for easy, items fall through to base
        let payload = step_reward(&s, Tier::Easy);
        assert_eq!(payload[0], RewardItem::Xp { amount: 30 });
        assert_eq!(
            payload[1],
            RewardItem::Item {
                id: "kibble".to_string(),
                quantity: 1
            }
        );
        // other tiers untouched
        let payload = step_reward(&s, Tier::Hard);
        assert_eq!(payload[0], RewardItem::Xp { amount: 50 });
    }

    fn mission_with_bonus(condition: BonusCondition) -> MissionDefinition {
        MissionDefinition {
            id: MissionId::new(),
            title: "Vet visit".to_string(),
            description: String::new(),
            steps: vec![step(50)],
            rewards: RewardBundle {
                xp: 100,
                badges: vec!["vet-hero".to_string()],
                items: vec![],
            },
            bonus_rewards: vec![BonusReward {
                condition,
                rewards: RewardBundle {
                    xp: 25,
                    badges: vec![],
                    items: vec![],
                },
            }],
            dda_enabled: false,
            default_tier: None,
            deadline_minutes: None,
        }
    }

    #[test]
    fn test_mission_reward_includes_quality_bonus() {
        let def = mission_with_bonus(BonusCondition::QualityAbove { threshold: 0.9 });
        let mut progress = MissionProgress::start(&def, "user-1");
        progress.quality_score = 0.95;

        let event = mission_reward_event(&def, &progress);
        assert_eq!(event.total_xp(), 125);
        assert_eq!(event.key.scope, RewardScope::Mission);
    }

    #[test]
    fn test_mission_reward_skips_unmet_bonus() {
        let def = mission_with_bonus(BonusCondition::QualityAbove { threshold: 0.9 });
        let mut progress = MissionProgress::start(&def, "user-1");
        progress.quality_score = 0.5;

        let payload = mission_reward(&def, &progress);
        let xp: u32 = payload.iter().map(RewardItem::xp_amount).sum();
        assert_eq!(xp, 100);
    }

    #[test]
    fn test_no_failed_attempts_bonus() {
        let def = mission_with_bonus(BonusCondition::NoFailedAttempts);
        let mut progress = MissionProgress::start(&def, "user-1");
        assert!(bonus_applies(&def.bonus_rewards[0].condition, &progress));

        progress.step_progress[0].retry_count = 1;
        assert!(!bonus_applies(&def.bonus_rewards[0].condition, &progress));
    }

    #[test]
    fn test_completed_within_minutes_bonus() {
        let def = mission_with_bonus(BonusCondition::CompletedWithinMinutes { minutes: 60 });
        let progress = MissionProgress::start(&def, "user-1");
        // just started, well within the window
        assert!(bonus_applies(&def.bonus_rewards[0].condition, &progress));
    }
}
