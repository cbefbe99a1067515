//! Per-instance mission progression state.

use serde::{Deserialize, Serialize};

use crate::evidence::Evidence;
use crate::id::{MissionId, ProgressId, StepId};
use crate::mission::MissionDefinition;
use crate::reward::{RewardEvent, RewardKey};
use crate::tier::Tier;
use crate::Time;

/// Rolling efficiency is capped here to bound runaway scores from very
/// fast submissions.
pub const EFFICIENCY_CEILING: f32 = 2.0;

/// Mission lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    /// Created but not yet started
    NotStarted,
    /// In progress, exactly one step active
    Active,
    /// Temporarily suspended
    Paused,
    /// All steps completed (terminal)
    Completed,
    /// Given up by the user (terminal)
    Abandoned,
    /// Deadline passed (terminal)
    Expired,
}

impl MissionStatus {
    /// Terminal states permit no further mutation.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Abandoned | Self::Expired)
    }
}

impl std::fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
            Self::Expired => "expired",
        };
        write!(f, "{}", s)
    }
}

/// Per-step lifecycle states.
///
/// Statuses only move forward: `Pending -> Active -> Completed`; a failed
/// submission keeps the step `Active` for retry and never regresses a
/// `Completed` step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Not yet reached
    Pending,
    /// The single step currently accepting submissions
    Active,
    /// Verified and done
    Completed,
    /// Recorded failure (the step itself stays retryable while active)
    Failed,
}

/// The mutable progression instance, one per (user, mission) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionProgress {
    /// Unique identifier
    pub id: ProgressId,

    /// The mission template this instance runs
    pub mission_id: MissionId,

    /// Owning user
    pub user_id: String,

    /// Lifecycle state
    pub status: MissionStatus,

    /// Index of the step currently active (or next to activate)
    pub current_step_index: usize,

    /// Count of completed steps
    pub completed_steps: usize,

    /// One entry per definition step, same order
    pub step_progress: Vec<StepProgress>,

    /// Rolling average of estimated/actual minutes, capped at
    /// [`EFFICIENCY_CEILING`]
    pub efficiency: f32,

    /// Rolling average of per-step quality scores (0..1)
    pub quality_score: f32,

    /// Tier in force for steps that activate now
    pub current_difficulty: Tier,

    /// Append-only audit log of tier changes
    pub dda_adjustments: Vec<DifficultyAdjustment>,

    /// Rewards acknowledged by the external ledger
    pub earned_rewards: Vec<RewardEvent>,

    /// Rewards emitted but not yet acknowledged
    pub pending_rewards: Vec<RewardEvent>,

    /// When the mission started
    pub started_at: Time,

    /// Last mutating activity
    pub last_active_at: Time,

    /// Creation timestamp
    pub created_at: Time,

    /// Last update timestamp
    pub updated_at: Time,

    /// Optimistic-concurrency counter, bumped on every persisted write
    pub version: u64,
}

impl MissionProgress {
    /// Create a fresh instance from a definition: all steps pending except
    /// step 0, which activates at the mission's default tier.
    pub fn start(def: &MissionDefinition, user_id: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        let tier = def.default_tier();
        let step_progress = def
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                let mut sp = StepProgress::pending(step.id);
                if i == 0 {
                    sp.activate(tier);
                }
                sp
            })
            .collect();

        Self {
            id: ProgressId::new(),
            mission_id: def.id,
            user_id: user_id.into(),
            status: MissionStatus::Active,
            current_step_index: 0,
            completed_steps: 0,
            step_progress,
            efficiency: 0.0,
            quality_score: 0.0,
            current_difficulty: tier,
            dda_adjustments: Vec::new(),
            earned_rewards: Vec::new(),
            pending_rewards: Vec::new(),
            started_at: now,
            last_active_at: now,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Number of steps in this instance.
    pub fn total_steps(&self) -> usize {
        self.step_progress.len()
    }

    /// Completed fraction in [0, 1].
    pub fn progress_percentage(&self) -> f32 {
        if self.step_progress.is_empty() {
            return 0.0;
        }
        self.completed_steps as f32 / self.step_progress.len() as f32
    }

    /// The currently active step, if any.
    pub fn active_step(&self) -> Option<(usize, &StepProgress)> {
        self.step_progress
            .iter()
            .enumerate()
            .find(|(_, s)| s.status == StepStatus::Active)
    }

    /// Mutable access to the currently active step.
    pub fn active_step_mut(&mut self) -> Option<(usize, &mut StepProgress)> {
        self.step_progress
            .iter_mut()
            .enumerate()
            .find(|(_, s)| s.status == StepStatus::Active)
    }

    /// Whether a reward key was already emitted (pending or earned).
    pub fn reward_key_emitted(&self, key: &RewardKey) -> bool {
        self.earned_rewards.iter().any(|e| e.key == *key)
            || self.pending_rewards.iter().any(|e| e.key == *key)
    }

    /// Fold a newly completed step's quality and efficiency into the
    /// rolling averages. `completed_steps` must already count the step.
    pub fn fold_step_scores(&mut self, step_efficiency: f32, step_quality: f32) {
        let n = self.completed_steps as f32;
        if n <= 1.0 {
            self.efficiency = step_efficiency;
            self.quality_score = step_quality;
        } else {
            self.efficiency += (step_efficiency - self.efficiency) / n;
            self.quality_score += (step_quality - self.quality_score) / n;
        }
        self.efficiency = self.efficiency.min(EFFICIENCY_CEILING);
        self.quality_score = self.quality_score.clamp(0.0, 1.0);
    }

    /// Refresh activity timestamps after a mutation.
    pub fn touch(&mut self) {
        let now = chrono::Utc::now();
        self.last_active_at = now;
        self.updated_at = now;
    }
}

/// Progress state of a single step within an instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepProgress {
    /// The step definition this tracks
    pub step_id: StepId,

    /// Current status
    pub status: StepStatus,

    /// Tier in force when this step became active. Rewards and estimates
    /// for the step always use this tier, never one assigned afterward.
    pub tier_at_activation: Tier,

    /// When the step completed
    pub completed_at: Option<Time>,

    /// Accumulated time across submissions, in seconds
    pub time_spent_secs: u64,

    /// Evidence from the most recent submission
    pub verification: Option<Evidence>,

    /// Quality score of the passing submission (0..1)
    pub rating: Option<f32>,

    /// Failed submission count for this step
    pub retry_count: u32,
}

impl StepProgress {
    /// A pending step, not yet reached.
    pub fn pending(step_id: StepId) -> Self {
        Self {
            step_id,
            status: StepStatus::Pending,
            tier_at_activation: Tier::default(),
            completed_at: None,
            time_spent_secs: 0,
            verification: None,
            rating: None,
            retry_count: 0,
        }
    }

    /// Activate the step, recording the tier in force right now.
    pub fn activate(&mut self, tier: Tier) {
        self.status = StepStatus::Active;
        self.tier_at_activation = tier;
    }

    /// Per-step efficiency: estimated over actual minutes, capped.
    ///
    /// A zero-time submission counts as maximally efficient.
    pub fn efficiency(&self, estimated_minutes: u32) -> f32 {
        let actual_minutes = self.time_spent_secs as f32 / 60.0;
        if actual_minutes <= 0.0 {
            return EFFICIENCY_CEILING;
        }
        (estimated_minutes as f32 / actual_minutes).min(EFFICIENCY_CEILING)
    }
}

/// One appended record of a tier change. The audit log is never rewritten
/// or truncated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifficultyAdjustment {
    /// When the change happened
    pub timestamp: Time,

    /// Tier before
    pub from_tier: Tier,

    /// Tier after
    pub to_tier: Tier,

    /// Why the tier changed
    pub reason: AdjustReason,
}

impl DifficultyAdjustment {
    /// Record a tier change happening now.
    pub fn new(from_tier: Tier, to_tier: Tier, reason: AdjustReason) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            from_tier,
            to_tier,
            reason,
        }
    }
}

/// Why the difficulty adjuster changed tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustReason {
    /// Last two completed steps were fast and high quality
    HighPerformance,
    /// Most recent step's quality fell below the floor
    LowQuality,
    /// Two consecutive failed submissions
    RepeatedFailures,
}

impl std::fmt::Display for AdjustReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::HighPerformance => "high_performance",
            Self::LowQuality => "low_quality",
            Self::RepeatedFailures => "repeated_failures",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::StepDefinition;
    use crate::reward::RewardBundle;
    use crate::MissionId;

    fn definition(step_count: usize) -> MissionDefinition {
        MissionDefinition {
            id: MissionId::new(),
            title: "Morning routine".to_string(),
            description: String::new(),
            steps: (0..step_count)
                .map(|order| StepDefinition {
                    id: StepId::new(),
                    order,
                    title: format!("step {}", order),
                    requirements: vec![],
                    estimated_minutes: 10,
                    xp_reward: 50,
                    item_rewards: vec![],
                    difficulty_modifiers: Default::default(),
                })
                .collect(),
            rewards: RewardBundle::default(),
            bonus_rewards: vec![],
            dda_enabled: true,
            default_tier: None,
            deadline_minutes: None,
        }
    }

    #[test]
    fn test_start_activates_only_first_step() {
        let def = definition(3);
        let progress = MissionProgress::start(&def, "user-1");

        assert_eq!(progress.status, MissionStatus::Active);
        assert_eq!(progress.step_progress.len(), 3);
        assert_eq!(progress.step_progress[0].status, StepStatus::Active);
        assert_eq!(progress.step_progress[1].status, StepStatus::Pending);
        assert_eq!(progress.step_progress[2].status, StepStatus::Pending);
        assert_eq!(progress.current_difficulty, Tier::Medium);
        assert_eq!(progress.completed_steps, 0);
        assert_eq!(progress.progress_percentage(), 0.0);
    }

    #[test]
    fn test_exactly_one_active_step() {
        let def = definition(4);
        let progress = MissionProgress::start(&def, "user-1");
        let active = progress
            .step_progress
            .iter()
            .filter(|s| s.status == StepStatus::Active)
            .count();
        assert_eq!(active, 1);
    }

    #[test]
    fn test_fold_step_scores_is_a_running_mean() {
        let def = definition(3);
        let mut progress = MissionProgress::start(&def, "user-1");

        progress.completed_steps = 1;
        progress.fold_step_scores(1.0, 0.8);
        assert!((progress.quality_score - 0.8).abs() < 1e-6);

        progress.completed_steps = 2;
        progress.fold_step_scores(1.0, 0.6);
        assert!((progress.quality_score - 0.7).abs() < 1e-6);
        assert!((progress.efficiency - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_efficiency_is_capped() {
        let mut sp = StepProgress::pending(StepId::new());
        sp.time_spent_secs = 60; // one minute against a 10 minute estimate
        assert!((sp.efficiency(10) - EFFICIENCY_CEILING).abs() < 1e-6);

        sp.time_spent_secs = 0;
        assert!((sp.efficiency(10) - EFFICIENCY_CEILING).abs() < 1e-6);

        sp.time_spent_secs = 1200; // twenty minutes
        assert!((sp.efficiency(10) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_progress_percentage_bounds() {
        let def = definition(4);
        let mut progress = MissionProgress::start(&def, "user-1");
        assert_eq!(progress.progress_percentage(), 0.0);
        progress.completed_steps = 2;
        assert!((progress.progress_percentage() - 0.5).abs() < 1e-6);
        progress.completed_steps = 4;
        assert!((progress.progress_percentage() - 1.0).abs() < 1e-6);
    }
}
