//! Tier adjustment rules.

use petquest_core::{AdjustReason, DifficultyAdjustment, Tier};

/// Both of the last two completed steps must beat this efficiency to escalate.
pub const ESCALATE_EFFICIENCY_BAR: f32 = 1.3;

/// Both of the last two completed steps must beat this quality to escalate.
pub const ESCALATE_QUALITY_BAR: f32 = 0.85;

/// Most recent quality below this floor de-escalates.
pub const DE_ESCALATE_QUALITY_FLOOR: f32 = 0.5;

/// Consecutive failed submissions that de-escalate.
pub const FAILURE_STREAK: u32 = 2;

/// Observed efficiency and quality of one completed step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSignal {
    /// Estimated over actual minutes, capped upstream
    pub efficiency: f32,

    /// Verification quality (0..1)
    pub quality: f32,
}

/// Performance signal fed to the adjuster after each step outcome.
#[derive(Debug, Clone, Default)]
pub struct PerformanceSignal {
    /// Completed-step signals, oldest first, most recent last
    pub recent_steps: Vec<StepSignal>,

    /// Failed submissions in a row on the currently active step
    pub consecutive_failures: u32,
}

/// The adjuster's output: the tier to use for steps activating from now
/// on, plus an audit record when the tier changed.
#[derive(Debug, Clone)]
pub struct TierDecision {
    /// Tier in force after the decision
    pub tier: Tier,

    /// Audit record, present only when the tier changed
    pub adjustment: Option<DifficultyAdjustment>,
}

/// Decide the next tier from the performance signal.
///
/// De-escalation is checked first: a failure streak or a most-recent
/// quality below the floor lowers the tier one notch (floored at easy).
/// Escalation requires the last two completed steps to be both fast and
/// high quality (capped at hard). Anything else leaves the tier unchanged
/// and appends nothing.
pub fn adjust(signal: &PerformanceSignal, current: Tier) -> TierDecision {
    if signal.consecutive_failures >= FAILURE_STREAK {
        return change(current, current.de_escalated(), AdjustReason::RepeatedFailures);
    }

    if let Some(latest) = signal.recent_steps.last() {
        if latest.quality < DE_ESCALATE_QUALITY_FLOOR {
            return change(current, current.de_escalated(), AdjustReason::LowQuality);
        }
    }

    if signal.recent_steps.len() >= 2 {
        let streak = &signal.recent_steps[signal.recent_steps.len() - 2..];
        let hot = streak.iter().all(|s| {
            s.efficiency > ESCALATE_EFFICIENCY_BAR && s.quality > ESCALATE_QUALITY_BAR
        });
        if hot {
            return change(current, current.escalated(), AdjustReason::HighPerformance);
        }
    }

    TierDecision {
        tier: current,
        adjustment: None,
    }
}

fn change(from: Tier, to: Tier, reason: AdjustReason) -> TierDecision {
    if from == to {
        // Already at the cap/floor; nothing to record.
        return TierDecision {
            tier: from,
            adjustment: None,
        };
    }
    tracing::debug!(%from, %to, %reason, "difficulty adjusted");
    TierDecision {
        tier: to,
        adjustment: Some(DifficultyAdjustment::new(from, to, reason)),
    }
}
