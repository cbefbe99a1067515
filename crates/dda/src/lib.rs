//! Dynamic difficulty adjustment (Layer 3)
//!
//! Deterministic, rule-based tier policy. Pure function of the observed
//! performance signal and the current tier; the caller owns the audit log
//! the produced adjustment records are appended to.

#![warn(missing_docs)]

mod adjuster;

pub use adjuster::{
    adjust, PerformanceSignal, StepSignal, TierDecision, DE_ESCALATE_QUALITY_FLOOR,
    ESCALATE_EFFICIENCY_BAR, ESCALATE_QUALITY_BAR, FAILURE_STREAK,
};
