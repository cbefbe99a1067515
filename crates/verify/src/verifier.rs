//! Per-type verdict logic.

use serde::{Deserialize, Serialize};

use petquest_core::{Evidence, QuizQuestion, RequirementKind, VerificationRequirement};

/// Minimum tag overlap for a photo to pass.
pub const PHOTO_OVERLAP_THRESHOLD: f32 = 0.5;

/// Maximum quality bonus contributed by optional checklist items.
pub const CHECKLIST_OPTIONAL_BONUS: f32 = 0.1;

/// Why a submission did not pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailReason {
    /// Missing or empty payload
    InsufficientEvidence,
    /// Computed score below the required threshold
    BelowThreshold,
    /// Evidence shape does not match the requirement type
    MalformedSubmission,
    /// External tag extraction timed out
    EvidenceTimeout,
}

impl std::fmt::Display for FailReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InsufficientEvidence => "insufficient_evidence",
            Self::BelowThreshold => "below_threshold",
            Self::MalformedSubmission => "malformed_submission",
            Self::EvidenceTimeout => "evidence_timeout",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of evaluating one requirement against one payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    /// Whether the requirement is satisfied
    pub passed: bool,

    /// Quality of the submission (0..1)
    pub quality_score: f32,

    /// Diagnostics when not passed
    pub reasons: Vec<FailReason>,
}

impl Verdict {
    fn pass(quality_score: f32) -> Self {
        Self {
            passed: true,
            quality_score,
            reasons: Vec::new(),
        }
    }

    fn fail(quality_score: f32, reason: FailReason) -> Self {
        Self {
            passed: false,
            quality_score,
            reasons: vec![reason],
        }
    }
}

/// Aggregated outcome of evaluating a whole step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepVerdict {
    /// All non-optional requirements passed
    pub passed: bool,

    /// Mean quality over the non-optional requirements
    pub quality_score: f32,

    /// Diagnostics collected from failing requirements
    pub reasons: Vec<FailReason>,
}

/// Evaluate one requirement against one evidence payload.
pub fn verify(requirement: &RequirementKind, evidence: &Evidence) -> Verdict {
    match (requirement, evidence) {
        (RequirementKind::Photo { required_elements }, Evidence::Photo { reference, tags }) => {
            verify_photo(required_elements, reference, tags)
        }
        (
            RequirementKind::Checklist {
                required_items,
                optional_items,
            },
            Evidence::Checklist { checked },
        ) => verify_checklist(required_items, optional_items, checked),
        (
            RequirementKind::Quiz {
                questions,
                passing_score,
            },
            Evidence::Quiz { answers },
        ) => verify_quiz(questions, *passing_score, answers),
        (
            RequirementKind::Training {
                target_sessions,
                target_minutes,
            },
            Evidence::Training { sessions, minutes },
        ) => verify_training(*target_sessions, *target_minutes, *sessions, *minutes),
        (requirement, evidence) => {
            tracing::debug!(
                required = requirement.name(),
                submitted = evidence.name(),
                "evidence shape mismatch"
            );
            Verdict::fail(0.0, FailReason::MalformedSubmission)
        }
    }
}

/// Evaluate a step's requirement list against a submission.
///
/// Each requirement is matched against the first payload of its own type;
/// all non-optional requirements must pass for the step to pass. Optional
/// requirements never block and do not drag the aggregate score down.
pub fn verify_step(requirements: &[VerificationRequirement], evidence: &[Evidence]) -> StepVerdict {
    let mut reasons = Vec::new();
    let mut passed = true;
    let mut quality_sum = 0.0;
    let mut scored = 0usize;

    for requirement in requirements {
        let payload = evidence
            .iter()
            .find(|e| e.name() == requirement.kind.name());

        let verdict = match payload {
            Some(payload) => verify(&requirement.kind, payload),
            None => Verdict::fail(0.0, FailReason::InsufficientEvidence),
        };

        if requirement.optional {
            continue;
        }
        scored += 1;
        quality_sum += verdict.quality_score;
        if !verdict.passed {
            passed = false;
            reasons.extend(verdict.reasons);
        }
    }

    let quality_score = if scored == 0 {
        1.0
    } else {
        quality_sum / scored as f32
    };

    StepVerdict {
        passed,
        quality_score,
        reasons,
    }
}

fn verify_photo(required_elements: &[String], reference: &str, tags: &[String]) -> Verdict {
    if reference.is_empty() {
        return Verdict::fail(0.0, FailReason::InsufficientEvidence);
    }
    if required_elements.is_empty() {
        return Verdict::pass(1.0);
    }

    let matched = required_elements
        .iter()
        .filter(|required| tags.iter().any(|tag| tag == *required))
        .count();
    let overlap = matched as f32 / required_elements.len() as f32;

    if overlap >= PHOTO_OVERLAP_THRESHOLD {
        Verdict::pass(overlap)
    } else if tags.is_empty() {
        Verdict::fail(0.0, FailReason::InsufficientEvidence)
    } else {
        Verdict::fail(overlap, FailReason::BelowThreshold)
    }
}

fn verify_checklist(
    required_items: &[String],
    optional_items: &[String],
    checked: &[String],
) -> Verdict {
    if required_items.is_empty() && optional_items.is_empty() {
        return Verdict::pass(1.0);
    }
    if checked.is_empty() {
        return Verdict::fail(0.0, FailReason::InsufficientEvidence);
    }

    let required_checked = required_items
        .iter()
        .filter(|item| checked.contains(item))
        .count();
    let base = if required_items.is_empty() {
        1.0
    } else {
        required_checked as f32 / required_items.len() as f32
    };

    // Optional items raise quality but never block
    let bonus = if optional_items.is_empty() {
        0.0
    } else {
        let optional_checked = optional_items
            .iter()
            .filter(|item| checked.contains(item))
            .count();
        CHECKLIST_OPTIONAL_BONUS * (optional_checked as f32 / optional_items.len() as f32)
    };
    let quality = (base + bonus).min(1.0);

    if required_checked == required_items.len() {
        Verdict::pass(quality)
    } else {
        Verdict::fail(quality, FailReason::BelowThreshold)
    }
}

fn verify_quiz(
    questions: &[QuizQuestion],
    passing_score: f32,
    answers: &std::collections::HashMap<String, String>,
) -> Verdict {
    if questions.is_empty() {
        return Verdict::pass(1.0);
    }
    if answers.is_empty() {
        return Verdict::fail(0.0, FailReason::InsufficientEvidence);
    }

    let correct = questions
        .iter()
        .filter(|q| answers.get(&q.id).is_some_and(|a| *a == q.answer))
        .count();
    let quality = correct as f32 / questions.len() as f32;

    if quality >= passing_score {
        Verdict::pass(quality)
    } else {
        Verdict::fail(quality, FailReason::BelowThreshold)
    }
}

fn verify_training(
    target_sessions: u32,
    target_minutes: u32,
    sessions: u32,
    minutes: u32,
) -> Verdict {
    if target_sessions == 0 && target_minutes == 0 {
        return Verdict::pass(1.0);
    }
    if sessions == 0 && minutes == 0 {
        return Verdict::fail(0.0, FailReason::InsufficientEvidence);
    }

    let mut quality = 1.0f32;
    let mut met = true;
    if target_sessions > 0 {
        quality = quality.min(sessions as f32 / target_sessions as f32);
        met &= sessions >= target_sessions;
    }
    if target_minutes > 0 {
        quality = quality.min(minutes as f32 / target_minutes as f32);
        met &= minutes >= target_minutes;
    }
    let quality = quality.min(1.0);

    if met {
        Verdict::pass(quality)
    } else {
        Verdict::fail(quality, FailReason::BelowThreshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn photo_requirement(elements: &[&str]) -> RequirementKind {
        RequirementKind::Photo {
            required_elements: elements.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_photo_half_overlap_passes() {
        // required ["bilancia", "peso_visibile"], tags ["bilancia"] -> 50%
        let requirement = photo_requirement(&["bilancia", "peso_visibile"]);
        let evidence = Evidence::Photo {
            reference: "s3://photos/42.jpg".to_string(),
            tags: vec!["bilancia".to_string()],
        };
        let verdict = verify(&requirement, &evidence);
        assert!(verdict.passed);
        assert!((verdict.quality_score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_photo_below_overlap_fails() {
        let requirement = photo_requirement(&["bilancia", "peso_visibile", "cane"]);
        let evidence = Evidence::Photo {
            reference: "s3://photos/42.jpg".to_string(),
            tags: vec!["bilancia".to_string()],
        };
        let verdict = verify(&requirement, &evidence);
        assert!(!verdict.passed);
        assert_eq!(verdict.reasons, vec![FailReason::BelowThreshold]);
    }

    #[test]
    fn test_photo_empty_reference_is_insufficient() {
        let requirement = photo_requirement(&["bilancia"]);
        let evidence = Evidence::Photo {
            reference: String::new(),
            tags: vec!["bilancia".to_string()],
        };
        let verdict = verify(&requirement, &evidence);
        assert!(!verdict.passed);
        assert_eq!(verdict.reasons, vec![FailReason::InsufficientEvidence]);
    }

    #[test]
    fn test_checklist_requires_all_required_items() {
        let requirement = RequirementKind::Checklist {
            required_items: vec!["food".to_string(), "water".to_string()],
            optional_items: vec![],
        };
        let partial = Evidence::Checklist {
            checked: vec!["food".to_string()],
        };
        let verdict = verify(&requirement, &partial);
        assert!(!verdict.passed);
        assert!((verdict.quality_score - 0.5).abs() < 1e-6);

        let full = Evidence::Checklist {
            checked: vec!["food".to_string(), "water".to_string()],
        };
        let verdict = verify(&requirement, &full);
        assert!(verdict.passed);
        assert!((verdict.quality_score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_checklist_optional_bonus_capped_at_one() {
        let requirement = RequirementKind::Checklist {
            required_items: vec!["food".to_string()],
            optional_items: vec!["brush".to_string(), "treat".to_string()],
        };
        let evidence = Evidence::Checklist {
            checked: vec![
                "food".to_string(),
                "brush".to_string(),
                "treat".to_string(),
            ],
        };
        let verdict = verify(&requirement, &evidence);
        assert!(verdict.passed);
        assert!(verdict.quality_score <= 1.0);
        assert!((verdict.quality_score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_quiz_passes_at_threshold() {
        let requirement = RequirementKind::Quiz {
            questions: vec![
                QuizQuestion {
                    id: "q1".to_string(),
                    answer: "a".to_string(),
                },
                QuizQuestion {
                    id: "q2".to_string(),
                    answer: "b".to_string(),
                },
            ],
            passing_score: 0.5,
        };
        let mut answers = HashMap::new();
        answers.insert("q1".to_string(), "a".to_string());
        answers.insert("q2".to_string(), "wrong".to_string());
        let verdict = verify(&requirement, &Evidence::Quiz { answers });
        assert!(verdict.passed);
        assert!((verdict.quality_score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_quiz_below_threshold_fails() {
        let requirement = RequirementKind::Quiz {
            questions: vec![
                QuizQuestion {
                    id: "q1".to_string(),
                    answer: "a".to_string(),
                },
                QuizQuestion {
                    id: "q2".to_string(),
                    answer: "b".to_string(),
                },
            ],
            passing_score: 0.8,
        };
        let mut answers = HashMap::new();
        answers.insert("q1".to_string(), "a".to_string());
        answers.insert("q2".to_string(), "nope".to_string());
        let verdict = verify(&requirement, &Evidence::Quiz { answers });
        assert!(!verdict.passed);
        assert_eq!(verdict.reasons, vec![FailReason::BelowThreshold]);
    }

    #[test]
    fn test_training_quality_is_min_ratio() {
        let requirement = RequirementKind::Training {
            target_sessions: 4,
            target_minutes: 60,
        };
        let evidence = Evidence::Training {
            sessions: 2,
            minutes: 60,
        };
        let verdict = verify(&requirement, &evidence);
        assert!(!verdict.passed);
        assert!((verdict.quality_score - 0.5).abs() < 1e-6);

        let evidence = Evidence::Training {
            sessions: 8,
            minutes: 90,
        };
        let verdict = verify(&requirement, &evidence);
        assert!(verdict.passed);
        assert!((verdict.quality_score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_shape_mismatch_is_malformed() {
        let requirement = photo_requirement(&["bilancia"]);
        let evidence = Evidence::Checklist {
            checked: vec!["food".to_string()],
        };
        let verdict = verify(&requirement, &evidence);
        assert!(!verdict.passed);
        assert_eq!(verdict.reasons, vec![FailReason::MalformedSubmission]);
    }

    #[test]
    fn test_step_verdict_ignores_optional_requirements() {
        let requirements = vec![
            VerificationRequirement {
                kind: RequirementKind::Checklist {
                    required_items: vec!["food".to_string()],
                    optional_items: vec![],
                },
                optional: false,
            },
            VerificationRequirement {
                kind: photo_requirement(&["bilancia"]),
                optional: true,
            },
        ];
        // No photo submitted; the optional requirement must not block.
        let evidence = vec![Evidence::Checklist {
            checked: vec!["food".to_string()],
        }];
        let verdict = verify_step(&requirements, &evidence);
        assert!(verdict.passed);
        assert!((verdict.quality_score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_step_verdict_missing_required_payload() {
        let requirements = vec![VerificationRequirement {
            kind: photo_requirement(&["bilancia"]),
            optional: false,
        }];
        let verdict = verify_step(&requirements, &[]);
        assert!(!verdict.passed);
        assert_eq!(verdict.reasons, vec![FailReason::InsufficientEvidence]);
    }
}
