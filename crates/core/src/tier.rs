//! Difficulty tiers.

use serde::{Deserialize, Serialize};

/// A discrete difficulty level governing which reward/time overrides apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Lowest difficulty
    Easy,
    /// Default difficulty
    Medium,
    /// Highest difficulty
    Hard,
}

impl Tier {
    /// One tier up, capped at `Hard`.
    pub fn escalated(self) -> Self {
        match self {
            Self::Easy => Self::Medium,
            Self::Medium | Self::Hard => Self::Hard,
        }
    }

    /// One tier down, floored at `Easy`.
    pub fn de_escalated(self) -> Self {
        match self {
            Self::Hard => Self::Medium,
            Self::Medium | Self::Easy => Self::Easy,
        }
    }
}

impl Default for Tier {
    fn default() -> Self {
        Self::Medium
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Easy => write!(f, "easy"),
            Self::Medium => write!(f, "medium"),
            Self::Hard => write!(f, "hard"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escalation_caps_at_hard() {
        assert_eq!(Tier::Easy.escalated(), Tier::Medium);
        assert_eq!(Tier::Medium.escalated(), Tier::Hard);
        assert_eq!(Tier::Hard.escalated(), Tier::Hard);
    }

    #[test]
    fn test_de_escalation_floors_at_easy() {
        assert_eq!(Tier::Hard.de_escalated(), Tier::Medium);
        assert_eq!(Tier::Medium.de_escalated(), Tier::Easy);
        assert_eq!(Tier::Easy.de_escalated(), Tier::Easy);
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Tier::Medium).unwrap(), "\"medium\"");
        let t: Tier = serde_json::from_str("\"hard\"").unwrap();
        assert_eq!(t, Tier::Hard);
    }
}
