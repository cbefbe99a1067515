//! Evidence payloads submitted by the caller at step-submission time.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Evidence submitted against a verification requirement.
///
/// The variants mirror [`crate::RequirementKind`]; the verifier rejects a
/// payload whose shape does not match the requirement it is evaluated
/// against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Evidence {
    /// A photo reference plus declared/detected tags
    Photo {
        /// Storage reference of the uploaded photo
        reference: String,
        /// Tags declared by the caller or detected downstream
        #[serde(default)]
        tags: Vec<String>,
    },

    /// Checked checklist item ids
    Checklist {
        /// Ids of items the user ticked
        checked: Vec<String>,
    },

    /// Quiz answers keyed by question id
    Quiz {
        /// Answer per question id
        answers: HashMap<String, String>,
    },

    /// A training log summary
    Training {
        /// Sessions logged
        sessions: u32,
        /// Minutes logged across sessions
        minutes: u32,
    },
}

impl Evidence {
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
