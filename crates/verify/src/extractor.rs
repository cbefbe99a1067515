//! Photo tag extraction seam.
//!
//! Tag extraction for photo evidence may run against an external, possibly
//! slow service. The engine bounds the call with a timeout; a timeout
//! resolves the submission to a failed verification rather than blocking
//! the state machine.

use std::collections::HashMap;

use async_trait::async_trait;

/// Extracts detectable tags from a stored photo.
#[async_trait]
pub trait TagExtractor: Send + Sync {
    /// Return the tags detected in the photo behind `reference`.
    async fn extract_tags(&self, reference: &str) -> Result<Vec<String>, anyhow::Error>;
}

/// Fixed-map extractor for tests and offline demos.
pub struct StaticTagExtractor {
    tags: HashMap<String, Vec<String>>,
}

impl StaticTagExtractor {
    /// Create an empty extractor.
    pub fn new() -> Self {
        Self {
            tags: HashMap::new(),
        }
    }

    /// Register the tags to report for a reference.
    pub fn with_tags(mut self, reference: impl Into<String>, tags: Vec<String>) -> Self {
        self.tags.insert(reference.into(), tags);
        self
    }
}

impl Default for StaticTagExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TagExtractor for StaticTagExtractor {
    async fn extract_tags(&self, reference: &str) -> Result<Vec<String>, anyhow::Error> {
        Ok(self.tags.get(reference).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_extractor_returns_registered_tags() {
        let extractor = StaticTagExtractor::new()
            .with_tags("photo-1", vec!["bilancia".to_string(), "cane".to_string()]);
        let tags = extractor.extract_tags("photo-1").await.unwrap();
        assert_eq!(tags.len(), 2);

        let none = extractor.extract_tags("unknown").await.unwrap();
        assert!(none.is_empty());
    }
}
