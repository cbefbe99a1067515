//! In-memory storage backend.

use std::collections::HashMap;

use async_trait::async_trait;
use petquest_core::{MissionProgress, ProgressId};
use tokio::sync::Mutex;

use super::{ProgressStore, Result, StoreError};

/// HashMap-backed store for tests and single-process runs.
pub struct MemoryStore {
    inner: Mutex<HashMap<ProgressId, MissionProgress>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn save(&self, progress: &MissionProgress) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        let stored_version = inner.get(&progress.id).map(|p| p.version).unwrap_or(0);
        if stored_version + 1 != progress.version {
            return Err(StoreError::VersionConflict {
                expected: progress.version,
                found: stored_version,
            });
        }
        inner.insert(progress.id, progress.clone());
        Ok(progress.version)
    }

    async fn load(&self, id: ProgressId) -> Result<Option<MissionProgress>> {
        Ok(self.inner.lock().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<MissionProgress>> {
        Ok(self.inner.lock().await.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petquest_core::{MissionDefinition, RewardBundle};

    fn empty_definition() -> MissionDefinition {
        MissionDefinition {
            id: petquest_core::MissionId::new(),
            title: "t".to_string(),
            description: String::new(),
            steps: vec![],
            rewards: RewardBundle::default(),
            bonus_rewards: vec![],
            dda_enabled: false,
            default_tier: None,
            deadline_minutes: None,
        }
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let store = MemoryStore::new();
        let def = empty_definition();
        let mut progress = MissionProgress::start(&def, "user-1");
        progress.version = 1;

        store.save(&progress).await.unwrap();
        let loaded = store.load(progress.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, progress.id);
        assert_eq!(loaded.version, 1);

        assert!(store.load(ProgressId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_write_is_rejected() {
        let store = MemoryStore::new();
        let def = empty_definition();
        let mut progress = MissionProgress::start(&def, "user-1");
        progress.version = 1;
        store.save(&progress).await.unwrap();

        // Writing version 1 again means the writer did not see version 1.
        let err = store.save(&progress).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::VersionConflict {
                expected: 1,
                found: 1
            }
        ));

        progress.version = 2;
        store.save(&progress).await.unwrap();

        // Skipping a version is also stale.
        progress.version = 5;
        assert!(store.save(&progress).await.is_err());
    }
}
