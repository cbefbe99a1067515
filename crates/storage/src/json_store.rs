//! JSON file storage implementation.
//!
//! One JSON document per progress instance under `{root}/progress/`. The
//! optimistic-concurrency version lives inside the document itself; a save
//! re-reads the current file to check it.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use petquest_core::{MissionProgress, ProgressId};
use tokio::fs;
use tokio::sync::Mutex;

use super::{ProgressStore, Result, StoreError};

/// File-based JSON storage backend.
pub struct JsonStore {
    root: PathBuf,
    // Serializes the read-check-write cycle of save()
    write_lock: Mutex<()>,
}

impl JsonStore {
    /// Create storage rooted at `root`, creating the directory layout.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join("progress")).await?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    fn progress_path(&self, id: ProgressId) -> PathBuf {
        self.root.join("progress").join(format!("{}.json", id))
    }
}

#[async_trait]
impl ProgressStore for JsonStore {
    async fn save(&self, progress: &MissionProgress) -> Result<u64> {
        let _guard = self.write_lock.lock().await;

        let path = self.progress_path(progress.id);
        let stored_version = read_json::<MissionProgress>(&path)
            .await?
            .map(|p| p.version)
            .unwrap_or(0);
        if stored_version + 1 != progress.version {
            return Err(StoreError::VersionConflict {
                expected: progress.version,
                found: stored_version,
            });
        }

        let json = serde_json::to_string_pretty(progress)?;
        fs::write(&path, json.as_bytes()).await?;
        tracing::debug!(progress_id = %progress.id, version = progress.version, "snapshot persisted");
        Ok(progress.version)
    }

    async fn load(&self, id: ProgressId) -> Result<Option<MissionProgress>> {
        read_json(&self.progress_path(id)).await
    }

    async fn list(&self) -> Result<Vec<MissionProgress>> {
        list_dir(&self.root.join("progress")).await
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        if entry.path().extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        if let Ok(Some(item)) = read_json(&entry.path()).await {
            items.push(item);
        }
    }
    Ok(items)
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

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("petquest-test-{}", ulid::Ulid::new()))
    }

    #[tokio::test]
    async fn test_file_round_trip_and_version_check() {
        let root = temp_root();
        let store = JsonStore::new(&root).await.unwrap();

        let def = empty_definition();
        let mut progress = MissionProgress::start(&def, "user-1");
        progress.version = 1;
        store.save(&progress).await.unwrap();

        let loaded = store.load(progress.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, progress.id);
        assert_eq!(loaded.version, 1);

        // Same version again is a stale write.
        assert!(matches!(
            store.save(&progress).await,
            Err(StoreError::VersionConflict { .. })
        ));

        progress.version = 2;
        store.save(&progress).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);

        let _ = fs::remove_dir_all(&root).await;
    }
}
