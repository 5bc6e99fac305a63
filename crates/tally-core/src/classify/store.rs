//! Durable classifier model snapshots
//!
//! The trained model is the only state in the pipeline that survives a
//! process restart: load-on-start, save-on-retrain. Snapshots are versioned
//! JSON written atomically (temp file + rename), so a crash mid-save never
//! leaves a truncated snapshot behind.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};

use super::bayes::BayesModel;

/// Bump when the snapshot layout changes; older snapshots are discarded and
/// the classifier re-bootstraps.
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    saved_at: DateTime<Utc>,
    model: BayesModel,
}

/// File-backed snapshot storage for the classifier model
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default snapshot location under the platform data directory
    /// (~/.local/share/tally/models/classifier.json on Linux).
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("tally").join("models").join("classifier.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted model, if a usable snapshot exists.
    ///
    /// A missing file is `Ok(None)`; an unreadable or version-mismatched
    /// snapshot is also `Ok(None)` with a warning, since the caller can
    /// always re-bootstrap from the keyword table.
    pub fn load(&self) -> Result<Option<BayesModel>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let text = fs::read_to_string(&self.path)?;
        let snapshot: Snapshot = match serde_json::from_str(&text) {
            Ok(s) => s,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unreadable model snapshot, ignoring");
                return Ok(None);
            }
        };

        if snapshot.version != SNAPSHOT_VERSION {
            warn!(
                found = snapshot.version,
                expected = SNAPSHOT_VERSION,
                "model snapshot version mismatch, ignoring"
            );
            return Ok(None);
        }

        info!(path = %self.path.display(), "loaded classifier model snapshot");
        Ok(Some(snapshot.model))
    }

    /// Persist the model, overwriting any previous snapshot.
    pub fn save(&self, model: &BayesModel) -> Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| Error::Snapshot("snapshot path has no parent directory".into()))?;
        fs::create_dir_all(parent)?;

        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            model: model.clone(),
        };

        let tmp = tempfile::NamedTempFile::new_in(parent)?;
        serde_json::to_writer(tmp.as_file(), &snapshot)?;
        tmp.persist(&self.path)
            .map_err(|e| Error::Snapshot(format!("failed to persist snapshot: {}", e)))?;

        info!(path = %self.path.display(), "saved classifier model snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_model() -> BayesModel {
        BayesModel::fit(&[
            ("walmart".to_string(), "food".to_string()),
            ("shell gas".to_string(), "transportation".to_string()),
        ])
        .unwrap()
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("classifier.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("models").join("classifier.json"));

        let model = sample_model();
        store.save(&model).unwrap();

        let loaded = store.load().unwrap().expect("snapshot should exist");
        assert_eq!(
            loaded.predict("walmart").unwrap(),
            model.predict("walmart").unwrap()
        );
    }

    #[test]
    fn test_corrupt_snapshot_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("classifier.json");
        fs::write(&path, "not json at all").unwrap();

        let store = SnapshotStore::new(&path);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_version_mismatch_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("classifier.json");

        let store = SnapshotStore::new(&path);
        store.save(&sample_model()).unwrap();

        // Rewrite with a bumped version field
        let text = fs::read_to_string(&path).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&text).unwrap();
        value["version"] = serde_json::json!(99);
        fs::write(&path, value.to_string()).unwrap();

        assert!(store.load().unwrap().is_none());
    }
}
