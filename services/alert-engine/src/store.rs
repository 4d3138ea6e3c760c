//! History store - persist alert history as a JSON snapshot

use crate::history::{AlertHistory, HistorySnapshot};
use anyhow::Context;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// JSON file holding a [`HistorySnapshot`]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load history; a missing file yields an empty history
    pub async fn load(&self) -> anyhow::Result<AlertHistory> {
        let exists = fs::try_exists(&self.path)
            .await
            .with_context(|| format!("Failed to check history file {}", self.path.display()))?;
        if !exists {
            debug!("No history at {}, starting empty", self.path.display());
            return Ok(AlertHistory::new());
        }

        let raw = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read history file {}", self.path.display()))?;
        let snapshot: HistorySnapshot = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid history file {}", self.path.display()))?;

        let history = AlertHistory::from_snapshot(snapshot);
        info!(
            "Loaded {} stored alerts from {}",
            history.len(),
            self.path.display()
        );
        Ok(history)
    }

    /// Write the snapshot via a temp file + rename
    pub async fn save(&self, history: &AlertHistory) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create history directory {}", parent.display())
                })?;
            }
        }

        let snapshot = history.snapshot(Utc::now());
        let json = serde_json::to_string_pretty(&snapshot)?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        debug!("Saved {} alerts to {}", snapshot.alerts.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::AlertEngine;
    use crate::metrics::{Metrics, Trend};
    use crate::presets::Preset;
    use crate::types::SuppressionReason;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("none.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_round_trip_preserves_cooldown() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("state").join("history.json"));
        let metrics = Metrics::new(155.0, 145.0, 0.02, Trend::Downward);

        let mut engine = AlertEngine::from_preset(Preset::Moderate).unwrap();
        assert!(engine.evaluate("AAPL", &metrics).unwrap().should_alert);
        store.save(engine.history()).await.unwrap();

        // Restarted host picks up where it left off
        let history = store.load().await.unwrap();
        let mut restarted =
            AlertEngine::with_history(engine.config().clone(), history).unwrap();
        let decision = restarted.evaluate("AAPL", &metrics).unwrap();
        assert_eq!(
            decision.suppression_reason,
            Some(SuppressionReason::DuplicateWithinCooldown)
        );
    }

    #[tokio::test]
    async fn test_unreadable_location_errors() {
        let dir = tempdir().unwrap();
        // A regular file where a directory is expected
        let blocker = dir.path().join("blocker");
        tokio::fs::write(&blocker, "x").await.unwrap();

        let store = HistoryStore::new(blocker.join("history.json"));
        assert!(store.load().await.is_err());
    }

    #[tokio::test]
    async fn test_corrupt_file_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        tokio::fs::write(&path, "not json").await.unwrap();
        assert!(HistoryStore::new(path).load().await.is_err());
    }
}
