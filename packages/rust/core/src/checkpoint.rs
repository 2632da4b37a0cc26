//! Durable progress checkpoint.
//!
//! The checkpoint is a small JSON file listing every posting id whose
//! enriched record has been persisted, plus the time of the last update. It
//! is replaced atomically: the new contents go to a sibling temp file which is
//! synced and then renamed over the original.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info};

use internscout_shared::{InternScoutError, ProgressRecord, Result};

pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the checkpoint. A missing file is an empty record.
    pub fn load(&self) -> Result<ProgressRecord> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no checkpoint, starting fresh");
                return Ok(ProgressRecord::default());
            }
            Err(e) => return Err(InternScoutError::checkpoint(&self.path, e.to_string())),
        };

        serde_json::from_str(&content)
            .map_err(|e| InternScoutError::checkpoint(&self.path, format!("corrupt checkpoint: {e}")))
    }

    /// Atomically replace the checkpoint with `record`.
    pub fn persist(&self, record: &ProgressRecord) -> Result<()> {
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| InternScoutError::checkpoint(&self.path, e.to_string()))?;

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "checkpoint".into());
        let temp = self.path.with_file_name(format!(".{file_name}.tmp"));

        let write = || -> std::io::Result<()> {
            let mut file = File::create(&temp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
            std::fs::rename(&temp, &self.path)
        };

        write().map_err(|e| {
            let _ = std::fs::remove_file(&temp);
            InternScoutError::checkpoint(&self.path, e.to_string())
        })
    }

    /// Add `ids` to `record`, stamp the run time, and persist.
    pub fn record<I>(&self, record: &mut ProgressRecord, ids: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        record.processed_ids.extend(ids.into_iter().map(Into::into));
        record.last_run = Some(Utc::now());
        self.persist(record)
    }

    /// Delete the checkpoint. A missing file is not an error.
    pub fn reset(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "checkpoint removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(InternScoutError::checkpoint(&self.path, e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_store() -> ProgressStore {
        let dir = std::env::temp_dir().join(format!("is-checkpoint-test-{}", Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        ProgressStore::new(dir.join("scraper_progress.json"))
    }

    #[test]
    fn missing_file_loads_empty() {
        let store = temp_store();
        assert_eq!(store.load().unwrap(), ProgressRecord::default());
    }

    #[test]
    fn record_persists_and_reloads() {
        let store = temp_store();
        let mut record = store.load().unwrap();

        store.record(&mut record, ["b", "a"]).unwrap();
        store.record(&mut record, vec!["c".to_string()]).unwrap();

        let loaded = store.load().unwrap();
        let ids: Vec<&str> = loaded.processed_ids.iter().map(String::as_str).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(loaded.last_run.is_some());
        assert_eq!(loaded, record);

        let leftover = store.path().with_file_name(".scraper_progress.json.tmp");
        assert!(!leftover.exists());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let store = temp_store();
        std::fs::write(store.path(), "{ not json").unwrap();
        let err = store.load().unwrap_err();
        assert!(matches!(err, InternScoutError::Checkpoint { .. }));
    }

    #[test]
    fn reset_removes_checkpoint() {
        let store = temp_store();
        let mut record = ProgressRecord::default();
        store.record(&mut record, ["x"]).unwrap();
        assert!(store.path().exists());

        store.reset().unwrap();
        assert!(!store.path().exists());
        assert!(store.load().unwrap().processed_ids.is_empty());
        store.reset().unwrap();
    }

    #[test]
    fn unwritable_location_is_an_error() {
        let store = ProgressStore::new(
            std::env::temp_dir()
                .join(format!("is-missing-dir-{}", Uuid::now_v7()))
                .join("progress.json"),
        );
        let err = store.persist(&ProgressRecord::default()).unwrap_err();
        assert!(matches!(err, InternScoutError::Checkpoint { .. }));
    }
}
