//! Pending submission queue, persisted as a JSON array in arrival order.

use std::path::{Path, PathBuf};

use mediaqueue_shared::{MediaQueueError, Result, SubmissionRecord};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{read_optional, write_atomic};

/// Handle to the queue file. Holds no records in memory between calls.
#[derive(Debug, Clone)]
pub struct QueueStore {
    path: PathBuf,
}

impl QueueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the queue in FIFO order.
    ///
    /// A missing or blank file is an empty queue. A file that does not parse
    /// is moved aside to `<name>.corrupt-<id>` and also read as empty, so the
    /// next save cannot overwrite the only copy.
    pub fn load(&self) -> Result<Vec<SubmissionRecord>> {
        let Some(content) = read_optional(&self.path)? else {
            debug!(path = %self.path.display(), "queue file missing, treating as empty");
            return Ok(Vec::new());
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str::<Vec<SubmissionRecord>>(&content) {
            Ok(records) => Ok(records),
            Err(e) => {
                let backup = self.quarantine()?;
                warn!(
                    path = %self.path.display(),
                    backup = %backup.display(),
                    error = %e,
                    "queue file is not valid JSON, treating as empty"
                );
                Ok(Vec::new())
            }
        }
    }

    /// Read without side effects. `None` means the file exists but is corrupt.
    pub fn peek(&self) -> Result<Option<Vec<SubmissionRecord>>> {
        match read_optional(&self.path)? {
            None => Ok(Some(Vec::new())),
            Some(content) if content.trim().is_empty() => Ok(Some(Vec::new())),
            Some(content) => Ok(serde_json::from_str(&content).ok()),
        }
    }

    /// Overwrite the queue with `records`.
    pub fn save(&self, records: &[SubmissionRecord]) -> Result<()> {
        let json = serde_json::to_string_pretty(records)?;
        write_atomic(&self.path, &json)?;
        debug!(path = %self.path.display(), len = records.len(), "queue saved");
        Ok(())
    }

    /// Append one record at the tail. Returns the new queue length.
    pub fn append(&self, record: &SubmissionRecord) -> Result<usize> {
        let mut records = self.load()?;
        records.push(record.clone());
        self.save(&records)?;
        Ok(records.len())
    }

    /// Create an empty queue file if none exists.
    pub fn ensure_exists(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        self.save(&[])?;
        info!(path = %self.path.display(), "created empty queue file");
        Ok(true)
    }

    fn quarantine(&self) -> Result<PathBuf> {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "queue.json".into());
        let backup = self
            .path
            .with_file_name(format!("{file_name}.corrupt-{}", Uuid::now_v7()));

        std::fs::rename(&self.path, &backup).map_err(|e| MediaQueueError::io(&self.path, e))?;
        Ok(backup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::temp_dir;
    use chrono::{TimeZone, Utc};

    fn record(n: u32) -> SubmissionRecord {
        SubmissionRecord {
            username: format!("user{n}"),
            display_name: format!("User {n}"),
            file_url: format!("https://example.com/{n}.png"),
            description: format!("item {n}"),
            submitted_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, n).unwrap(),
            claimed_date: (n % 2 == 0).then(|| "2024-01-01".to_string()),
        }
    }

    #[test]
    fn missing_file_is_empty_queue() {
        let tmp = temp_dir("mq-queue-test");
        let store = QueueStore::new(tmp.join("queue.json"));
        assert!(store.load().unwrap().is_empty());
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn save_then_load_preserves_order() {
        let tmp = temp_dir("mq-queue-test");
        let store = QueueStore::new(tmp.join("data/queue.json"));
        let records: Vec<_> = (0..5).map(record).collect();

        store.save(&records).unwrap();
        assert_eq!(store.load().unwrap(), records);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn append_adds_to_tail() {
        let tmp = temp_dir("mq-queue-test");
        let store = QueueStore::new(tmp.join("queue.json"));

        assert_eq!(store.append(&record(1)).unwrap(), 1);
        assert_eq!(store.append(&record(2)).unwrap(), 2);

        let loaded = store.load().unwrap();
        assert_eq!(loaded[0].username, "user1");
        assert_eq!(loaded[1].username, "user2");

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn corrupt_file_is_quarantined() {
        let tmp = temp_dir("mq-queue-test");
        let path = tmp.join("queue.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = QueueStore::new(&path);
        assert_eq!(store.peek().unwrap(), None);
        assert!(path.exists());
        assert!(store.load().unwrap().is_empty());
        assert!(!path.exists());

        let backups: Vec<_> = std::fs::read_dir(&tmp)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|n| n.starts_with("queue.json.corrupt-"))
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(
            std::fs::read_to_string(tmp.join(&backups[0])).unwrap(),
            "{ not json"
        );

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_exists_only_creates_once() {
        let tmp = temp_dir("mq-queue-test");
        let store = QueueStore::new(tmp.join("queue.json"));

        assert!(store.ensure_exists().unwrap());
        store.append(&record(1)).unwrap();
        assert!(!store.ensure_exists().unwrap());
        assert_eq!(store.load().unwrap().len(), 1);

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
