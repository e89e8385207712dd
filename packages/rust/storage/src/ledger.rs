//! Append-only audit ledger.
//!
//! Every intake attempt becomes one JSON file named
//! `<timestamp>-<username>.json`, under the success or the failure directory.
//! Files are created with `create_new` and never rewritten or removed.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use mediaqueue_shared::{FailureEntry, MediaQueueError, Result, SubmissionRecord};
use serde::Serialize;
use tracing::debug;

/// Same-instant collisions give up after this many numbered suffixes.
const MAX_NAME_ATTEMPTS: usize = 1000;

/// Handle to the two ledger directories.
#[derive(Debug, Clone)]
pub struct Ledger {
    submissions_dir: PathBuf,
    failures_dir: PathBuf,
}

/// Number of entries on each side of the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerCounts {
    pub submissions: usize,
    pub failures: usize,
}

impl Ledger {
    pub fn new(submissions_dir: impl Into<PathBuf>, failures_dir: impl Into<PathBuf>) -> Self {
        Self {
            submissions_dir: submissions_dir.into(),
            failures_dir: failures_dir.into(),
        }
    }

    /// Record an accepted submission. Returns the created file.
    pub fn record_submission(&self, record: &SubmissionRecord) -> Result<PathBuf> {
        write_entry(
            &self.submissions_dir,
            record.submitted_at,
            &record.username,
            record,
        )
    }

    /// Record a rejected input. Returns the created file.
    pub fn record_failure(&self, entry: &FailureEntry) -> Result<PathBuf> {
        write_entry(&self.failures_dir, entry.date, &entry.username, entry)
    }

    /// Count entries on both sides. Missing directories count as empty.
    pub fn counts(&self) -> Result<LedgerCounts> {
        Ok(LedgerCounts {
            submissions: count_entries(&self.submissions_dir)?,
            failures: count_entries(&self.failures_dir)?,
        })
    }

    /// Create both directories.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.submissions_dir, &self.failures_dir] {
            std::fs::create_dir_all(dir).map_err(|e| MediaQueueError::io(dir, e))?;
        }
        Ok(())
    }
}

/// Sortable, filesystem-safe ISO 8601 basic timestamp.
fn file_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%S%.3fZ").to_string()
}

/// Keep usernames from escaping the directory or breaking the name pattern.
fn sanitize_username(username: &str) -> String {
    let cleaned: String = username
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "anonymous".into()
    } else {
        cleaned
    }
}

fn write_entry<T: Serialize>(
    dir: &Path,
    at: DateTime<Utc>,
    username: &str,
    entry: &T,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| MediaQueueError::io(dir, e))?;

    let json = serde_json::to_string_pretty(entry)?;
    let stem = format!("{}-{}", file_stamp(at), sanitize_username(username));

    for attempt in 0..MAX_NAME_ATTEMPTS {
        let name = if attempt == 0 {
            format!("{stem}.json")
        } else {
            format!("{stem}-{attempt}.json")
        };
        let path = dir.join(name);

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(MediaQueueError::io(&path, e)),
        };

        file.write_all(json.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| MediaQueueError::io(&path, e))?;

        debug!(path = %path.display(), "ledger entry written");
        return Ok(path);
    }

    Err(MediaQueueError::validation(format!(
        "could not find a free ledger file name for {stem} in {}",
        dir.display()
    )))
}

fn count_entries(dir: &Path) -> Result<usize> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(MediaQueueError::io(dir, e)),
    };

    let mut count = 0;
    for entry in entries {
        let entry = entry.map_err(|e| MediaQueueError::io(dir, e))?;
        if entry.path().extension().is_some_and(|ext| ext == "json") {
            count += 1;
        }
    }
    Ok(count)
}
