//! Cooldown marker: the time of the last completed drain run.

use std::path::{Path, PathBuf};

use mediaqueue_shared::Result;
use tracing::{debug, warn};

use crate::{read_optional, write_atomic};

/// Handle to the cooldown file (one decimal integer, ms since the epoch).
#[derive(Debug, Clone)]
pub struct CooldownStore {
    path: PathBuf,
}

impl CooldownStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last armed timestamp in ms. Missing, unreadable or unparseable → `0`.
    pub fn last_run_millis(&self) -> i64 {
        let content = match read_optional(&self.path) {
            Ok(Some(content)) => content,
            Ok(None) => return 0,
            Err(e) => {
                warn!(error = %e, "cannot read cooldown file, treating as never run");
                return 0;
            }
        };

        match content.trim().parse::<i64>() {
            Ok(millis) => millis,
            Err(_) => {
                warn!(
                    path = %self.path.display(),
                    content = %content.trim(),
                    "cooldown file is not an integer, treating as never run"
                );
                0
            }
        }
    }

    /// Record a completed run at `now_millis`. The stored value never moves
    /// backwards; returns what was written.
    pub fn arm(&self, now_millis: i64) -> Result<i64> {
        let value = now_millis.max(self.last_run_millis());
        write_atomic(&self.path, &value.to_string())?;
        debug!(path = %self.path.display(), value, "cooldown armed");
        Ok(value)
    }
}
