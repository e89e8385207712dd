//! File-backed persistence for mediaqueue.
//!
//! Three stores, all plain files so results can be committed alongside the site:
//! - [`QueueStore`]: the pending FIFO as a JSON array
//! - [`CooldownStore`]: a single decimal millisecond timestamp
//! - [`Ledger`]: write-once JSON entries for accepted and rejected submissions
//!
//! **Access rules:** one writer at a time, by convention. Nothing here locks;
//! overlapping invocations can lose queue updates. Whole-file rewrites go
//! through [`write_atomic`] so a crash never leaves a half-written file.

mod cooldown;
mod ledger;
mod queue;

use std::io::ErrorKind;
use std::path::Path;

use mediaqueue_shared::{MediaQueueError, Result};
use tracing::debug;
use uuid::Uuid;

pub use cooldown::CooldownStore;
pub use ledger::{Ledger, LedgerCounts};
pub use queue::QueueStore;

/// Replace `path` with `contents` by writing a sibling temp file and renaming it.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| MediaQueueError::io(parent, e))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| MediaQueueError::validation(format!("{} has no file name", path.display())))?;
    let temp = parent.join(format!(".{file_name}.{}.tmp", Uuid::now_v7()));

    std::fs::write(&temp, contents).map_err(|e| MediaQueueError::io(&temp, e))?;

    if let Err(e) = std::fs::rename(&temp, path) {
        let _ = std::fs::remove_file(&temp);
        return Err(MediaQueueError::io(path, e));
    }

    debug!(path = %path.display(), bytes = contents.len(), "wrote file atomically");
    Ok(())
}

/// Read a UTF-8 file, mapping "not found" to `None`.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(MediaQueueError::io(path, e)),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;

    pub fn temp_dir(prefix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("{prefix}-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
