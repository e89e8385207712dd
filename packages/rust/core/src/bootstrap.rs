//! Working-tree bootstrap: documents with markers, queue file, ledger dirs.
//!
//! Existing documents are never rewritten, even when they lack a marker;
//! those are only reported.

use std::path::PathBuf;

use tracing::{info, instrument, warn};

use mediaqueue_render::{Marker, placeholder_document};
use mediaqueue_shared::{Category, MediaQueueError, Paths, Result};
use mediaqueue_storage::{Ledger, QueueStore, read_optional, write_atomic};

/// What [`bootstrap`] created or found.
#[derive(Debug, Default)]
pub struct BootstrapReport {
    /// Documents written from the placeholder template.
    pub created: Vec<PathBuf>,
    /// Documents already present with a marker.
    pub existing: Vec<PathBuf>,
    /// Documents already present but without a marker; drain will drop
    /// records routed to these.
    pub missing_marker: Vec<PathBuf>,
    pub queue_created: bool,
}

/// Create whatever is missing for intake and drain to run.
#[instrument(skip_all, fields(documents_dir = %paths.documents_dir.display()))]
pub fn bootstrap(paths: &Paths, marker_id: &str) -> Result<BootstrapReport> {
    let marker = Marker::new(marker_id)?;
    let mut report = BootstrapReport::default();

    std::fs::create_dir_all(&paths.documents_dir)
        .map_err(|e| MediaQueueError::io(&paths.documents_dir, e))?;

    for category in Category::ALL {
        let path = paths.document(category).to_path_buf();
        match read_optional(&path)? {
            Some(content) if marker.locate(&content).is_some() => report.existing.push(path),
            Some(_) => {
                warn!(path = %path.display(), marker_id, "document has no marker, leaving it alone");
                report.missing_marker.push(path);
            }
            None => {
                write_atomic(&path, &placeholder_document(category, marker_id))?;
                info!(path = %path.display(), %category, "created placeholder document");
                report.created.push(path);
            }
        }
    }

    report.queue_created = QueueStore::new(&paths.queue_file).ensure_exists()?;
    Ledger::new(&paths.submissions_dir, &paths.failures_dir).ensure_dirs()?;

    Ok(report)
}
