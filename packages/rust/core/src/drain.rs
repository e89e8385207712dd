//! Drain pipeline: cooldown gate → batch pop → route → render → splice.
//!
//! Each run ends in one of three outcomes:
//! - **Skipped**: the cooldown window has not elapsed; only the cooldown file is read
//! - **Idled**: the queue is empty; wait out the idle period, then arm the cooldown
//! - **Processed**: up to `max_per_run` records are popped and inserted, the
//!   remainder is written back, and the cooldown is armed
//!
//! Per-record faults drop that record and move on. A dropped record is not
//! re-queued; its ledger entry is the only remaining trace.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use mediaqueue_render::{FragmentRenderer, Marker};
use mediaqueue_shared::{
    Category, Clock, DrainSettings, MediaQueueError, Paths, RenderConfig, Result,
    SubmissionRecord,
};
use mediaqueue_storage::{CooldownStore, QueueStore, read_optional, write_atomic};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What a single drain invocation did.
#[derive(Debug)]
pub enum DrainOutcome {
    /// Cooldown still active.
    Skipped { remaining: Duration },
    /// Queue was empty. `interrupted` is set when the idle wait was cancelled.
    Idled { interrupted: bool },
    /// A batch was popped.
    Processed(DrainReport),
}

/// Per-run summary of a processed batch.
#[derive(Debug, Default)]
pub struct DrainReport {
    /// Records taken off the queue this run.
    pub popped: usize,
    pub inserted: Vec<InsertedRecord>,
    pub dropped: Vec<DroppedRecord>,
    /// Records still queued after the run.
    pub remaining: usize,
}

#[derive(Debug, Clone)]
pub struct InsertedRecord {
    pub record: SubmissionRecord,
    pub category: Category,
    pub document: PathBuf,
}

#[derive(Debug, Clone)]
pub struct DroppedRecord {
    pub record: SubmissionRecord,
    pub reason: DropReason,
}

/// Why a popped record was discarded instead of inserted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DropReason {
    #[error("no target document for extension {}", .extension.as_deref().unwrap_or("<none>"))]
    Unroutable { extension: Option<String> },

    #[error("target document {} does not exist", .path.display())]
    MissingDocument { path: PathBuf },

    #[error("target document {} has no marker element", .path.display())]
    MarkerNotFound { path: PathBuf },

    #[error("cannot render record: {message}")]
    Unrenderable { message: String },

    #[error("I/O failure on {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting drain status.
pub trait DrainProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before the idle wait begins.
    fn idle_wait(&self, duration: Duration);
    /// Called after each popped record is inserted or dropped.
    fn record_done(&self, current: usize, total: usize, detail: &str);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl DrainProgress for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn idle_wait(&self, _duration: Duration) {}
    fn record_done(&self, _current: usize, _total: usize, _detail: &str) {}
}

// ---------------------------------------------------------------------------
// Drainer
// ---------------------------------------------------------------------------

/// Drain entry point bound to one set of paths and settings.
pub struct Drainer {
    paths: Paths,
    settings: DrainSettings,
    queue: QueueStore,
    cooldown: CooldownStore,
    renderer: FragmentRenderer,
    marker: Marker,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
}

impl Drainer {
    pub fn new(
        paths: Paths,
        settings: DrainSettings,
        render: &RenderConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        if settings.max_per_run == 0 {
            return Err(MediaQueueError::config("max_per_run must be at least 1"));
        }

        Ok(Self {
            queue: QueueStore::new(&paths.queue_file),
            cooldown: CooldownStore::new(&paths.cooldown_file),
            renderer: FragmentRenderer::new(render),
            marker: Marker::new(&settings.marker_id)?,
            paths,
            settings,
            clock,
            cancel: CancellationToken::new(),
        })
    }

    /// Use `token` to cut the idle wait short.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Time left before the next run may do work, or `None` if it may run now.
    pub fn cooldown_remaining(&self) -> Option<Duration> {
        cooldown_remaining(
            self.cooldown.last_run_millis(),
            self.clock.now_millis(),
            self.settings.cooldown,
        )
    }

    /// Run one drain cycle.
    ///
    /// Errors are reserved for top-level storage faults: the queue cannot be
    /// read or rewritten, or the cooldown cannot be armed.
    #[instrument(skip_all, fields(max_per_run = self.settings.max_per_run))]
    pub async fn run(&self, progress: &dyn DrainProgress) -> Result<DrainOutcome> {
        if let Some(remaining) = self.cooldown_remaining() {
            info!(remaining_secs = remaining.as_secs(), "cooldown active, skipping");
            return Ok(DrainOutcome::Skipped { remaining });
        }

        progress.phase("Loading queue");
        let mut batch = self.queue.load()?;

        if batch.is_empty() {
            self.queue.ensure_exists()?;
            return self.idle(progress).await;
        }

        let take = batch.len().min(self.settings.max_per_run);
        let remainder = batch.split_off(take);
        info!(popped = take, remaining = remainder.len(), "processing batch");

        progress.phase("Inserting submissions");
        let mut report = DrainReport {
            popped: take,
            remaining: remainder.len(),
            ..DrainReport::default()
        };

        for (i, record) in batch.into_iter().enumerate() {
            match self.insert(&record) {
                Ok((category, document)) => {
                    info!(
                        username = %record.username,
                        %category,
                        document = %document.display(),
                        "submission inserted"
                    );
                    progress.record_done(i + 1, take, &format!("inserted into {category}"));
                    report.inserted.push(InsertedRecord {
                        record,
                        category,
                        document,
                    });
                }
                Err(reason) => {
                    warn!(
                        username = %record.username,
                        file_url = %record.file_url,
                        %reason,
                        "submission dropped"
                    );
                    progress.record_done(i + 1, take, &format!("dropped: {reason}"));
                    report.dropped.push(DroppedRecord { record, reason });
                }
            }
        }

        self.queue.save(&remainder)?;
        self.cooldown.arm(self.clock.now_millis())?;

        info!(
            inserted = report.inserted.len(),
            dropped = report.dropped.len(),
            remaining = report.remaining,
            "drain complete"
        );

        Ok(DrainOutcome::Processed(report))
    }

    async fn idle(&self, progress: &dyn DrainProgress) -> Result<DrainOutcome> {
        let wait = self.settings.idle_wait;
        info!(wait_secs = wait.as_secs(), "queue empty, idling");
        progress.idle_wait(wait);

        let interrupted = tokio::select! {
            _ = self.clock.sleep(wait) => false,
            _ = self.cancel.cancelled() => true,
        };
        if interrupted {
            info!("idle wait interrupted");
        }

        self.cooldown.arm(self.clock.now_millis())?;
        Ok(DrainOutcome::Idled { interrupted })
    }

    /// Route, render and splice one record into its document.
    fn insert(
        &self,
        record: &SubmissionRecord,
    ) -> std::result::Result<(Category, PathBuf), DropReason> {
        let category = record.category().ok_or_else(|| DropReason::Unroutable {
            extension: record.extension(),
        })?;
        let path = self.paths.document(category).to_path_buf();

        let document = match read_optional(&path) {
            Ok(Some(document)) => document,
            Ok(None) => return Err(DropReason::MissingDocument { path }),
            Err(e) => {
                return Err(DropReason::Io {
                    path,
                    message: e.to_string(),
                });
            }
        };

        let fragment = self
            .renderer
            .render(record, category)
            .map_err(|e| DropReason::Unrenderable {
                message: e.to_string(),
            })?;

        let updated = match self.marker.splice(&document, &fragment) {
            Ok(updated) => updated,
            Err(MediaQueueError::MarkerNotFound { .. }) => {
                return Err(DropReason::MarkerNotFound { path });
            }
            Err(e) => {
                return Err(DropReason::Unrenderable {
                    message: e.to_string(),
                });
            }
        };

        write_atomic(&path, &updated).map_err(|e| DropReason::Io {
            path: path.clone(),
            message: e.to_string(),
        })?;

        Ok((category, path))
    }
}

/// Remaining cooldown given the last armed time and now, both in ms.
pub(crate) fn cooldown_remaining(last_ms: i64, now_ms: i64, window: Duration) -> Option<Duration> {
    let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
    let elapsed = now_ms.saturating_sub(last_ms);
    if elapsed >= window_ms {
        return None;
    }
    let remaining = window_ms.saturating_sub(elapsed);
    Some(Duration::from_millis(u64::try_from(remaining).unwrap_or(u64::MAX)))
}
