//! Read-only snapshot of queue, cooldown, ledger and documents.

use std::path::PathBuf;

use serde::Serialize;

use mediaqueue_render::Marker;
use mediaqueue_shared::{Category, Clock, DrainSettings, Paths, Result};
use mediaqueue_storage::{CooldownStore, Ledger, QueueStore, read_optional};

use crate::drain::cooldown_remaining;

#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    /// `None` when the queue file exists but does not parse.
    pub queue_len: Option<usize>,
    /// Seconds until the next drain may do work; `None` when it may run now.
    pub cooldown_remaining_secs: Option<u64>,
    pub last_run_millis: i64,
    pub ledger_submissions: usize,
    pub ledger_failures: usize,
    pub documents: Vec<DocumentStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentStatus {
    pub category: Category,
    pub path: PathBuf,
    pub exists: bool,
    pub has_marker: bool,
}

/// Collect a snapshot without writing anything.
pub fn status(paths: &Paths, settings: &DrainSettings, clock: &dyn Clock) -> Result<StatusSnapshot> {
    let queue_len = QueueStore::new(&paths.queue_file)
        .peek()?
        .map(|records| records.len());

    let last_run_millis = CooldownStore::new(&paths.cooldown_file).last_run_millis();
    let cooldown_remaining_secs =
        cooldown_remaining(last_run_millis, clock.now_millis(), settings.cooldown)
            .map(|d| d.as_secs());

    let counts = Ledger::new(&paths.submissions_dir, &paths.failures_dir).counts()?;

    let marker = Marker::new(&settings.marker_id)?;
    let mut documents = Vec::with_capacity(Category::ALL.len());
    for category in Category::ALL {
        let path = paths.document(category).to_path_buf();
        let content = read_optional(&path)?;
        documents.push(DocumentStatus {
            category,
            exists: content.is_some(),
            has_marker: content.is_some_and(|c| marker.locate(&c).is_some()),
            path,
        });
    }

    Ok(StatusSnapshot {
        queue_len,
        cooldown_remaining_secs,
        last_run_millis,
        ledger_submissions: counts.submissions,
        ledger_failures: counts.failures,
        documents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::bootstrap;
    use crate::test_support::{cleanup, record, temp_paths};
    use mediaqueue_shared::{AppConfig, ManualClock};
    use std::time::Duration;

    #[test]
    fn fresh_tree_status() {
        let (root, paths) = temp_paths();
        let settings = DrainSettings::from(&AppConfig::default());
        let snapshot = status(&paths, &settings, &ManualClock::fixed()).unwrap();

        assert_eq!(snapshot.queue_len, Some(0));
        assert_eq!(snapshot.cooldown_remaining_secs, None);
        assert_eq!(snapshot.ledger_submissions, 0);
        assert!(snapshot.documents.iter().all(|d| !d.exists && !d.has_marker));

        cleanup(&root);
    }

    #[test]
    fn reports_queue_cooldown_and_documents() {
        let (root, paths) = temp_paths();
        bootstrap(&paths, "submissions").unwrap();
        QueueStore::new(&paths.queue_file)
            .save(&[record(0, "gif"), record(1, "png")])
            .unwrap();

        let clock = ManualClock::fixed();
        CooldownStore::new(&paths.cooldown_file)
            .arm(clock.now_millis())
            .unwrap();
        clock.advance(Duration::from_secs(100));

        let settings = DrainSettings::from(&AppConfig::default());
        let snapshot = status(&paths, &settings, &clock).unwrap();

        assert_eq!(snapshot.queue_len, Some(2));
        assert_eq!(snapshot.cooldown_remaining_secs, Some(200));
        assert!(snapshot.documents.iter().all(|d| d.exists && d.has_marker));

        cleanup(&root);
    }

    #[test]
    fn corrupt_queue_is_reported_not_repaired() {
        let (root, paths) = temp_paths();
        std::fs::create_dir_all(paths.queue_file.parent().unwrap()).unwrap();
        std::fs::write(&paths.queue_file, "[{").unwrap();

        let settings = DrainSettings::from(&AppConfig::default());
        let snapshot = status(&paths, &settings, &ManualClock::fixed()).unwrap();

        assert_eq!(snapshot.queue_len, None);
        assert_eq!(std::fs::read_to_string(&paths.queue_file).unwrap(), "[{");

        cleanup(&root);
    }
}
