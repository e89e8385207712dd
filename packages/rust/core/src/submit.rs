//! Intake pipeline: validate → ledger → queue.
//!
//! Every call leaves exactly one ledger entry behind. Accepted records are
//! also appended to the queue; rejections never touch it.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use mediaqueue_intake::{IntakeInput, RejectReason};
use mediaqueue_shared::{Clock, FailureEntry, Paths, Result, SubmissionRecord};
use mediaqueue_storage::{Ledger, QueueStore};

/// Result of one intake call.
#[derive(Debug)]
pub enum IntakeOutcome {
    Accepted {
        record: SubmissionRecord,
        /// Queue length after the append.
        queue_len: usize,
        ledger_entry: PathBuf,
    },
    Rejected {
        reason: RejectReason,
        ledger_entry: PathBuf,
    },
}

impl IntakeOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Intake entry point bound to one set of storage paths.
pub struct Submitter {
    queue: QueueStore,
    ledger: Ledger,
    clock: Arc<dyn Clock>,
}

impl Submitter {
    pub fn new(paths: &Paths, clock: Arc<dyn Clock>) -> Self {
        Self {
            queue: QueueStore::new(&paths.queue_file),
            ledger: Ledger::new(&paths.submissions_dir, &paths.failures_dir),
            clock,
        }
    }

    /// Validate and persist one submission.
    ///
    /// Only storage faults are errors. The ledger entry is written before the
    /// queue append, so an accepted record is on record even if the append fails.
    #[instrument(skip_all, fields(username = %username))]
    pub fn submit(&self, username: &str, input: &IntakeInput) -> Result<IntakeOutcome> {
        let now = self.clock.now();

        match mediaqueue_intake::validate(username, input, now) {
            Ok(record) => {
                let ledger_entry = self.ledger.record_submission(&record)?;
                let queue_len = self.queue.append(&record)?;

                info!(
                    file_url = %record.file_url,
                    display_name = %record.display_name,
                    queue_len,
                    "submission queued"
                );

                Ok(IntakeOutcome::Accepted {
                    record,
                    queue_len,
                    ledger_entry,
                })
            }
            Err(reason) => {
                let entry = FailureEntry {
                    username: username.to_string(),
                    raw: input.raw_text(),
                    reason: reason.to_string(),
                    date: now,
                };
                let ledger_entry = self.ledger.record_failure(&entry)?;

                warn!(
                    %reason,
                    ledger_entry = %ledger_entry.display(),
                    "submission rejected"
                );

                Ok(IntakeOutcome::Rejected {
                    reason,
                    ledger_entry,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{temp_paths, cleanup};
    use mediaqueue_intake::ExplicitFields;
    use mediaqueue_shared::{Category, ManualClock};

    fn submitter(paths: &Paths) -> Submitter {
        Submitter::new(paths, Arc::new(ManualClock::fixed()))
    }

    fn ledger(paths: &Paths) -> Ledger {
        Ledger::new(&paths.submissions_dir, &paths.failures_dir)
    }

    #[test]
    fn accepted_body_is_logged_and_queued() {
        let (root, paths) = temp_paths();
        let outcome = submitter(&paths)
            .submit(
                "alice",
                &IntakeInput::Body(
                    "(alice) [2024-01-01]\nhttps://example.com/cat.gif\nfunny cat".into(),
                ),
            )
            .unwrap();

        let IntakeOutcome::Accepted {
            record,
            queue_len,
            ledger_entry,
        } = outcome
        else {
            panic!("expected acceptance");
        };
        assert_eq!(record.display_name, "alice");
        assert_eq!(record.category(), Some(Category::Gif));
        assert_eq!(queue_len, 1);
        assert!(ledger_entry.starts_with(&paths.submissions_dir));

        let queued = QueueStore::new(&paths.queue_file).load().unwrap();
        assert_eq!(queued, vec![record]);
        assert_eq!(ledger(&paths).counts().unwrap().failures, 0);

        cleanup(&root);
    }

    #[test]
    fn rejection_leaves_queue_untouched() {
        let (root, paths) = temp_paths();
        let submitter = submitter(&paths);
        submitter
            .submit(
                "alice",
                &IntakeInput::Body("(alice) [d]\nhttps://example.com/a.png".into()),
            )
            .unwrap();

        let body = "alice [2024-01-01]\nhttps://example.com/cat.gif";
        let outcome = submitter
            .submit("mallory", &IntakeInput::Body(body.into()))
            .unwrap();

        assert!(matches!(
            outcome,
            IntakeOutcome::Rejected {
                reason: RejectReason::MalformedHeader,
                ..
            }
        ));
        assert_eq!(QueueStore::new(&paths.queue_file).load().unwrap().len(), 1);

        let counts = ledger(&paths).counts().unwrap();
        assert_eq!(counts.failures, 1);
        assert_eq!(counts.submissions, 1);

        cleanup(&root);
    }

    #[test]
    fn failure_entry_keeps_raw_text() {
        let (root, paths) = temp_paths();
        let outcome = submitter(&paths)
            .submit("bob", &IntakeInput::Body("just one line".into()))
            .unwrap();

        let IntakeOutcome::Rejected { ledger_entry, .. } = outcome else {
            panic!("expected rejection");
        };
        let entry: FailureEntry =
            serde_json::from_str(&std::fs::read_to_string(ledger_entry).unwrap()).unwrap();
        assert_eq!(entry.username, "bob");
        assert_eq!(entry.raw, "just one line");
        assert!(entry.reason.contains("at least 2"));

        cleanup(&root);
    }

    #[test]
    fn explicit_fields_accept_unmapped_extension() {
        let (root, paths) = temp_paths();
        let outcome = submitter(&paths)
            .submit(
                "carol",
                &IntakeInput::Fields(ExplicitFields {
                    file_url: "https://example.com/scan.bmp".into(),
                    display_name: Some("Carol".into()),
                    description: None,
                }),
            )
            .unwrap();

        assert!(outcome.is_accepted());
        assert_eq!(QueueStore::new(&paths.queue_file).load().unwrap().len(), 1);

        cleanup(&root);
    }
}
