//! Core workflows for mediaqueue.
//!
//! Ties intake validation, file-backed storage and fragment rendering into
//! the operations the CLI exposes: submit, drain, bootstrap and status.

pub mod bootstrap;
pub mod drain;
pub mod status;
pub mod submit;

pub use bootstrap::{BootstrapReport, bootstrap};
pub use drain::{
    DrainOutcome, DrainProgress, DrainReport, Drainer, DropReason, DroppedRecord, InsertedRecord,
    SilentProgress,
};
pub use status::{DocumentStatus, StatusSnapshot, status};
pub use submit::{IntakeOutcome, Submitter};

pub use mediaqueue_intake::{ExplicitFields, IntakeInput, RejectReason};
