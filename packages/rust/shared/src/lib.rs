//! Shared types, error model, and configuration for mediaqueue.
//!
//! This crate is the foundation depended on by all other mediaqueue crates.
//! It provides:
//! - [`MediaQueueError`], the unified error type
//! - Domain types ([`SubmissionRecord`], [`FailureEntry`], [`Category`])
//! - Configuration ([`AppConfig`], [`Paths`], [`DrainSettings`], config loading)
//! - The injectable [`Clock`]

pub mod clock;
pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    AppConfig, CONFIG_FILE_NAME, DocumentsConfig, DrainConfig, DrainSettings, Paths, PathsConfig,
    RenderConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
    locate_config,
};
pub use error::{MediaQueueError, Result};
pub use types::{Category, FailureEntry, SubmissionRecord, extension_of};
