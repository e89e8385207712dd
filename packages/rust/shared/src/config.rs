//! Application configuration for mediaqueue.
//!
//! Config lives in `mediaqueue.toml`, looked up in the working directory and
//! then under `~/.mediaqueue/`. CLI flags override config file values, which
//! override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MediaQueueError, Result};
use crate::types::Category;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "mediaqueue.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".mediaqueue";

// ---------------------------------------------------------------------------
// Config structs (matching mediaqueue.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Storage locations, relative to the working root.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Drain pacing.
    #[serde(default)]
    pub drain: DrainConfig,

    /// Target document names and marker.
    #[serde(default)]
    pub documents: DocumentsConfig,

    /// Fragment rendering.
    #[serde(default)]
    pub render: RenderConfig,
}

/// `[paths]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_queue_file")]
    pub queue_file: String,

    #[serde(default = "default_cooldown_file")]
    pub cooldown_file: String,

    /// Success half of the audit ledger.
    #[serde(default = "default_submissions_dir")]
    pub submissions_dir: String,

    /// Failure half of the audit ledger.
    #[serde(default = "default_failures_dir")]
    pub failures_dir: String,

    /// Directory holding the per-category HTML documents.
    #[serde(default = "default_documents_dir")]
    pub documents_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            queue_file: default_queue_file(),
            cooldown_file: default_cooldown_file(),
            submissions_dir: default_submissions_dir(),
            failures_dir: default_failures_dir(),
            documents_dir: default_documents_dir(),
        }
    }
}

fn default_queue_file() -> String {
    "data/queue.json".into()
}
fn default_cooldown_file() -> String {
    "data/cooldown.txt".into()
}
fn default_submissions_dir() -> String {
    "logs/submissions".into()
}
fn default_failures_dir() -> String {
    "logs/failures".into()
}
fn default_documents_dir() -> String {
    "pages".into()
}

/// `[drain]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrainConfig {
    /// Minimum seconds between drain runs.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Maximum records popped per run.
    #[serde(default = "default_max_per_run")]
    pub max_per_run: usize,

    /// Seconds to wait before arming the cooldown when the queue is empty.
    #[serde(default = "default_idle_wait_secs")]
    pub idle_wait_secs: u64,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
            max_per_run: default_max_per_run(),
            idle_wait_secs: default_idle_wait_secs(),
        }
    }
}

fn default_cooldown_secs() -> u64 {
    300
}
fn default_max_per_run() -> usize {
    3
}
fn default_idle_wait_secs() -> u64 {
    30
}

/// `[documents]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentsConfig {
    /// `id` attribute of the container element fragments are spliced into.
    #[serde(default = "default_marker_id")]
    pub marker_id: String,

    #[serde(default = "default_audio_document")]
    pub audio: String,

    #[serde(default = "default_gif_document")]
    pub gif: String,

    #[serde(default = "default_image_document")]
    pub image: String,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            marker_id: default_marker_id(),
            audio: default_audio_document(),
            gif: default_gif_document(),
            image: default_image_document(),
        }
    }
}

fn default_marker_id() -> String {
    "submissions".into()
}
fn default_audio_document() -> String {
    "audio.html".into()
}
fn default_gif_document() -> String {
    "gif.html".into()
}
fn default_image_document() -> String {
    "image.html".into()
}

/// `[render]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Avatar service base URL; the hashed username is appended as a path segment.
    #[serde(default = "default_avatar_base")]
    pub avatar_base: String,

    /// Avatar edge length in pixels.
    #[serde(default = "default_avatar_size")]
    pub avatar_size: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            avatar_base: default_avatar_base(),
            avatar_size: default_avatar_size(),
        }
    }
}

fn default_avatar_base() -> String {
    "https://www.gravatar.com/avatar".into()
}
fn default_avatar_size() -> u32 {
    64
}

// ---------------------------------------------------------------------------
// Resolved runtime settings
// ---------------------------------------------------------------------------

/// Every file-system location the pipelines touch, resolved against a root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub queue_file: PathBuf,
    pub cooldown_file: PathBuf,
    pub submissions_dir: PathBuf,
    pub failures_dir: PathBuf,
    pub documents_dir: PathBuf,
    pub audio_document: PathBuf,
    pub gif_document: PathBuf,
    pub image_document: PathBuf,
}

impl Paths {
    /// Target document for a category.
    pub fn document(&self, category: Category) -> &Path {
        match category {
            Category::Audio => &self.audio_document,
            Category::Gif => &self.gif_document,
            Category::Image => &self.image_document,
        }
    }
}

/// Runtime drain configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct DrainSettings {
    pub cooldown: Duration,
    pub max_per_run: usize,
    pub idle_wait: Duration,
    /// Marker element id in every target document.
    pub marker_id: String,
}

impl From<&AppConfig> for DrainSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            cooldown: Duration::from_secs(config.drain.cooldown_secs),
            max_per_run: config.drain.max_per_run,
            idle_wait: Duration::from_secs(config.drain.idle_wait_secs),
            marker_id: config.documents.marker_id.clone(),
        }
    }
}

impl AppConfig {
    /// Resolve configured locations against `root`. Absolute entries stay as-is.
    pub fn paths(&self, root: &Path) -> Paths {
        let documents_dir = root.join(&self.paths.documents_dir);
        Paths {
            queue_file: root.join(&self.paths.queue_file),
            cooldown_file: root.join(&self.paths.cooldown_file),
            submissions_dir: root.join(&self.paths.submissions_dir),
            failures_dir: root.join(&self.paths.failures_dir),
            audio_document: documents_dir.join(&self.documents.audio),
            gif_document: documents_dir.join(&self.documents.gif),
            image_document: documents_dir.join(&self.documents.image),
            documents_dir,
        }
    }

    /// Reject values the pipelines cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.drain.max_per_run == 0 {
            return Err(MediaQueueError::config("drain.max_per_run must be at least 1"));
        }

        let marker = &self.documents.marker_id;
        let marker_ok = !marker.is_empty()
            && marker
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !marker_ok {
            return Err(MediaQueueError::config(format!(
                "documents.marker_id '{marker}' must be non-empty and contain only \
                 ASCII letters, digits, '-' or '_'"
            )));
        }

        if !self.render.avatar_base.starts_with("https://")
            && !self.render.avatar_base.starts_with("http://")
        {
            return Err(MediaQueueError::config(format!(
                "render.avatar_base '{}' must be an http(s) URL",
                self.render.avatar_base
            )));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the user config directory (`~/.mediaqueue/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| MediaQueueError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the user config file (`~/.mediaqueue/mediaqueue.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Find the config file to use: `<root>/mediaqueue.toml`, then the user config.
pub fn locate_config(root: &Path) -> Option<PathBuf> {
    let local = root.join(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }

    config_file_path().ok().filter(|p| p.exists())
}

/// Load the application config. An explicit path must exist; otherwise the
/// located file is used, or defaults if there is none.
pub fn load_config(explicit: Option<&Path>, root: &Path) -> Result<AppConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match locate_config(root) {
            Some(path) => path,
            None => {
                tracing::debug!(root = %root.display(), "config file not found, using defaults");
                return Ok(AppConfig::default());
            }
        },
    };

    load_config_from(&path)
}

/// Load and validate the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| MediaQueueError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        MediaQueueError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;

    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Write a default config file at `path`, creating parent directories.
pub fn init_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| MediaQueueError::io(parent, e))?;
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| MediaQueueError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| MediaQueueError::io(path, e))?;
    tracing::info!(path = %path.display(), "created default config file");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mq-config-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn default_config_serializes() {
        let toml_str = toml::to_string_pretty(&AppConfig::default()).expect("serialize");
        assert!(toml_str.contains("queue_file"));
        assert!(toml_str.contains("marker_id"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[drain]
max_per_run = 5

[documents]
gif = "animated.html"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.drain.max_per_run, 5);
        assert_eq!(config.drain.cooldown_secs, 300);
        assert_eq!(config.documents.gif, "animated.html");
        assert_eq!(config.documents.marker_id, "submissions");
    }

    #[test]
    fn paths_resolve_against_root() {
        let config = AppConfig::default();
        let paths = config.paths(Path::new("/srv/site"));
        assert_eq!(paths.queue_file, PathBuf::from("/srv/site/data/queue.json"));
        assert_eq!(
            paths.document(Category::Gif),
            Path::new("/srv/site/pages/gif.html")
        );
        assert_eq!(
            paths.failures_dir,
            PathBuf::from("/srv/site/logs/failures")
        );
    }

    #[test]
    fn drain_settings_from_app_config() {
        let settings = DrainSettings::from(&AppConfig::default());
        assert_eq!(settings.cooldown, Duration::from_secs(300));
        assert_eq!(settings.max_per_run, 3);
        assert_eq!(settings.idle_wait, Duration::from_secs(30));
        assert_eq!(settings.marker_id, "submissions");
    }

    #[test]
    fn validate_rejects_zero_batch() {
        let mut config = AppConfig::default();
        config.drain.max_per_run = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_per_run"));
    }

    #[test]
    fn validate_rejects_unsafe_marker() {
        let mut config = AppConfig::default();
        config.documents.marker_id = "feed\" onload=\"x".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn init_then_load_roundtrip() {
        let tmp = temp_dir();
        let path = tmp.join("nested").join(CONFIG_FILE_NAME);

        init_config(&path).unwrap();
        let loaded = load_config(Some(&path), &tmp).unwrap();
        assert_eq!(loaded.drain.idle_wait_secs, 30);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn local_config_is_preferred() {
        let tmp = temp_dir();
        std::fs::write(tmp.join(CONFIG_FILE_NAME), "[drain]\ncooldown_secs = 60\n").unwrap();

        let loaded = load_config(None, &tmp).unwrap();
        assert_eq!(loaded.drain.cooldown_secs, 60);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let tmp = temp_dir();
        let result = load_config(Some(&tmp.join("absent.toml")), &tmp);
        assert!(result.is_err());

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
