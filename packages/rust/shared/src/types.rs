//! Core domain types for mediaqueue submissions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

// ---------------------------------------------------------------------------
// SubmissionRecord
// ---------------------------------------------------------------------------

/// A validated media submission, as stored in the queue and the audit ledger.
///
/// Records are immutable once created. Duplicates are allowed; nothing keys
/// on the record contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    /// Submitter account name, trusted as supplied by the caller.
    pub username: String,
    /// Name shown next to the media.
    #[serde(rename = "name")]
    pub display_name: String,
    /// Media URL; its path carries the file extension used for routing.
    pub file_url: String,
    /// Free-text description (may be empty).
    #[serde(default)]
    pub description: String,
    /// When the submission was accepted.
    #[serde(rename = "date")]
    pub submitted_at: DateTime<Utc>,
    /// The bracketed date the submitter wrote on the header line, verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_date: Option<String>,
}

impl SubmissionRecord {
    /// Lowercased file extension of [`Self::file_url`], if any.
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.file_url)
    }

    /// Target category for this record, or `None` if the extension is unmapped.
    pub fn category(&self) -> Option<Category> {
        self.extension().as_deref().and_then(Category::from_extension)
    }
}

// ---------------------------------------------------------------------------
// FailureEntry
// ---------------------------------------------------------------------------

/// A rejected submission, written to the failure ledger for manual review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureEntry {
    pub username: String,
    /// The offending input exactly as received.
    pub raw: String,
    /// Human-readable rejection reason.
    pub reason: String,
    pub date: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Media category; each one owns a single target document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Audio,
    Gif,
    Image,
}

impl Category {
    /// Every category, in document bootstrap order.
    pub const ALL: [Category; 3] = [Category::Audio, Category::Gif, Category::Image];

    /// Fixed extension → category mapping. Input must already be lowercased.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "mp3" => Some(Self::Audio),
            "gif" => Some(Self::Gif),
            "jpg" | "jpeg" | "png" | "webp" => Some(Self::Image),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Gif => "gif",
            Self::Image => "image",
        }
    }

    /// Whether fragments of this category embed an audio player.
    pub fn is_audio(&self) -> bool {
        matches!(self, Self::Audio)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derive the lowercased file extension from a URL's path.
///
/// The query string and fragment are ignored. Inputs that do not parse as
/// absolute URLs are treated as bare paths.
pub fn extension_of(url: &str) -> Option<String> {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };

    let file_name = path.rsplit('/').next()?;
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
