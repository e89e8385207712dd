//! Submission validation.
//!
//! Turns raw caller input into a [`SubmissionRecord`] or a [`RejectReason`].
//! Two channels are accepted:
//! - a free-text body following the line grammar in [`parser`]
//! - explicit fields, which bypass the grammar entirely
//!
//! This crate is pure: persisting accepted records and rejections is the
//! caller's job (see `mediaqueue-core`).

mod parser;

use chrono::{DateTime, Utc};
use tracing::debug;

use mediaqueue_shared::SubmissionRecord;

/// Raw input to the intake pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeInput {
    /// Free-text body to be parsed with the line grammar.
    Body(String),
    /// Caller-supplied fields, accepted without grammar parsing.
    Fields(ExplicitFields),
}

/// The looser, field-based intake channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplicitFields {
    pub file_url: String,
    /// Falls back to the username when absent or blank.
    pub display_name: Option<String>,
    pub description: Option<String>,
}

/// Why an input was rejected. Rejection is an expected outcome, not a fault.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("username is empty")]
    EmptyUsername,

    #[error("expected at least 2 non-empty lines, found {found}")]
    TooFewLines { found: usize },

    #[error("line 1 must be \"(display name) [date]\"")]
    MalformedHeader,

    #[error("line 2 must be a URL ending in jpg, jpeg, png, webp, gif or mp3")]
    MalformedMediaUrl,

    #[error("file_url is empty")]
    EmptyFileUrl,
}

impl IntakeInput {
    /// The input as it should appear in the failure ledger.
    pub fn raw_text(&self) -> String {
        match self {
            Self::Body(body) => body.clone(),
            Self::Fields(fields) => {
                let mut raw = format!("file_url: {}", fields.file_url);
                if let Some(name) = &fields.display_name {
                    raw.push_str(&format!("\nname: {name}"));
                }
                if let Some(description) = &fields.description {
                    raw.push_str(&format!("\ndescription: {description}"));
                }
                raw
            }
        }
    }
}

/// Validate one input and build the record it describes.
pub fn validate(
    username: &str,
    input: &IntakeInput,
    submitted_at: DateTime<Utc>,
) -> Result<SubmissionRecord, RejectReason> {
    let username = username.trim();
    if username.is_empty() {
        return Err(RejectReason::EmptyUsername);
    }

    let record = match input {
        IntakeInput::Body(body) => {
            let parsed = parser::parse_body(body)?;
            SubmissionRecord {
                username: username.to_string(),
                display_name: parsed.display_name,
                file_url: parsed.file_url,
                description: parsed.description,
                submitted_at,
                claimed_date: Some(parsed.claimed_date),
            }
        }
        IntakeInput::Fields(fields) => from_fields(username, fields, submitted_at)?,
    };

    debug!(username, file_url = %record.file_url, "submission validated");
    Ok(record)
}

fn from_fields(
    username: &str,
    fields: &ExplicitFields,
    submitted_at: DateTime<Utc>,
) -> Result<SubmissionRecord, RejectReason> {
    let file_url = fields.file_url.trim();
    if file_url.is_empty() {
        return Err(RejectReason::EmptyFileUrl);
    }

    let display_name = fields
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(username);

    Ok(SubmissionRecord {
        username: username.to_string(),
        display_name: display_name.to_string(),
        file_url: file_url.to_string(),
        description: fields
            .description
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string(),
        submitted_at,
        claimed_date: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediaqueue_shared::Category;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn body_produces_routable_record() {
        let input = IntakeInput::Body(
            "(alice) [2024-01-01]\nhttps://example.com/cat.gif\nfunny cat".into(),
        );
        let record = validate("alice", &input, now()).unwrap();

        assert_eq!(record.username, "alice");
        assert_eq!(record.display_name, "alice");
        assert_eq!(record.file_url, "https://example.com/cat.gif");
        assert_eq!(record.description, "funny cat");
        assert_eq!(record.claimed_date.as_deref(), Some("2024-01-01"));
        assert_eq!(record.submitted_at, now());
        assert_eq!(record.category(), Some(Category::Gif));
    }

    #[test]
    fn body_missing_parentheses_rejected() {
        let input = IntakeInput::Body("alice [2024-01-01]\nhttps://example.com/cat.gif".into());
        assert_eq!(
            validate("alice", &input, now()),
            Err(RejectReason::MalformedHeader)
        );
    }

    #[test]
    fn fields_bypass_grammar() {
        let input = IntakeInput::Fields(ExplicitFields {
            file_url: " https://example.com/painting.bmp ".into(),
            display_name: None,
            description: Some("oil on canvas".into()),
        });
        let record = validate("bob", &input, now()).unwrap();

        assert_eq!(record.display_name, "bob");
        assert_eq!(record.file_url, "https://example.com/painting.bmp");
        assert_eq!(record.description, "oil on canvas");
        assert_eq!(record.claimed_date, None);
        assert_eq!(record.category(), None);
    }

    #[test]
    fn fields_use_supplied_display_name() {
        let input = IntakeInput::Fields(ExplicitFields {
            file_url: "https://example.com/a.mp3".into(),
            display_name: Some("DJ Bob".into()),
            description: None,
        });
        let record = validate("bob", &input, now()).unwrap();
        assert_eq!(record.display_name, "DJ Bob");
        assert_eq!(record.description, "");
    }

    #[test]
    fn fields_require_file_url() {
        let input = IntakeInput::Fields(ExplicitFields::default());
        assert_eq!(validate("bob", &input, now()), Err(RejectReason::EmptyFileUrl));
    }

    #[test]
    fn blank_username_rejected() {
        let input = IntakeInput::Body("(a) [b]\nhttps://example.com/a.png".into());
        assert_eq!(validate("  ", &input, now()), Err(RejectReason::EmptyUsername));
    }

    #[test]
    fn raw_text_of_fields() {
        let input = IntakeInput::Fields(ExplicitFields {
            file_url: "u".into(),
            display_name: Some("n".into()),
            description: None,
        });
        assert_eq!(input.raw_text(), "file_url: u\nname: n");
    }
}
