//! Free-text submission grammar.
//!
//! The body is read line by line, ignoring blank lines:
//! - Line 1: `(Display Name) [date]`
//! - Line 2: a media URL ending in `jpg|jpeg|png|webp|gif|mp3` (optionally
//!   followed by a query/fragment), bare or as `![alt](url)`
//! - Line 3 onwards (optional): description

use std::sync::LazyLock;

use regex::Regex;

use crate::RejectReason;

/// Fields extracted from a body that matched the grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedBody {
    pub display_name: String,
    pub claimed_date: String,
    pub file_url: String,
    pub description: String,
}

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Absolute http(s) URL whose path ends in a supported media extension.
/// Path characters exclude `?` and `#` so the extension is always the path's.
const MEDIA_URL: &str =
    r#"https?://[^\s()<>"'?#]+?\.(?:jpe?g|png|webp|gif|mp3)(?:[?#][^\s()<>"']*)?"#;

/// Matches `(name) [date]`.
static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(([^()]+)\)\s*\[([^\[\]]+)\]$").expect("header regex"));

/// Matches a bare media URL.
static BARE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^({MEDIA_URL})$")).expect("bare URL regex")
});

/// Matches `![alt](url)` wrapping a media URL.
static MARKDOWN_IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^!\[[^\]]*\]\(\s*({MEDIA_URL})\s*\)$")).expect("markdown image regex")
});

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse a submission body. Fails on the first line that breaks the grammar.
pub(crate) fn parse_body(body: &str) -> Result<ParsedBody, RejectReason> {
    let lines: Vec<&str> = body
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if lines.len() < 2 {
        return Err(RejectReason::TooFewLines { found: lines.len() });
    }

    let (display_name, claimed_date) = parse_header(lines[0])?;
    let file_url = parse_media_url(lines[1])?;
    let description = lines[2..].join("\n");

    Ok(ParsedBody {
        display_name,
        claimed_date,
        file_url,
        description,
    })
}

fn parse_header(line: &str) -> Result<(String, String), RejectReason> {
    let caps = HEADER_RE
        .captures(line)
        .ok_or(RejectReason::MalformedHeader)?;

    let name = caps[1].trim();
    let date = caps[2].trim();
    if name.is_empty() || date.is_empty() {
        return Err(RejectReason::MalformedHeader);
    }

    Ok((name.to_string(), date.to_string()))
}

fn parse_media_url(line: &str) -> Result<String, RejectReason> {
    BARE_URL_RE
        .captures(line)
        .or_else(|| MARKDOWN_IMAGE_RE.captures(line))
        .map(|caps| caps[1].to_string())
        .ok_or(RejectReason::MalformedMediaUrl)
}
