//! Raw-text insertion at a marker element.
//!
//! Documents are never parsed into a DOM: the marker's opening tag is located
//! with a regex and the fragment is spliced in right after it, so every other
//! byte of the document is preserved. Text inside `<!-- -->` comments is never
//! considered, and quoted attribute values may contain `>`.

use std::ops::Range;

use regex::Regex;

use mediaqueue_shared::{MediaQueueError, Result};

/// One attribute, with an optional double-quoted, single-quoted or bare value.
const ATTRIBUTE: &str = r#"[^\s>"'=/]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>"']+))?"#;

/// Anything up to the closing `>`, skipping over quoted values.
const TAG_TAIL: &str = r#"[^>"']|"[^"]*"|'[^']*'"#;

const COMMENT_OPEN: &str = "<!--";
const COMMENT_CLOSE: &str = "-->";

/// The container element new fragments are inserted into, identified by its
/// `id` attribute.
#[derive(Debug, Clone)]
pub struct Marker {
    id: String,
    opening_tag: Regex,
}

impl Marker {
    /// Build a marker for `id`. The id is matched literally.
    pub fn new(id: &str) -> Result<Self> {
        if id.is_empty() {
            return Err(MediaQueueError::validation("marker id is empty"));
        }

        let id_re = regex::escape(id);
        let pattern = format!(
            r#"(?i)<[a-z][a-z0-9-]*(?:\s+{ATTRIBUTE})*?\s+id\s*=\s*(?:"{id_re}"|'{id_re}')(?:{TAG_TAIL})*>"#
        );
        let opening_tag = Regex::new(&pattern)
            .map_err(|e| MediaQueueError::validation(format!("marker pattern for '{id}': {e}")))?;

        Ok(Self {
            id: id.to_string(),
            opening_tag,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Byte range of the first marker opening tag in `document`.
    pub fn locate(&self, document: &str) -> Option<Range<usize>> {
        self.matches(document).next()
    }

    /// Number of marker opening tags in `document`.
    pub fn count(&self, document: &str) -> usize {
        self.matches(document).count()
    }

    /// Opening tags outside comments, in document order.
    fn matches<'a>(&'a self, document: &'a str) -> impl Iterator<Item = Range<usize>> + 'a {
        uncommented_spans(document).into_iter().flat_map(move |span| {
            let base = span.start;
            self.opening_tag
                .find_iter(&document[span])
                .map(move |m| base + m.start()..base + m.end())
        })
    }

    /// Insert `fragment` as the first child of the marker element.
    ///
    /// Earlier insertions are pushed down, so the newest fragment is always
    /// on top. Fails with [`MediaQueueError::MarkerNotFound`] when the
    /// document has no marker.
    pub fn splice(&self, document: &str, fragment: &str) -> Result<String> {
        let tag = self
            .locate(document)
            .ok_or_else(|| MediaQueueError::marker_not_found(&self.id))?;

        let mut out = String::with_capacity(document.len() + fragment.len() + 1);
        out.push_str(&document[..tag.end]);
        out.push('\n');
        out.push_str(fragment);
        out.push_str(&document[tag.end..]);
        Ok(out)
    }
}

/// Byte ranges of `document` that lie outside `<!-- -->` comments. An
/// unterminated comment runs to the end of the document.
fn uncommented_spans(document: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut pos = 0;

    while let Some(offset) = document[pos..].find(COMMENT_OPEN) {
        let open = pos + offset;
        spans.push(pos..open);

        let body = open + COMMENT_OPEN.len();
        match document[body..].find(COMMENT_CLOSE) {
            Some(close) => pos = body + close + COMMENT_CLOSE.len(),
            None => return spans,
        }
    }

    spans.push(pos..document.len());
    spans
}
