//! HTML fragment rendering and document splicing.
//!
//! Output is a small fixed fragment shape, so it is built with plain string
//! formatting. Every interpolated value goes through [`escape_html`].

mod splice;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;

use mediaqueue_shared::{Category, MediaQueueError, RenderConfig, Result, SubmissionRecord};

pub use splice::Marker;

// ---------------------------------------------------------------------------
// Escaping
// ---------------------------------------------------------------------------

/// Escape text for use in HTML element content and quoted attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Fragment renderer
// ---------------------------------------------------------------------------

/// Renders one submission into a self-contained `<article>` fragment.
#[derive(Debug, Clone)]
pub struct FragmentRenderer {
    avatar_base: String,
    avatar_size: u32,
}

impl FragmentRenderer {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            avatar_base: config.avatar_base.trim_end_matches('/').to_string(),
            avatar_size: config.avatar_size,
        }
    }

    /// Deterministic avatar URL: SHA-256 of the trimmed, lowercased username.
    pub fn avatar_url(&self, username: &str) -> String {
        let digest = Sha256::digest(username.trim().to_lowercase().as_bytes());
        format!(
            "{}/{:x}?d=identicon&s={}",
            self.avatar_base, digest, self.avatar_size
        )
    }

    /// Render `record` for `category`'s document.
    ///
    /// Only `http`/`https` media URLs are emitted; anything else is a
    /// [`MediaQueueError::Render`] error.
    pub fn render(&self, record: &SubmissionRecord, category: Category) -> Result<String> {
        let media_url = checked_media_url(&record.file_url)?;
        let media_url = escape_html(media_url.as_str());
        let name = escape_html(&record.display_name);

        let media = if category.is_audio() {
            format!(r#"<audio class="media" controls preload="none" src="{media_url}"></audio>"#)
        } else {
            format!(r#"<img class="media" src="{media_url}" alt="{name}" loading="lazy">"#)
        };

        let claimed = record
            .claimed_date
            .as_deref()
            .map(|d| format!("\n    <span class=\"claimed-date\">{}</span>", escape_html(d)))
            .unwrap_or_default();

        let description = if record.description.is_empty() {
            String::new()
        } else {
            format!(
                "\n  <p class=\"description\">{}</p>",
                escape_html(&record.description)
            )
        };

        let fragment = format!(
            r#"<article class="submission submission-{category}">
  <header>
    <img class="avatar" src="{avatar}" alt="" width="{size}" height="{size}">
    <span class="display-name">{name}</span>
    <time datetime="{datetime}">{human}</time>{claimed}
  </header>
  {media}{description}
</article>"#,
            avatar = escape_html(&self.avatar_url(&record.username)),
            size = self.avatar_size,
            datetime = record.submitted_at.to_rfc3339(),
            human = human_timestamp(record.submitted_at),
        );

        debug!(username = %record.username, %category, len = fragment.len(), "fragment rendered");
        Ok(fragment)
    }
}

fn checked_media_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| MediaQueueError::Render(format!("invalid media URL '{raw}': {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(MediaQueueError::Render(format!(
            "unsupported media URL scheme '{other}'"
        ))),
    }
}

/// `Jan 1, 2024 12:00 UTC`
pub fn human_timestamp(at: DateTime<Utc>) -> String {
    at.format("%b %-d, %Y %H:%M UTC").to_string()
}

// ---------------------------------------------------------------------------
// Document bootstrap
// ---------------------------------------------------------------------------

/// Minimal page for a category, containing an empty marker element.
pub fn placeholder_document(category: Category, marker_id: &str) -> String {
    let title = match category {
        Category::Audio => "Audio",
        Category::Gif => "GIFs",
        Category::Image => "Images",
    };
    let marker_id = escape_html(marker_id);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{title}</title>
</head>
<body>
  <h1>{title}</h1>
  <div id="{marker_id}">
  </div>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use scraper::{Html, Selector};

    fn renderer() -> FragmentRenderer {
        FragmentRenderer::new(&RenderConfig::default())
    }

    fn record(url: &str, description: &str) -> SubmissionRecord {
        SubmissionRecord {
            username: "alice".into(),
            display_name: "Alice".into(),
            file_url: url.into(),
            description: description.into(),
            submitted_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            claimed_date: Some("2024-01-01".into()),
        }
    }

    fn select<'a>(doc: &'a Html, css: &str) -> Vec<scraper::ElementRef<'a>> {
        let sel = Selector::parse(css).unwrap();
        doc.select(&sel).collect()
    }

    #[test]
    fn escape_covers_markup_and_quotes() {
        assert_eq!(
            escape_html(r#"<b onclick="x">'&'</b>"#),
            "&lt;b onclick=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/b&gt;"
        );
        assert_eq!(escape_html("plain text"), "plain text");
    }

    #[test]
    fn avatar_is_deterministic() {
        let r = renderer();
        assert_eq!(r.avatar_url("Alice"), r.avatar_url(" alice "));
        assert_ne!(r.avatar_url("alice"), r.avatar_url("bob"));
        assert!(r.avatar_url("alice").starts_with("https://www.gravatar.com/avatar/"));
        assert!(r.avatar_url("alice").ends_with("?d=identicon&s=64"));
    }

    #[test]
    fn image_fragment_structure() {
        let html = renderer()
            .render(&record("https://example.com/cat.gif", "funny cat"), Category::Gif)
            .unwrap();
        let doc = Html::parse_fragment(&html);

        assert_eq!(select(&doc, "article.submission-gif").len(), 1);
        assert_eq!(select(&doc, "img.avatar").len(), 1);
        let media = select(&doc, "img.media");
        assert_eq!(media.len(), 1);
        assert_eq!(media[0].value().attr("src"), Some("https://example.com/cat.gif"));
        assert!(select(&doc, "audio").is_empty());

        let name: String = select(&doc, ".display-name")[0].text().collect();
        assert_eq!(name, "Alice");
        let time = select(&doc, "time");
        assert_eq!(time[0].text().collect::<String>(), "Jan 1, 2024 12:00 UTC");
        let desc: String = select(&doc, "p.description")[0].text().collect();
        assert_eq!(desc, "funny cat");
    }

    #[test]
    fn audio_fragment_uses_player() {
        let html = renderer()
            .render(&record("https://example.com/song.mp3", ""), Category::Audio)
            .unwrap();
        let doc = Html::parse_fragment(&html);

        let audio = select(&doc, "audio.media");
        assert_eq!(audio.len(), 1);
        assert!(audio[0].value().attr("controls").is_some());
        assert!(select(&doc, "img.media").is_empty());
        assert!(select(&doc, "p.description").is_empty());
    }

    #[test]
    fn untrusted_text_cannot_inject_markup() {
        let mut rec = record(
            "https://example.com/a.png?x=\"><script>",
            "<script>alert(1)</script>",
        );
        rec.display_name = "\" onerror=\"alert(1)".into();

        let html = renderer().render(&rec, Category::Image).unwrap();
        let doc = Html::parse_fragment(&html);

        assert!(select(&doc, "script").is_empty());
        assert!(select(&doc, "img.media")[0].value().attr("onerror").is_none());
        let desc: String = select(&doc, "p.description")[0].text().collect();
        assert_eq!(desc, "<script>alert(1)</script>");
    }

    #[test]
    fn non_http_urls_are_refused() {
        let err = renderer()
            .render(&record("javascript:alert(1)//x.png", ""), Category::Image)
            .unwrap_err();
        assert!(err.to_string().contains("javascript"));

        assert!(renderer().render(&record("not a url.png", ""), Category::Image).is_err());
    }

    #[test]
    fn placeholder_contains_exactly_one_marker() {
        let doc = placeholder_document(Category::Gif, "submissions");
        let marker = Marker::new("submissions").unwrap();
        assert_eq!(marker.count(&doc), 1);
        assert!(doc.contains("<title>GIFs</title>"));

        let spliced = marker.splice(&doc, "<p>first</p>").unwrap();
        let parsed = Html::parse_document(&spliced);
        assert_eq!(select(&parsed, "#submissions > p").len(), 1);
    }
}
