//! Inline citation rewriting.
//!
//! The agent marks citations in its answer text as
//! `U+E200 "cite" U+E202 <id> U+E201`. [`clean_citations`] replaces each marker
//! with a sequential reference number and [`format_references_html`] renders the
//! matching footer.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::OnceLock;

/// Opens a citation marker.
pub const CITATION_OPEN: char = '\u{e200}';
/// Closes a citation marker.
pub const CITATION_CLOSE: char = '\u{e201}';
/// Separates the marker tag from the citation id.
pub const CITATION_SEPARATOR: char = '\u{e202}';

fn citation_marker_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"\x{E200}cite\x{E202}(.+?)\x{E201}").expect("citation regex must compile")
    })
}

/// Link metadata known for a citation id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationRecord {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
}

impl CitationRecord {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
        }
    }

    /// Copies fields from `other` into fields that are still empty.
    ///
    /// Present values are never overwritten, so filling twice from the same
    /// record is a no-op.
    pub fn fill_from(&mut self, other: &CitationRecord) {
        if self.url.is_empty() {
            self.url.clone_from(&other.url);
        }
        if self.title.is_empty() {
            self.title.clone_from(&other.title);
        }
    }
}

/// Citation id -> link metadata.
pub type CitationMetadata = BTreeMap<String, CitationRecord>;

/// A citation as numbered in cleaned text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub id: String,
    pub num: usize,
    pub url: String,
    pub title: String,
}

/// Reference number -> citation, iterated in ascending number order.
pub type CitationsByNum = BTreeMap<usize, Citation>;

/// Rewrites citation markers in `text` into `[n]` references.
///
/// Numbers start at 1 and follow the first appearance of each distinct id;
/// repeated ids reuse their number. Link metadata is seeded from `metadata`;
/// ids without an entry get an empty url and a `Source {n}` title.
///
/// With `use_html` set, references whose url is known become superscript
/// links. Otherwise the output never contains HTML.
pub fn clean_citations(
    text: &str,
    use_html: bool,
    metadata: &CitationMetadata,
) -> (String, CitationsByNum) {
    if text.is_empty() {
        return (String::new(), CitationsByNum::new());
    }

    let mut registry: BTreeMap<String, Citation> = BTreeMap::new();
    let mut next_num = 0;

    let cleaned = citation_marker_regex().replace_all(text, |caps: &Captures| {
        let id = &caps[1];
        let citation = match registry.entry(id.to_owned()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                next_num += 1;
                let known = metadata.get(id);
                let url = known.map(|record| record.url.clone()).unwrap_or_default();
                let title = known
                    .map(|record| record.title.clone())
                    .filter(|title| !title.is_empty())
                    .unwrap_or_else(|| format!("Source {next_num}"));
                entry.insert(Citation {
                    id: id.to_owned(),
                    num: next_num,
                    url,
                    title,
                })
            }
        };

        if use_html && !citation.url.is_empty() {
            format!(
                r#"<a href="{}" target="_blank" style="text-decoration:none;color:#0066cc;"><sup>[{}]</sup></a>"#,
                escape_html(&citation.url),
                citation.num
            )
        } else {
            format!("[{}]", citation.num)
        }
    });

    let by_num = registry
        .into_values()
        .map(|citation| (citation.num, citation))
        .collect();

    (cleaned.into_owned(), by_num)
}

/// Renders the references footer for citations produced by [`clean_citations`].
///
/// Returns an empty string when there is nothing to list.
pub fn format_references_html(citations: &CitationsByNum) -> String {
    if citations.is_empty() {
        return String::new();
    }

    let mut html = String::from(
        r#"<div style="margin-top:1rem;padding-top:0.5rem;border-top:1px solid #ddd;font-size:0.9em;">"#,
    );
    html.push_str("<strong>References:</strong><br>");
    for (num, citation) in citations {
        let title = escape_html(&citation.title);
        if citation.url.is_empty() {
            html.push_str(&format!("<span>[{num}] {title}</span><br>"));
        } else {
            html.push_str(&format!(
                r#"<a href="{}" target="_blank" style="color:#0066cc;">[{num}] {title}</a><br>"#,
                escape_html(&citation.url)
            ));
        }
    }
    html.push_str("</div>");
    html
}

/// Plain-text references footer, one `[n] title <url>` line per citation.
pub fn format_references_text(citations: &CitationsByNum) -> String {
    if citations.is_empty() {
        return String::new();
    }

    let mut text = String::from("References:\n");
    for (num, citation) in citations {
        if citation.url.is_empty() {
            text.push_str(&format!("[{num}] {}\n", citation.title));
        } else {
            text.push_str(&format!("[{num}] {} <{}>\n", citation.title, citation.url));
        }
    }
    text
}

fn escape_html(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['&', '<', '>', '"']) {
        return Cow::Borrowed(raw);
    }
    let mut escaped = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    Cow::Owned(escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(id: &str) -> String {
        format!("{CITATION_OPEN}cite{CITATION_SEPARATOR}{id}{CITATION_CLOSE}")
    }

    #[test]
    fn text_without_markers_is_unchanged() {
        let metadata = CitationMetadata::new();
        for text in ["", "plain answer", "brackets [1] stay", "lone \u{e200} open"] {
            let (cleaned, citations) = clean_citations(text, true, &metadata);
            assert_eq!(cleaned, text);
            assert!(citations.is_empty());
        }
    }

    #[test]
    fn numbers_follow_first_appearance() {
        let text = format!("a{}b{}c{}d", marker("x"), marker("y"), marker("x"));
        let (cleaned, citations) = clean_citations(&text, false, &CitationMetadata::new());

        assert_eq!(cleaned, "a[1]b[2]c[1]d");
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[&1].id, "x");
        assert_eq!(citations[&2].id, "y");
        assert_eq!(citations[&2].title, "Source 2");
    }

    #[test]
    fn plain_mode_never_emits_html() {
        let mut metadata = CitationMetadata::new();
        metadata.insert("x".to_string(), CitationRecord::new("https://x", "X"));
        let (cleaned, citations) = clean_citations(&marker("x"), false, &metadata);

        assert_eq!(cleaned, "[1]");
        assert_eq!(citations[&1].url, "https://x");
    }

    #[test]
    fn html_mode_links_only_known_urls() {
        let mut metadata = CitationMetadata::new();
        metadata.insert("x".to_string(), CitationRecord::new("https://x", "X"));
        let text = format!("{}{}", marker("x"), marker("unknown"));
        let (cleaned, citations) = clean_citations(&text, true, &metadata);

        assert!(cleaned.starts_with(r#"<a href="https://x" target="_blank""#));
        assert!(cleaned.contains("<sup>[1]</sup>"));
        assert!(cleaned.ends_with("</a>[2]"));
        assert_eq!(citations[&2].url, "");
        assert_eq!(citations[&2].title, "Source 2");
    }

    #[test]
    fn empty_metadata_title_falls_back_to_placeholder() {
        let mut metadata = CitationMetadata::new();
        metadata.insert("x".to_string(), CitationRecord::new("https://x", ""));
        let (_, citations) = clean_citations(&marker("x"), true, &metadata);
        assert_eq!(citations[&1].title, "Source 1");
    }

    #[test]
    fn references_footer_is_sorted_and_escaped() {
        let mut citations = CitationsByNum::new();
        citations.insert(
            2,
            Citation {
                id: "b".into(),
                num: 2,
                url: String::new(),
                title: "B & co".into(),
            },
        );
        citations.insert(
            1,
            Citation {
                id: "a".into(),
                num: 1,
                url: "https://a?x=1&y=2".into(),
                title: "<A>".into(),
            },
        );

        let html = format_references_html(&citations);
        let first = html.find("[1] &lt;A&gt;").unwrap();
        let second = html.find("<span>[2] B &amp; co</span>").unwrap();
        assert!(first < second);
        assert!(html.contains(r#"href="https://a?x=1&amp;y=2""#));
        assert!(html.contains("<strong>References:</strong>"));
    }

    #[test]
    fn empty_footers_are_empty() {
        assert_eq!(format_references_html(&CitationsByNum::new()), "");
        assert_eq!(format_references_text(&CitationsByNum::new()), "");
    }

    #[test]
    fn fill_from_keeps_present_values() {
        let mut record = CitationRecord::new("https://kept", "");
        record.fill_from(&CitationRecord::new("https://other", "Title"));
        assert_eq!(record, CitationRecord::new("https://kept", "Title"));

        let snapshot = record.clone();
        record.fill_from(&CitationRecord::new("https://other", "Other"));
        assert_eq!(record, snapshot);
    }
}
