//! Split a transcript into markdown chunks and annotation markers.
//!
//! Markers are HTML comments of the form `<!-- annotate -->`, optionally
//! carrying JSON metadata: `<!-- annotate {"role": "assistant"} -->`.
//! Authors pin heading ids by placing `<a id="..."></a>` on the line(s) before
//! a heading.

use super::slug::{plain_text, slugify};
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub const MARKER_TAG: &str = "annotate";

/// The only role that gets an annotation form.
pub const ASSISTANT_ROLE: &str = "assistant";

/// Heading slug → explicit anchor id.
pub type AnchorMap = BTreeMap<String, String>;

static ANCHOR_LINE_RE: OnceLock<Regex> = OnceLock::new();
static ANCHOR_TAG_RE: OnceLock<Regex> = OnceLock::new();
static HEADING_LINE_RE: OnceLock<Regex> = OnceLock::new();
static MARKER_RE: OnceLock<Regex> = OnceLock::new();
static SETEXT_UNDERLINE_RE: OnceLock<Regex> = OnceLock::new();

fn anchor_line_re() -> &'static Regex {
    ANCHOR_LINE_RE.get_or_init(|| {
        Regex::new(r#"^\s*<a\s+(?:id|name)\s*=\s*["']([^"']+)["']\s*>\s*</a>\s*$"#).unwrap()
    })
}

fn anchor_tag_re() -> &'static Regex {
    ANCHOR_TAG_RE.get_or_init(|| {
        Regex::new(r#"<a\s+(?:id|name)\s*=\s*["'][^"']*["']\s*>\s*</a>"#).unwrap()
    })
}

fn heading_line_re() -> &'static Regex {
    HEADING_LINE_RE.get_or_init(|| Regex::new(r"^ {0,3}#{1,6}\s+(.*?)(?:\s+#+)?\s*$").unwrap())
}

fn setext_underline_re() -> &'static Regex {
    SETEXT_UNDERLINE_RE.get_or_init(|| Regex::new(r"^ {0,3}(?:=+|-+)\s*$").unwrap())
}

fn marker_re() -> &'static Regex {
    MARKER_RE.get_or_init(|| Regex::new(r"(?s)<!--\s*annotate\b(.*?)-->").unwrap())
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// An annotation placeholder found in the document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    /// 1-based ordinal among all markers, in document order.
    pub section: usize,
    pub role: Option<String>,
    /// Text of the most recent heading before the marker.
    pub heading: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

impl Marker {
    pub fn has_form(&self) -> bool {
        self.role.as_deref() == Some(ASSISTANT_ROLE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    Markdown { text: String },
    Marker(Marker),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SegmentedDocument {
    pub anchors: AnchorMap,
    pub segments: Vec<Segment>,
}

impl SegmentedDocument {
    pub fn parse(markdown: &str) -> Self {
        let anchors = collect_anchors(markdown);
        let stripped = strip_anchors(markdown);
        let segments = split_markers(&stripped);
        SegmentedDocument { anchors, segments }
    }

    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Marker(m) => Some(m),
            Segment::Markdown { .. } => None,
        })
    }

    /// Markers that render an annotation form.
    pub fn form_sections(&self) -> impl Iterator<Item = &Marker> {
        self.markers().filter(|m| m.has_form())
    }
}

// ---------------------------------------------------------------------------
// Anchors
// ---------------------------------------------------------------------------

/// Map each heading that directly follows an anchor line to that anchor's id.
///
/// Blank lines and whole comment blocks may sit between the anchor and the
/// heading. Anything else cancels the pending anchor. Later duplicates win.
/// Both ATX (`## Title`) and setext (`Title` over `===`/`---`) headings pin.
pub fn collect_anchors(markdown: &str) -> AnchorMap {
    let mut anchors = AnchorMap::new();
    let mut pending: Option<String> = None;
    let mut in_comment = false;
    let mut in_fence = false;
    let mut lines = markdown.lines().peekable();

    while let Some(line) = lines.next() {
        let trimmed = line.trim();

        if in_comment {
            if trimmed.contains("-->") {
                in_comment = false;
            }
            continue;
        }
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            pending = None;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some(caps) = anchor_line_re().captures(line) {
            pending = Some(caps[1].to_string());
            continue;
        }
        if trimmed.starts_with("<!--") {
            if !trimmed.contains("-->") {
                in_comment = true;
            }
            continue;
        }
        if trimmed.is_empty() {
            continue;
        }
        if let Some(id) = pending.take() {
            if let Some(caps) = heading_line_re().captures(line) {
                anchors.insert(slugify(&plain_text(&caps[1])), id);
            } else if lines
                .peek()
                .is_some_and(|next| setext_underline_re().is_match(next))
            {
                anchors.insert(slugify(&plain_text(trimmed)), id);
                lines.next();
            }
        }
    }

    anchors
}

/// Remove every anchor construct; their ids live in the [`AnchorMap`] now.
pub fn strip_anchors(markdown: &str) -> String {
    anchor_tag_re().replace_all(markdown, "").into_owned()
}

// ---------------------------------------------------------------------------
// Markers
// ---------------------------------------------------------------------------

fn split_markers(markdown: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut heading: Option<String> = None;
    let mut cursor = 0;
    let mut ordinal = 0;

    for caps in marker_re().captures_iter(markdown) {
        let Some(whole) = caps.get(0) else { continue };
        let chunk = &markdown[cursor..whole.start()];
        if let Some(h) = last_heading(chunk) {
            heading = Some(h);
        }
        if !chunk.trim().is_empty() {
            segments.push(Segment::Markdown {
                text: chunk.to_string(),
            });
        }

        ordinal += 1;
        let metadata = parse_metadata(caps.get(1).map(|m| m.as_str()).unwrap_or(""));
        let role = resolve_role(metadata.as_ref(), heading.as_deref());
        segments.push(Segment::Marker(Marker {
            section: ordinal,
            role,
            heading: heading.clone(),
            metadata,
        }));
        cursor = whole.end();
    }

    let tail = &markdown[cursor..];
    if ordinal == 0 || !tail.trim().is_empty() {
        segments.push(Segment::Markdown {
            text: tail.to_string(),
        });
    }
    segments
}

fn parse_metadata(raw: &str) -> Option<Map<String, Value>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("ignoring malformed marker metadata {raw:?}: {e}");
            None
        }
    }
}

/// Explicit `role` metadata wins; otherwise the first `-`-delimited token of
/// the owning heading.
pub fn resolve_role(metadata: Option<&Map<String, Value>>, heading: Option<&str>) -> Option<String> {
    let explicit = metadata
        .and_then(|m| m.get("role"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|r| !r.is_empty());
    if let Some(role) = explicit {
        return Some(role.to_lowercase());
    }
    heading
        .and_then(|h| h.split('-').next())
        .map(|token| token.trim().to_lowercase())
        .filter(|token| !token.is_empty())
}

/// Text of the last heading in `chunk`, if any.
fn last_heading(chunk: &str) -> Option<String> {
    let mut last = None;
    let mut current: Option<String> = None;
    for event in Parser::new(chunk) {
        match event {
            Event::Start(Tag::Heading { .. }) => current = Some(String::new()),
            Event::Text(t) | Event::Code(t) => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(&t);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(text) = current.take() {
                    last = Some(text.trim().to_string());
                }
            }
            _ => {}
        }
    }
    last
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_markers_is_one_chunk() {
        let doc = SegmentedDocument::parse("# Title\n\nSome text.\n\n## More\n");
        assert_eq!(doc.segments.len(), 1);
        assert_eq!(doc.markers().count(), 0);
    }

    #[test]
    fn empty_document_is_one_chunk() {
        let doc = SegmentedDocument::parse("");
        assert_eq!(doc.segments.len(), 1);
    }

    #[test]
    fn anchor_pins_heading_id() {
        let anchors = collect_anchors("<a id=\"m-2\"></a>\n## Setup\n");
        assert_eq!(anchors.get("setup").map(String::as_str), Some("m-2"));
    }

    #[test]
    fn anchor_skips_blank_lines_and_comment_blocks() {
        let md = "<a name=\"step-3\"></a>\n\n<!-- note -->\n<!--\nmulti\nline\n-->\n\n### Assistant - Step 3\n";
        let anchors = collect_anchors(md);
        assert_eq!(
            anchors.get("assistant---step-3").map(String::as_str),
            Some("step-3")
        );
    }

    #[test]
    fn anchor_cancelled_by_intervening_text() {
        let anchors = collect_anchors("<a id=\"x\"></a>\nparagraph\n## Setup\n");
        assert!(anchors.is_empty());
    }

    #[test]
    fn anchor_pins_setext_heading() {
        let anchors = collect_anchors("<a id=\"x\"></a>\nSetup\n=====\n");
        assert_eq!(anchors.get("setup").map(String::as_str), Some("x"));

        let anchors = collect_anchors("<a id=\"y\"></a>\n\nRun the *tests*\n---\n");
        assert_eq!(anchors.get("run-the-tests").map(String::as_str), Some("y"));
    }

    #[test]
    fn anchors_inside_code_fences_are_ignored() {
        let anchors = collect_anchors("```\n<a id=\"x\"></a>\n## Setup\n```\n");
        assert!(anchors.is_empty());
    }

    #[test]
    fn duplicate_slugs_last_anchor_wins() {
        let md = "<a id=\"first\"></a>\n## Setup\n\n<a id=\"second\"></a>\n## Setup\n";
        let anchors = collect_anchors(md);
        assert_eq!(anchors.get("setup").map(String::as_str), Some("second"));
    }

    #[test]
    fn anchors_are_stripped() {
        let doc = SegmentedDocument::parse("<a id=\"m-2\"></a>\n## Setup\n");
        let Segment::Markdown { text } = &doc.segments[0] else {
            panic!("expected markdown");
        };
        assert!(!text.contains("<a "));
        assert!(text.contains("## Setup"));
    }

    #[test]
    fn markers_split_and_number_sections() {
        let md = "## User - Step 1\nhi\n<!-- annotate -->\n## Assistant - Step 2\nok\n<!-- annotate -->\ntrailing\n";
        let doc = SegmentedDocument::parse(md);
        let markers: Vec<_> = doc.markers().collect();
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].section, 1);
        assert_eq!(markers[0].role.as_deref(), Some("user"));
        assert!(!markers[0].has_form());
        assert_eq!(markers[1].section, 2);
        assert_eq!(markers[1].heading.as_deref(), Some("Assistant - Step 2"));
        assert!(markers[1].has_form());
        assert_eq!(doc.form_sections().count(), 1);
        assert_eq!(doc.segments.len(), 5);
    }

    #[test]
    fn explicit_role_overrides_heading() {
        let md = "## User - Step 1\n<!-- annotate {\"role\": \"Assistant\"} -->\n";
        let doc = SegmentedDocument::parse(md);
        let marker = doc.markers().next().unwrap();
        assert_eq!(marker.role.as_deref(), Some("assistant"));
        assert_eq!(marker.metadata.as_ref().unwrap()["role"], "Assistant");
    }

    #[test]
    fn empty_role_falls_back_to_heading() {
        let md = "## Assistant - Step 1\n<!-- annotate {\"role\": \"  \"} -->\n";
        let doc = SegmentedDocument::parse(md);
        assert!(doc.markers().next().unwrap().has_form());
    }

    #[test]
    fn malformed_metadata_is_ignored() {
        let md = "## Assistant - Step 1\n<!-- annotate {role: oops -->\n";
        let doc = SegmentedDocument::parse(md);
        let marker = doc.markers().next().unwrap();
        assert!(marker.metadata.is_none());
        assert!(marker.has_form());
    }

    #[test]
    fn heading_carries_across_chunks() {
        let md = "## Assistant - Step 1\n<!-- annotate -->\nmore text\n<!-- annotate -->\n";
        let doc = SegmentedDocument::parse(md);
        let markers: Vec<_> = doc.markers().collect();
        assert_eq!(markers[1].heading.as_deref(), Some("Assistant - Step 1"));
        assert!(markers[1].has_form());
    }

    #[test]
    fn marker_without_heading_has_no_role() {
        let doc = SegmentedDocument::parse("text\n<!-- annotate -->\n");
        let marker = doc.markers().next().unwrap();
        assert_eq!(marker.role, None);
        assert!(!marker.has_form());
    }

    #[test]
    fn ordinary_comments_are_not_markers() {
        let doc = SegmentedDocument::parse("a\n<!-- annotated later -->\n<!-- todo -->\n");
        assert_eq!(doc.markers().count(), 0);
    }
}
