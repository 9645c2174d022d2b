//! HTML rendering of a segmented transcript.
//!
//! Each heading gets an `id`: the pinned anchor id when its slug is in the
//! anchor map (plus `class="anchor-section"`), otherwise the slug itself.
//! Syntax highlighting is left to the viewer: fenced code only carries
//! pulldown-cmark's `class="language-<lang>"` for it to hook onto.

use super::segment::{AnchorMap, Marker, Segment, SegmentedDocument};
use super::slug::slugify;
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};
use serde::Serialize;

pub const ANCHOR_SECTION_CLASS: &str = "anchor-section";

/// A heading in document order. Scroll offsets are left to the viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionAnchor {
    pub id: String,
    pub title: String,
    pub level: u8,
    /// Pinned by an explicit anchor; eligible for jump-to-section navigation.
    pub anchor_section: bool,
}

/// Where an annotation form goes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormSlot {
    pub section: usize,
    pub title: Option<String>,
    pub heading_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderedBlock {
    Html { html: String },
    Form(FormSlot),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderedDocument {
    pub blocks: Vec<RenderedBlock>,
    pub headings: Vec<SectionAnchor>,
}

impl RenderedDocument {
    pub fn forms(&self) -> impl Iterator<Item = &FormSlot> {
        self.blocks.iter().filter_map(|b| match b {
            RenderedBlock::Form(slot) => Some(slot),
            RenderedBlock::Html { .. } => None,
        })
    }

    /// Headings eligible for section navigation.
    pub fn anchor_sections(&self) -> impl Iterator<Item = &SectionAnchor> {
        self.headings.iter().filter(|h| h.anchor_section)
    }

    /// All HTML blocks joined, with an empty placeholder element per form.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            match block {
                RenderedBlock::Html { html } => out.push_str(html),
                RenderedBlock::Form(slot) => out.push_str(&format!(
                    "<div class=\"annotation-form\" data-section=\"{}\"></div>\n",
                    slot.section
                )),
            }
        }
        out
    }
}

fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES
}

/// Parse, segment and render `markdown` in one go.
pub fn render_markdown(markdown: &str) -> RenderedDocument {
    render(&SegmentedDocument::parse(markdown))
}

pub fn render(doc: &SegmentedDocument) -> RenderedDocument {
    let mut rendered = RenderedDocument::default();
    for segment in &doc.segments {
        match segment {
            Segment::Markdown { text } => {
                let html = render_chunk(text, &doc.anchors, &mut rendered.headings);
                rendered.blocks.push(RenderedBlock::Html { html });
            }
            Segment::Marker(marker) if marker.has_form() => {
                rendered
                    .blocks
                    .push(RenderedBlock::Form(form_slot(marker, &doc.anchors)));
            }
            Segment::Marker(_) => {}
        }
    }
    rendered
}

/// Id for a heading with the given rendered text, and whether it was pinned.
pub fn resolve_heading_id(text: &str, anchors: &AnchorMap) -> (String, bool) {
    let slug = slugify(text);
    match anchors.get(&slug) {
        Some(id) => (id.clone(), true),
        None => (slug, false),
    }
}

fn form_slot(marker: &Marker, anchors: &AnchorMap) -> FormSlot {
    FormSlot {
        section: marker.section,
        title: marker.heading.clone(),
        heading_id: marker
            .heading
            .as_deref()
            .map(|h| resolve_heading_id(h, anchors).0),
    }
}

fn render_chunk(chunk: &str, anchors: &AnchorMap, headings: &mut Vec<SectionAnchor>) -> String {
    let mut events: Vec<Event> = Vec::new();
    let mut open_heading: Option<(usize, String)> = None;

    for event in Parser::new_ext(chunk, options()) {
        match &event {
            Event::Start(Tag::Heading { .. }) => {
                open_heading = Some((events.len(), String::new()));
            }
            Event::Text(t) | Event::Code(t) => {
                if let Some((_, text)) = open_heading.as_mut() {
                    text.push_str(t);
                }
            }
            Event::End(TagEnd::Heading(level)) => {
                if let Some((start, text)) = open_heading.take() {
                    let (id, pinned) = resolve_heading_id(&text, anchors);
                    if let Some(Event::Start(Tag::Heading {
                        id: slot, classes, ..
                    })) = events.get_mut(start)
                    {
                        *slot = Some(CowStr::from(id.clone()));
                        if pinned {
                            classes.push(CowStr::Borrowed(ANCHOR_SECTION_CLASS));
                        }
                    }
                    headings.push(SectionAnchor {
                        id,
                        title: text.trim().to_string(),
                        level: *level as u8,
                        anchor_section: pinned,
                    });
                }
            }
            _ => {}
        }
        events.push(event);
    }

    let mut out = String::with_capacity(chunk.len() * 3 / 2);
    html::push_html(&mut out, events.into_iter());
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
