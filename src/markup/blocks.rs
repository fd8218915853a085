//! Section fragments and renderable blocks
//!
//! A section response carries two fragments: the table of contents
//! (`#text-toc`) and the body (`#text-content`). The body is flattened into
//! paragraph-level [`Block`]s made of styled [`Span`]s; every block remembers
//! the location identifiers and element ids found inside it so the viewer can
//! position them after layout.
//!
//! Inline notes (`.inner-note`) stay in the block list but are tagged with
//! their note id; they are only drawn while a `.inner-note-link` naming them
//! has opened them.

use super::parser::{parse, Element, Node};
use crate::error::{Error, Result};

/// Id of the table-of-contents fragment.
pub const TOC_FRAGMENT_ID: &str = "text-toc";

/// Id of the body fragment.
pub const BODY_FRAGMENT_ID: &str = "text-content";

/// Attribute carrying the location identifier shared across panels.
pub const LOCATION_ATTR: &str = "data-text-id";

/// Class marking collation apparatus.
const COLLATION_CLASS: &str = "tag";

/// Class marking editorial commentary.
const COMMENTARY_CLASS: &str = "comment";

/// Classes of anchors that navigate to another section.
const LINK_CLASSES: &[&str] = &["section-link", "xref-link"];

/// Class of a note hidden until its link opens it.
const INNER_NOTE_CLASS: &str = "inner-note";

/// Class of the element that opens an inner note named by its `target`.
const INNER_NOTE_LINK_CLASS: &str = "inner-note-link";

/// Class of the scene list nested under a table-of-contents entry.
const SCENE_NAV_CLASS: &str = "scene-nav";

const BLOCK_ELEMENTS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "dd",
    "div",
    "dl",
    "dt",
    "figcaption",
    "figure",
    "footer",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hr",
    "li",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "td",
    "th",
    "tr",
    "ul",
];

// ─────────────────────────────────────────────────────────────────────────────
// Fragments
// ─────────────────────────────────────────────────────────────────────────────

/// The two fragments extracted from a section response.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragments {
    /// Table of contents, absent when the response has none
    pub toc: Option<Element>,
    /// Body content
    pub body: Element,
}

impl Fragments {
    /// Extract the fragments from raw markup.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingFragment` if the body fragment is absent. A
    /// missing table of contents is not an error.
    pub fn extract(markup: &str) -> Result<Self> {
        let root = parse(markup.trim());
        let body = root
            .find_by_id(BODY_FRAGMENT_ID)
            .cloned()
            .ok_or(Error::MissingFragment {
                fragment: BODY_FRAGMENT_ID,
            })?;
        let toc = root.find_by_id(TOC_FRAGMENT_ID).cloned();
        Ok(Self { toc, body })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Links
// ─────────────────────────────────────────────────────────────────────────────

/// A link to a section, optionally to an element inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionLink {
    /// Section reference to load
    pub section: String,
    /// Element id to scroll to once loaded
    pub element: Option<String>,
    /// Link text
    pub label: String,
}

impl SectionLink {
    /// Parse a `section#element` target.
    pub fn parse(target: &str, label: impl Into<String>) -> Option<Self> {
        let mut parts = target.splitn(2, '#');
        let section = parts.next().unwrap_or_default().trim();
        if section.is_empty() {
            return None;
        }
        let element = parts
            .next()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string);
        Some(Self {
            section: section.to_string(),
            element,
            label: label.into(),
        })
    }

    /// Build a link from an anchor element, reading `rel` then `href`.
    fn from_anchor(anchor: &Element) -> Option<Self> {
        let label = collapse_whitespace(&anchor.text_content()).trim().to_string();
        anchor
            .attr("rel")
            .and_then(|rel| Self::parse(rel, label.clone()))
            .or_else(|| {
                anchor
                    .attr("href")
                    .map(|href| href.trim_matches('/'))
                    .and_then(|href| Self::parse(href, label))
            })
    }
}

/// A table-of-contents entry and the scenes listed under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub link: SectionLink,
    pub scenes: Vec<SectionLink>,
}

impl From<SectionLink> for TocEntry {
    fn from(link: SectionLink) -> Self {
        Self {
            link,
            scenes: Vec::new(),
        }
    }
}

/// Collect the entries of a table-of-contents fragment.
///
/// The links of a `.scene-nav` list belong to the entry before it.
pub fn toc_entries(toc: &Element) -> Vec<TocEntry> {
    let mut entries = Vec::new();
    collect_entries(toc, &mut entries);
    entries
}

fn collect_entries(element: &Element, entries: &mut Vec<TocEntry>) {
    for child in element.child_elements() {
        if child.has_class(SCENE_NAV_CLASS) {
            let mut scenes = Vec::new();
            collect_links(child, &mut scenes);
            match entries.last_mut() {
                Some(entry) => entry.scenes.extend(scenes),
                None => entries.extend(scenes.into_iter().map(TocEntry::from)),
            }
        } else if child.name == "a" {
            if let Some(link) = SectionLink::from_anchor(child) {
                entries.push(TocEntry::from(link));
            }
        } else {
            collect_entries(child, entries);
        }
    }
}

fn collect_links(element: &Element, links: &mut Vec<SectionLink>) {
    for child in element.child_elements() {
        if child.name == "a" {
            if let Some(link) = SectionLink::from_anchor(child) {
                links.push(link);
            }
        } else {
            collect_links(child, links);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Blocks
// ─────────────────────────────────────────────────────────────────────────────

/// Which display switch a piece of text depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextClass {
    /// Always shown
    #[default]
    Plain,
    /// Collation marks, shown with the `collation` switch
    Collation,
    /// Commentary, shown with the `commentary` switch
    Commentary,
}

/// A run of text with uniform styling.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub text: String,
    pub class: TextClass,
    pub emphasis: bool,
    pub strong: bool,
    pub link: Option<SectionLink>,
    /// Id of the inner note this span opens and closes
    pub note_link: Option<String>,
}

/// Paragraph-level kind of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockKind {
    #[default]
    Paragraph,
    Heading(u8),
    ListItem,
    Quote,
    Preformatted,
}

/// A paragraph-level unit of body content.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub kind: BlockKind,
    /// Class of the block element itself
    pub class: TextClass,
    pub spans: Vec<Span>,
    /// Location identifiers in document order
    pub location_ids: Vec<String>,
    /// Element ids in document order (targets of section links)
    pub element_ids: Vec<String>,
    /// Id of the inner note holding this block, if any
    pub note: Option<String>,
}

impl Block {
    /// Check whether the block has any non-whitespace text.
    pub fn has_text(&self) -> bool {
        self.spans.iter().any(|s| !s.text.trim().is_empty())
    }

    /// The block's text, ignoring styling.
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    /// Check whether the block carries a location identifier.
    pub fn has_location_id(&self, id: &str) -> bool {
        self.location_ids.iter().any(|l| l == id)
    }

    fn is_empty(&self) -> bool {
        self.spans.is_empty() && self.location_ids.is_empty() && self.element_ids.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
struct SpanContext {
    class: TextClass,
    emphasis: bool,
    strong: bool,
    preformatted: bool,
    link: Option<SectionLink>,
    note_link: Option<String>,
    note: Option<String>,
}

/// Flattens an element tree into blocks.
#[derive(Default)]
struct BlockBuilder {
    blocks: Vec<Block>,
    current: Block,
}

impl BlockBuilder {
    /// Emit the current block if it has text. Identifiers seen in an empty
    /// block carry over to the next one, so a wrapper's id lands on its first
    /// paragraph.
    fn flush(&mut self) {
        if self.current.has_text() {
            if let Some(last) = self.current.spans.last_mut() {
                let trimmed = last.text.trim_end().len();
                last.text.truncate(trimmed);
            }
            let kind = self.current.kind;
            let class = self.current.class;
            let note = self.current.note.clone();
            self.blocks.push(std::mem::take(&mut self.current));
            self.current.kind = kind;
            self.current.class = class;
            self.current.note = note;
        } else {
            self.current.spans.clear();
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        // Trailing identifiers with no text still need a position
        if !self.current.is_empty() {
            self.current.spans.clear();
            self.blocks.push(self.current);
        }
        self.blocks
    }

    fn push_text(&mut self, raw: &str, ctx: &SpanContext) {
        let mut text = if ctx.preformatted {
            raw.to_string()
        } else {
            collapse_whitespace(raw)
        };
        let at_line_start = self
            .current
            .spans
            .last()
            .map(|s| s.text.ends_with([' ', '\n']))
            .unwrap_or(true);
        if at_line_start && !ctx.preformatted {
            text = text.trim_start().to_string();
        }
        if text.is_empty() {
            return;
        }

        if let Some(last) = self.current.spans.last_mut() {
            if last.class == ctx.class
                && last.emphasis == ctx.emphasis
                && last.strong == ctx.strong
                && last.link == ctx.link
                && last.note_link == ctx.note_link
            {
                last.text.push_str(&text);
                return;
            }
        }
        self.current.spans.push(Span {
            text,
            class: ctx.class,
            emphasis: ctx.emphasis,
            strong: ctx.strong,
            link: ctx.link.clone(),
            note_link: ctx.note_link.clone(),
        });
    }

    fn record_ids(&mut self, element: &Element) {
        if let Some(id) = element.attr(LOCATION_ATTR).filter(|id| !id.is_empty()) {
            self.current.location_ids.push(id.to_string());
        }
        if let Some(id) = element.id() {
            self.current.element_ids.push(id.to_string());
        }
    }

    fn walk(&mut self, element: &Element, parent: &SpanContext) {
        let mut ctx = parent.clone();
        if element.has_class(COLLATION_CLASS) {
            ctx.class = TextClass::Collation;
        } else if element.has_class(COMMENTARY_CLASS) {
            ctx.class = TextClass::Commentary;
        }
        match element.name.as_str() {
            "em" | "i" => ctx.emphasis = true,
            "strong" | "b" => ctx.strong = true,
            "pre" => ctx.preformatted = true,
            "a" if LINK_CLASSES.iter().any(|c| element.has_class(c)) => {
                ctx.link = SectionLink::from_anchor(element);
            }
            _ => {}
        }
        if element.has_class(INNER_NOTE_LINK_CLASS) {
            ctx.note_link = element
                .attr("target")
                .map(|target| target.trim_start_matches('#'))
                .filter(|target| !target.is_empty())
                .map(str::to_string);
        }
        let is_note = element.has_class(INNER_NOTE_CLASS);
        if is_note {
            ctx.note = element.id().map(str::to_string);
        }

        if element.name == "br" {
            self.push_text("\n", &SpanContext {
                preformatted: true,
                ..ctx
            });
            self.record_ids(element);
            return;
        }

        let is_block = is_note || BLOCK_ELEMENTS.contains(&element.name.as_str());
        if is_block {
            self.flush();
            self.current.kind = block_kind(&element.name, self.current.kind);
            self.current.class = ctx.class;
            self.current.note = ctx.note.clone();
        }
        self.record_ids(element);

        for child in &element.children {
            match child {
                Node::Text(text) => self.push_text(text, &ctx),
                Node::Element(el) => self.walk(el, &ctx),
            }
        }

        if is_block {
            self.flush();
            self.current.kind = BlockKind::Paragraph;
            self.current.class = parent.class;
            self.current.note = parent.note.clone();
        }
    }
}

fn block_kind(name: &str, enclosing: BlockKind) -> BlockKind {
    match name {
        "h1" => BlockKind::Heading(1),
        "h2" => BlockKind::Heading(2),
        "h3" => BlockKind::Heading(3),
        "h4" => BlockKind::Heading(4),
        "h5" => BlockKind::Heading(5),
        "h6" => BlockKind::Heading(6),
        "li" | "dd" | "dt" => BlockKind::ListItem,
        "blockquote" => BlockKind::Quote,
        "pre" => BlockKind::Preformatted,
        // Generic containers keep the kind of their enclosing block
        "div" | "section" | "article" => enclosing,
        _ => BlockKind::Paragraph,
    }
}

/// Flatten the children of `body` into blocks.
pub fn flatten_blocks(body: &Element) -> Vec<Block> {
    let mut builder = BlockBuilder::default();
    let ctx = SpanContext::default();
    for child in &body.children {
        match child {
            Node::Text(text) => builder.push_text(text, &ctx),
            Node::Element(el) => builder.walk(el, &ctx),
        }
    }
    builder.finish()
}

fn collapse_whitespace(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_space = false;
    for ch in raw.chars() {
        // Non-breaking spaces are content, not layout
        if ch.is_whitespace() && ch != '\u{a0}' {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
