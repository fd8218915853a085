//! Lenient markup parser
//!
//! Builds a small element tree from the HTML-like markup served by content
//! sources. The parser never fails: unknown constructs are skipped, stray
//! closing tags are ignored and unclosed elements are closed at the end of
//! the input.

use regex::Regex;
use std::sync::OnceLock;

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose content is not markup and is dropped.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Name of the synthetic element wrapping a parsed document.
pub const ROOT_NAME: &str = "#root";

fn tag_regex() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| {
        Regex::new(
            r#"(?s)<!--.*?-->|<![^>]*>|<\?[^>]*>|<(/?)([A-Za-z][A-Za-z0-9:_-]*)((?:\s+[^\s"'>/=]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'=<>`]+))?)*)\s*(/?)>"#,
        )
        .expect("tag pattern is valid")
    })
}

fn attr_regex() -> &'static Regex {
    static ATTR: OnceLock<Regex> = OnceLock::new();
    ATTR.get_or_init(|| {
        Regex::new(
            r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#,
        )
        .expect("attribute pattern is valid")
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tree
// ─────────────────────────────────────────────────────────────────────────────

/// A node of the parsed tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An element with its attributes and children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    /// Lowercased tag name
    pub name: String,
    /// Attributes in source order, names lowercased
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    /// Create an element without attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Get an attribute value by (lowercase) name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// The element's `id` attribute, if non-empty.
    pub fn id(&self) -> Option<&str> {
        self.attr("id").filter(|id| !id.is_empty())
    }

    /// Check whether the `class` attribute lists `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|classes| classes.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Iterate over child elements, skipping text.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    /// Depth-first search for the first element with the given `id`.
    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        if self.id() == Some(id) {
            return Some(self);
        }
        self.child_elements().find_map(|child| child.find_by_id(id))
    }

    /// Concatenated text of all descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }
}

fn collect_text(element: &Element, out: &mut String) {
    for node in &element.children {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element(child) => collect_text(child, out),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Parse markup into a tree rooted at a synthetic [`ROOT_NAME`] element.
pub fn parse(markup: &str) -> Element {
    let mut stack: Vec<Element> = vec![Element::new(ROOT_NAME)];
    let mut pos = 0;

    while let Some(caps) = tag_regex().captures_at(markup, pos) {
        let whole = match caps.get(0) {
            Some(m) => m,
            None => break,
        };
        push_text(&mut stack, &markup[pos..whole.start()]);
        pos = whole.end();

        // Comments, doctypes and processing instructions have no name group
        let Some(name) = caps.get(2) else {
            continue;
        };
        let name = name.as_str().to_ascii_lowercase();
        let closing = caps.get(1).map(|m| !m.as_str().is_empty()).unwrap_or(false);

        if closing {
            close_element(&mut stack, &name);
            continue;
        }

        let attrs = caps
            .get(3)
            .map(|m| parse_attributes(m.as_str()))
            .unwrap_or_default();
        let self_closing = caps.get(4).map(|m| !m.as_str().is_empty()).unwrap_or(false);
        let element = Element {
            name: name.clone(),
            attrs,
            children: Vec::new(),
        };

        if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
            // Skip to the matching end tag without interpreting the content
            let end_tag = format!("</{}", name);
            pos = markup[pos..]
                .to_ascii_lowercase()
                .find(&end_tag)
                .map(|offset| {
                    let after = pos + offset;
                    markup[after..]
                        .find('>')
                        .map(|gt| after + gt + 1)
                        .unwrap_or(markup.len())
                })
                .unwrap_or(markup.len());
            continue;
        }

        if self_closing || VOID_ELEMENTS.contains(&name.as_str()) {
            append_node(&mut stack, Node::Element(element));
        } else {
            stack.push(element);
        }
    }

    push_text(&mut stack, &markup[pos..]);

    while stack.len() > 1 {
        if let Some(open) = stack.pop() {
            append_node(&mut stack, Node::Element(open));
        }
    }
    stack.pop().unwrap_or_else(|| Element::new(ROOT_NAME))
}

fn append_node(stack: &mut [Element], node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

fn push_text(stack: &mut [Element], raw: &str) {
    if raw.is_empty() {
        return;
    }
    append_node(stack, Node::Text(decode_entities(raw)));
}

/// Close the innermost open element named `name`, closing anything nested
/// inside it. Closing tags with no open counterpart are ignored.
fn close_element(stack: &mut Vec<Element>, name: &str) {
    let Some(depth) = stack.iter().skip(1).rposition(|el| el.name == name) else {
        return;
    };
    let target = depth + 1;
    while stack.len() > target {
        if let Some(open) = stack.pop() {
            append_node(stack, Node::Element(open));
        }
    }
}

fn parse_attributes(raw: &str) -> Vec<(String, String)> {
    attr_regex()
        .captures_iter(raw)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| decode_entities(m.as_str()))
                .unwrap_or_default();
            Some((name, value))
        })
        .collect()
}

/// Decode the character references the content uses.
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&tail[1..semi]).map(|ch| (ch, semi)));
        match decoded {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" | "#39" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let code = name.strip_prefix('#')?;
            let value = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
