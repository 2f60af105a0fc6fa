//! Lenient tag tree for catalog XML feeds
//!
//! Catalog endpoints emit XML that is often only mostly well-formed: stray
//! closing tags, unclosed elements at the end of a truncated body, bare `&`
//! inside text. This module builds a small owned tree from quick-xml events
//! and tolerates those defects. Syntax errors quick-xml cannot step over are
//! still reported.

use crate::error::Result;
use quick_xml::errors::IllFormedError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, warn};

/// One element of the tag tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    text: String,
    pub children: Vec<TagNode>,
}

impl TagNode {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn from_start(start: &BytesStart<'_>) -> Self {
        let mut node = Self::new(String::from_utf8_lossy(start.name().as_ref()));
        for attr in start.attributes().with_checks(false).flatten() {
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = unescape_lenient(&String::from_utf8_lossy(&attr.value));
            node.attributes.push((key, value));
        }
        node
    }

    /// Parses a whole document
    ///
    /// The returned node is a nameless document root whose children are the
    /// top-level elements. Elements still open at the end of input are
    /// closed implicitly.
    pub fn parse_document(xml: &str) -> Result<TagNode> {
        let mut reader = Reader::from_str(xml);
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
        config.allow_dangling_amp = true;

        let mut stack = vec![TagNode::new("")];

        loop {
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(quick_xml::Error::IllFormed(IllFormedError::MissingEndTag(tag))) => {
                    debug!(tag = %tag, "Document ends inside an open element");
                    break;
                }
                Err(e) => return Err(e.into()),
            };
            match event {
                Event::Start(e) | Event::Empty(e) if !is_tag_name(e.name().as_ref()) => {
                    recover_stray_lt(&mut stack, &String::from_utf8_lossy(&e))
                }
                Event::Start(e) => stack.push(TagNode::from_start(&e)),
                Event::Empty(e) => attach(&mut stack, TagNode::from_start(&e)),
                Event::End(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    close_element(&mut stack, &name);
                }
                Event::Text(e) => {
                    push_text(&mut stack, &unescape_lenient(&String::from_utf8_lossy(&e)))
                }
                Event::CData(e) => push_text(&mut stack, &String::from_utf8_lossy(&e)),
                Event::GeneralRef(e) => {
                    push_text(&mut stack, &resolve_reference(&String::from_utf8_lossy(&e)))
                }
                Event::Eof => break,
                _ => {}
            }
        }

        while stack.len() > 1 {
            close_top(&mut stack);
        }
        Ok(stack.pop().unwrap_or_default())
    }

    /// First child element named `name`
    pub fn child(&self, name: &str) -> Option<&TagNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Every child element named `name`, in document order
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a TagNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Text and CDATA content of the element, trimmed
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

fn attach(stack: &mut [TagNode], node: TagNode) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

fn push_text(stack: &mut [TagNode], text: &str) {
    if let Some(current) = stack.last_mut() {
        current.text.push_str(text);
    }
}

fn close_top(stack: &mut Vec<TagNode>) {
    if let Some(node) = stack.pop() {
        attach(stack, node);
    }
}

/// Closes the innermost open element named `name` and everything above it
fn close_element(stack: &mut Vec<TagNode>, name: &str) {
    match stack.iter().skip(1).rposition(|n| n.name == name) {
        Some(pos) => {
            // rposition over skip(1) is relative to index 1
            let target = pos + 1;
            while stack.len() > target {
                close_top(stack);
            }
        }
        None => debug!(tag = name, "Ignoring closing tag without matching opening tag"),
    }
}

/// Whether `name` can start an element; `a < b` in text reads as a start tag otherwise
fn is_tag_name(name: &[u8]) -> bool {
    match name.first() {
        Some(&b) if b.is_ascii_alphabetic() || b == b'_' || b == b':' || b >= 0x80 => {
            !name.contains(&b'<')
        }
        _ => false,
    }
}

/// Puts a bare `<` and what quick-xml read as tag content back into the text
///
/// The tag content runs up to the next `>`, so it may swallow the closing
/// tag of the enclosing element; that tag is still applied.
fn recover_stray_lt(stack: &mut Vec<TagNode>, raw: &str) {
    warn!(raw, "Treating malformed start tag as text");
    match raw.rsplit_once("</") {
        Some((text, end)) => {
            push_text(stack, &unescape_lenient(&format!("<{text}")));
            close_element(stack, end.trim());
        }
        None => push_text(stack, &unescape_lenient(&format!("<{raw}>"))),
    }
}

/// Resolves `name` of an `&name;` reference, keeping unknown ones verbatim
fn resolve_reference(name: &str) -> String {
    let resolved = match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => name.strip_prefix('#').and_then(|code| {
            let value = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)
        }),
    };
    match resolved {
        Some(c) => c.to_string(),
        None => format!("&{name};"),
    }
}

/// Replaces `&name;` references, leaving bare `&` and unknown entities alone
fn unescape_lenient(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        match tail.find(';') {
            Some(end) if end > 0 && end <= 10 && !tail[..end].contains('&') => {
                out.push_str(&resolve_reference(&tail[..end]));
                rest = &tail[end + 1..];
            }
            _ => {
                out.push('&');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}
