#![deny(missing_docs)]

//! # Position-Aware Document AST
//!
//! Parses JSON and YAML text into a tree of [`Node`]s where every node knows
//! the byte range it was read from. The tree is what the locator walks to turn
//! a JSON Pointer into a line number, and it also produces the plain
//! `serde_json::Value` the bundler works on, so both always agree on the shape
//! of a document.
//!
//! - **json**: RFC 8259 parser.
//! - **yaml**: parser for the block/flow subset used by API descriptions.

mod json;
mod yaml;

use crate::oas::pointer::JsonPointer;
use serde_json::{Map, Number, Value as JsonValue};
use std::fmt;
use std::path::Path;

/// Source syntax of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// JSON text.
    Json,
    /// YAML text.
    Yaml,
}

impl Format {
    /// `.yaml` / `.yml` (any case) are YAML, everything else is JSON.
    pub fn from_path(path: &Path) -> Format {
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
            .unwrap_or(false);
        if is_yaml {
            Format::Yaml
        } else {
            Format::Json
        }
    }
}

/// Half-open byte range `[start, end)` into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// First byte.
    pub start: usize,
    /// One past the last byte.
    pub end: usize,
}

impl Span {
    /// Creates a span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A typed scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// `null`, `~` or an empty YAML value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer or finite float.
    Number(Number),
    /// Any string.
    String(String),
}

/// One key/value pair of a mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// The key as a string.
    pub key: String,
    /// Where the key was written.
    pub key_span: Span,
    /// The value node.
    pub value: Node,
}

/// Node payload.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// A leaf value.
    Scalar(Scalar),
    /// Ordered list of nodes.
    Sequence(Vec<Node>),
    /// Ordered, duplicate-free key/value pairs.
    Mapping(Vec<Entry>),
}

/// A parsed node and its byte range.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Payload.
    pub kind: NodeKind,
    /// Byte range in the source text.
    pub span: Span,
}

/// A syntax error with the byte offset it was detected at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// Byte offset.
    pub offset: usize,
    /// Description.
    pub message: String,
}

impl SyntaxError {
    pub(crate) fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (offset {})", self.message, self.offset)
    }
}

/// Parses `text` in the given format.
pub fn parse(text: &str, format: Format) -> Result<Node, SyntaxError> {
    match format {
        Format::Json => json::parse(text),
        Format::Yaml => yaml::parse(text),
    }
}

impl Node {
    pub(crate) fn scalar(scalar: Scalar, span: Span) -> Self {
        Self {
            kind: NodeKind::Scalar(scalar),
            span,
        }
    }

    /// The `(start, end)` byte range.
    pub fn range(&self) -> (usize, usize) {
        (self.span.start, self.span.end)
    }

    /// Looks up a direct child of a mapping.
    pub fn get(&self, key: &str) -> Option<&Node> {
        match &self.kind {
            NodeKind::Mapping(entries) => entries.iter().find(|e| e.key == key).map(|e| &e.value),
            _ => None,
        }
    }

    /// Follows `pointer` from this node. Never panics; `None` if any segment
    /// does not match.
    pub fn find(&self, pointer: &JsonPointer) -> Option<&Node> {
        let mut current = self;
        for segment in pointer.segments() {
            current = match &current.kind {
                NodeKind::Mapping(_) => current.get(segment)?,
                NodeKind::Sequence(items) => items.get(parse_index(segment)?)?,
                NodeKind::Scalar(_) => return None,
            };
        }
        Some(current)
    }

    /// Every node of the tree together with its pointer, in document order.
    pub fn descendants(&self) -> Vec<(JsonPointer, &Node)> {
        let mut out = Vec::new();
        collect(self, &mut JsonPointer::root(), &mut out);
        out
    }

    /// Converts the tree into a plain JSON value (key order preserved).
    pub fn to_value(&self) -> JsonValue {
        match &self.kind {
            NodeKind::Scalar(Scalar::Null) => JsonValue::Null,
            NodeKind::Scalar(Scalar::Bool(b)) => JsonValue::Bool(*b),
            NodeKind::Scalar(Scalar::Number(n)) => JsonValue::Number(n.clone()),
            NodeKind::Scalar(Scalar::String(s)) => JsonValue::String(s.clone()),
            NodeKind::Sequence(items) => JsonValue::Array(items.iter().map(Node::to_value).collect()),
            NodeKind::Mapping(entries) => {
                let mut map = Map::new();
                for entry in entries {
                    map.insert(entry.key.clone(), entry.value.to_value());
                }
                JsonValue::Object(map)
            }
        }
    }
}

fn collect<'a>(node: &'a Node, path: &mut JsonPointer, out: &mut Vec<(JsonPointer, &'a Node)>) {
    out.push((path.clone(), node));
    match &node.kind {
        NodeKind::Mapping(entries) => {
            for entry in entries {
                path.push(entry.key.clone());
                collect(&entry.value, path, out);
                path.pop();
            }
        }
        NodeKind::Sequence(items) => {
            for (i, item) in items.iter().enumerate() {
                path.push(i.to_string());
                collect(item, path, out);
                path.pop();
            }
        }
        NodeKind::Scalar(_) => {}
    }
}

/// Array indices must be canonical: `0` or digits without a leading zero.
fn parse_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if segment.len() > 1 && segment.starts_with('0') {
        return None;
    }
    segment.parse().ok()
}

/// Rejects a key that is already present in `entries`.
pub(crate) fn check_duplicate(entries: &[Entry], key: &str, at: usize) -> Result<(), SyntaxError> {
    if entries.iter().any(|e| e.key == key) {
        return Err(SyntaxError::new(at, format!("Duplicate key '{}'", key)));
    }
    Ok(())
}
