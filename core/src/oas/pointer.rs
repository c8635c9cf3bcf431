#![deny(missing_docs)]

//! # JSON Pointers
//!
//! RFC 6901 pointers used to address nodes in parsed documents, the merged
//! document and the provenance tree. Both the plain form (`/a/b`) and the
//! URI fragment form (`#/a/b`) are accepted.

use crate::oas::ref_utils::decode_pointer_segment;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// An ordered list of unescaped pointer segments. Empty = document root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsonPointer {
    segments: Vec<String>,
}

impl JsonPointer {
    /// The root pointer.
    pub fn root() -> Self {
        Self::default()
    }

    /// Builds a pointer from already unescaped segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses `#/a/b`, `/a/b`, `#` or the empty string.
    ///
    /// The fragment form is percent-decoded, the plain form is not.
    pub fn parse(raw: &str) -> Self {
        let (body, fragment) = match raw.strip_prefix('#') {
            Some(rest) => (rest, true),
            None => (raw, false),
        };
        if body.is_empty() {
            return Self::root();
        }
        let body = body.strip_prefix('/').unwrap_or(body);
        let segments = body
            .split('/')
            .map(|seg| {
                if fragment {
                    decode_pointer_segment(seg)
                } else {
                    unescape(seg)
                }
            })
            .collect();
        Self { segments }
    }

    /// Unescaped segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True for the root pointer.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Appends a segment.
    pub fn push(&mut self, segment: impl Into<String>) {
        self.segments.push(segment.into());
    }

    /// Removes the last segment.
    pub fn pop(&mut self) -> Option<String> {
        self.segments.pop()
    }

    /// Returns a new pointer with `segment` appended.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.push(segment);
        next
    }

    /// Returns a new pointer with all of `suffix` appended.
    pub fn join(&self, suffix: &[String]) -> Self {
        let mut next = self.clone();
        next.segments.extend(suffix.iter().cloned());
        next
    }

    /// Segment `n` from the end (`0` = last).
    pub fn nth_last(&self, n: usize) -> Option<&str> {
        let len = self.segments.len();
        if n >= len {
            return None;
        }
        self.segments.get(len - 1 - n).map(String::as_str)
    }

    /// True if `self` is `other` or an ancestor of it.
    pub fn is_prefix_of(&self, other: &JsonPointer) -> bool {
        other.segments.len() >= self.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
    }

    /// The `#/a/b` form used in `$ref` values.
    pub fn to_fragment(&self) -> String {
        format!("#{}", self)
    }
}

/// Escapes a single segment (`~` → `~0`, `/` → `~1`).
pub fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Reverses [`escape`].
pub fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for seg in &self.segments {
            write!(f, "/{}", escape(seg))?;
        }
        Ok(())
    }
}

impl Serialize for JsonPointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_fragment())
    }
}

impl<'de> Deserialize<'de> for JsonPointer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(JsonPointer::parse(&raw))
    }
}
