#![deny(missing_docs)]

//! # Reference Utilities
//!
//! Shared helpers for splitting `$ref` values into a document part and a JSON
//! Pointer, resolving the document part against the referencing file, and
//! mangling references into component names.
//!
//! Only local files are supported: references with a URL scheme are reported
//! as remote and never fetched.

use crate::oas::pointer::JsonPointer;
use percent_encoding::percent_decode_str;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// Where a reference points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// `#/...` into the referencing document.
    Local,
    /// A path relative to the referencing document.
    Relative,
    /// An absolute URL (`http://...`).
    Remote,
}

/// A `$ref` value split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// The `$ref` string as written.
    pub raw: String,
    /// Document part before `#` (empty for local references).
    pub document: String,
    /// Pointer from the fragment (root if there is none).
    pub pointer: JsonPointer,
    /// Classification of `document`.
    pub kind: ReferenceKind,
}

/// Splits a `$ref` value at the first `#`.
pub fn parse_reference(ref_str: &str) -> Reference {
    let (document, fragment) = match ref_str.split_once('#') {
        Some((doc, frag)) => (doc, frag),
        None => (ref_str, ""),
    };

    let kind = if document.is_empty() {
        ReferenceKind::Local
    } else if is_remote(document) {
        ReferenceKind::Remote
    } else {
        ReferenceKind::Relative
    };

    Reference {
        raw: ref_str.to_string(),
        document: document.to_string(),
        pointer: JsonPointer::parse(&format!("#{}", fragment)),
        kind,
    }
}

fn is_remote(document: &str) -> bool {
    match Url::parse(document) {
        // Single letter schemes are Windows drive letters.
        Ok(url) => url.scheme().len() > 1 && url.scheme() != "file",
        Err(_) => false,
    }
}

/// Resolves the document part of a reference against the referencing file.
///
/// Uses RFC 3986 resolution so `../`, `./` and percent-encoded names behave
/// the way they do in a browser. `referrer` must be absolute.
pub fn resolve_document_path(referrer: &Path, document: &str) -> Option<PathBuf> {
    if let Ok(url) = Url::parse(document) {
        if url.scheme() == "file" {
            return url.to_file_path().ok();
        }
    }
    let base = Url::from_file_path(referrer).ok()?;
    base.join(document).ok()?.to_file_path().ok()
}

/// Decodes a JSON Pointer segment taken from a URI fragment.
pub fn decode_pointer_segment(segment: &str) -> String {
    let decoded = percent_decode_str(segment).decode_utf8_lossy();
    decoded.replace("~1", "/").replace("~0", "~")
}

/// Turns a reference or relative path into a string usable as a component key.
///
/// `~`, `/`, `\` and `.` become `-`, `#` is dropped.
pub fn mangle(value: &str) -> String {
    value
        .chars()
        .filter(|c| *c != '#')
        .map(|c| match c {
            '~' | '/' | '\\' | '.' => '-',
            other => other,
        })
        .collect()
}

/// Path of `target` relative to the directory `base`, with `/` separators.
pub fn relative_path(base: &Path, target: &Path) -> String {
    let base: Vec<Component> = base.components().collect();
    let target: Vec<Component> = target.components().collect();
    let common = base
        .iter()
        .zip(&target)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = Vec::new();
    for _ in common..base.len() {
        parts.push("..".to_string());
    }
    for comp in &target[common..] {
        parts.push(comp.as_os_str().to_string_lossy().into_owned());
    }
    parts.join("/")
}
