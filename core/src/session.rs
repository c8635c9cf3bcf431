#![deny(missing_docs)]

//! # Audit Session
//!
//! Owns the per-run cache of parsed documents. Every file is read, parsed and
//! line-indexed at most once per session; the bundler and the locator share
//! the cached results. Nothing is invalidated while a session is open.

use crate::ast::{self, Format, Node};
use crate::error::{AuditError, AuditResult};
use crate::lines::LineIndex;
use crate::oas::version::SpecVersion;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// A file parsed once and kept for the rest of the session.
#[derive(Debug)]
pub struct ParsedDocument {
    /// Canonical absolute path.
    pub path: PathBuf,
    /// Syntax the file was parsed as.
    pub format: Format,
    /// Source text.
    pub text: String,
    /// Position-aware tree.
    pub root: Node,
    /// Plain value produced from `root`.
    pub value: JsonValue,
    /// Line starts of `text`.
    pub lines: LineIndex,
}

impl ParsedDocument {
    /// Parses in-memory text. `path` is only used for error messages.
    pub fn from_text(path: PathBuf, format: Format, text: String) -> AuditResult<Self> {
        let root = ast::parse(&text, format).map_err(|e| AuditError::Parse {
            file: path.display().to_string(),
            offset: e.offset,
            message: e.message,
        })?;
        let value = root.to_value();
        let lines = LineIndex::new(&text);
        Ok(Self {
            path,
            format,
            text,
            root,
            value,
            lines,
        })
    }

    /// 1-based line of a byte offset.
    pub fn line_for(&self, offset: usize) -> usize {
        self.lines.line_for(offset)
    }
}

/// Parse cache for one audit run.
#[derive(Debug, Default)]
pub struct AuditSession {
    documents: HashMap<PathBuf, Rc<ParsedDocument>>,
}

impl AuditSession {
    /// Opens an empty session.
    pub fn open() -> Self {
        log::debug!("Opening audit session");
        Self::default()
    }

    /// Drops every cached document.
    pub fn close(self) {
        log::debug!(
            "Closing audit session ({} cached documents)",
            self.documents.len()
        );
    }

    /// Number of cached documents.
    pub fn cached(&self) -> usize {
        self.documents.len()
    }

    /// Returns the parsed document for `path`, reading it on first use.
    ///
    /// The cache key is the canonical path, so `./a.yaml` and `a.yaml` share
    /// one entry.
    pub fn document(&mut self, path: &Path) -> AuditResult<Rc<ParsedDocument>> {
        let canonical = fs::canonicalize(path)?;
        if let Some(doc) = self.documents.get(&canonical) {
            return Ok(Rc::clone(doc));
        }
        log::debug!("Parsing {}", canonical.display());
        let text = fs::read_to_string(&canonical)?;
        let format = Format::from_path(&canonical);
        let doc = Rc::new(ParsedDocument::from_text(canonical.clone(), format, text)?);
        self.documents.insert(canonical, Rc::clone(&doc));
        Ok(doc)
    }
}

/// True if `path` parses and declares `swagger: "2.0"` or `openapi: 3.0.x`.
///
/// Unreadable and malformed files are not OpenAPI.
pub fn is_openapi(path: &Path) -> bool {
    let Ok(text) = fs::read_to_string(path) else {
        return false;
    };
    match ast::parse(&text, Format::from_path(path)) {
        Ok(root) => SpecVersion::detect(&root.to_value()).is_some(),
        Err(e) => {
            log::debug!("Skipping {}: {}", path.display(), e);
            false
        }
    }
}
