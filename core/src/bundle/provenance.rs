#![deny(missing_docs)]

//! # Provenance Tree
//!
//! Records, for every relocated or inlined node of a bundled document, the
//! file and pointer it was copied from. The tree mirrors the shape of the
//! merged document; only the nodes that were placed by the bundler carry a
//! record. A lookup walks a merged-document pointer down the tree and appends
//! whatever part of the pointer lies below the deepest record.

use crate::error::{AuditError, AuditResult};
use crate::oas::pointer::JsonPointer;
use indexmap::IndexMap;
use serde::Serialize;
use std::path::PathBuf;

/// Where a node of the merged document came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Origin {
    /// Canonical path of the source file.
    pub file: PathBuf,
    /// Pointer inside `file`.
    pub pointer: JsonPointer,
}

/// One node of the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProvenanceNode {
    /// Record for this exact path, if the bundler placed something here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
    /// Children keyed by pointer segment, in insertion order.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub children: IndexMap<String, ProvenanceNode>,
}

/// Reverse mapping from merged-document pointers to their sources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ProvenanceTree {
    root: ProvenanceNode,
}

impl ProvenanceTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// The root node.
    pub fn root(&self) -> &ProvenanceNode {
        &self.root
    }

    /// True if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.root.origin.is_none() && self.root.children.is_empty()
    }

    /// Records `origin` at `path`, creating intermediate nodes.
    pub(crate) fn insert(&mut self, path: &JsonPointer, origin: Origin) {
        let mut current = &mut self.root;
        for segment in path.segments() {
            current = current.children.entry(segment.clone()).or_default();
        }
        if let Some(previous) = &current.origin {
            log::debug!(
                "Replacing provenance at {} ({} -> {})",
                path.to_fragment(),
                previous.pointer,
                origin.pointer
            );
        }
        current.origin = Some(origin);
    }

    /// Every record with its merged-document path, depth first.
    pub fn records(&self) -> Vec<(JsonPointer, &Origin)> {
        let mut out = Vec::new();
        collect(&self.root, &mut JsonPointer::root(), &mut out);
        out
    }

    /// Maps a merged-document pointer back to its source.
    ///
    /// The deepest node on the walk that carries a record wins; the segments
    /// of `pointer` below that node are appended to the recorded pointer.
    /// Fails with `ProvenanceMissing` if no node on the walk has a record.
    pub fn resolve(&self, pointer: &JsonPointer) -> AuditResult<Origin> {
        let segments = pointer.segments();
        let mut current = &self.root;
        let mut best = current.origin.as_ref().map(|origin| (origin, 0));
        for (depth, segment) in segments.iter().enumerate() {
            let Some(child) = current.children.get(segment) else {
                break;
            };
            current = child;
            if let Some(origin) = &child.origin {
                best = Some((origin, depth + 1));
            }
        }
        let (origin, matched) =
            best.ok_or_else(|| AuditError::ProvenanceMissing(pointer.to_fragment()))?;
        Ok(Origin {
            file: origin.file.clone(),
            pointer: origin.pointer.join(&segments[matched..]),
        })
    }
}

fn collect<'a>(
    node: &'a ProvenanceNode,
    path: &mut JsonPointer,
    out: &mut Vec<(JsonPointer, &'a Origin)>,
) {
    if let Some(origin) = &node.origin {
        out.push((path.clone(), origin));
    }
    for (key, child) in &node.children {
        path.push(key.clone());
        collect(child, path, out);
        path.pop();
    }
}
