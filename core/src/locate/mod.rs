#![deny(missing_docs)]

//! # Diagnostic Locator
//!
//! Turns pointers into the merged document back into places in the source
//! tree. A pointer is first looked up in the root file itself; if the node
//! was relocated or inlined by the bundler, the provenance tree names the
//! originating file and pointer, and that file's tree is searched instead.
//!
//! - **report**: serde model of the analysis report.
//! - **issues**: located issues, severities and score formatting.

pub mod issues;
pub mod report;

pub use issues::{display_score, severity_for, LocatedIssue, Severity};
pub use report::{Assessment, Category, IssueGroup, PointerIndex, PointerKey, SubIssue};

use crate::ast::Node;
use crate::bundle::{BundledDocument, ProvenanceTree};
use crate::error::{AuditError, AuditResult};
use crate::oas::pointer::JsonPointer;
use crate::session::{AuditSession, ParsedDocument};
use serde::Serialize;
use std::path::PathBuf;
use std::rc::Rc;

/// A resolved source location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    /// Canonical path of the file.
    pub file: PathBuf,
    /// 1-based line of the node's first byte.
    pub line: usize,
    /// Byte range of the node.
    pub range: (usize, usize),
}

/// Resolves merged-document pointers for one bundle.
pub struct Locator<'s> {
    session: &'s mut AuditSession,
    root: Rc<ParsedDocument>,
    provenance: &'s ProvenanceTree,
}

impl<'s> Locator<'s> {
    /// Creates a locator for `bundled`, reusing the session's parse cache.
    pub fn new(session: &'s mut AuditSession, bundled: &'s BundledDocument) -> AuditResult<Self> {
        let root = session.document(&bundled.root_file)?;
        Ok(Self {
            session,
            root,
            provenance: &bundled.provenance,
        })
    }

    /// Finds the source location of `pointer`.
    ///
    /// Fails with `LocationNotFound` if neither the root file nor the
    /// provenance tree lead to an existing node.
    pub fn locate(&mut self, pointer: &JsonPointer) -> AuditResult<Location> {
        if let Some(node) = self.root.root.find(pointer) {
            return Ok(location_of(&self.root, node));
        }
        let origin = self.provenance.resolve(pointer).map_err(|e| {
            log::debug!("{}", e);
            AuditError::LocationNotFound(pointer.to_fragment())
        })?;
        let doc = self.session.document(&origin.file)?;
        let node = doc
            .root
            .find(&origin.pointer)
            .ok_or_else(|| AuditError::LocationNotFound(pointer.to_fragment()))?;
        Ok(location_of(&doc, node))
    }

    /// Converts every sub-issue of `assessment` into a located issue, sorted
    /// by descending score.
    ///
    /// Issues that cannot be located are kept without line and range.
    pub fn get_issues(&mut self, assessment: &Assessment) -> AuditResult<Vec<LocatedIssue>> {
        let mut located = Vec::new();
        for (category, issues, default_criticality) in assessment.categories() {
            log::debug!("Locating {} issue groups in '{}'", issues.issues.len(), category);
            for (id, group) in &issues.issues {
                let criticality = group
                    .criticality
                    .filter(|c| *c != 0)
                    .unwrap_or(default_criticality);
                let severity = severity_for(criticality)?;
                for sub in &group.issues {
                    let raw = assessment.index.get(&sub.pointer).ok_or_else(|| {
                        AuditError::Report(format!(
                            "Issue '{}' refers to missing index entry {}",
                            id, sub.pointer
                        ))
                    })?;
                    let (file, line, range) = match self.locate(&JsonPointer::parse(raw)) {
                        Ok(loc) => (loc.file, Some(loc.line), Some(loc.range)),
                        Err(e) if e.is_per_issue() => {
                            log::warn!("Issue '{}': {}", id, e);
                            (self.root.path.clone(), None, None)
                        }
                        Err(e) => return Err(e),
                    };
                    let score = sub.score.unwrap_or(0.0);
                    located.push(LocatedIssue {
                        id: id.clone(),
                        description: sub
                            .specific_description
                            .clone()
                            .or_else(|| group.description.clone())
                            .unwrap_or_default(),
                        pointer: raw.to_string(),
                        file,
                        line,
                        range,
                        severity,
                        criticality,
                        score: score.abs(),
                        display_score: display_score(score),
                    });
                }
            }
        }
        located.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(located)
    }
}

fn location_of(doc: &ParsedDocument, node: &Node) -> Location {
    Location {
        file: doc.path.clone(),
        line: doc.line_for(node.span.start),
        range: node.range(),
    }
}
