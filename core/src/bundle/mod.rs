#![deny(missing_docs)]

//! # Reference Bundler
//!
//! Merges a multi-file API description into one self-contained document.
//!
//! - **builder**: traversal, relocation and inline dereferencing.
//! - **provenance**: reverse mapping from merged pointers to source files.
//!
//! Internal references of the root file are kept as written. Every cross-file
//! reference is rewritten to a local one that points at a copy of the target
//! placed in a version specific container (`components/...` for OpenAPI 3,
//! `definitions` / `parameters` / `responses` for Swagger 2). Targets that fit
//! no container are inlined at the reference site.

pub mod builder;
pub mod provenance;

pub use builder::BundleBuilder;
pub use provenance::{Origin, ProvenanceNode, ProvenanceTree};

use crate::error::AuditResult;
use crate::oas::version::SpecVersion;
use crate::session::AuditSession;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};

/// Result of bundling one root file.
#[derive(Debug, Clone)]
pub struct BundledDocument {
    /// Canonical path of the root file.
    pub root_file: PathBuf,
    /// Version detected from the root file.
    pub version: Option<SpecVersion>,
    /// The merged document.
    pub document: JsonValue,
    /// Where relocated and inlined nodes came from.
    pub provenance: ProvenanceTree,
}

impl BundledDocument {
    /// The merged document as pretty printed JSON.
    pub fn to_json(&self) -> AuditResult<String> {
        serde_json::to_string_pretty(&self.document)
            .map_err(|e| format!("Failed to serialize bundle: {}", e).into())
    }
}

/// Bundles `root` and everything it references.
///
/// Files are read through `session`, so a later locator run over the same
/// session reuses the parsed trees.
pub fn bundle(session: &mut AuditSession, root: &Path) -> AuditResult<BundledDocument> {
    let root_doc = session.document(root)?;
    BundleBuilder::new(session, root_doc).run()
}
