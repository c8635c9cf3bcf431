#![deny(missing_docs)]

//! # apiaudit Core
//!
//! Core library for bundling multi-file OpenAPI documents and mapping audit
//! findings on the bundle back to the files they came from.

/// Shared error types.
pub mod error;

/// Position-aware JSON/YAML parsing.
pub mod ast;

/// Byte offset to line number mapping.
pub mod lines;

/// OpenAPI pointers, references and versions.
pub mod oas;

/// Per-run parse cache.
pub mod session;

/// Cross-file `$ref` bundling and provenance.
pub mod bundle;

/// Mapping report pointers back to source locations.
pub mod locate;

pub use ast::{Format, Node, NodeKind, Scalar, Span, SyntaxError};
pub use bundle::{bundle, BundleBuilder, BundledDocument, Origin, ProvenanceTree};
pub use error::{AuditError, AuditResult};
pub use lines::LineIndex;
pub use locate::{Assessment, LocatedIssue, Location, Locator, Severity};
pub use oas::pointer::JsonPointer;
pub use oas::version::SpecVersion;
pub use session::{is_openapi, AuditSession, ParsedDocument};
