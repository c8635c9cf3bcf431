//! # Error Handling
//!
//! Provides the unified `AuditError` enum used across the workspace.

use derive_more::{Display, From};

/// The Global Error Enum.
///
/// Bundling errors (`Parse`, `ReferenceResolution`, `DestinationCollision`,
/// `UnsupportedVersion`, `CircularReference`) abort the run for a root file.
/// `ProvenanceMissing` and `LocationNotFound` concern a single issue and are
/// downgraded by the locator. String errors default to `General`.
#[derive(Debug, Display, From)]
pub enum AuditError {
    /// Wrapper for standard IO errors.
    #[display("IO Error: {_0}")]
    Io(std::io::Error),

    /// Malformed JSON or YAML source text.
    #[from(ignore)]
    #[display("Failed to parse {file} at offset {offset}: {message}")]
    Parse {
        /// File the text was read from (empty for in-memory text).
        file: String,
        /// Byte offset of the syntax error.
        offset: usize,
        /// Underlying syntax error message.
        message: String,
    },

    /// A `$ref` whose file or pointer does not exist, or that is not local.
    #[from(ignore)]
    #[display("Unable to resolve reference '{reference}' from {file}: {reason}")]
    ReferenceResolution {
        /// File containing the reference.
        file: String,
        /// The raw `$ref` value.
        reference: String,
        /// What went wrong.
        reason: String,
    },

    /// Two distinct sources relocated to the same destination.
    #[from(ignore)]
    #[display("Unable to merge, object already exists at path: {path}")]
    DestinationCollision {
        /// Destination pointer in the merged document.
        path: String,
    },

    /// Cross-file references in a document whose OpenAPI version is unknown.
    #[from(ignore)]
    #[display("Unsupported OpenAPI version in {file}: cross-file references require swagger 2.0 or openapi 3.0.x")]
    UnsupportedVersion {
        /// Root file of the bundle.
        file: String,
    },

    /// A reference cycle that would have to be inlined forever.
    #[from(ignore)]
    #[display("Circular reference '{reference}' in {file} cannot be inlined")]
    CircularReference {
        /// File containing the reference.
        file: String,
        /// The raw `$ref` value.
        reference: String,
    },

    /// Provenance lookup reached a node without a record.
    #[from(ignore)]
    #[display("No provenance recorded for pointer: {_0}")]
    ProvenanceMissing(String),

    /// An issue pointer that could not be located in any source file.
    #[from(ignore)]
    #[display("Cannot find entry for pointer: {_0}")]
    LocationNotFound(String),

    /// Criticality outside of `1..=5`.
    #[from(ignore)]
    #[display("Invalid criticality: {_0}")]
    InvalidCriticality(i64),

    /// Malformed assessment report.
    #[from(ignore)]
    #[display("Report Error: {_0}")]
    Report(String),

    /// Generic errors.
    #[display("General Error: {_0}")]
    General(String),
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for AuditError {}

impl AuditError {
    /// True for errors that only affect a single issue rather than the run.
    pub fn is_per_issue(&self) -> bool {
        matches!(
            self,
            AuditError::ProvenanceMissing(_) | AuditError::LocationNotFound(_)
        )
    }
}

/// Helper type alias for Result using AuditError.
pub type AuditResult<T> = Result<T, AuditError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_io_conversion() {
        let io_err = Error::new(ErrorKind::Other, "test");
        let err: AuditError = io_err.into();
        assert!(matches!(err, AuditError::Io(_)));
    }

    #[test]
    fn test_string_conversion() {
        let msg = String::from("something wrong");
        let err: AuditError = msg.into();
        match err {
            AuditError::General(s) => assert_eq!(s, "something wrong"),
            _ => panic!("String should convert to AuditError::General"),
        }
    }

    #[test]
    fn test_collision_display() {
        let err = AuditError::DestinationCollision {
            path: "#/components/schemas/a-yaml-X".into(),
        };
        assert_eq!(
            err.to_string(),
            "Unable to merge, object already exists at path: #/components/schemas/a-yaml-X"
        );
    }

    #[test]
    fn test_per_issue_classification() {
        assert!(AuditError::LocationNotFound("#/a".into()).is_per_issue());
        assert!(AuditError::ProvenanceMissing("#/a".into()).is_per_issue());
        assert!(!AuditError::UnsupportedVersion { file: "a.yaml".into() }.is_per_issue());
    }
}
