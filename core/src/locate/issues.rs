//! Located issues and the criticality / score conversions applied to them.

use crate::error::{AuditError, AuditResult};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Severity label derived from a criticality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Criticality 1 or 2.
    Low,
    /// Criticality 3.
    Medium,
    /// Criticality 4.
    High,
    /// Criticality 5.
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        };
        write!(f, "{}", label)
    }
}

/// Maps a criticality in `1..=5` to its severity.
pub fn severity_for(criticality: i64) -> AuditResult<Severity> {
    match criticality {
        1 | 2 => Ok(Severity::Low),
        3 => Ok(Severity::Medium),
        4 => Ok(Severity::High),
        5 => Ok(Severity::Critical),
        other => Err(AuditError::InvalidCriticality(other)),
    }
}

/// Formats a score for humans: `0`, a whole number, or `less than 1`.
///
/// Rounds half up, so `-0.5` is "less than 1" and `0.5` is "1".
pub fn display_score(score: f64) -> String {
    if score == 0.0 {
        return "0".to_string();
    }
    let rounded = (score + 0.5).floor().abs();
    if rounded >= 1.0 {
        format!("{}", rounded as i64)
    } else {
        "less than 1".to_string()
    }
}

/// An issue from the report resolved to a source location.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocatedIssue {
    /// Issue id from the report.
    pub id: String,
    /// Specific description, or the generic one.
    pub description: String,
    /// Pointer into the merged document as reported.
    pub pointer: String,
    /// File the issue was located in (the root file if unlocated).
    pub file: PathBuf,
    /// 1-based line, if located.
    pub line: Option<usize>,
    /// Byte range in `file`, if located.
    pub range: Option<(usize, usize)>,
    /// Severity label.
    pub severity: Severity,
    /// 1 to 5.
    pub criticality: i64,
    /// Magnitude of the score impact.
    pub score: f64,
    /// Score formatted by [`display_score`].
    pub display_score: String,
}

impl LocatedIssue {
    /// True if the issue carries a line.
    pub fn is_located(&self) -> bool {
        self.line.is_some()
    }
}
