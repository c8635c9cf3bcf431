#![deny(missing_docs)]

//! # Assessment Report
//!
//! Serde model of the report returned by the analysis service. Issue pointers
//! are not written inline; each sub-issue carries a key into the report's
//! `index`, which may be an array or an object.

use crate::error::{AuditError, AuditResult};
use indexmap::IndexMap;
use serde::Deserialize;
use std::fmt;

/// Criticality used when a `warnings` issue does not state one.
pub const WARNING_CRITICALITY: i64 = 1;
/// Criticality used for every other category.
pub const DEFAULT_CRITICALITY: i64 = 5;

/// Top-level report.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    /// Overall score.
    #[serde(default)]
    pub score: Option<f64>,
    /// Whether the service considered the document valid.
    #[serde(default)]
    pub openapi_state: Option<String>,
    /// Pointer table the sub-issues refer into.
    #[serde(default)]
    pub index: PointerIndex,
    /// Data validation findings.
    #[serde(default)]
    pub data: Option<Category>,
    /// Security findings.
    #[serde(default)]
    pub security: Option<Category>,
    /// Best practice warnings.
    #[serde(default)]
    pub warnings: Option<Category>,
    /// Semantic errors.
    #[serde(default)]
    pub semantic_errors: Option<Category>,
    /// Structural validation errors.
    #[serde(default)]
    pub validation_errors: Option<Category>,
}

impl Assessment {
    /// Parses a report from JSON text.
    pub fn from_json(text: &str) -> AuditResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| AuditError::Report(format!("Invalid assessment report: {}", e)))
    }

    /// The present categories in report order, with their default criticality.
    pub fn categories(&self) -> Vec<(&'static str, &Category, i64)> {
        [
            ("data", &self.data, DEFAULT_CRITICALITY),
            ("security", &self.security, DEFAULT_CRITICALITY),
            ("warnings", &self.warnings, WARNING_CRITICALITY),
            ("semanticErrors", &self.semantic_errors, DEFAULT_CRITICALITY),
            ("validationErrors", &self.validation_errors, DEFAULT_CRITICALITY),
        ]
        .into_iter()
        .filter_map(|(name, category, default)| {
            category.as_ref().map(|category| (name, category, default))
        })
        .collect()
    }
}

/// Issues of one category, keyed by issue id.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Category {
    /// Category score.
    #[serde(default)]
    pub score: Option<f64>,
    /// Issue groups in report order.
    #[serde(default)]
    pub issues: IndexMap<String, IssueGroup>,
}

/// All occurrences of one issue id.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueGroup {
    /// Generic description of the issue.
    #[serde(default)]
    pub description: Option<String>,
    /// 1 (lowest) to 5 (highest).
    #[serde(default)]
    pub criticality: Option<i64>,
    /// Individual occurrences.
    #[serde(default)]
    pub issues: Vec<SubIssue>,
}

/// One occurrence of an issue.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubIssue {
    /// Key into [`Assessment::index`].
    pub pointer: PointerKey,
    /// Description specific to this occurrence.
    #[serde(default)]
    pub specific_description: Option<String>,
    /// Score impact, usually negative.
    #[serde(default)]
    pub score: Option<f64>,
}

/// Key of a sub-issue into the pointer index.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PointerKey {
    /// Position in an array index.
    Position(usize),
    /// Key of an object index.
    Name(String),
}

impl fmt::Display for PointerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointerKey::Position(n) => write!(f, "{}", n),
            PointerKey::Name(s) => write!(f, "{}", s),
        }
    }
}

/// The report's pointer table.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PointerIndex {
    /// `["/paths/...", ...]`
    List(Vec<String>),
    /// `{"0": "/paths/...", ...}`
    Map(IndexMap<String, String>),
}

impl Default for PointerIndex {
    fn default() -> Self {
        PointerIndex::List(Vec::new())
    }
}

impl PointerIndex {
    /// Looks up the pointer string for `key`.
    pub fn get(&self, key: &PointerKey) -> Option<&str> {
        let found = match (self, key) {
            (PointerIndex::List(items), PointerKey::Position(n)) => items.get(*n),
            (PointerIndex::List(items), PointerKey::Name(s)) => {
                s.parse::<usize>().ok().and_then(|n| items.get(n))
            }
            (PointerIndex::Map(map), key) => map.get(&key.to_string()),
        };
        found.map(String::as_str)
    }
}
