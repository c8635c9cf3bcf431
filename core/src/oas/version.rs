#![deny(missing_docs)]

//! # OpenAPI Versions
//!
//! Detects the major version of a document and exposes the fixed table that
//! routes relocated references into component containers for that version.

use regex::Regex;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::OnceLock;

/// OpenAPI major versions supported for cross-file bundling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecVersion {
    /// Swagger 2.0 (`swagger: "2.0"`).
    V2,
    /// OpenAPI 3.0.x (`openapi: "3.0.x"`).
    V3,
}

const V2_ROUTES: &[(&str, &[&str])] = &[
    ("parameters", &["parameters"]),
    ("schema", &["definitions"]),
    ("responses", &["responses"]),
];

const V3_ROUTES: &[(&str, &[&str])] = &[
    ("parameters", &["components", "parameters"]),
    ("schema", &["components", "schemas"]),
    ("responses", &["components", "responses"]),
    ("examples", &["components", "examples"]),
    ("requestBody", &["components", "requestBodies"]),
    ("callbacks", &["components", "callbacks"]),
    ("headers", &["components", "headers"]),
    ("links", &["components", "links"]),
];

impl SpecVersion {
    /// Detects the version from the top-level `swagger` / `openapi` fields.
    ///
    /// Returns `None` for anything but `swagger: "2.0"` and `openapi: 3.0.x`.
    pub fn detect(document: &JsonValue) -> Option<SpecVersion> {
        if document.get("swagger").and_then(JsonValue::as_str) == Some("2.0") {
            return Some(SpecVersion::V2);
        }
        let openapi = document.get("openapi").and_then(JsonValue::as_str)?;
        if v3_pattern().is_match(openapi) {
            return Some(SpecVersion::V3);
        }
        None
    }

    /// Destination container for a reference found under `context`.
    ///
    /// `context` is a key of the referencing location (its parent or
    /// grandparent), e.g. `parameters` or `schema`.
    pub fn destination_for(self, context: &str) -> Option<&'static [&'static str]> {
        let table = match self {
            SpecVersion::V2 => V2_ROUTES,
            SpecVersion::V3 => V3_ROUTES,
        };
        table
            .iter()
            .find(|(name, _)| *name == context)
            .map(|(_, dest)| *dest)
    }
}

fn v3_pattern() -> &'static Regex {
    static V3_RE: OnceLock<Regex> = OnceLock::new();
    V3_RE.get_or_init(|| Regex::new(r"^3\.0\.\d(-.+)?$").expect("Invalid regex"))
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecVersion::V2 => write!(f, "v2"),
            SpecVersion::V3 => write!(f, "v3"),
        }
    }
}
