#![deny(missing_docs)]

//! # SARIF Output
//!
//! Writes located issues as a SARIF 2.1.0 log: one rule per issue id, one
//! artifact per file, one result per issue.

use apiaudit_core::LocatedIssue;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use url::Url;

const SARIF_SCHEMA: &str = "http://json.schemastore.org/sarif-2.1.0-rtm.4";
const TOOL_NAME: &str = "apiaudit";

/// Top-level SARIF document.
#[derive(Debug, Serialize)]
pub struct SarifLog {
    #[serde(rename = "$schema")]
    schema: &'static str,
    version: &'static str,
    runs: Vec<Run>,
}

#[derive(Debug, Serialize)]
struct Run {
    tool: Tool,
    artifacts: Vec<Artifact>,
    results: Vec<SarifResult>,
}

#[derive(Debug, Serialize)]
struct Tool {
    driver: Driver,
}

#[derive(Debug, Serialize)]
struct Driver {
    name: &'static str,
    version: &'static str,
    rules: Vec<Rule>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Rule {
    id: String,
    short_description: Message,
    properties: RuleProperties,
}

#[derive(Debug, Serialize)]
struct RuleProperties {
    category: &'static str,
}

#[derive(Debug, Serialize)]
struct Message {
    text: String,
}

#[derive(Debug, Serialize)]
struct Artifact {
    location: ArtifactLocation,
}

#[derive(Debug, Serialize)]
struct ArtifactLocation {
    uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    index: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifResult {
    rule_id: String,
    rule_index: usize,
    level: &'static str,
    message: Message,
    locations: Vec<ResultLocation>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResultLocation {
    physical_location: PhysicalLocation,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PhysicalLocation {
    artifact_location: ArtifactLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<Region>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Region {
    start_line: usize,
    start_column: usize,
}

/// SARIF level for a criticality.
pub fn level_for(criticality: i64) -> &'static str {
    match criticality {
        1 | 2 => "note",
        3 => "warning",
        _ => "error",
    }
}

fn file_uri(path: &Path) -> String {
    Url::from_file_path(path)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| path.display().to_string())
}

/// Builds the SARIF log for `issues`.
pub fn produce(issues: &[LocatedIssue]) -> SarifLog {
    let mut rules: Vec<Rule> = Vec::new();
    let mut rule_indices: HashMap<&str, usize> = HashMap::new();
    let mut artifacts: Vec<Artifact> = Vec::new();
    let mut artifact_indices: HashMap<&Path, usize> = HashMap::new();
    let mut results = Vec::new();

    for issue in issues {
        let uri = file_uri(&issue.file);
        let artifact_index = *artifact_indices
            .entry(issue.file.as_path())
            .or_insert_with(|| {
                artifacts.push(Artifact {
                    location: ArtifactLocation {
                        uri: uri.clone(),
                        index: None,
                    },
                });
                artifacts.len() - 1
            });
        let rule_index = *rule_indices.entry(issue.id.as_str()).or_insert_with(|| {
            rules.push(Rule {
                id: issue.id.clone(),
                short_description: Message {
                    text: issue.description.clone(),
                },
                properties: RuleProperties { category: "Other" },
            });
            rules.len() - 1
        });

        results.push(SarifResult {
            rule_id: issue.id.clone(),
            rule_index,
            level: level_for(issue.criticality),
            message: Message {
                text: issue.description.clone(),
            },
            locations: vec![ResultLocation {
                physical_location: PhysicalLocation {
                    artifact_location: ArtifactLocation {
                        uri,
                        index: Some(artifact_index),
                    },
                    region: issue.line.map(|line| Region {
                        start_line: line,
                        start_column: 1,
                    }),
                },
            }],
        });
    }

    SarifLog {
        schema: SARIF_SCHEMA,
        version: "2.1.0",
        runs: vec![Run {
            tool: Tool {
                driver: Driver {
                    name: TOOL_NAME,
                    version: env!("CARGO_PKG_VERSION"),
                    rules,
                },
            },
            artifacts,
            results,
        }],
    }
}
