#![deny(missing_docs)]

//! # Configuration File
//!
//! Reads the optional `apiaudit.yaml` from the root directory:
//!
//! ```yaml
//! audit:
//!   discovery:
//!     search:
//!       - "specs/**/*.yaml"
//!       - "!specs/drafts/"
//!   mapping:
//!     specs/legacy.json: 4a8d1c3e-2f6b-4c1d-9e7a-0b5c6d7e8f90
//! ```
//!
//! `discovery: false` turns discovery off. Files listed under `mapping` are
//! bound to an existing API id and skipped by discovery.

use crate::error::{CliError, CliResult};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Name of the configuration file looked up in the root directory.
pub const CONFIG_FILE: &str = "apiaudit.yaml";

/// Discovery patterns used when the config file does not set any.
pub const DEFAULT_PATTERNS: &[&str] = &[
    "**/*.json",
    "**/*.yaml",
    "**/*.yml",
    "!node_modules/",
    "!tsconfig.json",
];

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    audit: Option<AuditSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AuditSection {
    #[serde(default)]
    discovery: Option<DiscoverySetting>,
    #[serde(default)]
    mapping: Option<BTreeMap<String, String>>,
    /// Failure rules of the hosted audit; read so that existing files load.
    #[serde(default)]
    fail_on: Option<serde_yaml::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DiscoverySetting {
    Enabled(bool),
    Search(DiscoverySection),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DiscoverySection {
    #[serde(default)]
    search: Option<Vec<String>>,
}

/// Effective configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditConfig {
    /// Discovery patterns, `None` if discovery is disabled.
    pub discovery: Option<Vec<String>>,
    /// Mapped files (relative to the root directory) and their API ids.
    pub mapping: BTreeMap<PathBuf, String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            discovery: Some(DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect()),
            mapping: BTreeMap::new(),
        }
    }
}

fn uuid_regex() -> &'static Regex {
    static UUID_RE: OnceLock<Regex> = OnceLock::new();
    UUID_RE.get_or_init(|| {
        Regex::new(
            r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$",
        )
        .expect("Invalid regex")
    })
}

impl AuditConfig {
    /// Loads `apiaudit.yaml` from `root_dir`, or the defaults if it does not
    /// exist.
    pub fn load(root_dir: &Path) -> CliResult<Self> {
        let path = root_dir.join(CONFIG_FILE);
        if !path.exists() {
            log::debug!("No {} in {}, using defaults", CONFIG_FILE, root_dir.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path)?;
        Self::from_yaml(root_dir, &text)
            .map_err(|e| CliError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parses and validates configuration text. Mapped files are checked
    /// relative to `root_dir`.
    pub fn from_yaml(root_dir: &Path, text: &str) -> Result<Self, String> {
        let file: ConfigFile = if text.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(text).map_err(|e| e.to_string())?
        };
        let audit = file.audit.unwrap_or_default();
        let mut config = Self::default();
        if audit.fail_on.is_some() {
            log::warn!("The 'fail_on' section is not evaluated and will be ignored");
        }

        match audit.discovery {
            Some(DiscoverySetting::Enabled(false)) => config.discovery = None,
            Some(DiscoverySetting::Search(DiscoverySection {
                search: Some(patterns),
            })) => config.discovery = Some(patterns),
            _ => {}
        }

        let mut seen: BTreeMap<String, String> = BTreeMap::new();
        for (file, id) in audit.mapping.unwrap_or_default() {
            if !root_dir.join(&file).exists() {
                return Err(format!(
                    "The file \"{}\" listed in the 'mapping' section does not exist",
                    file
                ));
            }
            if !uuid_regex().is_match(&id) {
                return Err(format!(
                    "The API id for \"{}\" listed in the 'mapping' section is not a valid UUID",
                    file
                ));
            }
            if let Some(previous) = seen.insert(id.to_lowercase(), file.clone()) {
                return Err(format!(
                    "\"{}\" and \"{}\" are mapped to the same API id {}",
                    previous, file, id
                ));
            }
            config.mapping.insert(PathBuf::from(file), id);
        }

        Ok(config)
    }
}
