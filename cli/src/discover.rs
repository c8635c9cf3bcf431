#![deny(missing_docs)]

//! # Discover Command
//!
//! Finds OpenAPI documents below a root directory. Files are selected with
//! glob patterns (a leading `!` excludes, a trailing `/` means the whole
//! directory), then kept only if they parse and declare Swagger 2.0 or
//! OpenAPI 3.0.x.

use crate::config::AuditConfig;
use crate::error::{CliError, CliResult};
use apiaudit_core::is_openapi;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Stand-in file name used to test whether a pattern covers a whole directory.
const PLACEHOLDER: &str = "\u{0}";

/// Arguments for the discover command.
#[derive(clap::Args, Debug, Clone)]
pub struct DiscoverArgs {
    /// Directory to search.
    #[clap(long, env = "APIAUDIT_ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Search patterns; replaces the configured ones.
    #[clap(long = "pattern")]
    pub patterns: Vec<String>,
}

/// Executes discovery and prints one relative path per line.
pub fn execute(args: &DiscoverArgs) -> CliResult<()> {
    let config = AuditConfig::load(&args.root)?;
    let patterns = if args.patterns.is_empty() {
        match config.discovery {
            Some(patterns) => patterns,
            None => {
                log::info!("Discovery is disabled in the configuration file");
                return Ok(());
            }
        }
    } else {
        args.patterns.clone()
    };

    let excluded: Vec<PathBuf> = config.mapping.keys().cloned().collect();
    for file in discover(&args.root, &patterns, &excluded)? {
        println!("{}", file.display());
    }
    Ok(())
}

struct Matcher {
    include: GlobSet,
    exclude: GlobSet,
}

impl Matcher {
    fn new(patterns: &[String]) -> CliResult<Self> {
        let mut include = GlobSetBuilder::new();
        let mut exclude = GlobSetBuilder::new();
        for pattern in patterns {
            let (negated, body) = match pattern.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, pattern.as_str()),
            };
            let expanded = if body.ends_with('/') {
                format!("{}**", body)
            } else {
                body.to_string()
            };
            let glob = GlobBuilder::new(&expanded)
                .literal_separator(true)
                .build()
                .map_err(|e| CliError::Config(format!("Invalid pattern '{}': {}", pattern, e)))?;
            if negated {
                exclude.add(glob);
            } else {
                include.add(glob);
            }
        }
        let build = |b: GlobSetBuilder| {
            b.build()
                .map_err(|e| CliError::Config(format!("Invalid patterns: {}", e)))
        };
        Ok(Self {
            include: build(include)?,
            exclude: build(exclude)?,
        })
    }

    fn is_match(&self, relative: &Path) -> bool {
        self.include.is_match(relative) && !self.exclude.is_match(relative)
    }

    /// True if everything below the directory `relative` is excluded.
    fn excludes_dir(&self, relative: &Path) -> bool {
        let child = relative.join(PLACEHOLDER);
        self.exclude.is_match(&child) && self.exclude.is_match(child.join(PLACEHOLDER))
    }
}

/// Drops `.` components so `./a.json` and `a.json` compare equal.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Returns the OpenAPI files under `root` matching `patterns`, relative to
/// `root` and sorted. Files listed in `excluded` are skipped.
pub fn discover(root: &Path, patterns: &[String], excluded: &[PathBuf]) -> CliResult<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(CliError::General(format!(
            "Root directory not found: {:?}",
            root
        )));
    }
    let matcher = Matcher::new(patterns)?;
    let excluded: Vec<PathBuf> = excluded.iter().map(|p| normalize(p)).collect();
    let mut found = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            let pruned = entry.depth() > 0
                && entry.file_type().is_dir()
                && matcher.excludes_dir(relative);
            if pruned {
                log::debug!("Skipping excluded directory {}", relative.display());
            }
            !pruned
        });

    for entry in walker.filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        if !matcher.is_match(relative) {
            continue;
        }
        if excluded.iter().any(|m| m == relative) {
            log::debug!(
                "{} is mapped to an existing API id, skipping",
                relative.display()
            );
            continue;
        }
        if is_openapi(path) {
            found.push(relative.to_path_buf());
        } else {
            log::debug!("{} is not an OpenAPI document", relative.display());
        }
    }

    log::info!("Discovered {} OpenAPI files", found.len());
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PATTERNS;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn defaults() -> Vec<String> {
        DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_discover_filters_by_content_and_pattern() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("api/v1")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("api/v1/petstore.yaml"), "openapi: 3.0.1\ninfo: {}\n").unwrap();
        fs::write(root.join("api/swagger.json"), r#"{"swagger": "2.0"}"#).unwrap();
        fs::write(root.join("api/v1/notes.txt"), "openapi: 3.0.1").unwrap();
        fs::write(root.join("package.json"), r#"{"name": "x"}"#).unwrap();
        fs::write(root.join("tsconfig.json"), r#"{"swagger": "2.0"}"#).unwrap();
        fs::write(root.join("node_modules/pkg/api.json"), r#"{"swagger": "2.0"}"#).unwrap();

        let found = discover(root, &defaults(), &[]).unwrap();
        assert_eq!(
            found,
            vec![
                PathBuf::from("api/swagger.json"),
                PathBuf::from("api/v1/petstore.yaml"),
            ]
        );
    }

    #[test]
    fn test_mapped_files_are_skipped() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.json"), r#"{"swagger": "2.0"}"#).unwrap();
        fs::write(dir.path().join("b.json"), r#"{"swagger": "2.0"}"#).unwrap();
        let found = discover(dir.path(), &defaults(), &[PathBuf::from("a.json")]).unwrap();
        assert_eq!(found, vec![PathBuf::from("b.json")]);
    }

    #[test]
    fn test_mapped_files_match_with_dot_prefix() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.json"), r#"{"swagger": "2.0"}"#).unwrap();
        fs::write(dir.path().join("b.json"), r#"{"swagger": "2.0"}"#).unwrap();
        let found = discover(dir.path(), &defaults(), &[PathBuf::from("./a.json")]).unwrap();
        assert_eq!(found, vec![PathBuf::from("b.json")]);
    }

    #[test]
    fn test_excluded_directories_are_pruned() {
        let matcher = Matcher::new(&defaults()).unwrap();
        assert!(matcher.excludes_dir(Path::new("node_modules")));
        assert!(!matcher.excludes_dir(Path::new("api")));
        assert!(!matcher.excludes_dir(Path::new("lib/node_modules")));

        // Only the files directly inside `drafts` are excluded, not its subdirectories.
        let shallow = Matcher::new(&["**/*.yaml".to_string(), "!drafts/*".to_string()]).unwrap();
        assert!(!shallow.excludes_dir(Path::new("drafts")));

        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("drafts/keep")).unwrap();
        fs::write(dir.path().join("drafts/skip.yaml"), "swagger: '2.0'\n").unwrap();
        fs::write(dir.path().join("drafts/keep/api.yaml"), "swagger: '2.0'\n").unwrap();
        let found = discover(
            dir.path(),
            &["**/*.yaml".to_string(), "!drafts/*".to_string()],
            &[],
        )
        .unwrap();
        assert_eq!(found, vec![PathBuf::from("drafts/keep/api.yaml")]);
    }

    #[test]
    fn test_single_star_does_not_cross_directories() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("top.yaml"), "swagger: '2.0'\n").unwrap();
        fs::write(dir.path().join("nested/deep.yaml"), "swagger: '2.0'\n").unwrap();
        let found = discover(dir.path(), &["*.yaml".to_string()], &[]).unwrap();
        assert_eq!(found, vec![PathBuf::from("top.yaml")]);
    }

    #[test]
    fn test_invalid_pattern_and_missing_root() {
        let dir = tempdir().unwrap();
        assert!(discover(dir.path(), &["a[".to_string()], &[]).is_err());
        assert!(discover(&dir.path().join("missing"), &defaults(), &[]).is_err());
    }
}
