#![deny(missing_docs)]

//! # Bundle Command
//!
//! Merges a multi-file OpenAPI document into one file and optionally dumps
//! the provenance tree next to it.

use crate::error::{CliError, CliResult};
use apiaudit_core::{bundle, AuditSession, BundledDocument};
use std::fs;
use std::path::{Path, PathBuf};

/// Arguments for the bundle command.
#[derive(clap::Args, Debug, Clone)]
pub struct BundleArgs {
    /// Root OpenAPI file.
    pub file: PathBuf,

    /// Where to write the merged document (stdout if omitted). A `.yaml` /
    /// `.yml` extension writes YAML, anything else JSON.
    #[clap(long, short)]
    pub output: Option<PathBuf>,

    /// Where to write the provenance tree as JSON.
    #[clap(long)]
    pub mapping: Option<PathBuf>,
}

/// Executes the bundle command.
pub fn execute(args: &BundleArgs) -> CliResult<()> {
    let mut session = AuditSession::open();
    let bundled = bundle(&mut session, &args.file)?;
    session.close();

    let text = render(&bundled, args.output.as_deref())?;
    match &args.output {
        Some(path) => {
            write_file(path, &text)?;
            log::info!("Bundled {} into {}", args.file.display(), path.display());
        }
        None => println!("{}", text),
    }

    if let Some(path) = &args.mapping {
        let mapping = serde_json::to_string_pretty(&bundled.provenance)
            .map_err(|e| CliError::General(format!("Failed to serialize mapping: {}", e)))?;
        write_file(path, &mapping)?;
        log::info!("Wrote provenance mapping to {}", path.display());
    }
    Ok(())
}

fn render(bundled: &BundledDocument, output: Option<&Path>) -> CliResult<String> {
    let is_yaml = output
        .and_then(|p| p.extension())
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
    if is_yaml {
        serde_yaml::to_string(&bundled.document)
            .map_err(|e| CliError::General(format!("Failed to serialize YAML: {}", e)))
    } else {
        Ok(bundled.to_json()?)
    }
}

pub(crate) fn write_file(path: &Path, contents: &str) -> CliResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, contents)?;
    Ok(())
}
