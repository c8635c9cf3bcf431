#![deny(missing_docs)]

//! # Locate Command
//!
//! Bundles a root file, reads an assessment report produced for the bundle
//! and prints every finding with the file and line it comes from.

use crate::bundle::write_file;
use crate::error::{CliError, CliResult};
use crate::sarif;
use apiaudit_core::{bundle, Assessment, AuditSession, LocatedIssue, Locator};
use clap::ValueEnum;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

/// Output formats for located issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per issue.
    Text,
    /// JSON array of issues.
    Json,
    /// SARIF 2.1.0 log.
    Sarif,
}

/// Arguments for the locate command.
#[derive(clap::Args, Debug, Clone)]
pub struct LocateArgs {
    /// Root OpenAPI file the report was produced for.
    pub file: PathBuf,

    /// Assessment report (JSON).
    #[clap(long)]
    pub report: PathBuf,

    /// Output format.
    #[clap(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Where to write the output (stdout if omitted).
    #[clap(long, short)]
    pub output: Option<PathBuf>,
}

/// Executes the locate command.
pub fn execute(args: &LocateArgs) -> CliResult<()> {
    let report = fs::read_to_string(&args.report)?;
    let assessment = Assessment::from_json(&report)?;

    let mut session = AuditSession::open();
    let bundled = bundle(&mut session, &args.file)?;
    let issues = Locator::new(&mut session, &bundled)?.get_issues(&assessment)?;
    session.close();

    let unlocated = issues.iter().filter(|i| !i.is_located()).count();
    if unlocated > 0 {
        log::warn!("{} of {} issues could not be located", unlocated, issues.len());
    }

    let text = render(&issues, args.format)?;
    match &args.output {
        Some(path) => write_file(path, &text)?,
        None => println!("{}", text),
    }
    Ok(())
}

/// Formats `issues` in the requested format.
pub fn render(issues: &[LocatedIssue], format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Text => Ok(render_text(issues)),
        OutputFormat::Json => serde_json::to_string_pretty(issues)
            .map_err(|e| CliError::General(format!("Failed to serialize issues: {}", e))),
        OutputFormat::Sarif => serde_json::to_string_pretty(&sarif::produce(issues))
            .map_err(|e| CliError::General(format!("Failed to serialize SARIF: {}", e))),
    }
}

fn render_text(issues: &[LocatedIssue]) -> String {
    let mut out = String::new();
    for issue in issues {
        let place = match issue.line {
            Some(line) => format!("{}:{}", issue.file.display(), line),
            None => issue.file.display().to_string(),
        };
        let _ = writeln!(
            out,
            "{} [{}] {} (score impact {}): {}",
            place, issue.severity, issue.id, issue.display_score, issue.description
        );
    }
    if issues.is_empty() {
        out.push_str("No issues found.\n");
    }
    out.trim_end().to_string()
}
