#![deny(missing_docs)]

//! # API Audit CLI
//!
//! Command line front end for the multi-file OpenAPI tooling.
//!
//! Supported Commands:
//! - `discover`: Lists OpenAPI documents below a directory.
//! - `bundle`: Merges a root file and its references into one document.
//! - `locate`: Maps the findings of an assessment report back to source lines.

use clap::{Parser, Subcommand};

use crate::error::CliResult;

mod bundle;
mod config;
mod discover;
mod error;
mod locate;
mod sarif;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Multi-file OpenAPI bundler and issue locator")]
struct Cli {
    /// Log filter such as `debug` or `apiaudit_core=trace` (overrides RUST_LOG).
    #[clap(long, global = true, env = "APIAUDIT_LOG_LEVEL")]
    log_level: Option<String>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Lists OpenAPI documents matching the discovery patterns.
    Discover(discover::DiscoverArgs),
    /// Bundles a root file into a single document.
    Bundle(bundle::BundleArgs),
    /// Locates the issues of an assessment report in the source files.
    Locate(locate::LocateArgs),
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(filters) = &cli.log_level {
        builder.parse_filters(filters);
    }
    builder.target(env_logger::Target::Stderr).init();

    match &cli.command {
        Commands::Discover(args) => discover::execute(args)?,
        Commands::Bundle(args) => bundle::execute(args)?,
        Commands::Locate(args) => locate::execute(args)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli_structure() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_locate_arguments() {
        let cli = Cli::try_parse_from([
            "apiaudit",
            "--log-level",
            "debug",
            "locate",
            "api.yaml",
            "--report",
            "report.json",
            "--format",
            "sarif",
        ])
        .unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Commands::Locate(args) => {
                assert_eq!(args.format, locate::OutputFormat::Sarif);
                assert_eq!(args.report, std::path::PathBuf::from("report.json"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
