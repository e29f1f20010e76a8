//! CLI argument parsing and command dispatch

use std::str::FromStr;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};

use crate::commands;

/// hostconf - Build host configuration trees from segment overlays
#[derive(Parser, Debug)]
#[command(name = "hostconf")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace); RUST_LOG overrides it
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the configuration trees of one or more hosts
    Build(commands::build::BuildArgs),

    /// List the hosts affected by changed repository paths
    Affected(commands::affected::AffectedArgs),

    /// Show the segment paths overlaid for a host
    Overlay(commands::overlay::OverlayArgs),

    /// Check a variables directory and dry-run substitution on a tree
    Check(commands::check::CheckArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level)?;

        match self.command {
            Commands::Build(args) => commands::build::execute(args, &self.color),
            Commands::Affected(args) => commands::affected::execute(args),
            Commands::Overlay(args) => commands::overlay::execute(args),
            Commands::Check(args) => commands::check::execute(args, &self.color),
        }
    }
}

/// Route `log` records to stderr at `level`, unless `RUST_LOG` says otherwise.
fn init_logging(level: &str) -> Result<()> {
    let level = log::LevelFilter::from_str(level)
        .map_err(|_| anyhow!("Invalid log level '{}'", level))?;

    env_logger::Builder::new()
        .filter_level(level)
        .parse_env("RUST_LOG")
        .target(env_logger::Target::Stderr)
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_build_with_hosts() {
        let cli = Cli::try_parse_from(["hostconf", "build", "berweb01", "-r", "42"]).unwrap();
        match cli.command {
            Commands::Build(args) => {
                assert_eq!(args.hosts, vec!["berweb01"]);
                assert_eq!(args.revision, "42");
            }
            other => panic!("expected build, got {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "hostconf",
            "affected",
            "host/berweb01/etc",
            "--log-level",
            "debug",
            "--color",
            "never",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        assert_eq!(cli.color, "never");
    }

    #[test]
    fn test_affected_requires_paths() {
        assert!(Cli::try_parse_from(["hostconf", "affected"]).is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let err = init_logging("loud").unwrap_err();
        assert!(err.to_string().contains("Invalid log level"));
    }
}
