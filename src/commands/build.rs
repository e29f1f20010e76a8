//! # Build Command Implementation
//!
//! This module implements the `build` subcommand, which builds the
//! configuration trees of hosts.
//!
//! ## Host Selection
//!
//! 1.  Hosts named on the command line.
//! 2.  Otherwise, with `--changed`, the hosts affected by the changed paths.
//! 3.  Otherwise, every host of the settings file.
//!
//! Hosts are built in parallel. Each host ends up in `<output>/<host>/tree`
//! (substituted) and `<output>/<host>/view` (browsable rendering). A failing
//! host does not stop the others, but the command exits with an error when
//! any host failed or was skipped.

use anyhow::Result;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use hostconf::defaults::{default_work_root, DEFAULT_OUTPUT_DIR, SETTINGS_FILE};
use hostconf::output::{marker, OutputConfig, Status};
use hostconf::overlay::resolve_affected_hosts;
use hostconf::phases::{build_hosts, BuildContext, BuildSummary, HostOutcome};

use super::load_settings;

/// Build the configuration trees of one or more hosts
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Hosts to build. Defaults to the affected hosts with `--changed`, or to
    /// every host of the settings file.
    #[arg(value_name = "HOST")]
    pub hosts: Vec<String>,

    /// Path to the settings file.
    #[arg(short, long, value_name = "FILE", default_value = SETTINGS_FILE, env = "HOSTCONF_CONFIG")]
    pub config: PathBuf,

    /// Source revision to build.
    #[arg(short, long, value_name = "REV", default_value = "HEAD")]
    pub revision: String,

    /// Output directory for the host trees.
    #[arg(short, long, value_name = "DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,

    /// Root directory for per-host working directories.
    ///
    /// Defaults to the system cache directory (`~/.cache/hostconf` on Linux).
    #[arg(long, value_name = "DIR", env = "HOSTCONF_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    /// Build only the hosts affected by this changed repository path.
    /// May be repeated.
    #[arg(long = "changed", value_name = "PATH")]
    pub changed: Vec<String>,

    /// Print the build summary as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute the `build` command.
pub fn execute(args: BuildArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let settings = load_settings(&args.config)?;

    let hosts = select_hosts(&args, &settings);
    if hosts.is_empty() {
        if args.json {
            let summary = BuildSummary {
                revision: args.revision.clone(),
                ..BuildSummary::default()
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            println!("{} No hosts to build", marker(&out, Status::Info));
        }
        return Ok(());
    }

    let work_root = args.work_dir.clone().unwrap_or_else(default_work_root);
    let ctx = BuildContext::from_settings(settings, work_root, &args.output)?;

    let bar = if args.json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(hosts.len() as u64)
    };
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let summary = build_hosts(&hosts, &args.revision, &ctx, |outcome| {
        if let HostOutcome::Failed(failure) = outcome {
            bar.println(format!(
                "{} {}: {}",
                marker(&out, Status::Error),
                failure.host,
                failure.error
            ));
        }
        bar.set_message(outcome.host().to_string());
        bar.inc(1);
    })?;
    bar.finish_and_clear();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary, &out);
    }

    if summary.is_success() {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "{} of {} hosts failed, {} skipped",
            summary.failed.len(),
            hosts.len(),
            summary.skipped.len()
        ))
    }
}

/// The hosts this invocation builds, in the order given or sorted.
fn select_hosts(args: &BuildArgs, settings: &hostconf::config::Settings) -> Vec<String> {
    if !args.hosts.is_empty() {
        return args.hosts.clone();
    }
    if !args.changed.is_empty() {
        return resolve_affected_hosts(&args.changed, &settings.hosts, &settings.segment_settings())
            .into_iter()
            .collect();
    }
    settings.hosts.clone()
}

fn print_summary(summary: &BuildSummary, out: &OutputConfig) {
    for build in &summary.built {
        println!(
            "{} {} -> {} ({} files, {} unused variables)",
            marker(out, Status::Ok),
            build.host,
            build.tree.display(),
            build.files_written,
            build.unused_variables.len()
        );
    }
    for failure in &summary.failed {
        println!(
            "{} {}: {}",
            marker(out, Status::Error),
            failure.host,
            failure.error
        );
    }
    for host in &summary.skipped {
        println!("{} {}: skipped", marker(out, Status::Skipped), host);
    }
    println!(
        "\n{} Revision {}: {} built, {} failed, {} skipped",
        marker(out, Status::Done),
        summary.revision,
        summary.built.len(),
        summary.failed.len(),
        summary.skipped.len()
    );
}
