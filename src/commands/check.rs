//! # Check Command Implementation
//!
//! Validates a variables directory and dry-runs the substitution of a tree:
//!
//! - **Cycle Detection**: every cycle in the token references is reported,
//!   not just the first one found.
//! - **Dry Run**: the tree is copied to a scratch directory and substituted
//!   there, so missing tokens and oversized files surface without touching
//!   the original files. The scratch root may not lie inside the tree.
//! - **Unused Variables**: variables that no file references are listed.

use anyhow::{bail, Context, Result};
use clap::Args;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use hostconf::config::DEFAULT_MAX_FILE_SIZE;
use hostconf::defaults::{default_work_root, VARIABLES_DIR};
use hostconf::error::Error;
use hostconf::output::{marker, OutputConfig, Status};
use hostconf::phases::write::copy_dir;
use hostconf::token::{build_graph, filter_directory, find_cycles, ReplaceOptions, TokenTable};

/// Check a variables directory and dry-run substitution on a tree
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Tree to check.
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Variables directory. Defaults to `<DIR>/VARIABLES`.
    #[arg(long, value_name = "DIR")]
    pub variables: Option<PathBuf>,

    /// Files larger than this many bytes are reported as errors.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_FILE_SIZE)]
    pub max_file_size: u64,

    /// Scratch directory root for the dry run.
    #[arg(long, value_name = "DIR", env = "HOSTCONF_WORK_DIR")]
    pub work_dir: Option<PathBuf>,
}

/// Execute the `check` command.
pub fn execute(args: CheckArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let variables = args
        .variables
        .clone()
        .unwrap_or_else(|| args.dir.join(VARIABLES_DIR));

    println!(
        "{} Checking variables in {}",
        marker(&out, Status::Scan),
        variables.display()
    );
    let table = TokenTable::from_dir(&variables).map_err(|e| {
        anyhow::anyhow!("Failed to load variables from {}: {}", variables.display(), e)
    })?;
    println!("   {} variables loaded", table.len());

    let cycles = find_cycles(&build_graph(&table));
    if !cycles.is_empty() {
        for cycle in &cycles {
            println!(
                "{} Cycle: {}",
                marker(&out, Status::Error),
                cycle.join(" -> ")
            );
        }
        return Err(Error::CycleDetected { components: cycles }.into());
    }
    println!("{} No cycles detected", marker(&out, Status::Ok));

    let scratch = scratch_dir(&args)?;
    let result = dry_run(&args, &variables, scratch.path());
    scratch.close()?;
    let report = result?;

    println!(
        "{} Dry run: {} files would change, {} unchanged, {} binary skipped",
        marker(&out, Status::Ok),
        report.files_filtered,
        report.files_unchanged,
        report.files_skipped
    );
    if !report.unused.is_empty() {
        println!("{} Unused variables:", marker(&out, Status::Warning));
        for name in &report.unused {
            println!("   {}", name);
        }
    }
    Ok(())
}

/// Create the dry-run scratch directory below the work root.
///
/// A work root inside the checked tree would be copied into itself.
fn scratch_dir(args: &CheckArgs) -> Result<TempDir> {
    let work_root = args.work_dir.clone().unwrap_or_else(default_work_root);
    let tree = args
        .dir
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", args.dir.display()))?;
    let resolved = resolve(&work_root)
        .with_context(|| format!("Failed to resolve {}", work_root.display()))?;
    if resolved.starts_with(&tree) {
        bail!(
            "Work directory {} is inside the checked tree {}",
            work_root.display(),
            args.dir.display()
        );
    }

    fs::create_dir_all(&work_root)?;
    tempfile::Builder::new()
        .prefix("check-")
        .tempdir_in(&work_root)
        .with_context(|| format!("Failed to create scratch directory in {}", work_root.display()))
}

/// Canonicalize `path`, allowing trailing components that do not exist yet.
fn resolve(path: &Path) -> io::Result<PathBuf> {
    match path.canonicalize() {
        Ok(resolved) => Ok(resolved),
        Err(e) if path.exists() => Err(e),
        Err(e) => match (path.parent(), path.file_name()) {
            (Some(parent), Some(name)) => {
                let parent = if parent.as_os_str().is_empty() {
                    Path::new(".")
                } else {
                    parent
                };
                Ok(resolve(parent)?.join(name))
            }
            _ => Err(e),
        },
    }
}

/// Substitute a copy of the tree below `scratch`.
fn dry_run(
    args: &CheckArgs,
    variables: &Path,
    scratch: &Path,
) -> Result<hostconf::token::FilterReport> {
    copy_dir(&args.dir, scratch)?;

    // Variables inside the tree are excluded at their copied location.
    let variables = match variables.strip_prefix(&args.dir) {
        Ok(relative) => scratch.join(relative),
        Err(_) => variables.to_path_buf(),
    };
    let options = ReplaceOptions {
        max_file_size: args.max_file_size,
        ..ReplaceOptions::default()
    };
    Ok(filter_directory(scratch, &variables, options)?)
}
