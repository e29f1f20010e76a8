//! Orchestrator for complete host builds
//!
//! [`build_host`] runs the full pipeline for one host, [`build_hosts`] runs
//! it for many hosts on a worker pool sized by `settings.threads`.
//!
//! Each job owns its working directory and all token and dependency state,
//! so jobs share nothing but the read-only [`BuildContext`]. Results are fanned
//! in through a channel to the calling thread, which hands each one to a
//! callback as soon as it arrives (the CLI drives its progress bar from it).
//!
//! A failing host does not stop the others. Once `max_failed_hosts` failures
//! have been counted (when non-zero), hosts that have not started yet are
//! recorded as skipped; builds already running finish normally.

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;

use log::{error, info, warn};
use serde::Serialize;

use super::{build_host_tree, substitute, viewer, write, BuildContext};
use crate::error::{Error, Result};

/// A successfully built host.
#[derive(Debug, Clone, Serialize)]
pub struct HostBuild {
    pub host: String,
    /// Substituted tree, `<output>/<host>/tree`.
    pub tree: PathBuf,
    /// Browsable rendering, `<output>/<host>/view`.
    pub view: PathBuf,
    pub overlaying: Vec<String>,
    pub files_written: usize,
    pub used_variables: BTreeSet<String>,
    pub unused_variables: BTreeSet<String>,
}

/// A host whose build failed.
#[derive(Debug, Clone, Serialize)]
pub struct HostFailure {
    pub host: String,
    pub error: String,
}

/// What happened to one host of a run.
#[derive(Debug, Clone)]
pub enum HostOutcome {
    Built(HostBuild),
    Failed(HostFailure),
    /// Not attempted because too many hosts had failed.
    Skipped(String),
}

impl HostOutcome {
    pub fn host(&self) -> &str {
        match self {
            HostOutcome::Built(build) => &build.host,
            HostOutcome::Failed(failure) => &failure.host,
            HostOutcome::Skipped(host) => host,
        }
    }
}

/// Results of a multi-host run, each list sorted by host name.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildSummary {
    pub revision: String,
    pub built: Vec<HostBuild>,
    pub failed: Vec<HostFailure>,
    pub skipped: Vec<String>,
}

impl BuildSummary {
    fn record(&mut self, outcome: HostOutcome) {
        match outcome {
            HostOutcome::Built(build) => self.built.push(build),
            HostOutcome::Failed(failure) => self.failed.push(failure),
            HostOutcome::Skipped(host) => self.skipped.push(host),
        }
    }

    fn sort(&mut self) {
        self.built.sort_by(|a, b| a.host.cmp(&b.host));
        self.failed.sort_by(|a, b| a.host.cmp(&b.host));
        self.skipped.sort();
    }

    /// Whether every requested host was built.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// Build one host completely and write it to `<output>/<host>/`.
///
/// The working directory is removed afterwards, whether the build succeeded
/// or not, unless `keep_workdir` is set.
pub fn build_host(hostname: &str, revision: &str, ctx: &BuildContext) -> Result<HostBuild> {
    let result = run_pipeline(hostname, revision, ctx);

    let work_dir = ctx.work_dir(hostname);
    if ctx.settings.keep_workdir {
        info!("{}: keeping working directory {}", hostname, work_dir.display());
    } else if work_dir.exists() {
        if let Err(e) = fs::remove_dir_all(&work_dir) {
            warn!(
                "{}: failed to remove working directory {}: {}",
                hostname,
                work_dir.display(),
                e
            );
        }
    }

    result
}

fn run_pipeline(hostname: &str, revision: &str, ctx: &BuildContext) -> Result<HostBuild> {
    let max_file_size = ctx.settings.max_file_size;

    // Phases 1 and 2
    let tree = build_host_tree(hostname, revision, ctx)?;

    // Phase 3: snapshot before the tree is substituted
    let view = viewer::snapshot(&tree, &ctx.work_dir(hostname).join("view"))?;

    // Phase 4
    let report = substitute::execute(hostname, &tree, max_file_size)?;

    // Phase 5
    viewer::render(&view, max_file_size)?;

    // Phase 6
    let output = ctx.output.join(hostname);
    let tree_out = output.join("tree");
    let view_out = output.join("view");
    let files_written = write::execute(&tree.root, &tree_out)?;
    write::execute(&view, &view_out)?;

    Ok(HostBuild {
        host: hostname.to_string(),
        tree: tree_out,
        view: view_out,
        overlaying: tree.overlaying,
        files_written,
        used_variables: report.used,
        unused_variables: report.unused,
    })
}

/// Build every host in `hosts` in parallel.
///
/// `on_outcome` is called on the calling thread for each host as its build
/// finishes. Per-host failures are collected in the summary; only a failure
/// to set up the worker pool is returned as an error.
pub fn build_hosts<F>(
    hosts: &[String],
    revision: &str,
    ctx: &BuildContext,
    mut on_outcome: F,
) -> Result<BuildSummary>
where
    F: FnMut(&HostOutcome),
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(ctx.settings.threads)
        .thread_name(|i| format!("hostconf-worker-{}", i))
        .build()
        .map_err(|e| Error::WorkerPool {
            message: e.to_string(),
        })?;

    let max_failed = ctx.settings.max_failed_hosts;
    let failures = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<HostOutcome>();
    let mut summary = BuildSummary {
        revision: revision.to_string(),
        ..BuildSummary::default()
    };

    info!(
        "Building {} hosts at revision {} with {} workers",
        hosts.len(),
        revision,
        ctx.settings.threads
    );

    std::thread::scope(|s| {
        let failures = &failures;
        let pool = &pool;
        s.spawn(move || {
            pool.scope(|scope| {
                for host in hosts {
                    let tx = tx.clone();
                    scope.spawn(move |_| {
                        let outcome = if max_failed > 0
                            && failures.load(Ordering::SeqCst) >= max_failed
                        {
                            warn!("{}: skipped after {} failed hosts", host, max_failed);
                            HostOutcome::Skipped(host.clone())
                        } else {
                            match build_host(host, revision, ctx) {
                                Ok(build) => HostOutcome::Built(build),
                                Err(e) => {
                                    failures.fetch_add(1, Ordering::SeqCst);
                                    error!("{}: {}", host, e);
                                    HostOutcome::Failed(HostFailure {
                                        host: host.clone(),
                                        error: e.to_string(),
                                    })
                                }
                            }
                        };
                        // The receiver outlives every worker.
                        let _ = tx.send(outcome);
                    });
                }
            });
        });

        for outcome in rx {
            on_outcome(&outcome);
            summary.record(outcome);
        }
    });

    summary.sort();
    info!(
        "Built {} hosts, {} failed, {} skipped",
        summary.built.len(),
        summary.failed.len(),
        summary.skipped.len()
    );
    Ok(summary)
}
