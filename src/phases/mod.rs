//! Implementation of the per-host build pipeline.
//!
//! ## Overview
//!
//! Building one host follows these phases:
//! 1. Overlay - export every segment path of the host, general to specific,
//!    into one merged tree, collecting dependency files on the way
//! 2. Variables - write the derived variables into the tree's `VARIABLES/`
//! 3. Viewer copy - snapshot the unsubstituted tree for the browsable rendering
//! 4. Substitution - check the token table and substitute the merged tree
//! 5. Viewer rendering - substitute the snapshot with HTML escaping
//! 6. Writing - copy both trees to the output directory
//!
//! Phases 1 and 2 are exposed together as [`build_host_tree`]. The
//! [`orchestrator`] runs the complete pipeline for many hosts in parallel.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;

use crate::config::{Settings, Source};
use crate::defaults::VARIABLES_DIR;
use crate::dependency::DependencyBuckets;
use crate::error::{Error, Result};
use crate::export::{LocalExporter, SvnExporter, TreeExporter};
use crate::host::{DnsLookup, HostLookup};
use crate::segment::validate_hostname;

pub mod orchestrator;
pub mod overlay;
pub mod substitute;
pub mod variables;
pub mod viewer;
pub mod write;

pub use orchestrator::{build_host, build_hosts, BuildSummary, HostBuild, HostFailure, HostOutcome};

/// Everything a host build needs besides the host name and revision.
pub struct BuildContext {
    pub settings: Settings,
    pub exporter: Arc<dyn TreeExporter>,
    pub lookup: Arc<dyn HostLookup>,
    /// Per-host working directories are created below this directory.
    pub work_root: PathBuf,
    /// Results are written to `<output>/<host>/`.
    pub output: PathBuf,
}

impl BuildContext {
    pub fn new(
        settings: Settings,
        exporter: Arc<dyn TreeExporter>,
        lookup: Arc<dyn HostLookup>,
        work_root: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            settings,
            exporter,
            lookup,
            work_root: work_root.into(),
            output: output.into(),
        }
    }

    /// Build a context whose collaborators are chosen by the settings.
    pub fn from_settings(
        settings: Settings,
        work_root: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Result<Self> {
        let exporter: Arc<dyn TreeExporter> = match settings.require_source()? {
            Source::Local(root) => Arc::new(LocalExporter::new(root.clone())),
            Source::Svn(url) => Arc::new(SvnExporter::new(url.clone())),
        };
        let lookup =
            Arc::new(DnsLookup::new(settings.domain.clone()).strict(settings.strict_host_lookup));
        Ok(Self::new(settings, exporter, lookup, work_root, output))
    }

    /// Working directory of one host.
    pub fn work_dir(&self, hostname: &str) -> PathBuf {
        self.work_root.join(hostname)
    }
}

/// A merged host tree with its variables written, ready for substitution.
#[derive(Debug, Clone)]
pub struct HostTree {
    pub root: PathBuf,
    pub variables_dir: PathBuf,
    pub dependencies: DependencyBuckets,
    /// Segment paths that contributed to the tree, in overlay order.
    pub overlaying: Vec<String>,
}

/// Export and merge the overlay tree of `hostname` and write its variables.
///
/// The tree is built in `<work_root>/<hostname>/tree`, which is recreated
/// from scratch.
pub fn build_host_tree(hostname: &str, revision: &str, ctx: &BuildContext) -> Result<HostTree> {
    validate_hostname(hostname)?;

    let root = ctx.work_dir(hostname).join("tree");
    recreate_dir(&root)?;

    let merged = overlay::execute(hostname, revision, ctx, &root)?;
    let variables_dir = root.join(VARIABLES_DIR);
    variables::execute(hostname, revision, ctx, &merged, &variables_dir)?;

    Ok(HostTree {
        root,
        variables_dir,
        dependencies: merged.dependencies,
        overlaying: merged.overlaying,
    })
}

/// Remove `dir` if it exists and create it empty.
pub(crate) fn recreate_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        debug!("Removing stale directory {}", dir.display());
        fs::remove_dir_all(dir).map_err(|e| Error::Filesystem {
            message: format!("Failed to remove directory '{}': {}", dir.display(), e),
        })?;
    }
    fs::create_dir_all(dir).map_err(|e| Error::Filesystem {
        message: format!("Failed to create directory '{}': {}", dir.display(), e),
    })
}
