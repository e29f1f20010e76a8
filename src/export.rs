//! # Tree Export
//!
//! The overlay phase materializes each segment path of a host into the same
//! working directory. Where the files come from is abstracted behind the
//! [`TreeExporter`] trait so that the pipeline can be driven by a Subversion
//! repository in production and by a plain directory in tests.
//!
//! - [`LocalExporter`] copies `<root>/<segment path>` from a working copy.
//! - [`SvnExporter`] runs `svn export` against a repository URL. It uses the
//!   system `svn` command, which picks up the user's configured credentials.
//!
//! Both report a segment path that does not exist as
//! [`Error::PathNotFound`], which the overlay phase treats as an empty
//! segment.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// One file materialized by an export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    /// Path in the source tree, e.g. `loc/ber/etc/ntp.conf`.
    pub source_path: String,
    /// Path relative to the export destination, e.g. `etc/ntp.conf`.
    pub relative_path: PathBuf,
}

/// Materializes source sub-trees into a destination directory.
pub trait TreeExporter: Send + Sync {
    /// Export `source_path` at `revision` into `destination`, overwriting
    /// files that already exist there.
    fn export(
        &self,
        source_path: &str,
        destination: &Path,
        revision: &str,
    ) -> Result<Vec<ExportedFile>>;

    /// Human-readable change log for `revision`.
    fn log(&self, _revision: &str) -> Result<String> {
        Ok(String::new())
    }
}

/// Exports from a local working copy. The revision is not interpreted.
#[derive(Debug, Clone)]
pub struct LocalExporter {
    root: PathBuf,
}

impl LocalExporter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TreeExporter for LocalExporter {
    fn export(
        &self,
        source_path: &str,
        destination: &Path,
        revision: &str,
    ) -> Result<Vec<ExportedFile>> {
        let source = self.root.join(source_path);
        if !source.is_dir() {
            return Err(Error::PathNotFound {
                path: source_path.to_string(),
                revision: revision.to_string(),
            });
        }
        copy_tree(&source, destination, source_path)
    }
}

/// Exports from a Subversion repository with the `svn` command line client.
#[derive(Debug, Clone)]
pub struct SvnExporter {
    url: String,
}

impl SvnExporter {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
        }
    }

    fn run(&self, args: &[&str], path: &str, revision: &str) -> Result<String> {
        debug!("Running svn {}", args.join(" "));
        let output = Command::new("svn")
            .args(args)
            .output()
            .map_err(|e| Error::Export {
                command: format!("svn {}", args.join(" ")),
                path: path.to_string(),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            if is_missing_path(&stderr) {
                return Err(Error::PathNotFound {
                    path: path.to_string(),
                    revision: revision.to_string(),
                });
            }
            return Err(Error::Export {
                command: format!("svn {}", args.join(" ")),
                path: path.to_string(),
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl TreeExporter for SvnExporter {
    fn export(
        &self,
        source_path: &str,
        destination: &Path,
        revision: &str,
    ) -> Result<Vec<ExportedFile>> {
        // Export into scratch space, then overlay file by file.
        let staging = staging_dir(destination)?;
        let url = format!("{}/{}", self.url, source_path);
        let target = staging.path().join("export");
        let target_str = target.to_string_lossy().to_string();

        let result = self
            .run(
                &["export", "--force", "--quiet", "-r", revision, &url, &target_str],
                source_path,
                revision,
            )
            .and_then(|_| copy_tree(&target, destination, source_path));

        staging.close()?;
        result
    }

    fn log(&self, revision: &str) -> Result<String> {
        self.run(&["log", "-r", revision, &self.url], "", revision)
    }
}

/// Whether `svn` stderr says the requested path does not exist.
fn is_missing_path(stderr: &str) -> bool {
    stderr.contains("E170000")
        || stderr.contains("E160013")
        || stderr.contains("path not found")
        || stderr.contains("doesn't exist")
}

/// A scratch directory next to `destination`, removed when dropped.
fn staging_dir(destination: &Path) -> Result<TempDir> {
    let parent = destination.parent().unwrap_or(destination);
    tempfile::Builder::new()
        .prefix(".svn-export-")
        .tempdir_in(parent)
        .map_err(|e| Error::Filesystem {
            message: format!(
                "Failed to create staging directory in '{}': {}",
                parent.display(),
                e
            ),
        })
}

/// Copy every file below `source` into `destination`, overwriting.
fn copy_tree(source: &Path, destination: &Path, source_path: &str) -> Result<Vec<ExportedFile>> {
    let mut exported = Vec::new();

    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| Error::Filesystem {
                message: format!("Failed to relativize '{}': {}", entry.path().display(), e),
            })?
            .to_path_buf();
        // Working copy metadata never belongs to a host tree.
        if relative.components().any(|c| c.as_os_str() == ".svn") {
            continue;
        }

        let target = destination.join(&relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::Filesystem {
                message: format!("Failed to create directory '{}': {}", parent.display(), e),
            })?;
        }
        fs::copy(entry.path(), &target).map_err(|e| Error::Filesystem {
            message: format!("Failed to write file '{}': {}", target.display(), e),
        })?;

        exported.push(ExportedFile {
            source_path: format!(
                "{}/{}",
                source_path.trim_end_matches('/'),
                relative.to_string_lossy()
            ),
            relative_path: relative,
        });
    }

    Ok(exported)
}
