//! Phase 6: Writing to Disk
//!
//! The final phase of a host build copies the substituted tree and its
//! browsable rendering from the working directory to the output directory.
//!
//! ## Process
//!
//! 1.  **Clear**: The destination directory is recreated empty, so files that
//!     disappeared from the source tree do not linger in the output.
//!
//! 2.  **Create Directories**: For each file, creates any necessary parent
//!     directories recursively.
//!
//! 3.  **Copy Content**: Copies the file, keeping its permissions (e.g. the
//!     executable bit of scripts).

use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use super::recreate_dir;
use crate::error::{Error, Result};

/// Execute Phase 6: replace `destination` with a copy of `source`.
///
/// Returns the number of files written.
pub fn execute(source: &Path, destination: &Path) -> Result<usize> {
    recreate_dir(destination)?;
    copy_dir(source, destination)
}

/// Copy every file below `source` into `destination`, overwriting.
pub fn copy_dir(source: &Path, destination: &Path) -> Result<usize> {
    let mut written = 0;

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
            })?;
        let full_path = destination.join(relative);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::Filesystem {
                message: format!("Failed to create directory '{}': {}", parent.display(), e),
            })?;
        }

        fs::copy(entry.path(), &full_path).map_err(|e| Error::Filesystem {
            message: format!("Failed to write file '{}': {}", full_path.display(), e),
        })?;
        written += 1;
    }

    Ok(written)
}
