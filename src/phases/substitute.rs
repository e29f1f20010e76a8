//! Phase 4: Substitution
//!
//! Checks the token table of a merged host tree and substitutes it into
//! every file of the tree, except the variables themselves.

use log::info;

use super::HostTree;
use crate::error::Result;
use crate::token::{filter_directory, FilterReport, ReplaceOptions};

/// Execute Phase 4: substitute the tokens of `tree` in place.
pub fn execute(hostname: &str, tree: &HostTree, max_file_size: u64) -> Result<FilterReport> {
    let options = ReplaceOptions {
        max_file_size,
        ..ReplaceOptions::default()
    };
    let report = filter_directory(&tree.root, &tree.variables_dir, options)?;
    info!(
        "{}: filtered {} files ({} unchanged, {} skipped), {} of {} variables used",
        hostname,
        report.files_filtered,
        report.files_unchanged,
        report.files_skipped,
        report.used.len(),
        report.used.len() + report.unused.len()
    );
    Ok(report)
}
