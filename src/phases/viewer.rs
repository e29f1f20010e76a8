//! Phases 3 and 5: the browsable rendering of a host tree.
//!
//! Before substitution the merged tree is snapshotted. After the real tree
//! has been substituted, the snapshot is substituted with the viewer options:
//! file content is HTML-escaped and every substituted value is wrapped in a
//! `<span class="token" title="NAME">` element, so a reader can see which
//! token produced which text.

use std::path::{Path, PathBuf};

use log::debug;

use super::write::copy_dir;
use super::{recreate_dir, HostTree};
use crate::defaults::VARIABLES_DIR;
use crate::error::Result;
use crate::token::{filter_directory, FilterReport, ReplaceOptions};

/// Execute Phase 3: copy the unsubstituted tree to `view_root`.
pub fn snapshot(tree: &HostTree, view_root: &Path) -> Result<PathBuf> {
    recreate_dir(view_root)?;
    let copied = copy_dir(&tree.root, view_root)?;
    debug!("Snapshotted {} files to {}", copied, view_root.display());
    Ok(view_root.to_path_buf())
}

/// Execute Phase 5: render the snapshot at `view_root` in place.
pub fn render(view_root: &Path, max_file_size: u64) -> Result<FilterReport> {
    filter_directory(
        view_root,
        &view_root.join(VARIABLES_DIR),
        ReplaceOptions::viewer(max_file_size),
    )
}
