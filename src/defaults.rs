//! Default values for hostconf.
//!
//! This module provides centralized default values used across commands,
//! ensuring consistency and avoiding duplication.

use std::path::PathBuf;

/// Settings file looked up in the current directory when `--config` is absent.
pub const SETTINGS_FILE: &str = "hostconf.yaml";

/// Directory `build` writes host trees to when `--output` is absent.
pub const DEFAULT_OUTPUT_DIR: &str = "hostconf-out";

/// Name of the per-host directory holding one file per variable.
pub const VARIABLES_DIR: &str = "VARIABLES";

/// Returns the default work directory for per-host build trees.
///
/// Uses the platform-appropriate cache directory:
/// - Linux: `~/.cache/hostconf` (XDG Base Directory)
/// - macOS: `~/Library/Caches/hostconf`
/// - Windows: `{FOLDERID_LocalAppData}\hostconf`
///
/// Falls back to `.hostconf-work` in the current directory if the
/// platform cache directory cannot be determined.
///
/// This can be overridden by the `--work-dir` CLI flag or the
/// `HOSTCONF_WORK_DIR` environment variable.
pub fn default_work_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".hostconf-work"))
        .join("hostconf")
}
