//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the `hostconf`
//! command-line tool. Each subcommand is defined in its own file.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic by calling into the `hostconf` library.

use std::path::Path;

use anyhow::Result;

use hostconf::config::{self, Settings};

pub mod affected;
pub mod build;
pub mod check;
pub mod overlay;

/// Load the settings file, with the path in the error message.
pub fn load_settings(path: &Path) -> Result<Settings> {
    config::from_file(path)
        .map_err(|e| anyhow::anyhow!("Failed to load settings from {}: {}", path.display(), e))
}
