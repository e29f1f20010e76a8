//! # Settings Schema and Parsing
//!
//! This module defines the `hostconf.yaml` settings file and the logic for
//! parsing it. Settings are an explicit value: they are loaded once by the CLI
//! (or built in code with `Settings::default()`) and passed to every component
//! that needs them. There is no global configuration state.
//!
//! ```yaml
//! source:
//!   local: /srv/config-checkout
//! hosts: [berweb01, fraweb02]
//! production_locations: [ber]
//! repo_packages: "^(httpd|nginx)"
//! threads: 4
//! ```

use crate::error::{Error, Result};
use crate::segment::SegmentSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default size limit for files handed to the token replacer.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Where segment sub-trees are exported from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// A local working copy; `<root>/<segment path>` is copied.
    Local(PathBuf),
    /// A Subversion repository URL; segment paths are exported with `svn export`.
    Svn(String),
}

/// Settings for one `hostconf` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Source tree the segments are exported from.
    pub source: Option<Source>,
    /// All hosts known to the configuration tree.
    pub hosts: Vec<String>,
    /// Location codes that additionally belong to the production alias.
    pub production_locations: Vec<String>,
    /// Name of the alias location shared by all production locations.
    pub production_alias: String,
    /// Regex selecting the packages that come from the package repositories.
    pub repo_packages: Option<String>,
    /// Files larger than this many bytes are refused by the token replacer.
    pub max_file_size: u64,
    /// Size of the worker pool building hosts.
    pub threads: usize,
    /// Stop dispatching new hosts after this many failures (0 disables).
    pub max_failed_hosts: usize,
    /// Domain appended to host names to form the FQDN.
    pub domain: Option<String>,
    /// Fail a host whose name does not resolve instead of leaving `IP` empty.
    pub strict_host_lookup: bool,
    /// Keep per-host working directories after a build.
    pub keep_workdir: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source: None,
            hosts: Vec::new(),
            production_locations: Vec::new(),
            production_alias: "pro".to_string(),
            repo_packages: None,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            threads: 4,
            max_failed_hosts: 0,
            domain: None,
            strict_host_lookup: false,
            keep_workdir: false,
        }
    }
}

impl Settings {
    /// The part of the settings the segment rules depend on.
    pub fn segment_settings(&self) -> SegmentSettings {
        SegmentSettings {
            production_locations: self.production_locations.clone(),
            production_alias: self.production_alias.clone(),
        }
    }

    /// Check values that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(Error::ConfigParse {
                message: "threads must be at least 1".to_string(),
                hint: None,
            });
        }
        if self.production_alias.is_empty() {
            return Err(Error::ConfigParse {
                message: "production_alias must not be empty".to_string(),
                hint: None,
            });
        }
        if let Some(pattern) = &self.repo_packages {
            regex::Regex::new(pattern)?;
        }
        Ok(())
    }

    /// The configured source, or an error explaining how to set one.
    pub fn require_source(&self) -> Result<&Source> {
        self.source.as_ref().ok_or_else(|| Error::ConfigParse {
            message: "no source configured".to_string(),
            hint: Some("add `source: {local: <dir>}` or `source: {svn: <url>}`".to_string()),
        })
    }
}

/// Parse settings from a YAML string.
pub fn parse(yaml_content: &str) -> Result<Settings> {
    if yaml_content.trim().is_empty() {
        return Ok(Settings::default());
    }
    let settings: Settings = serde_yaml::from_str(yaml_content).map_err(|e| {
        let message = e.to_string();
        let hint = message
            .contains("unknown field")
            .then(|| "check the spelling of the settings keys".to_string());
        Error::ConfigParse { message, hint }
    })?;
    settings.validate()?;
    Ok(settings)
}

/// Load settings from a file.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let content = std::fs::read_to_string(path.as_ref())?;
    parse(&content)
}
