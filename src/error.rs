//! # Error Handling
//!
//! This module defines the centralized error type for `hostconf`. It uses the
//! `thiserror` library to create one `Error` enum covering every failure mode
//! of the overlay and substitution pipeline, so that callers can tell the kinds
//! apart and decide whether a failure is host-local or fatal for the run.
//!
//! ## Kinds
//!
//! - Configuration errors (`ConfigParse`, `Regex`, `Yaml`) fail fast when
//!   settings or accumulators are constructed.
//! - `CycleDetected` blocks all substitution for the affected token table and
//!   carries every offending strongly-connected component. `ExpansionCycle`
//!   catches the cycles only visible while substituting, where a value joins
//!   the surrounding text into a placeholder.
//! - `MissingToken` carries the token name and, when known, the file it was
//!   referenced from.
//! - `CannotFilter` reports a file above the configured size limit.
//! - `PathNotFound` is raised by exporters for segment paths that do not exist
//!   at a revision. The overlay phase treats it as "segment is empty".
//! - `Export`, `HostLookup`, `Filesystem`, `Io` and `WorkerPool` cover the
//!   collaborators and the plumbing around the core.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for hostconf operations
#[derive(Error, Debug)]
pub enum Error {
    /// An error occurred while parsing the settings file.
    ///
    /// This error includes the specific parsing issue and optionally a hint
    /// about how to fix it.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A host name does not have the fixed `LLLTTTNN` shape.
    #[error("Invalid hostname '{hostname}': {message}")]
    InvalidHostname { hostname: String, message: String },

    /// The token reference graph contains one or more cycles.
    #[error("Cycle detected in token references: {}", format_components(components))]
    CycleDetected {
        /// Every strongly-connected component that forms a cycle.
        components: Vec<Vec<String>>,
    },

    /// Substituting a token produced a placeholder for that same token.
    ///
    /// Raised when values only form a reference together with the text
    /// around them, so the reference graph could not see the cycle.
    #[error("Token '{token}' re-enters its own expansion via {}{}", chain.join(" -> "), path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    ExpansionCycle {
        token: String,
        /// Tokens whose expansion produced the placeholder, outermost first.
        chain: Vec<String>,
        path: Option<PathBuf>,
    },

    /// A placeholder referenced a token that is not defined.
    #[error("Missing token '{token}'{}", path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    MissingToken {
        token: String,
        /// The file the placeholder was found in, if any.
        path: Option<PathBuf>,
    },

    /// A file is too large to be filtered.
    #[error("Cannot filter {}: file exceeds the size limit of {limit} bytes", path.display())]
    CannotFilter { path: PathBuf, limit: u64 },

    /// A source path does not exist at the requested revision.
    #[error("Path not found: {path}@{revision}")]
    PathNotFound { path: String, revision: String },

    /// An external export command failed.
    #[error("Export command failed for {path}: {command} - {stderr}")]
    Export {
        command: String,
        path: String,
        stderr: String,
    },

    /// Host information (IP, FQDN) could not be resolved.
    #[error("Host lookup failed for {host}: {message}")]
    HostLookup { host: String, message: String },

    /// An error occurred with a filesystem operation.
    #[error("Filesystem operation error: {message}")]
    Filesystem { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A directory walk error, wrapped from `walkdir::Error`.
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// The worker pool for parallel host builds could not be created.
    #[error("Worker pool error: {message}")]
    WorkerPool { message: String },
}

impl Error {
    /// Whether an exporter error only means "nothing to export here".
    pub fn is_path_not_found(&self) -> bool {
        matches!(self, Error::PathNotFound { .. })
    }

    /// Attach a file path to a substitution error that does not have one yet.
    pub fn with_path(self, file: impl Into<PathBuf>) -> Self {
        match self {
            Error::MissingToken { token, path: None } => Error::MissingToken {
                token,
                path: Some(file.into()),
            },
            Error::ExpansionCycle {
                token,
                chain,
                path: None,
            } => Error::ExpansionCycle {
                token,
                chain,
                path: Some(file.into()),
            },
            other => other,
        }
    }
}

fn format_components(components: &[Vec<String>]) -> String {
    components
        .iter()
        .map(|c| format!("[{}]", c.join(", ")))
        .collect::<Vec<_>>()
        .join(" ")
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
