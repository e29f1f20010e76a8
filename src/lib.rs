//! # hostconf Library
//!
//! This library builds host-specific configuration trees from a segment
//! overlaid source tree and substitutes `@@@NAME@@@` tokens in them. It is
//! designed to be used by the `hostconf` command-line tool but can also be
//! integrated into other build or deployment tooling.
//!
//! ## Quick Example
//!
//! ```
//! use hostconf::segment::{Segment, SegmentSettings};
//! use hostconf::token::{Replacer, ReplaceOptions, TokenTable};
//!
//! // Segment values are derived from the fixed-width host name
//! let settings = SegmentSettings {
//!     production_locations: vec!["ber".to_string()],
//!     ..SegmentSettings::default()
//! };
//! assert_eq!(Segment::Loc.values("berweb01", &settings), vec!["pro", "ber"]);
//!
//! // Tokens may reference each other; cycles are rejected up front
//! let table: TokenTable = [("FOO", "foo"), ("BAR", "@@@FOO@@@")].into_iter().collect();
//! let mut replacer = Replacer::new(table, ReplaceOptions::default()).unwrap();
//! assert_eq!(replacer.substitute("x @@@BAR@@@").unwrap(), "x foo");
//! ```
//!
//! ## Core Concepts
//!
//! - **Segments (`segment`, `overlay`)**: A host name `LLLTTTNN` belongs to a
//!   location, a type and a number. Each segment kind maps the host name to
//!   one or more source paths (`loc/ber`, `typ/web`, ...). The overlay order
//!   layers them from general to specific.
//! - **Dependencies (`dependency`)**: `RPM_REQUIRES` and `RPM_PROVIDES` lists
//!   contributed by segments are accumulated or collapsed and split by a
//!   repository package filter.
//! - **Tokens (`token`)**: Values loaded from a `VARIABLES/` directory are
//!   substituted into every file of a host tree, transitively, after the
//!   reference graph has been checked for cycles.
//! - **Collaborators (`export`, `host`)**: Traits for materializing source
//!   sub-trees (local working copy or `svn export`) and for resolving host
//!   addresses.
//!
//! ## Execution Flow
//!
//! The main entry point is [`phases::orchestrator`], which runs, per host:
//!
//! 1.  **Overlay**: Export each segment path into one merged tree.
//! 2.  **Variables**: Write dependency, segment and host variables.
//! 3.  **Substitution**: Check the tokens and substitute the merged tree.
//! 4.  **Viewer**: Render an HTML-escaped, annotated copy of the tree.
//! 5.  **Disk Output**: Copy both trees to the output directory.

pub mod config;
pub mod defaults;
pub mod dependency;
pub mod error;
pub mod export;
pub mod host;
pub mod output;
pub mod overlay;
pub mod phases;
pub mod segment;
pub mod token;

#[cfg(test)]
mod token_proptest;
