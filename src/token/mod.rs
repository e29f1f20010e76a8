//! # Token Substitution
//!
//! Tokens are named values written as `@@@NAME@@@` placeholders into the files
//! of a host tree. Their values come from the files of the host's `VARIABLES`
//! directory (file name = token name, trimmed content = value) and may
//! themselves contain placeholders, which are expanded transitively.
//!
//! Substitution is guarded by a validation gate: the reference graph between
//! tokens is checked for cycles ([`graph`]) before any text is touched, so the
//! expansion loop in [`replace`] always terminates.

use std::collections::BTreeMap;
use std::fs;
use std::ops::Range;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::Result;

pub mod graph;
pub mod replace;

pub use graph::{assert_acyclic, build_graph, find_cycles, TokenGraph};
pub use replace::{
    check_and_substitute, escape_html, filter_directory, FileOutcome, FilterReport,
    ReplaceOptions, Renderer, Replacer, unused_tokens,
};

/// The fixed placeholder syntax: three at-signs, an identifier, three at-signs.
fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@@@([A-Za-z0-9_]+)@@@").expect("static regex"))
}

/// Wrap a token name in placeholder syntax.
pub fn placeholder_for(name: &str) -> String {
    format!("@@@{}@@@", name)
}

/// The first complete placeholder in `text`, with its byte range.
pub fn find_placeholder(text: &str) -> Option<(Range<usize>, &str)> {
    placeholder().captures(text).and_then(|caps| {
        let whole = caps.get(0)?;
        let name = caps.get(1)?;
        Some((whole.range(), name.as_str()))
    })
}

/// Names of every placeholder in `text`, in order of appearance.
pub fn referenced_names(text: &str) -> impl Iterator<Item = &str> {
    placeholder()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
}

/// Token name to value mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenTable {
    tokens: BTreeMap<String, String>,
}

impl TokenTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every regular file directly inside `dir` as a token.
    ///
    /// Subdirectories are ignored. Values are trimmed.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let mut table = Self::new();
        for entry in fs::read_dir(dir.as_ref())? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let content = fs::read(entry.path())?;
            table.insert(name, String::from_utf8_lossy(&content).as_ref());
        }
        Ok(table)
    }

    /// Insert or replace a token; the value is trimmed.
    pub fn insert(&mut self, name: impl Into<String>, value: &str) {
        self.tokens.insert(name.into(), value.trim().to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.tokens.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tokens.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tokens.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tokens.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl<K: Into<String>, V: AsRef<str>> FromIterator<(K, V)> for TokenTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (name, value) in iter {
            table.insert(name, value.as_ref());
        }
        table
    }
}
