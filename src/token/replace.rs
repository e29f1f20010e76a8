//! Placeholder expansion over strings, files and directory trees.
//!
//! A [`Replacer`] is only constructed from a token table that passed the cycle
//! check. It then repeatedly replaces the first complete `@@@NAME@@@` span
//! until none is left, so placeholders inside token values are resolved layer
//! by layer.
//!
//! Files are handled conservatively:
//!
//! - binary content (a NUL byte near the start, or bytes that are not UTF-8)
//!   is skipped and left untouched;
//! - files above the size limit abort the pass with [`Error::CannotFilter`];
//! - missing tokens and expansion cycles abort the pass and name the
//!   offending file.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io::Read;
use std::ops::Range;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

use super::{assert_acyclic, build_graph, find_placeholder, TokenTable};
use crate::config::DEFAULT_MAX_FILE_SIZE;
use crate::error::{Error, Result};

/// Number of leading bytes inspected for NUL bytes.
const BINARY_SNIFF_LEN: u64 = 8000;

/// Renders one substitution from the token name and its value.
pub type Renderer = Box<dyn Fn(&str, &str) -> String + Send + Sync>;

/// How a [`Replacer`] treats files and renders values.
pub struct ReplaceOptions {
    /// Files larger than this are refused.
    pub max_file_size: u64,
    /// HTML-escape file content before substituting.
    pub escape_html: bool,
    /// Custom rendering of each substitution; the plain value when `None`.
    pub renderer: Option<Renderer>,
}

impl Default for ReplaceOptions {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            escape_html: false,
            renderer: None,
        }
    }
}

impl fmt::Debug for ReplaceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplaceOptions")
            .field("max_file_size", &self.max_file_size)
            .field("escape_html", &self.escape_html)
            .field("renderer", &self.renderer.as_ref().map(|_| "custom"))
            .finish()
    }
}

impl ReplaceOptions {
    /// Options for the browsable rendering of a host tree.
    ///
    /// Content is HTML-escaped and every substitution is wrapped in a span
    /// whose title names the token.
    pub fn viewer(max_file_size: u64) -> Self {
        Self {
            max_file_size,
            escape_html: true,
            renderer: Some(Box::new(|name: &str, value: &str| {
                format!(
                    "<span class=\"token\" title=\"{}\">{}</span>",
                    escape_html(name),
                    escape_html(value)
                )
            })),
        }
    }
}

/// What happened to a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// Placeholders were replaced and the file rewritten.
    Filtered,
    /// The file contained nothing to replace.
    Unchanged,
    /// The file looks binary and was left alone.
    Skipped,
}

/// Result of filtering a directory tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterReport {
    /// Tokens substituted at least once.
    pub used: BTreeSet<String>,
    /// Tokens defined but never substituted.
    pub unused: BTreeSet<String>,
    pub files_filtered: usize,
    pub files_unchanged: usize,
    pub files_skipped: usize,
}

/// Substitutes placeholders using a cycle-free token table.
pub struct Replacer {
    table: TokenTable,
    options: ReplaceOptions,
    used: BTreeSet<String>,
}

impl Replacer {
    /// Validate the table and build a replacer.
    ///
    /// Fails with [`Error::CycleDetected`] before any substitution when the
    /// token values reference each other in a cycle.
    pub fn new(table: TokenTable, options: ReplaceOptions) -> Result<Self> {
        assert_acyclic(&build_graph(&table))?;
        Ok(Self {
            table,
            options,
            used: BTreeSet::new(),
        })
    }

    pub fn table(&self) -> &TokenTable {
        &self.table
    }

    /// Tokens substituted so far.
    pub fn used(&self) -> &BTreeSet<String> {
        &self.used
    }

    /// Tokens defined but not substituted so far.
    pub fn unused(&self) -> BTreeSet<String> {
        unused_tokens(&self.table, &self.used)
    }

    /// Expand every placeholder in `text`.
    ///
    /// Each substituted span remembers the tokens it was expanded from. A
    /// placeholder overlapping spans of its own token is an
    /// [`Error::ExpansionCycle`]: a value that only forms a reference
    /// together with its surroundings would otherwise expand forever.
    pub fn substitute(&mut self, text: &str) -> Result<String> {
        let mut result = text.to_string();
        let mut expansions: Vec<Expansion> = Vec::new();

        while let Some((range, name)) = find_placeholder(&result) {
            let name = name.to_string();

            let mut chain: Vec<String> = Vec::new();
            for expansion in expansions.iter().filter(|e| e.overlaps(&range)) {
                for token in &expansion.chain {
                    if !chain.contains(token) {
                        chain.push(token.clone());
                    }
                }
            }
            if chain.contains(&name) {
                return Err(Error::ExpansionCycle {
                    token: name,
                    chain,
                    path: None,
                });
            }

            let value = self.table.get(&name).ok_or_else(|| Error::MissingToken {
                token: name.clone(),
                path: None,
            })?;
            let rendered = match &self.options.renderer {
                Some(render) => render(&name, value),
                None => value.to_string(),
            };

            result.replace_range(range.clone(), &rendered);
            expansions = expansions
                .into_iter()
                .flat_map(|e| e.outside(&range, rendered.len()))
                .collect();
            chain.push(name.clone());
            expansions.push(Expansion {
                range: range.start..range.start + rendered.len(),
                chain,
            });
            self.used.insert(name);
        }

        Ok(result)
    }

    /// Substitute placeholders in one file, in place.
    pub fn filter_file(&mut self, path: &Path) -> Result<FileOutcome> {
        if has_nul_prefix(path)? {
            debug!("Skipping binary file {}", path.display());
            return Ok(FileOutcome::Skipped);
        }

        let size = fs::metadata(path)?.len();
        if size > self.options.max_file_size {
            return Err(Error::CannotFilter {
                path: path.to_path_buf(),
                limit: self.options.max_file_size,
            });
        }

        let content = match String::from_utf8(fs::read(path)?) {
            Ok(content) => content,
            Err(_) => {
                debug!("Skipping non-UTF-8 file {}", path.display());
                return Ok(FileOutcome::Skipped);
            }
        };

        let source = if self.options.escape_html {
            escape_html(&content)
        } else {
            content.clone()
        };
        let filtered = self.substitute(&source).map_err(|e| e.with_path(path))?;

        if filtered == content {
            return Ok(FileOutcome::Unchanged);
        }
        fs::write(path, filtered)?;
        Ok(FileOutcome::Filtered)
    }

    /// Filter every file below `root`, skipping anything inside `exclude`.
    ///
    /// Files are visited in sorted order. The first hard failure aborts the
    /// walk.
    pub fn filter_tree(&mut self, root: &Path, exclude: Option<&Path>) -> Result<FilterReport> {
        let exclude = exclude.map(canonical).transpose()?;
        let root = canonical(root)?;

        let mut report = FilterReport::default();
        let walker = WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| exclude.as_deref() != Some(entry.path()));

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            match self.filter_file(entry.path())? {
                FileOutcome::Filtered => report.files_filtered += 1,
                FileOutcome::Unchanged => report.files_unchanged += 1,
                FileOutcome::Skipped => report.files_skipped += 1,
            }
        }

        report.used = self.used.clone();
        report.unused = self.unused();
        Ok(report)
    }
}

/// A span of substituted text and the tokens it was expanded from.
#[derive(Debug, Clone)]
struct Expansion {
    range: Range<usize>,
    chain: Vec<String>,
}

impl Expansion {
    fn overlaps(&self, other: &Range<usize>) -> bool {
        self.range.start < other.end && other.start < self.range.end
    }

    /// What is left of this span after `replaced` became `inserted_len`
    /// bytes, shifted to the new positions.
    fn outside(self, replaced: &Range<usize>, inserted_len: usize) -> Vec<Expansion> {
        let mut parts = Vec::new();

        let before = self.range.start..self.range.end.min(replaced.start);
        if !before.is_empty() {
            parts.push(Expansion {
                range: before,
                chain: self.chain.clone(),
            });
        }

        let after_start = self.range.start.max(replaced.end);
        if after_start < self.range.end {
            let shift = |offset: usize| offset - replaced.end + replaced.start + inserted_len;
            parts.push(Expansion {
                range: shift(after_start)..shift(self.range.end),
                chain: self.chain,
            });
        }

        parts
    }
}

/// Load the token table from `variables_dir` and filter every file below
/// `root` except the variables themselves.
pub fn filter_directory(
    root: &Path,
    variables_dir: &Path,
    options: ReplaceOptions,
) -> Result<FilterReport> {
    let table = TokenTable::from_dir(variables_dir)?;
    debug!(
        "Loaded {} tokens from {}",
        table.len(),
        variables_dir.display()
    );
    let mut replacer = Replacer::new(table, options)?;
    let report = replacer.filter_tree(root, Some(variables_dir))?;
    for name in &report.unused {
        warn!("Variable {} is never used below {}", name, root.display());
    }
    Ok(report)
}

/// Check the tokens of `variables_dir` and substitute them below `root`
/// with default options, returning the names of the tokens used.
pub fn check_and_substitute(root: &Path, variables_dir: &Path) -> Result<BTreeSet<String>> {
    filter_directory(root, variables_dir, ReplaceOptions::default()).map(|report| report.used)
}

/// Names defined in `table` that are not in `used`.
pub fn unused_tokens(table: &TokenTable, used: &BTreeSet<String>) -> BTreeSet<String> {
    table
        .names()
        .filter(|name| !used.contains(*name))
        .map(str::to_string)
        .collect()
}

/// Escape the characters that are significant in HTML.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn has_nul_prefix(path: &Path) -> Result<bool> {
    let mut head = Vec::new();
    fs::File::open(path)?
        .take(BINARY_SNIFF_LEN)
        .read_to_end(&mut head)?;
    Ok(head.contains(&0))
}

fn canonical(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).map_err(|e| Error::Filesystem {
        message: format!("Failed to resolve '{}': {}", path.display(), e),
    })
}
