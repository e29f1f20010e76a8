//! # Dependency Accumulation
//!
//! Segments may carry `RPM_REQUIRES` and `RPM_PROVIDES` files. Their contents
//! are folded, in overlay order, into a [`DependencySet`]: a mapping from
//! package name to the clause(s) rendered for it (`httpd >= 2.4`).
//!
//! Two policies decide what happens when a package shows up again with a
//! different clause:
//!
//! - [`Policy::Accumulate`] keeps every distinct clause (`httpd, httpd > 4`).
//! - [`Policy::Collapse`] keeps only the last one.
//!
//! Byte-identical clauses are never stored twice. An optional regex filter
//! restricts the visible view to matching ([`Polarity::Include`]) or
//! non-matching ([`Polarity::Exclude`]) package names. The unfiltered entries
//! are always retained, so the filtered view is recomputed on every read and
//! a package filtered out once is never lost.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Merge policy for repeated package names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Keep every distinct clause for a package.
    Accumulate,
    /// Keep only the most recent clause for a package.
    Collapse,
}

impl FromStr for Policy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "accumulate" => Ok(Policy::Accumulate),
            "collapse" => Ok(Policy::Collapse),
            other => Err(Error::ConfigParse {
                message: format!("unknown dependency policy '{}'", other),
                hint: Some("expected 'accumulate' or 'collapse'".to_string()),
            }),
        }
    }
}

/// Whether a filter keeps the matching or the non-matching names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Include,
    Exclude,
}

#[derive(Debug, Clone)]
struct Filter {
    regex: Regex,
    polarity: Polarity,
}

impl Filter {
    fn keeps(&self, name: &str) -> bool {
        self.regex.is_match(name) == (self.polarity == Polarity::Include)
    }
}

/// An accumulated set of RPM-style dependency clauses.
#[derive(Debug, Clone)]
pub struct DependencySet {
    policy: Policy,
    filter: Option<Filter>,
    /// Unfiltered clauses per package name.
    entries: BTreeMap<String, Vec<String>>,
}

impl DependencySet {
    /// Create an empty, unfiltered set.
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            filter: None,
            entries: BTreeMap::new(),
        }
    }

    /// Create an empty set whose view is filtered by `pattern`.
    ///
    /// A malformed pattern is reported here, not on first use.
    pub fn with_filter(policy: Policy, pattern: &str, polarity: Polarity) -> Result<Self> {
        let mut set = Self::new(policy);
        set.set_filter(pattern, polarity)?;
        Ok(set)
    }

    /// Replace the filter of this set.
    pub fn set_filter(&mut self, pattern: &str, polarity: Polarity) -> Result<()> {
        let regex = Regex::new(pattern)?;
        self.filter = Some(Filter { regex, polarity });
        Ok(())
    }

    /// A copy of the same entries seen through a different filter.
    pub fn filtered(&self, pattern: &str, polarity: Polarity) -> Result<Self> {
        let mut view = self.clone();
        view.set_filter(pattern, polarity)?;
        Ok(view)
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Add raw dependency text: one or more clauses separated by commas or
    /// whitespace, with or without spaces around the operators.
    pub fn add(&mut self, raw: &str) {
        for clause in normalize(raw) {
            self.insert_clause(clause);
        }
    }

    /// Add several raw dependency strings, in order.
    pub fn add_all<I, S>(&mut self, raws: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for raw in raws {
            self.add(raw.as_ref());
        }
    }

    fn insert_clause(&mut self, clause: String) {
        let name = clause
            .split(' ')
            .next()
            .unwrap_or_default()
            .to_string();
        let clauses = self.entries.entry(name).or_default();

        if clauses.contains(&clause) {
            return;
        }
        match self.policy {
            Policy::Collapse => *clauses = vec![clause],
            Policy::Accumulate => clauses.push(clause),
        }
    }

    /// Package names and their rendered clauses, filtered, in name order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, String)> + '_ {
        self.entries
            .iter()
            .filter(|(name, _)| self.filter.as_ref().map_or(true, |f| f.keeps(name)))
            .map(|(name, clauses)| (name.as_str(), clauses.join(", ")))
    }

    /// The rendered clause(s) for one package, if visible.
    pub fn get(&self, name: &str) -> Option<String> {
        self.entries()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All visible clauses joined with `", "`.
    pub fn render(&self) -> String {
        self.entries()
            .map(|(_, value)| value)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn operator_spacing() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*([<>=]+)\s*").expect("static regex"))
}

fn separators() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[,\s]+").expect("static regex"))
}

fn clause_parts() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([^<>=]+)([<>=]+)(.*)$").expect("static regex"))
}

/// Split raw dependency text into canonical `name[ op version]` clauses.
fn normalize(raw: &str) -> Vec<String> {
    let joined = operator_spacing().replace_all(raw, "$1");
    separators()
        .split(&joined)
        .filter(|token| !token.is_empty())
        .map(|token| match clause_parts().captures(token) {
            Some(caps) => format!("{} {} {}", &caps[1], &caps[2], &caps[3])
                .trim_end()
                .to_string(),
            None => token.to_string(),
        })
        .collect()
}

/// The requires and provides collected for one host.
#[derive(Debug, Clone)]
pub struct DependencyBuckets {
    pub requires: DependencySet,
    pub provides: DependencySet,
}

impl Default for DependencyBuckets {
    fn default() -> Self {
        Self {
            requires: DependencySet::new(Policy::Accumulate),
            provides: DependencySet::new(Policy::Collapse),
        }
    }
}

impl DependencyBuckets {
    /// Variable file names and rendered contents of every bucket.
    ///
    /// `repo_packages` selects the requirements served by the package
    /// repositories; without it every requirement is a non-repo one.
    pub fn render(&self, repo_packages: Option<&str>) -> Result<Vec<(&'static str, String)>> {
        let (repos, non_repos) = match repo_packages {
            Some(pattern) => (
                self.requires.filtered(pattern, Polarity::Include)?.render(),
                self.requires.filtered(pattern, Polarity::Exclude)?.render(),
            ),
            None => (String::new(), self.requires.render()),
        };

        Ok(vec![
            ("RPM_REQUIRES", self.requires.render()),
            ("RPM_PROVIDES", self.provides.render()),
            ("RPM_REQUIRES_REPOS", repos),
            ("RPM_REQUIRES_NON_REPOS", non_repos),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_operator_spacing() {
        assert_eq!(normalize("httpd>=2.4"), vec!["httpd >= 2.4"]);
        assert_eq!(normalize("httpd  >=   2.4"), vec!["httpd >= 2.4"]);
        assert_eq!(normalize("httpd > 4, php"), vec!["httpd > 4", "php"]);
        assert_eq!(normalize("a\nb c,,d"), vec!["a", "b", "c", "d"]);
        assert!(normalize("  \n ").is_empty());
    }

    #[test]
    fn test_collapse_keeps_each_package_once() {
        let mut set = DependencySet::new(Policy::Collapse);
        set.add_all(["httpd", "httpd", "httpd", "a", "b", "httpd"]);
        let rendered = set.render();
        assert_eq!(rendered.matches("httpd").count(), 1);
        assert_eq!(rendered, "a, b, httpd");
    }

    #[test]
    fn test_collapse_last_write_wins() {
        let mut set = DependencySet::new(Policy::Collapse);
        set.add("httpd > 4");
        set.add("httpd >= 5");
        assert_eq!(set.get("httpd").as_deref(), Some("httpd >= 5"));
    }

    #[test]
    fn test_accumulate_keeps_distinct_clauses() {
        let mut set = DependencySet::new(Policy::Accumulate);
        set.add_all(["httpd", "httpd > 4"]);
        assert_eq!(set.render(), "httpd, httpd > 4");
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_accumulate_suppresses_exact_duplicates() {
        let mut set = DependencySet::new(Policy::Accumulate);
        set.add_all(["httpd>4", "httpd > 4", "httpd", "httpd"]);
        assert_eq!(set.render(), "httpd > 4, httpd");
    }

    #[test]
    fn test_include_filter() {
        let mut set =
            DependencySet::with_filter(Policy::Accumulate, "^http", Polarity::Include).unwrap();
        set.add("httpd, php, httpd-tools");
        assert_eq!(set.render(), "httpd, httpd-tools");
    }

    #[test]
    fn test_exclude_filter() {
        let mut set =
            DependencySet::with_filter(Policy::Accumulate, "^http", Polarity::Exclude).unwrap();
        set.add("httpd, php, httpd-tools");
        assert_eq!(set.render(), "php");
        assert!(set.get("httpd").is_none());
    }

    #[test]
    fn test_filter_retains_superset() {
        let mut set = DependencySet::new(Policy::Accumulate);
        set.add("httpd php");
        set.set_filter("^php$", Polarity::Include).unwrap();
        set.add("perl");
        assert_eq!(set.render(), "php");

        // Widening the filter brings filtered-out packages back.
        set.set_filter("^(php|httpd|perl)$", Polarity::Include).unwrap();
        assert_eq!(set.render(), "httpd, perl, php");
    }

    #[test]
    fn test_filter_is_idempotent() {
        let mut set = DependencySet::new(Policy::Collapse);
        set.add("a b c");
        let once = set.filtered("^[ab]$", Polarity::Include).unwrap();
        let twice = once.filtered("^[ab]$", Polarity::Include).unwrap();
        assert_eq!(once.render(), twice.render());
    }

    #[test]
    fn test_bad_regex_fails_at_construction() {
        let err = DependencySet::with_filter(Policy::Collapse, "(", Polarity::Include).unwrap_err();
        assert!(matches!(err, Error::Regex(_)));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("accumulate".parse::<Policy>().unwrap(), Policy::Accumulate);
        assert_eq!("collapse".parse::<Policy>().unwrap(), Policy::Collapse);
        assert!(matches!(
            "merge".parse::<Policy>(),
            Err(Error::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_buckets_split_repo_packages() {
        let mut buckets = DependencyBuckets::default();
        buckets.requires.add("httpd >= 2.4, local-tools, nginx");
        buckets.provides.add("webserver = 1");

        let rendered: BTreeMap<_, _> = buckets
            .render(Some("^(httpd|nginx)$"))
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(rendered["RPM_REQUIRES"], "httpd >= 2.4, local-tools, nginx");
        assert_eq!(rendered["RPM_PROVIDES"], "webserver = 1");
        assert_eq!(rendered["RPM_REQUIRES_REPOS"], "httpd >= 2.4, nginx");
        assert_eq!(rendered["RPM_REQUIRES_NON_REPOS"], "local-tools");
    }

    #[test]
    fn test_buckets_without_repo_regex() {
        let mut buckets = DependencyBuckets::default();
        buckets.requires.add("a b");
        let rendered: BTreeMap<_, _> = buckets.render(None).unwrap().into_iter().collect();
        assert_eq!(rendered["RPM_REQUIRES_REPOS"], "");
        assert_eq!(rendered["RPM_REQUIRES_NON_REPOS"], "a, b");
    }
}
