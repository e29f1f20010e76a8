//! # Segments
//!
//! A segment is a rule that maps a host name to one or more configuration
//! path fragments. Host names have the fixed-width layout `LLLTTTNN`: a
//! three-character location code, a three-character type code and a
//! two-digit number, e.g. `berweb01`.
//!
//! | Segment       | Values for `berweb01`  | Prefix          |
//! |---------------|------------------------|-----------------|
//! | `All`         | `all`                  |                 |
//! | `Typ`         | `web`                  | `typ/`          |
//! | `Loc`         | `pro`, `ber`           | `loc/`          |
//! | `LocTyp`      | `proweb`, `berweb`     | `loctyp/`       |
//! | `Host`        | `berweb01`             | `host/`         |
//! | `HostNr`      | `01`                   | `hostnr/`       |
//! | `ShortHostNr` | `1`                    | `short_hostnr/` |
//!
//! (`pro` only appears when `ber` is a configured production location.)
//!
//! Fixed-width segments return no values for host names too short to hold
//! their field. Use [`validate_hostname`] to reject such names up front.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Location code field of a host name.
const LOC_FIELD: std::ops::Range<usize> = 0..3;
/// Type code field of a host name.
const TYP_FIELD: std::ops::Range<usize> = 3..6;
/// Number field of a host name.
const NR_FIELD: std::ops::Range<usize> = 6..8;

/// The settings segment rules depend on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentSettings {
    /// Location codes that also belong to `production_alias`.
    pub production_locations: Vec<String>,
    /// Alias location shared by every production location.
    pub production_alias: String,
}

impl Default for SegmentSettings {
    fn default() -> Self {
        Self {
            production_locations: Vec::new(),
            production_alias: "pro".to_string(),
        }
    }
}

/// The closed set of segment kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    All,
    Typ,
    Loc,
    LocTyp,
    Host,
    HostNr,
    ShortHostNr,
}

impl Segment {
    /// Every segment kind, including those that only produce variables.
    pub const ALL_KINDS: [Segment; 7] = [
        Segment::All,
        Segment::Typ,
        Segment::Loc,
        Segment::LocTyp,
        Segment::Host,
        Segment::HostNr,
        Segment::ShortHostNr,
    ];

    /// Lower-case identifier used on the command line and in logs.
    pub fn name(self) -> &'static str {
        match self {
            Segment::All => "all",
            Segment::Typ => "typ",
            Segment::Loc => "loc",
            Segment::LocTyp => "loctyp",
            Segment::Host => "host",
            Segment::HostNr => "hostnr",
            Segment::ShortHostNr => "short_hostnr",
        }
    }

    /// Name of the variable file holding this segment's values.
    pub fn variable_name(self) -> String {
        self.name().to_uppercase()
    }

    /// Prefix prepended to each value to form a source sub-tree path.
    pub fn svn_prefix(self) -> &'static str {
        match self {
            Segment::All => "",
            Segment::Typ => "typ/",
            Segment::Loc => "loc/",
            Segment::LocTyp => "loctyp/",
            Segment::Host => "host/",
            Segment::HostNr => "hostnr/",
            Segment::ShortHostNr => "short_hostnr/",
        }
    }

    /// The segment values a host belongs to, most general first.
    pub fn values(self, hostname: &str, settings: &SegmentSettings) -> Vec<String> {
        match self {
            Segment::All => vec!["all".to_string()],
            Segment::Typ => field(hostname, TYP_FIELD).into_iter().collect(),
            Segment::Loc => match field(hostname, LOC_FIELD) {
                Some(loc) if settings.production_locations.contains(&loc) => {
                    vec![settings.production_alias.clone(), loc]
                }
                Some(loc) => vec![loc],
                None => Vec::new(),
            },
            Segment::LocTyp => {
                let typs = Segment::Typ.values(hostname, settings);
                Segment::Loc
                    .values(hostname, settings)
                    .iter()
                    .flat_map(|loc| typs.iter().map(move |typ| format!("{}{}", loc, typ)))
                    .collect()
            }
            Segment::Host => vec![hostname.to_string()],
            Segment::HostNr => field(hostname, NR_FIELD).into_iter().collect(),
            Segment::ShortHostNr => field(hostname, NR_FIELD)
                .map(|nr| {
                    let short = nr.trim_start_matches('0');
                    if short.is_empty() {
                        "0".to_string()
                    } else {
                        short.to_string()
                    }
                })
                .into_iter()
                .collect(),
        }
    }

    /// Source sub-tree paths for a host, in the order of [`Segment::values`].
    pub fn svn_paths(self, hostname: &str, settings: &SegmentSettings) -> Vec<String> {
        self.values(hostname, settings)
            .into_iter()
            .map(|value| format!("{}{}", self.svn_prefix(), value))
            .collect()
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Segment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Segment::ALL_KINDS
            .into_iter()
            .find(|segment| segment.name() == s)
            .ok_or_else(|| Error::ConfigParse {
                message: format!("unknown segment '{}'", s),
                hint: Some("expected one of: all, typ, loc, loctyp, host, hostnr, short_hostnr".to_string()),
            })
    }
}

/// Extract a fixed-width field, `None` when the name is too short or the
/// range does not fall on character boundaries.
fn field(hostname: &str, range: std::ops::Range<usize>) -> Option<String> {
    hostname.get(range).map(str::to_string)
}

/// Reject host names that do not have the `LLLTTTNN` shape.
pub fn validate_hostname(hostname: &str) -> Result<()> {
    let invalid = |message: &str| Error::InvalidHostname {
        hostname: hostname.to_string(),
        message: message.to_string(),
    };

    if !hostname.is_ascii() {
        return Err(invalid("host names must be ASCII"));
    }
    if hostname.len() < NR_FIELD.end {
        return Err(invalid(
            "expected at least 8 characters (location, type, number)",
        ));
    }
    if !hostname[NR_FIELD].bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("characters 7-8 must be the host number"));
    }
    Ok(())
}
