//! # Overlay Resolution
//!
//! The overlay order layers segment contents from general to specific:
//! `all`, then the host type, the location(s), the location/type
//! combination(s) and finally the host itself. Later exports physically
//! overwrite earlier ones, so the order of [`overlay_segment_paths`] is the
//! merge order.
//!
//! The same segment paths are used in reverse to find the hosts affected by a
//! set of changed repository paths.

use std::collections::BTreeSet;

use crate::segment::{Segment, SegmentSettings};

/// Segments that contribute content, general to specific.
pub const OVERLAY_ORDER: [Segment; 5] = [
    Segment::All,
    Segment::Typ,
    Segment::Loc,
    Segment::LocTyp,
    Segment::Host,
];

/// The `(segment, path)` pairs to export for a host, in merge order.
pub fn overlay_segment_paths(hostname: &str, settings: &SegmentSettings) -> Vec<(Segment, String)> {
    OVERLAY_ORDER
        .iter()
        .flat_map(|&segment| {
            segment
                .svn_paths(hostname, settings)
                .into_iter()
                .map(move |path| (segment, path))
        })
        .collect()
}

/// Hosts whose overlay includes at least one of the changed paths.
///
/// A host is affected when one of its segment paths is a string prefix of a
/// changed path. Matching is not aware of path boundaries: `loc/pro` matches
/// `loc/production` as well.
pub fn resolve_affected_hosts<S, H>(
    changed_paths: &[S],
    available_hosts: &[H],
    settings: &SegmentSettings,
) -> BTreeSet<String>
where
    S: AsRef<str>,
    H: AsRef<str>,
{
    let mut affected = BTreeSet::new();

    for host in available_hosts {
        let host = host.as_ref();
        let segment_paths = overlay_segment_paths(host, settings);
        let hit = changed_paths.iter().any(|changed| {
            segment_paths
                .iter()
                .any(|(_, path)| changed.as_ref().starts_with(path.as_str()))
        });
        if hit {
            affected.insert(host.to_string());
        }
    }

    affected
}
