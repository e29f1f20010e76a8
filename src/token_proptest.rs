//! Property-based tests for segments and token substitution.
//!
//! These tests use proptest to generate random host names, token tables and
//! texts, and verify that invariants hold for all of them.

#[cfg(test)]
mod proptest_tests {
    use crate::overlay::resolve_affected_hosts;
    use crate::segment::{Segment, SegmentSettings};
    use crate::token::{placeholder_for, Replacer, ReplaceOptions, TokenTable};
    use proptest::collection::btree_map;
    use proptest::prelude::*;

    fn hostname() -> impl Strategy<Value = String> {
        "[a-z]{3}[a-z]{3}[0-9]{2}"
    }

    fn table_strategy() -> impl Strategy<Value = std::collections::BTreeMap<String, String>> {
        btree_map("[A-Z][A-Z0-9_]{0,8}", "[a-z0-9 .,:-]{0,16}", 1..8)
    }

    // ============================================================================
    // Segment property tests
    // ============================================================================

    proptest! {
        /// Property: Loc is the location code, preceded by the alias for
        /// production locations
        #[test]
        fn loc_values_follow_production_settings(host in hostname(), production in any::<bool>()) {
            let loc = host[0..3].to_string();
            let settings = SegmentSettings {
                production_locations: if production { vec![loc.clone()] } else { Vec::new() },
                ..SegmentSettings::default()
            };
            let values = Segment::Loc.values(&host, &settings);
            if production {
                prop_assert_eq!(values, vec!["pro".to_string(), loc]);
            } else {
                prop_assert_eq!(values, vec![loc]);
            }
        }

        /// Property: LocTyp is the loc-major product of Loc and Typ
        #[test]
        fn loctyp_is_product_of_loc_and_typ(host in hostname(), production in any::<bool>()) {
            let settings = SegmentSettings {
                production_locations: if production { vec![host[0..3].to_string()] } else { Vec::new() },
                ..SegmentSettings::default()
            };
            let typ = &Segment::Typ.values(&host, &settings)[0];
            let expected: Vec<String> = Segment::Loc
                .values(&host, &settings)
                .iter()
                .map(|loc| format!("{}{}", loc, typ))
                .collect();
            prop_assert_eq!(Segment::LocTyp.values(&host, &settings), expected);
        }

        /// Property: a change below a host's own directory affects that host
        #[test]
        fn host_path_affects_host(host in hostname(), file in "[a-z]{1,8}") {
            let changed = vec![format!("host/{}/{}", host, file)];
            let hosts = vec![host.clone()];
            let affected = resolve_affected_hosts(&changed, &hosts, &SegmentSettings::default());
            prop_assert!(affected.contains(&host));
        }

        /// Property: ShortHostNr parses to the same number as HostNr
        #[test]
        fn short_hostnr_has_same_value(host in hostname()) {
            let settings = SegmentSettings::default();
            let nr: u32 = Segment::HostNr.values(&host, &settings)[0].parse().unwrap();
            let short = &Segment::ShortHostNr.values(&host, &settings)[0];
            prop_assert_eq!(short.parse::<u32>().unwrap(), nr);
            prop_assert!(short == "0" || !short.starts_with('0'));
        }
    }

    // ============================================================================
    // Substitution property tests
    // ============================================================================

    proptest! {
        /// Property: text without placeholders passes through unchanged
        #[test]
        fn placeholder_free_text_is_unchanged(tokens in table_strategy(), text in "[^@]*") {
            let table: TokenTable = tokens.into_iter().collect();
            let mut replacer = Replacer::new(table, ReplaceOptions::default()).unwrap();
            prop_assert_eq!(replacer.substitute(&text).unwrap(), text);
            prop_assert!(replacer.used().is_empty());
        }

        /// Property: the concatenated placeholders of every token expand to
        /// the concatenated values
        #[test]
        fn concatenated_placeholders_expand_to_values(tokens in table_strategy()) {
            let text: String = tokens.keys().map(|name| placeholder_for(name)).collect();
            let expected: String = tokens.values().map(|value| value.trim()).collect();

            let table: TokenTable = tokens.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            let mut replacer = Replacer::new(table, ReplaceOptions::default()).unwrap();
            prop_assert_eq!(replacer.substitute(&text).unwrap(), expected);
            prop_assert_eq!(replacer.used().len(), tokens.len());
            prop_assert!(replacer.unused().is_empty());
        }

        /// Property: substituted output contains no complete placeholder of a
        /// known token, so substituting again is a no-op
        #[test]
        fn substitution_is_idempotent(tokens in table_strategy(), filler in "[a-z ]{0,10}") {
            let text: String = tokens
                .keys()
                .map(|name| format!("{}{}", filler, placeholder_for(name)))
                .collect();
            let table: TokenTable = tokens.into_iter().collect();
            let mut replacer = Replacer::new(table, ReplaceOptions::default()).unwrap();

            let once = replacer.substitute(&text).unwrap();
            let twice = replacer.substitute(&once).unwrap();
            prop_assert_eq!(once, twice);
        }

        /// Property: a chain of tokens each referencing the next resolves to
        /// the value at the end of the chain
        #[test]
        fn chains_resolve_transitively(len in 1usize..10, value in "[a-z]{1,8}") {
            let mut table = TokenTable::new();
            for i in 0..len {
                table.insert(format!("T{}", i), &placeholder_for(&format!("T{}", i + 1)));
            }
            table.insert(format!("T{}", len), &value);

            let mut replacer = Replacer::new(table, ReplaceOptions::default()).unwrap();
            prop_assert_eq!(replacer.substitute("@@@T0@@@").unwrap(), value);
        }

        /// Property: substitution finishes for every table that passes the
        /// cycle check, even when values hold placeholder fragments
        #[test]
        fn fragments_always_terminate(
            a in "[@AB]{0,10}",
            b in "[@AB]{0,10}",
            text in "[@AB]{0,14}",
        ) {
            let table: TokenTable = [("A", a), ("B", b)].into_iter().collect();
            let replacer = Replacer::new(table, ReplaceOptions::default());
            prop_assume!(replacer.is_ok());

            let mut replacer = replacer.unwrap();
            match replacer.substitute(&text) {
                Ok(result) => prop_assert!(crate::token::find_placeholder(&result).is_none()),
                Err(e) => prop_assert!(matches!(
                    e,
                    crate::error::Error::ExpansionCycle { .. } | crate::error::Error::MissingToken { .. }
                ), "unexpected error: {:?}", e),
            }
        }
    }
}
