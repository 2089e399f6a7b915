//! Roster extraction: selector fallback chain, filtering, dedup and sort.
//!
//! ## First match wins
//!
//! Roster pages come in several generations of markup. The selector list is
//! ordered from the most specific pattern to generic fallbacks, and the first
//! pattern that matches *anything* is the only one used. Taking the union of
//! all patterns would pull in navigation links and other `/users/` anchors
//! that only the generic fallbacks pick up.
//!
//! ## Filtering
//!
//! Each matched element must yield a non-empty name and a numeric identifier
//! from `users/(\d+)` in its link. Names outside the configured length bounds
//! or containing the excluded substring (`"test user"` by default) are
//! dropped, and only the first entry per identifier is kept.

use crate::config::ExtractionConfig;
use crate::error::RosterQrError;
use crate::output::{Record, RosterSnapshot};
use crate::pipeline::tree::{DocumentTree, LinkNode};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{debug, info};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

static RE_USER_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"users/(\d+)").unwrap());

/// Extract the unique, name-sorted roster from a document snapshot.
///
/// Returns an empty snapshot (not an error) when no selector matches; the
/// boundary layer decides how to report "no data". Errors are returned only
/// for selectors that are not valid CSS.
pub fn extract<T>(tree: &T, config: &ExtractionConfig) -> Result<RosterSnapshot, RosterQrError>
where
    T: DocumentTree + ?Sized,
{
    let title = tree.title();
    let mut records = Vec::new();
    let mut pattern = None;

    for selector in &config.selectors {
        let nodes = tree.select(selector)?;
        if nodes.is_empty() {
            debug!("Selector matched nothing: {}", selector);
            continue;
        }

        info!("Found {} students using selector: {}", nodes.len(), selector);
        records = collect_records(&nodes, config);
        pattern = Some(selector.clone());
        break;
    }

    let records = sort_by_name(dedup_by_identifier(records));
    info!("Extracted {} unique students", records.len());

    Ok(RosterSnapshot {
        records,
        title,
        pattern,
    })
}

/// Turn matched nodes into records, applying the filter predicate and
/// first-seen-wins dedup in a single pass.
fn collect_records(nodes: &[LinkNode], config: &ExtractionConfig) -> Vec<Record> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut records = Vec::with_capacity(nodes.len());

    for node in nodes {
        let name = node.text.trim();
        let identifier = node.href.as_deref().and_then(user_id).unwrap_or_default();

        if !accept(name, identifier, config) {
            debug!("Skipping entry {:?} (id {:?})", name, identifier);
            continue;
        }
        if !seen.insert(identifier.to_string()) {
            continue;
        }
        records.push(Record::new(name, identifier));
    }

    records
}

/// Capture the numeric id from a link such as `/courses/7/users/42`.
pub fn user_id(href: &str) -> Option<&str> {
    RE_USER_ID
        .captures(href)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// The filter predicate applied to every candidate entry.
pub fn accept(name: &str, identifier: &str, config: &ExtractionConfig) -> bool {
    if name.is_empty() || identifier.is_empty() {
        return false;
    }
    let len = name.chars().count();
    if len <= config.min_name_len || len >= config.max_name_len {
        return false;
    }
    let excluded = config.excluded_substring.to_lowercase();
    if !excluded.is_empty() && name.to_lowercase().contains(&excluded) {
        return false;
    }
    true
}

/// Keep the first record for every identifier. Idempotent.
pub fn dedup_by_identifier(records: Vec<Record>) -> Vec<Record> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.identifier.clone()))
        .collect()
}

/// Stable sort by name under [`compare_names`].
pub fn sort_by_name(mut records: Vec<Record>) -> Vec<Record> {
    records.sort_by(|a, b| compare_names(&a.name, &b.name));
    records
}

/// Locale-style name ordering in three levels:
///
/// 1. base letters, ignoring accents and case (`Émile` sorts with `E`)
/// 2. accents, ignoring case (`Emile` before `Émile`)
/// 3. case, lowercase first, then the raw string so the order is total
pub fn compare_names(a: &str, b: &str) -> Ordering {
    primary_key(a)
        .cmp(&primary_key(b))
        .then_with(|| secondary_key(a).cmp(&secondary_key(b)))
        .then_with(|| b.cmp(a))
}

/// Decomposed, lowercased, with combining marks removed and the common
/// non-decomposing Latin letters expanded to their base form.
fn primary_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    for c in name.nfd().filter(|c| !is_combining_mark(*c)) {
        match c {
            'ß' => key.push_str("ss"),
            'æ' | 'Æ' => key.push_str("ae"),
            'œ' | 'Œ' => key.push_str("oe"),
            'ø' | 'Ø' => key.push('o'),
            'đ' | 'Đ' => key.push('d'),
            'ł' | 'Ł' => key.push('l'),
            'ı' => key.push('i'),
            _ => key.extend(c.to_lowercase()),
        }
    }
    key
}

fn secondary_key(name: &str) -> String {
    name.nfd().flat_map(char::to_lowercase).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// In-memory tree answering selectors from a fixed table and recording
    /// which patterns were evaluated.
    #[derive(Default)]
    struct FixtureTree {
        title: Option<String>,
        matches: HashMap<String, Vec<LinkNode>>,
        evaluated: RefCell<Vec<String>>,
    }

    impl FixtureTree {
        fn with(mut self, pattern: &str, nodes: Vec<LinkNode>) -> Self {
            self.matches.insert(pattern.to_string(), nodes);
            self
        }
    }

    impl DocumentTree for FixtureTree {
        fn title(&self) -> Option<String> {
            self.title.clone()
        }

        fn select(&self, pattern: &str) -> Result<Vec<LinkNode>, RosterQrError> {
            self.evaluated.borrow_mut().push(pattern.to_string());
            Ok(self.matches.get(pattern).cloned().unwrap_or_default())
        }
    }

    fn config(selectors: &[&str]) -> ExtractionConfig {
        ExtractionConfig {
            selectors: selectors.iter().map(|s| s.to_string()).collect(),
            ..ExtractionConfig::default()
        }
    }

    fn link(name: &str, id: u32) -> LinkNode {
        LinkNode::new(name, format!("https://school.example/courses/9/users/{id}"))
    }

    #[test]
    fn first_matching_pattern_wins() {
        let tree = FixtureTree::default()
            .with("p1", vec![link("Ada Lovelace", 1)])
            .with("p2", vec![link("Bob Builder", 2)]);

        let snap = extract(&tree, &config(&["p0", "p1", "p2"])).unwrap();

        assert_eq!(snap.records, vec![Record::new("Ada Lovelace", "1")]);
        assert_eq!(snap.pattern.as_deref(), Some("p1"));
        assert_eq!(*tree.evaluated.borrow(), vec!["p0", "p1"]);
    }

    #[test]
    fn no_match_yields_empty_snapshot() {
        let tree = FixtureTree {
            title: Some("Empty".into()),
            ..FixtureTree::default()
        };
        let snap = extract(&tree, &config(&["a", "b"])).unwrap();
        assert!(snap.is_empty());
        assert_eq!(snap.pattern, None);
        assert_eq!(snap.title.as_deref(), Some("Empty"));
    }

    #[test]
    fn duplicates_keep_first_occurrence() {
        let tree = FixtureTree::default().with(
            "p",
            vec![
                link("Ada Lovelace", 7),
                link("Ada L. (duplicate row)", 7),
                link("Charles Babbage", 8),
            ],
        );
        let snap = extract(&tree, &config(&["p"])).unwrap();
        let ids: Vec<_> = snap.records.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, vec!["7", "8"]);
        assert_eq!(snap.records[0].name, "Ada Lovelace");
    }

    #[test]
    fn names_are_trimmed_and_sorted() {
        let tree = FixtureTree::default().with(
            "p",
            vec![
                link("  zoe Zimmer ", 3),
                link("\nAlan Turing\n", 1),
                link("bella Baker", 2),
            ],
        );
        let snap = extract(&tree, &config(&["p"])).unwrap();
        let names: Vec<_> = snap.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Alan Turing", "bella Baker", "zoe Zimmer"]);
    }

    #[test]
    fn filter_rejects_bad_entries() {
        let long = "x".repeat(100);
        let tree = FixtureTree::default().with(
            "p",
            vec![
                link("Al", 1),
                link("Abe", 2),
                link(&long, 3),
                link("Demo TEST User", 4),
                LinkNode::new("No Number", "/courses/9/users/self"),
                LinkNode {
                    text: "No Href".into(),
                    href: None,
                },
                link("   ", 5),
            ],
        );
        let snap = extract(&tree, &config(&["p"])).unwrap();
        assert_eq!(snap.records, vec![Record::new("Abe", "2")]);
    }

    #[test]
    fn length_bounds_are_exclusive() {
        let cfg = ExtractionConfig::default();
        assert!(!accept("ab", "1", &cfg));
        assert!(accept("abc", "1", &cfg));
        assert!(accept(&"y".repeat(99), "1", &cfg));
        assert!(!accept(&"y".repeat(100), "1", &cfg));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let cfg = ExtractionConfig::default();
        assert!(accept("Zoë", "1", &cfg));
        assert!(!accept("Zö", "1", &cfg));
    }

    #[test]
    fn empty_excluded_substring_disables_check() {
        let cfg = ExtractionConfig {
            excluded_substring: String::new(),
            ..ExtractionConfig::default()
        };
        assert!(accept("Test User", "1", &cfg));
    }

    #[test]
    fn user_id_capture() {
        assert_eq!(user_id("/courses/1/users/42"), Some("42"));
        assert_eq!(user_id("https://x.example/users/7?tab=1"), Some("7"));
        assert_eq!(user_id("/users/abc"), None);
        assert_eq!(user_id(""), None);
    }

    #[test]
    fn dedup_is_idempotent() {
        let records = vec![
            Record::new("Ada Lovelace", "1"),
            Record::new("Ada Again", "1"),
            Record::new("Bob Builder", "2"),
        ];
        let once = dedup_by_identifier(records);
        let twice = dedup_by_identifier(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
    }

    #[test]
    fn compare_names_is_case_insensitive_first() {
        assert_eq!(compare_names("alice", "Bob"), Ordering::Less);
        assert_eq!(compare_names("Bob", "alice"), Ordering::Greater);
        assert_eq!(compare_names("same", "same"), Ordering::Equal);
        // lowercase sorts before uppercase on a tie, as locale collation does
        assert_eq!(compare_names("ada", "Ada"), Ordering::Less);
    }

    #[test]
    fn accented_initials_sort_with_their_base_letter() {
        assert_eq!(compare_names("Émile Zola", "Zoe Adams"), Ordering::Less);
        assert_eq!(compare_names("Émile Zola", "Ana Silva"), Ordering::Greater);
        assert_eq!(compare_names("Ørjan Berg", "Pia Lund"), Ordering::Less);
        assert_eq!(compare_names("Łukasz Nowak", "Luna Park"), Ordering::Less);
        // unaccented first when the base letters tie
        assert_eq!(compare_names("Emile", "Émile"), Ordering::Less);
        assert_eq!(compare_names("émile", "Émile"), Ordering::Less);
    }

    #[test]
    fn accented_names_sort_among_plain_ones() {
        let tree = FixtureTree::default().with(
            "p",
            vec![link("Zoe Adams", 1), link("Émile Zola", 2), link("Ana Silva", 3)],
        );
        let snap = extract(&tree, &config(&["p"])).unwrap();
        let names: Vec<_> = snap.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Ana Silva", "Émile Zola", "Zoe Adams"]);
    }
}
