//! Fixed synonym table and the word-level similarity test.
//!
//! The groups are process-wide immutable configuration, built once on
//! first use. Two words are semantically similar when they are equal,
//! share a group, or share a 4-character prefix stem.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

const GROUPS: &[&[&str]] = &[
    &["review", "assessment", "evaluation", "analysis", "audit", "examination", "inspection"],
    &["executive", "leadership", "management", "strategic", "senior", "c-level", "director"],
    &["banking", "financial", "finance", "fintech", "monetary", "credit", "lending"],
    &["ai", "artificial-intelligence", "machine-learning", "ml", "intelligent", "smart", "automated"],
    &["product", "service", "offering", "solution", "platform", "system"],
    &["digital", "online", "electronic", "cyber", "virtual", "tech", "technology"],
];

fn group_index() -> &'static HashMap<&'static str, usize> {
    static INDEX: OnceLock<HashMap<&'static str, usize>> = OnceLock::new();
    INDEX.get_or_init(|| {
        let mut index = HashMap::new();
        for (i, group) in GROUPS.iter().enumerate() {
            for word in *group {
                index.insert(*word, i);
            }
        }
        index
    })
}

/// Heuristic stemming: both words longer than 4 characters and the
/// first 4 characters of one prefix the other ("analyze" ~ "analysis").
fn shares_prefix_stem(a: &str, b: &str) -> bool {
    a.len() > 4 && b.len() > 4 && (a.starts_with(&b[..4]) || b.starts_with(&a[..4]))
}

/// Word-level semantic similarity over lower-cased, trimmed input.
pub fn semantically_similar(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a == b {
        return true;
    }

    let index = group_index();
    if let (Some(ga), Some(gb)) = (index.get(a.as_str()), index.get(b.as_str())) {
        if ga == gb {
            return true;
        }
    }

    // Guard the byte slice: group terms are ASCII but caller input
    // need not be.
    if !a.is_char_boundary(4.min(a.len())) || !b.is_char_boundary(4.min(b.len())) {
        return false;
    }
    shares_prefix_stem(&a, &b)
}

/// Whether `text` (lower-cased, space-separated) contains `term`
/// literally or any of its words is semantically similar to it.
pub fn text_contains_semantic(text: &str, term: &str) -> bool {
    let text = text.to_lowercase();
    let term = term.to_lowercase();

    if text.contains(&term) {
        return true;
    }
    text.split_whitespace()
        .any(|word| semantically_similar(word, &term))
}

/// Query tags covered semantically by at least one skill tag.
pub fn semantic_tag_matches<'q>(
    skill_tags: &HashSet<String>,
    query_tags: &'q HashSet<String>,
) -> HashSet<&'q str> {
    let mut matches = HashSet::new();
    for query_tag in query_tags {
        if skill_tags
            .iter()
            .any(|skill_tag| semantically_similar(skill_tag, query_tag))
        {
            matches.insert(query_tag.as_str());
        }
    }
    matches
}
