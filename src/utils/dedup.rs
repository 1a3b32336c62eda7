//! Deduplication utilities for papers across providers.

use std::collections::HashSet;
use strsim::jaro_winkler;

use crate::models::Paper;

/// Titles at least this similar (after normalization) may be the same work
const TITLE_SIMILARITY_THRESHOLD: f64 = 0.95;

/// Find duplicate papers based on DOI, or title similarity plus a shared author
///
/// Returns groups of paper indices that are duplicates of each other, each
/// group in ascending order
pub fn find_duplicates(papers: &[Paper]) -> Vec<Vec<usize>> {
    let titles: Vec<String> = papers.iter().map(|p| normalize_title(&p.title)).collect();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut processed: HashSet<usize> = HashSet::new();

    for i in 0..papers.len() {
        if processed.contains(&i) {
            continue;
        }

        let mut group = vec![i];

        for j in (i + 1)..papers.len() {
            if processed.contains(&j) {
                continue;
            }

            if are_duplicates(&papers[i], &titles[i], &papers[j], &titles[j]) {
                group.push(j);
                processed.insert(j);
            }
        }

        if group.len() > 1 {
            groups.push(group);
        }

        processed.insert(i);
    }

    groups
}

/// Check if two papers are likely the same work
fn are_duplicates(a: &Paper, title_a: &str, b: &Paper, title_b: &str) -> bool {
    // One provider never returns the same record twice
    if a.source == b.source {
        return false;
    }

    if let (Some(doi_a), Some(doi_b)) = (&a.doi, &b.doi) {
        if doi_a.trim().eq_ignore_ascii_case(doi_b.trim()) {
            return true;
        }
    }

    if title_a.is_empty() || title_b.is_empty() {
        return false;
    }

    (title_a == title_b || jaro_winkler(title_a, title_b) >= TITLE_SIMILARITY_THRESHOLD)
        && authors_match(a, b)
}

/// Check if the author lists share at least one name
fn authors_match(a: &Paper, b: &Paper) -> bool {
    let authors_a: HashSet<String> = a.authors.iter().map(|s| normalize_title(s)).collect();
    let authors_b: HashSet<String> = b.authors.iter().map(|s| normalize_title(s)).collect();

    // Nothing to compare against
    if authors_a.is_empty() || authors_b.is_empty() {
        return true;
    }

    !authors_a.is_disjoint(&authors_b)
}

/// Lowercase, drop punctuation, collapse whitespace
fn normalize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Remove duplicate papers from a list, keeping the first occurrence of each
/// group and preserving the order of the survivors
pub fn deduplicate_papers(papers: Vec<Paper>) -> Vec<Paper> {
    let groups = find_duplicates(&papers);
    if groups.is_empty() {
        return papers;
    }

    let mut to_remove: HashSet<usize> = HashSet::new();
    for group in groups {
        to_remove.extend(group.into_iter().skip(1));
    }

    papers
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !to_remove.contains(i))
        .map(|(_, p)| p)
        .collect()
}
