//! Keyword relevance scoring.
//!
//! Scores a candidate text against a query using two heuristics and keeps the
//! better of the two:
//!
//! 1. **Word overlap** — fraction of distinct query words that appear as
//!    distinct words of the candidate.
//! 2. **Substring match** — fraction of query words that appear anywhere in
//!    the lowercased candidate text.
//!
//! A candidate qualifies only when its score strictly exceeds the configured
//! threshold. Qualifiers are ranked best-first and truncated to the
//! configured top-K. An empty query scores 0 everywhere, so it matches
//! nothing rather than erroring.

use std::collections::HashSet;

use crate::config::RetrievalConfig;
use crate::models::SearchHit;

/// Function words stripped from the query when stop-word filtering is on.
const STOP_WORDS: &[&str] = &[
    "the", "is", "are", "what", "how", "where", "when", "why", "who", "a", "an", "and", "or",
    "but", "in", "on", "at", "to", "for", "of", "with", "by", "explain", "tell", "me", "about",
];

/// Lowercase and split on whitespace into a set of distinct words.
pub fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Build the query word set, optionally removing stop words.
///
/// If filtering empties the set, the whole trimmed lowercased query is kept
/// as a single token so short queries still match something.
pub fn query_words(query: &str, filter_stop_words: bool) -> HashSet<String> {
    let mut words = tokenize(query);
    if filter_stop_words {
        words.retain(|w| !STOP_WORDS.contains(&w.as_str()));
        if words.is_empty() {
            let whole = query.trim().to_lowercase();
            if !whole.is_empty() {
                words.insert(whole);
            }
        }
    }
    words
}

/// Score a candidate text against a prepared query word set.
pub fn score_text(query: &HashSet<String>, text: &str) -> f64 {
    if query.is_empty() {
        return 0.0;
    }
    let text_lower = text.to_lowercase();
    let text_words = tokenize(&text_lower);

    let overlap = query.intersection(&text_words).count() as f64 / query.len() as f64;
    let substring =
        query.iter().filter(|w| text_lower.contains(w.as_str())).count() as f64 / query.len() as f64;

    overlap.max(substring)
}

/// Rank candidate texts against a query: score, threshold, sort, truncate.
///
/// Returns qualifying candidates best match first. Ties keep their input
/// order (stable sort).
pub fn rank<'a, I>(query: &str, candidates: I, retrieval: &RetrievalConfig) -> Vec<SearchHit>
where
    I: IntoIterator<Item = &'a str>,
{
    let words = query_words(query, retrieval.stop_words);

    let mut hits: Vec<SearchHit> = candidates
        .into_iter()
        .filter_map(|text| {
            let score = score_text(&words, text);
            if score > retrieval.threshold {
                Some(SearchHit {
                    text: text.to_string(),
                    score,
                })
            } else {
                None
            }
        })
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(retrieval.top_k);
    hits
}
