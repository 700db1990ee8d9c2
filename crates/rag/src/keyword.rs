//! Keyword-scoring fallback search
//!
//! Used whenever the vector store is unavailable: disabled by configuration,
//! not yet indexed, or the embedding service failing at query time. Scores
//! whole sections rather than chunks; short focused sections are favored by
//! the length divisor.

use crate::corpus::Section;

/// Closed stop-word set; matching is case-insensitive.
pub const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "your", "with", "can",
    "how", "what", "when", "where", "who", "why", "does", "this", "that",
    "have", "has", "was", "will", "about", "from", "into", "their", "there",
    "they", "its",
];

/// A scored section.
#[derive(Debug, Clone)]
pub struct KeywordHit<'a> {
    pub score: f32,
    pub section: &'a Section,
}

/// Lowercase alphabetic tokens of at least three characters, stop words
/// removed.
pub fn extract_keywords(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| w.len() >= 3)
        .filter(|w| !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Score sections against the query and return the top `k` hits with a
/// positive score.
pub fn keyword_search<'a>(query: &str, sections: &'a [Section], k: usize) -> Vec<KeywordHit<'a>> {
    let keywords = extract_keywords(query);
    if keywords.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<KeywordHit<'a>> = sections
        .iter()
        .filter_map(|section| {
            let score = score_section(&keywords, section);
            (score > 0.0).then_some(KeywordHit { score, section })
        })
        .collect();

    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(k);
    hits
}

/// Occurrences of all keywords x 100, +200 when every keyword appears,
/// divided by section length / 100 to favor concise sections.
fn score_section(keywords: &[String], section: &Section) -> f32 {
    let haystack = section.text.to_lowercase();

    let mut occurrences = 0usize;
    let mut matched = 0usize;
    for keyword in keywords {
        let count = haystack.matches(keyword.as_str()).count();
        occurrences += count;
        if count > 0 {
            matched += 1;
        }
    }

    if occurrences == 0 {
        return 0.0;
    }

    let mut score = (occurrences * 100) as f32;
    if matched == keywords.len() {
        score += 200.0;
    }

    let length_factor = (section.text.len() as f32 / 100.0).max(1.0);
    score / length_factor
}
