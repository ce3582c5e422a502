//! Term extraction and pseudo-similarity for keyword-only stores

use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::domain::search::{KeywordDocument, SourceType, VectorResult};

/// Term searched for when a query yields no usable terms
pub const DEFAULT_TERM: &str = "aoma";

/// Pseudo-similarity bounds for keyword matches
pub const MIN_KEYWORD_SCORE: f32 = 0.3;
pub const MAX_KEYWORD_SCORE: f32 = 0.9;

/// Occurrences per term that map to the maximum score
const OCCURRENCES_PER_TERM: f32 = 5.0;

/// Candidate rows fetched per requested result
pub const CANDIDATE_MULTIPLIER: usize = 3;

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "and", "for", "but", "not", "are", "was", "were", "has", "have", "had", "does",
        "did", "can", "could", "should", "would", "will", "what", "which", "who", "whom", "why",
        "when", "where", "how", "this", "that", "these", "those", "with", "from", "into", "about",
        "your", "you", "our", "their", "there", "then", "than", "any", "all", "some", "its",
        "tell", "explain", "show", "give", "please", "use", "using", "get",
    ]
    .into_iter()
    .collect()
});

/// Phrases that mark index or navigation pages rather than content
pub const NAVIGATION_MARKERS: &[&str] = &[
    "table of contents",
    "page tree",
    "child pages",
    "index of",
];

/// Scores keyword-store documents against a query
#[derive(Debug, Clone)]
pub struct KeywordScorer {
    default_term: String,
}

impl Default for KeywordScorer {
    fn default() -> Self {
        Self::new(DEFAULT_TERM)
    }
}

impl KeywordScorer {
    pub fn new(default_term: impl Into<String>) -> Self {
        Self {
            default_term: default_term.into().to_lowercase(),
        }
    }

    /// Lower-cased search terms, falling back to the default term
    pub fn terms(&self, query: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let terms: Vec<String> = query
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.chars().count() > 2 && !STOPWORDS.contains(t))
            .filter(|t| seen.insert(t.to_string()))
            .map(str::to_string)
            .collect();

        if terms.is_empty() {
            vec![self.default_term.clone()]
        } else {
            terms
        }
    }

    /// Case-insensitive check that any term appears in the title or content
    pub fn matches(&self, doc: &KeywordDocument, terms: &[String]) -> bool {
        let title = doc.title().to_lowercase();
        let content = doc.content().to_lowercase();

        terms
            .iter()
            .any(|t| title.contains(t.as_str()) || content.contains(t.as_str()))
    }

    pub fn is_navigation(&self, doc: &KeywordDocument) -> bool {
        let title = doc.title().to_lowercase();
        let content = doc.content().to_lowercase();

        NAVIGATION_MARKERS
            .iter()
            .any(|m| title.contains(m) || content.contains(m))
    }

    /// Occurrence-based pseudo-similarity in `[0.3, 0.9]`
    pub fn score(&self, doc: &KeywordDocument, terms: &[String]) -> f32 {
        if terms.is_empty() {
            return MIN_KEYWORD_SCORE;
        }

        let haystack = format!("{} {}", doc.title(), doc.content()).to_lowercase();
        let occurrences: usize = terms
            .iter()
            .map(|t| haystack.matches(t.as_str()).count())
            .sum();

        let raw = occurrences as f32 / (terms.len() as f32 * OCCURRENCES_PER_TERM);
        raw.clamp(MIN_KEYWORD_SCORE, MAX_KEYWORD_SCORE)
    }

    /// Score candidates, drop navigation pages, sort and truncate.
    ///
    /// Pseudo-similarity is not comparable to a vector threshold, so every
    /// matched page keeps at least the floor score.
    pub fn rank(
        &self,
        candidates: Vec<KeywordDocument>,
        terms: &[String],
        source_type: SourceType,
        limit: usize,
    ) -> Vec<VectorResult> {
        let mut scored: Vec<VectorResult> = candidates
            .into_iter()
            .filter(|doc| !self.is_navigation(doc))
            .map(|doc| {
                let score = self.score(&doc, terms);
                doc.into_result(source_type, score)
            })
            .collect();

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);
        scored
    }
}
