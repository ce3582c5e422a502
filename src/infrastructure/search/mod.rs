//! Search backends - vector index, keyword fallback, and detail lookup

mod detail;
mod in_memory;
mod keyword_scoring;
mod keyword_source;
mod pgvector_source;

pub use detail::{InMemoryDetailLookup, PgDetailLookup, DEFAULT_VECTOR_TABLE};
pub use in_memory::{InMemoryKeywordSource, InMemoryVectorSource, StoredVector};
pub use keyword_scoring::{
    KeywordScorer, CANDIDATE_MULTIPLIER, DEFAULT_TERM, MAX_KEYWORD_SCORE, MIN_KEYWORD_SCORE,
    NAVIGATION_MARKERS,
};
pub use keyword_source::{PgKeywordSource, DEFAULT_WIKI_APP};
pub use pgvector_source::PgVectorSource;
