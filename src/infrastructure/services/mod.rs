//! Infrastructure services

mod embedding_service;
mod query_service;
mod search_service;
mod synthesis_service;

pub use embedding_service::{EmbeddingService, DEFAULT_EMBEDDING_DIMENSIONS};
pub use query_service::QueryService;
pub use search_service::{SearchEngine, SearchOutcome, DEFAULT_FANOUT_TIMEOUT};
pub use synthesis_service::{
    build_context, build_prompt, Synthesis, SynthesisConfig, SynthesisEngine, SynthesisTarget,
    EMPTY_RESULTS_ANSWER,
};
