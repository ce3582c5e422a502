//! Domain layer - Core business logic and entities

pub mod cache;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod query;
pub mod search;

pub use cache::{Cache, CacheKeyGenerator, CacheKeyParams, DefaultKeyGenerator};
pub use embedding::{cosine_similarity, EmbeddingProvider, EmbeddingResult};
pub use error::DomainError;
pub use llm::{FinishReason, LlmProvider, LlmRequest, LlmRequestBuilder, LlmResponse, Message, MessageRole, Usage};
pub use query::{NormalizedQuery, QueryFailure, QueryLimits, QueryMetrics, QueryRequest, QueryResponse};
pub use search::{
    DetailLookup, DetailRecord, KeywordDocument, RawVectorRow, ScorePolicy, SearchSource,
    SourceKind, SourceQuery, SourceType, TieBreak, VectorResult,
};
