//! Query domain - request normalization and response shapes

mod request;
mod response;

pub use request::{
    cache_text, preprocess_query, NormalizedQuery, QueryLimits, QueryRequest, MAX_QUERY_CHARS,
};
pub use response::{QueryFailure, QueryMetrics, QueryResponse};

pub(crate) use response::as_millis;
