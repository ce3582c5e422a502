//! Application state for shared services

use std::sync::Arc;

use crate::domain::query::{QueryFailure, QueryRequest, QueryResponse};
use crate::domain::search::DetailLookup;
use crate::infrastructure::services::QueryService;

/// Application state containing shared services using dynamic dispatch
#[derive(Clone)]
pub struct AppState {
    pub query_service: Arc<dyn QueryServiceTrait>,
    pub detail_lookup: Arc<dyn DetailLookup>,
}

/// Trait for query service operations
#[async_trait::async_trait]
pub trait QueryServiceTrait: Send + Sync {
    async fn query(&self, request: QueryRequest) -> Result<QueryResponse, QueryFailure>;

    /// Names of the registered search backends, in registration order
    fn backends(&self) -> Vec<String>;

    fn cached_responses(&self) -> u64;
}

#[async_trait::async_trait]
impl QueryServiceTrait for QueryService {
    async fn query(&self, request: QueryRequest) -> Result<QueryResponse, QueryFailure> {
        QueryService::query(self, request).await
    }

    fn backends(&self) -> Vec<String> {
        self.search_engine()
            .sources()
            .iter()
            .map(|s| s.name().to_string())
            .collect()
    }

    fn cached_responses(&self) -> u64 {
        QueryService::cached_responses(self)
    }
}

impl AppState {
    /// Create new application state with provided services
    pub fn new(
        query_service: Arc<dyn QueryServiceTrait>,
        detail_lookup: Arc<dyn DetailLookup>,
    ) -> Self {
        Self {
            query_service,
            detail_lookup,
        }
    }
}
