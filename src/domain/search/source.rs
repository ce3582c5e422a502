//! Search source trait definition

use std::fmt::Debug;

use async_trait::async_trait;

use super::{SourceType, VectorResult};
use crate::domain::DomainError;

/// Backend category, used for logging and metrics labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// True vector index answering a similarity operation
    Vector,
    /// Keyword store standing in for a vector index
    Keyword,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Keyword => "keyword",
        }
    }
}

/// Parameters passed to a single backend query
#[derive(Debug, Clone)]
pub struct SourceQuery<'a> {
    /// Query embedding
    pub embedding: &'a [f32],
    /// Raw (trimmed) query text
    pub text: &'a str,
    /// Minimum raw similarity
    pub threshold: f32,
    /// Maximum rows to return
    pub limit: usize,
    /// Source types this backend should restrict itself to
    pub source_types: Vec<SourceType>,
}

/// A searchable backend
///
/// Vector-index backends and keyword fallbacks implement the same trait so the
/// engine never needs to know how a backend ranks its rows.
#[async_trait]
pub trait SearchSource: Send + Sync + Debug {
    /// Backend name for logs and metrics
    fn name(&self) -> &str;

    /// Backend category
    fn kind(&self) -> SourceKind;

    /// Source types this backend can return
    fn source_types(&self) -> &[SourceType];

    /// Query the backend; rows must already be normalized
    async fn search(&self, query: &SourceQuery<'_>) -> Result<Vec<VectorResult>, DomainError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Mock search source for testing
    #[derive(Debug)]
    pub struct MockSearchSource {
        name: String,
        kind: SourceKind,
        source_types: Vec<SourceType>,
        results: Vec<VectorResult>,
        error: Option<String>,
        delay: Option<Duration>,
        calls: AtomicUsize,
        last_filter: Mutex<Option<Vec<SourceType>>>,
    }

    impl MockSearchSource {
        pub fn new(name: impl Into<String>, source_types: Vec<SourceType>) -> Self {
            Self {
                name: name.into(),
                kind: SourceKind::Vector,
                source_types,
                results: Vec::new(),
                error: None,
                delay: None,
                calls: AtomicUsize::new(0),
                last_filter: Mutex::new(None),
            }
        }

        pub fn with_kind(mut self, kind: SourceKind) -> Self {
            self.kind = kind;
            self
        }

        pub fn with_results(mut self, results: Vec<VectorResult>) -> Self {
            self.results = results;
            self
        }

        pub fn with_error(mut self, error: impl Into<String>) -> Self {
            self.error = Some(error.into());
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn last_filter(&self) -> Option<Vec<SourceType>> {
            self.last_filter.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SearchSource for MockSearchSource {
        fn name(&self) -> &str {
            &self.name
        }

        fn kind(&self) -> SourceKind {
            self.kind
        }

        fn source_types(&self) -> &[SourceType] {
            &self.source_types
        }

        async fn search(
            &self,
            query: &SourceQuery<'_>,
        ) -> Result<Vec<VectorResult>, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_filter.lock().unwrap() = Some(query.source_types.clone());

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            if let Some(ref error) = self.error {
                return Err(DomainError::provider(self.name.clone(), error));
            }

            Ok(self
                .results
                .iter()
                .filter(|r| query.source_types.contains(&r.source_type))
                .take(query.limit)
                .cloned()
                .collect())
        }
    }
}
