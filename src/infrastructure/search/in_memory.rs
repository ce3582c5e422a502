//! In-memory search backends for development and tests

use std::collections::HashMap;
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::keyword_scoring::{KeywordScorer, CANDIDATE_MULTIPLIER};
use crate::domain::embedding::cosine_similarity;
use crate::domain::search::{
    KeywordDocument, SearchSource, SourceKind, SourceQuery, SourceType, VectorResult,
};
use crate::domain::DomainError;

/// A stored row with its embedding
#[derive(Debug, Clone)]
pub struct StoredVector {
    pub id: String,
    pub content: String,
    pub source_type: SourceType,
    pub source_id: String,
    pub embedding: Vec<f32>,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl StoredVector {
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        source_type: SourceType,
        source_id: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            source_type,
            source_id: source_id.into(),
            embedding,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Vector backend computing cosine similarity over stored rows
#[derive(Debug)]
pub struct InMemoryVectorSource {
    name: String,
    source_types: Vec<SourceType>,
    rows: RwLock<Vec<StoredVector>>,
}

impl InMemoryVectorSource {
    pub fn new(name: impl Into<String>, source_types: Vec<SourceType>) -> Self {
        Self {
            name: name.into(),
            source_types,
            rows: RwLock::new(Vec::new()),
        }
    }

    pub fn with_rows(mut self, rows: Vec<StoredVector>) -> Self {
        self.rows.get_mut().extend(rows);
        self
    }

    pub async fn insert(&self, row: StoredVector) {
        self.rows.write().await.push(row);
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SearchSource for InMemoryVectorSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Vector
    }

    fn source_types(&self) -> &[SourceType] {
        &self.source_types
    }

    async fn search(&self, query: &SourceQuery<'_>) -> Result<Vec<VectorResult>, DomainError> {
        let rows = self.rows.read().await;

        let mut results: Vec<VectorResult> = rows
            .iter()
            .filter(|row| query.source_types.contains(&row.source_type))
            .filter_map(|row| {
                let similarity = cosine_similarity(query.embedding, &row.embedding);
                if similarity < query.threshold {
                    return None;
                }

                Some(
                    VectorResult::new(
                        row.id.clone(),
                        row.content.clone(),
                        row.source_type,
                        row.source_id.clone(),
                        similarity,
                    )
                    .with_all_metadata(row.metadata.clone()),
                )
            })
            .collect();

        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(query.limit);

        Ok(results)
    }
}

/// Keyword backend over an in-memory document list
#[derive(Debug)]
pub struct InMemoryKeywordSource {
    name: String,
    source_types: Vec<SourceType>,
    documents: RwLock<Vec<KeywordDocument>>,
    scorer: KeywordScorer,
}

impl InMemoryKeywordSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_types: vec![SourceType::Wiki],
            documents: RwLock::new(Vec::new()),
            scorer: KeywordScorer::default(),
        }
    }

    pub fn with_documents(mut self, documents: Vec<KeywordDocument>) -> Self {
        self.documents.get_mut().extend(documents);
        self
    }

    pub fn with_scorer(mut self, scorer: KeywordScorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub async fn insert(&self, document: KeywordDocument) {
        self.documents.write().await.push(document);
    }
}

#[async_trait]
impl SearchSource for InMemoryKeywordSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Keyword
    }

    fn source_types(&self) -> &[SourceType] {
        &self.source_types
    }

    async fn search(&self, query: &SourceQuery<'_>) -> Result<Vec<VectorResult>, DomainError> {
        let terms = self.scorer.terms(query.text);
        let cap = query.limit.saturating_mul(CANDIDATE_MULTIPLIER);

        let candidates: Vec<KeywordDocument> = self
            .documents
            .read()
            .await
            .iter()
            .filter(|doc| self.scorer.matches(doc, &terms))
            .take(cap)
            .cloned()
            .collect();

        Ok(self
            .scorer
            .rank(candidates, &terms, SourceType::Wiki, query.limit))
    }
}
