//! Keyword backend over the legacy `wiki_documents` table

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use super::keyword_scoring::{KeywordScorer, CANDIDATE_MULTIPLIER};
use crate::domain::search::{
    KeywordDocument, SearchSource, SourceKind, SourceQuery, SourceType, VectorResult,
};
use crate::domain::DomainError;

pub const DEFAULT_WIKI_APP: &str = "AOMA_WIKI";

/// Text-search fallback for a store that has no usable embeddings
#[derive(Debug, Clone)]
pub struct PgKeywordSource {
    name: String,
    pool: PgPool,
    app_name: Option<String>,
    source_types: Vec<SourceType>,
    scorer: KeywordScorer,
}

impl PgKeywordSource {
    pub fn new(name: impl Into<String>, pool: PgPool) -> Self {
        Self {
            name: name.into(),
            pool,
            app_name: Some(DEFAULT_WIKI_APP.to_string()),
            source_types: vec![SourceType::Wiki],
            scorer: KeywordScorer::default(),
        }
    }

    /// Restrict to one application's pages; `None` searches every app
    pub fn with_app_name(mut self, app_name: Option<String>) -> Self {
        self.app_name = app_name;
        self
    }

    pub fn with_scorer(mut self, scorer: KeywordScorer) -> Self {
        self.scorer = scorer;
        self
    }

    fn candidate_sql(&self, term_count: usize) -> String {
        // $1..$n are term patterns, followed by the optional app filter and the cap
        let conditions: Vec<String> = (1..=term_count)
            .map(|i| format!("title ILIKE ${i} OR markdown_content ILIKE ${i}"))
            .collect();

        let mut next = term_count + 1;
        let app_filter = if self.app_name.is_some() {
            let clause = format!(" AND app_name = ${}", next);
            next += 1;
            clause
        } else {
            String::new()
        };

        format!(
            "SELECT id::text AS id, title, markdown_content, url, metadata \
             FROM wiki_documents WHERE ({}){} LIMIT ${}",
            conditions.join(" OR "),
            app_filter,
            next
        )
    }

    fn row_to_document(row: &PgRow) -> Option<KeywordDocument> {
        let id: String = row.try_get("id").ok()?;

        Some(KeywordDocument {
            id,
            title: row.try_get("title").ok(),
            content: row.try_get("markdown_content").ok(),
            url: row.try_get("url").ok(),
            metadata: row.try_get("metadata").ok(),
        })
    }
}

#[async_trait]
impl SearchSource for PgKeywordSource {
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
        let sql = self.candidate_sql(terms.len());

        tracing::debug!(
            source = %self.name,
            terms = ?terms,
            candidate_cap = cap,
            "Querying keyword store"
        );

        let mut statement = sqlx::query(&sql);
        for term in &terms {
            statement = statement.bind(format!("%{}%", term));
        }
        if let Some(app) = &self.app_name {
            statement = statement.bind(app);
        }
        statement = statement.bind(i64::try_from(cap).unwrap_or(i64::MAX));

        let rows = statement.fetch_all(&self.pool).await.map_err(|e| {
            tracing::error!(source = %self.name, error = %e, "Keyword search failed");
            DomainError::storage(format!("Keyword search failed: {}", e))
        })?;

        let candidates: Vec<KeywordDocument> =
            rows.iter().filter_map(Self::row_to_document).collect();
        let candidate_count = candidates.len();

        let results = self.scorer.rank(
            candidates,
            &terms,
            SourceType::Wiki,
            query.limit,
        );

        tracing::debug!(
            source = %self.name,
            candidates = candidate_count,
            results = results.len(),
            "Keyword search completed"
        );

        Ok(results)
    }
}
