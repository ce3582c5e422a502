//! Vector-index backend over the `match_knowledge_vectors` Postgres function

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::search::{
    RawVectorRow, SearchSource, SourceKind, SourceQuery, SourceType, VectorResult,
};
use crate::domain::DomainError;

/// Calls the similarity function for a fixed set of source types
#[derive(Debug, Clone)]
pub struct PgVectorSource {
    name: String,
    pool: PgPool,
    /// Tenant/application scope passed through to the similarity function
    scope: String,
    source_types: Vec<SourceType>,
}

impl PgVectorSource {
    pub fn new(
        name: impl Into<String>,
        pool: PgPool,
        scope: impl Into<String>,
        source_types: Vec<SourceType>,
    ) -> Self {
        Self {
            name: name.into(),
            pool,
            scope: scope.into(),
            source_types,
        }
    }

    fn row_to_raw(row: &PgRow) -> RawVectorRow {
        RawVectorRow {
            id: row.try_get("id").ok(),
            content: row.try_get("content").ok(),
            source_type: row.try_get("source_type").ok(),
            source_id: row.try_get("source_id").ok(),
            similarity: row.try_get("similarity").ok(),
            metadata: row.try_get("metadata").ok(),
        }
    }
}

pub(crate) fn embedding_to_pgvector(embedding: &[f32]) -> String {
    let values: Vec<String> = embedding.iter().map(|v| v.to_string()).collect();
    format!("[{}]", values.join(","))
}

/// Normalize raw rows, skipping (and logging) any that fail validation
pub(crate) fn normalize_rows(source: &str, rows: Vec<RawVectorRow>) -> Vec<VectorResult> {
    let total = rows.len();
    let results: Vec<VectorResult> = rows
        .into_iter()
        .filter_map(|row| match VectorResult::try_from(row) {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::warn!(source = source, error = %e, "Skipping invalid search row");
                None
            }
        })
        .collect();

    if results.len() < total {
        tracing::debug!(
            source = source,
            rows = total,
            valid = results.len(),
            "Dropped invalid rows"
        );
    }

    results
}

#[async_trait]
impl SearchSource for PgVectorSource {
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
        let filter: Vec<String> = query
            .source_types
            .iter()
            .map(|t| t.as_str().to_string())
            .collect();

        tracing::debug!(
            source = %self.name,
            scope = %self.scope,
            threshold = query.threshold,
            limit = query.limit,
            source_types = ?filter,
            "Querying vector index"
        );

        let rows = sqlx::query(
            r#"
            SELECT
                id::text AS id,
                content,
                source_type,
                source_id,
                similarity::float8 AS similarity,
                metadata
            FROM match_knowledge_vectors($1::vector, $2, $3, $4, $5)
            "#,
        )
        .bind(embedding_to_pgvector(query.embedding))
        .bind(&self.scope)
        .bind(f64::from(query.threshold))
        .bind(i32::try_from(query.limit).unwrap_or(i32::MAX))
        .bind(&filter)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(source = %self.name, error = %e, "Vector search failed");
            DomainError::storage(format!("Vector search failed: {}", e))
        })?;

        let raw: Vec<RawVectorRow> = rows.iter().map(Self::row_to_raw).collect();
        let results = normalize_rows(&self.name, raw);

        tracing::debug!(
            source = %self.name,
            results = results.len(),
            "Vector search completed"
        );

        Ok(results)
    }
}
