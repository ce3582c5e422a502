//! Detail lookup implementations

use std::collections::HashMap;
use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;
use tokio::sync::RwLock;

use crate::domain::search::{DetailLookup, DetailRecord, SourceType};
use crate::domain::DomainError;

pub const DEFAULT_VECTOR_TABLE: &str = "knowledge_vectors";

/// Fetches full records from the vector table or the wiki table
#[derive(Debug, Clone)]
pub struct PgDetailLookup {
    pool: PgPool,
    vector_table: String,
}

impl PgDetailLookup {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            vector_table: DEFAULT_VECTOR_TABLE.to_string(),
        }
    }

    pub fn with_vector_table(mut self, table: impl Into<String>) -> Self {
        self.vector_table = table.into();
        self
    }

    fn query_for(&self, source_type: SourceType) -> String {
        match source_type {
            SourceType::Wiki => "SELECT row_to_json(w)::jsonb AS record FROM wiki_documents w \
                                 WHERE w.url = $1 OR w.id::text = $1 LIMIT 1"
                .to_string(),
            _ => format!(
                "SELECT (row_to_json(v)::jsonb - 'embedding') AS record FROM {} v \
                 WHERE v.source_id = $1 AND v.source_type = $2 LIMIT 1",
                self.vector_table
            ),
        }
    }
}

#[async_trait]
impl DetailLookup for PgDetailLookup {
    async fn fetch(
        &self,
        source_type: SourceType,
        source_id: &str,
    ) -> Result<Option<DetailRecord>, DomainError> {
        if !source_type.supports_detail() {
            return Ok(None);
        }

        let sql = self.query_for(source_type);
        let mut statement = sqlx::query(&sql).bind(source_id);
        if source_type != SourceType::Wiki {
            statement = statement.bind(source_type.as_str());
        }

        let row = statement
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to fetch detail: {}", e)))?;

        match row {
            Some(row) => {
                let record: serde_json::Value = row
                    .try_get("record")
                    .map_err(|e| DomainError::storage(format!("Invalid detail row: {}", e)))?;

                Ok(Some(DetailRecord::new(source_type, source_id, record)))
            }
            None => Ok(None),
        }
    }
}

/// Detail records held in memory, keyed by `(source_type, source_id)`
#[derive(Debug, Default)]
pub struct InMemoryDetailLookup {
    records: RwLock<HashMap<(SourceType, String), serde_json::Value>>,
}

impl InMemoryDetailLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(
        mut self,
        source_type: SourceType,
        source_id: impl Into<String>,
        record: serde_json::Value,
    ) -> Self {
        self.records
            .get_mut()
            .insert((source_type, source_id.into()), record);
        self
    }
}

#[async_trait]
impl DetailLookup for InMemoryDetailLookup {
    async fn fetch(
        &self,
        source_type: SourceType,
        source_id: &str,
    ) -> Result<Option<DetailRecord>, DomainError> {
        if !source_type.supports_detail() {
            return Ok(None);
        }

        let records = self.records.read().await;

        Ok(records
            .get(&(source_type, source_id.to_string()))
            .map(|record| DetailRecord::new(source_type, source_id, record.clone())))
    }
}
