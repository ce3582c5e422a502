//! Detail lookup behind expandable results

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::Serialize;

use super::SourceType;
use crate::domain::DomainError;

/// Full record behind a search result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailRecord {
    pub source_type: SourceType,
    pub source_id: String,
    pub record: serde_json::Value,
}

impl DetailRecord {
    pub fn new(source_type: SourceType, source_id: impl Into<String>, record: serde_json::Value) -> Self {
        Self {
            source_type,
            source_id: source_id.into(),
            record,
        }
    }
}

/// Fetches the full record for a `(source_type, source_id)` pair
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DetailLookup: Send + Sync {
    async fn fetch(
        &self,
        source_type: SourceType,
        source_id: &str,
    ) -> Result<Option<DetailRecord>, DomainError>;
}
