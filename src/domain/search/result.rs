//! Search result types and row normalization

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Corpus a result originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Commit history
    Git,
    /// Issue tracker tickets
    Jira,
    /// Generic knowledge articles
    Knowledge,
    /// Support email threads
    Email,
    /// Operational metrics snapshots
    Metrics,
    /// Wiki pages (legacy text-search store)
    Wiki,
}

impl SourceType {
    pub const ALL: [SourceType; 6] = [
        SourceType::Git,
        SourceType::Jira,
        SourceType::Knowledge,
        SourceType::Email,
        SourceType::Metrics,
        SourceType::Wiki,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Git => "git",
            Self::Jira => "jira",
            Self::Knowledge => "knowledge",
            Self::Email => "email",
            Self::Metrics => "metrics",
            Self::Wiki => "wiki",
        }
    }

    /// Whether a richer detail record can be fetched for results of this type
    pub fn supports_detail(&self) -> bool {
        matches!(self, Self::Git | Self::Jira | Self::Email | Self::Wiki)
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "git" => Ok(Self::Git),
            "jira" => Ok(Self::Jira),
            "knowledge" => Ok(Self::Knowledge),
            "email" => Ok(Self::Email),
            "metrics" => Ok(Self::Metrics),
            "wiki" => Ok(Self::Wiki),
            other => Err(DomainError::validation(format!(
                "Unknown source type '{}'",
                other
            ))),
        }
    }
}

/// Normalized representation of one retrieved item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorResult {
    pub id: String,
    pub content: String,
    pub source_type: SourceType,
    pub source_id: String,
    pub similarity: f32,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub expandable: bool,
}

impl VectorResult {
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        source_type: SourceType,
        source_id: impl Into<String>,
        similarity: f32,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            source_type,
            source_id: source_id.into(),
            similarity: clamp_similarity(similarity),
            metadata: HashMap::new(),
            expandable: false,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_all_metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

fn clamp_similarity(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Untyped row as returned by a vector similarity backend
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawVectorRow {
    pub id: Option<String>,
    pub content: Option<String>,
    pub source_type: Option<String>,
    pub source_id: Option<String>,
    pub similarity: Option<f64>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl TryFrom<RawVectorRow> for VectorResult {
    type Error = DomainError;

    fn try_from(row: RawVectorRow) -> Result<Self, Self::Error> {
        let id = non_empty(row.id, "id")?;
        let source_id = non_empty(row.source_id, "source_id")?;
        let source_type = row
            .source_type
            .as_deref()
            .ok_or_else(|| DomainError::validation("Row is missing source_type"))?
            .parse::<SourceType>()?;
        let similarity = row
            .similarity
            .ok_or_else(|| DomainError::validation("Row is missing similarity"))?;

        let metadata = match row.metadata {
            Some(serde_json::Value::Object(map)) => map.into_iter().collect(),
            _ => HashMap::new(),
        };

        Ok(VectorResult::new(
            id,
            row.content.unwrap_or_default(),
            source_type,
            source_id,
            similarity as f32,
        )
        .with_all_metadata(metadata))
    }
}

/// Untyped row from the keyword-searchable document store
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeywordDocument {
    pub id: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl KeywordDocument {
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: Some(title.into()),
            content: Some(content.into()),
            url: None,
            metadata: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    pub fn content(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    /// Normalize into a result of the given source type with a pseudo-similarity
    pub fn into_result(self, source_type: SourceType, similarity: f32) -> VectorResult {
        let source_id = self
            .url
            .clone()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| self.id.clone());

        let mut metadata: HashMap<String, serde_json::Value> = match self.metadata {
            Some(serde_json::Value::Object(map)) => map.into_iter().collect(),
            _ => HashMap::new(),
        };

        if let Some(title) = &self.title {
            metadata.insert("title".to_string(), serde_json::json!(title));
        }

        if let Some(url) = &self.url {
            metadata.insert("url".to_string(), serde_json::json!(url));
        }

        VectorResult::new(
            self.id,
            self.content.unwrap_or_default(),
            source_type,
            source_id,
            similarity,
        )
        .with_all_metadata(metadata)
    }
}

fn non_empty(value: Option<String>, field: &str) -> Result<String, DomainError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(DomainError::validation(format!("Row is missing {}", field))),
    }
}
