//! Retrieved context candidates and the retrieval boundary.
//!
//! Retrieval itself (embeddings, vector search, usage mining) lives outside
//! sqlwright. A [`Retriever`] hands back ranked candidates per component; the
//! assembler treats every list as already ordered best-first and never
//! re-ranks or retries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A table that may be relevant to the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaCandidate {
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Relevance score from retrieval (0.0–1.0).
    #[serde(default)]
    pub relevance: f64,
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub foreign_key: bool,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            primary_key: false,
            foreign_key: false,
            nullable: true,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn foreign_key(mut self) -> Self {
        self.foreign_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// A foreign-key edge from the owning table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub column: String,
    pub target_table: String,
    pub target_column: String,
}

/// A previously used query similar to the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleCandidate {
    /// The natural-language question the query answered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    pub sql: String,
    #[serde(default)]
    pub similarity: f64,
    /// How many times the query has been run
    #[serde(default)]
    pub usage_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessRuleCandidate {
    pub name: String,
    pub description: String,
    /// SQL fragment implementing the rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_mapping: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceHint {
    /// e.g. "index", "partition", "join"
    pub kind: String,
    pub description: String,
    /// "high", "medium" or "low"
    #[serde(default = "default_impact")]
    pub impact: String,
}

fn default_impact() -> String {
    "medium".into()
}

/// Ranked candidates for every component, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateSet {
    #[serde(default)]
    pub schema: Vec<SchemaCandidate>,
    #[serde(default)]
    pub examples: Vec<ExampleCandidate>,
    #[serde(default)]
    pub business_rules: Vec<BusinessRuleCandidate>,
    #[serde(default)]
    pub performance_hints: Vec<PerformanceHint>,
}

impl CandidateSet {
    pub fn is_empty(&self) -> bool {
        self.schema.is_empty()
            && self.examples.is_empty()
            && self.business_rules.is_empty()
            && self.performance_hints.is_empty()
    }
}

/// Source of ranked candidates for a connection and request text.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, connection_id: &str, query: &str) -> sqlwright_core::Result<CandidateSet>;
}

/// Returns the same candidates for every request.
#[derive(Debug, Clone, Default)]
pub struct StaticRetriever {
    candidates: CandidateSet,
}

impl StaticRetriever {
    pub fn new(candidates: CandidateSet) -> Self {
        Self { candidates }
    }

    /// Load a candidate set from JSON.
    pub fn from_json(json: &str) -> sqlwright_core::Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn retrieve(&self, _connection_id: &str, _query: &str) -> sqlwright_core::Result<CandidateSet> {
        Ok(self.candidates.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_builders() {
        let id = ColumnInfo::new("id", "bigint").primary_key();
        assert!(id.primary_key && !id.nullable);

        let fk = ColumnInfo::new("customer_id", "bigint").foreign_key().not_null();
        assert!(fk.foreign_key && !fk.nullable && !fk.primary_key);
    }

    #[tokio::test]
    async fn static_retriever_from_json() {
        let retriever = StaticRetriever::from_json(
            r#"{
                "schema": [{
                    "table": "orders",
                    "relevance": 0.9,
                    "columns": [{"name": "id", "data_type": "bigint", "primary_key": true, "nullable": false}]
                }],
                "performance_hints": [{"kind": "index", "description": "orders.created_at is indexed"}]
            }"#,
        )
        .unwrap();

        let set = retriever.retrieve("conn-1", "recent orders").await.unwrap();
        assert_eq!(set.schema[0].table, "orders");
        assert!(set.schema[0].columns[0].primary_key);
        assert_eq!(set.performance_hints[0].impact, "medium");
        assert!(set.examples.is_empty());
        assert!(!set.is_empty());
    }

    #[test]
    fn bad_json_is_serialization_error() {
        let err = StaticRetriever::from_json("{not json").unwrap_err();
        assert_eq!(err.kind(), sqlwright_core::ErrorKind::InternalError);
    }
}
