//! Caller-facing request and result types.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Whether a request asks for a new query or a repair of an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Generate,
    Fix,
}

impl RequestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Fix => "fix",
        }
    }
}

/// A natural-language-to-SQL or SQL-repair request.
///
/// Generation needs a non-empty `prompt`. Fixing needs a non-empty `query`
/// and `error`; a prompt on a fix request is passed along as additional
/// context. Unset provider, model, token ceiling and temperature are filled
/// from configuration before dispatch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Natural-language request
    #[serde(default)]
    pub prompt: String,

    /// Existing query (fix requests)
    #[serde(default)]
    pub query: String,

    /// Database error produced by `query` (fix requests)
    #[serde(default)]
    pub error: String,

    /// Schema text supplied directly by the caller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature in [0, 1]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Open hints such as `connection_id` and `connection_type`
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl GenerationRequest {
    /// A generation request for `prompt`.
    pub fn generate(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// A fix request for `query` that failed with `error`.
    pub fn fix(query: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            error: error.into(),
            ..Default::default()
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// A structured SQL answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub query: String,
    pub explanation: String,
    /// Confidence in [0, 1]. Fallback extraction paths cap this value.
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub provider: String,
    pub model: String,
    pub tokens_used: u32,
    /// Wall-clock time of the backend call
    pub duration_ms: u64,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_fill_fields() {
        let req = GenerationRequest::generate("top customers")
            .with_provider("anthropic")
            .with_context("connection_type", "postgres");
        assert_eq!(req.prompt, "top customers");
        assert_eq!(req.provider.as_deref(), Some("anthropic"));
        assert!(req.model.is_none());
        assert_eq!(req.context["connection_type"], "postgres");

        let fix = GenerationRequest::fix("SELEC 1", "syntax error");
        assert!(fix.prompt.is_empty());
        assert_eq!(fix.error, "syntax error");
    }

    #[test]
    fn request_deserializes_with_defaults() {
        let req: GenerationRequest =
            serde_json::from_str(r#"{"prompt": "count users"}"#).unwrap();
        assert_eq!(req.prompt, "count users");
        assert!(req.context.is_empty());
        assert!(req.temperature.is_none());
    }
}
