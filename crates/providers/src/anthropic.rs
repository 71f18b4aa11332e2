//! Anthropic native backend.
//!
//! Uses Anthropic's Messages API directly:
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System prompt as a top-level field, user prompt as the single message

use crate::http;
use async_trait::async_trait;
use serde::Deserialize;
use sqlwright_core::{Backend, BackendRequest, BackendResponse, ProviderError};
use std::time::Duration;
use tracing::{debug, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const HTTP_TIMEOUT: Duration = Duration::from_secs(300);
const PROBE_MODEL: &str = "claude-3-5-haiku-20241022";

const KNOWN_MODELS: &[&str] = &[
    "claude-sonnet-4-20250514",
    "claude-3-5-sonnet-20241022",
    "claude-3-5-haiku-20241022",
    "claude-3-opus-20240229",
];

/// Anthropic Messages API backend.
pub struct AnthropicBackend {
    name: String,
    base_url: String,
    api_key: String,
    models: Vec<String>,
    client: reqwest::Client,
}

impl AnthropicBackend {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            name: "anthropic".into(),
            base_url: ANTHROPIC_BASE_URL.into(),
            api_key: api_key.into(),
            models: Vec::new(),
            client: http::client(HTTP_TIMEOUT)?,
        })
    }

    /// Register under a different provider id.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Custom base URL (proxies, tests). A trailing `/v1` is accepted.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let url = base_url.into();
        let url = url.trim_end_matches('/');
        self.base_url = url.strip_suffix("/v1").unwrap_or(url).to_string();
        self
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request_body(request: &BackendRequest) -> serde_json::Value {
        serde_json::json!({
            "model": request.model,
            "system": request.system_prompt,
            "messages": [{ "role": "user", "content": request.user_prompt }],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        })
    }

    fn post(&self, body: &serde_json::Value) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(body)
    }

    /// Join the text blocks of a Messages response.
    fn into_response(resp: AnthropicResponse) -> BackendResponse {
        let text = resp
            .content
            .iter()
            .filter_map(|block| match block {
                ResponseContentBlock::Text { text } => Some(text.as_str()),
                ResponseContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        BackendResponse {
            text,
            model: resp.model,
            tokens_used: resp.usage.map(|u| u.input_tokens + u.output_tokens),
        }
    }
}

#[async_trait]
impl Backend for AnthropicBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, request: BackendRequest) -> Result<BackendResponse, ProviderError> {
        let body = Self::request_body(&request);

        debug!(provider = %self.name, model = %request.model, "Sending completion request");

        let response = self.post(&body).send().await.map_err(http::send_error)?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Anthropic API error");
            return Err(http::status_error(status, error_body, "Anthropic"));
        }

        let api_resp: AnthropicResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: status,
                message: format!("Failed to parse Anthropic response: {e}"),
            })?;

        Ok(Self::into_response(api_resp))
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        // No listing endpoint is used; return configured or known models
        if !self.models.is_empty() {
            return Ok(self.models.clone());
        }
        Ok(KNOWN_MODELS.iter().map(|m| m.to_string()).collect())
    }

    async fn health_probe(&self) -> Result<bool, ProviderError> {
        // A one-token request verifies the key and reachability
        let body = serde_json::json!({
            "model": PROBE_MODEL,
            "messages": [{"role": "user", "content": "hi"}],
            "max_tokens": 1,
        });

        let response = self.post(&body).send().await.map_err(http::send_error)?;

        match response.status().as_u16() {
            status @ (401 | 403) => Err(http::status_error(status, String::new(), "Anthropic")),
            _ => Ok(response.status().is_success()),
        }
    }
}

// --- Anthropic API types ---

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    model: String,
    content: Vec<ResponseContentBlock>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor() {
        let backend = AnthropicBackend::new("sk-ant-test").unwrap();
        assert_eq!(backend.name(), "anthropic");
        assert_eq!(backend.base_url(), ANTHROPIC_BASE_URL);
    }

    #[test]
    fn base_url_accepts_v1_suffix() {
        let a = AnthropicBackend::new("k").unwrap().with_base_url("https://proxy.local/v1/");
        assert_eq!(a.base_url(), "https://proxy.local");

        let b = AnthropicBackend::new("k").unwrap().with_base_url("https://proxy.local");
        assert_eq!(b.base_url(), "https://proxy.local");
    }

    #[test]
    fn body_uses_top_level_system() {
        let body = AnthropicBackend::request_body(&BackendRequest {
            model: "claude-3-5-sonnet-20241022".into(),
            system_prompt: "You fix SQL.".into(),
            user_prompt: "SELEC 1".into(),
            max_tokens: 1024,
            temperature: 0.2,
        });
        assert_eq!(body["system"], "You fix SQL.");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["max_tokens"], 1024);
    }

    #[test]
    fn parse_text_response() {
        let resp: AnthropicResponse = serde_json::from_str(
            r#"{
                "id": "msg_01",
                "model": "claude-3-5-sonnet-20241022",
                "content": [
                    {"type": "text", "text": "```sql"},
                    {"type": "tool_use", "id": "t1", "name": "x", "input": {}},
                    {"type": "text", "text": "SELECT 1\n```"}
                ],
                "usage": {"input_tokens": 10, "output_tokens": 5},
                "stop_reason": "end_turn"
            }"#,
        )
        .unwrap();

        let response = AnthropicBackend::into_response(resp);
        assert_eq!(response.text, "```sql\nSELECT 1\n```");
        assert_eq!(response.tokens_used, Some(15));
        assert_eq!(response.model, "claude-3-5-sonnet-20241022");
    }

    #[tokio::test]
    async fn list_models_returns_known_models() {
        let backend = AnthropicBackend::new("sk-test").unwrap();
        let models = backend.list_models().await.unwrap();
        assert!(models.len() >= 3);
        assert!(models.iter().all(|m| m.starts_with("claude")));

        let pinned = AnthropicBackend::new("sk-test")
            .unwrap()
            .with_models(vec!["claude-3-opus-20240229".into()]);
        assert_eq!(pinned.list_models().await.unwrap(), vec!["claude-3-opus-20240229"]);
    }
}
