//! Backend trait: the abstraction over text-generation services.
//!
//! A Backend knows how to send a system/user prompt pair to a model and get
//! raw text back. It never interprets that text; structured extraction
//! happens above it, in the provider registry.
//!
//! Implementations: OpenAI-compatible (OpenAI, Ollama, vLLM, ...), Anthropic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// One operation a backend may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Generate,
    Fix,
    Chat,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generate => write!(f, "generate"),
            Self::Fix => write!(f, "fix"),
            Self::Chat => write!(f, "chat"),
        }
    }
}

/// Capability marker carried by every registered backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub generate: bool,
    pub fix: bool,
    pub chat: bool,
}

impl Capabilities {
    pub const ALL: Capabilities = Capabilities {
        generate: true,
        fix: true,
        chat: true,
    };

    pub fn supports(self, capability: Capability) -> bool {
        match capability {
            Capability::Generate => self.generate,
            Capability::Fix => self.fix,
            Capability::Chat => self.chat,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::ALL
    }
}

/// A single prompt pair sent to a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Raw text returned by a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendResponse {
    pub text: String,
    /// Which model actually responded (may differ from requested)
    pub model: String,
    /// Total tokens billed for the call, when the vendor reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u32>,
}

/// The core Backend trait.
///
/// Cancellation is cooperative: callers race `call` against a cancellation
/// token and drop the future when the token fires, so implementations must be
/// safe to drop at any await point.
#[async_trait]
pub trait Backend: Send + Sync {
    /// A human-readable name for this backend (e.g., "openai", "anthropic").
    fn name(&self) -> &str;

    fn capabilities(&self) -> Capabilities {
        Capabilities::ALL
    }

    /// Send a prompt pair and get the raw completion text.
    async fn call(&self, request: BackendRequest) -> std::result::Result<BackendResponse, ProviderError>;

    /// Lightweight reachability probe.
    async fn health_probe(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }

    /// List available models for this backend.
    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        Ok(Vec::new())
    }
}

/// Outcome of a health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Unhealthy,
    /// The provider is not configured / not registered.
    Unavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub provider: String,
    pub state: HealthState,
    pub message: String,
    pub last_checked: DateTime<Utc>,
    pub response_time_ms: u64,
}

impl HealthStatus {
    pub fn unavailable(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            state: HealthState::Unavailable,
            message: "Provider not configured".into(),
            last_checked: Utc::now(),
            response_time_ms: 0,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.state == HealthState::Healthy
    }
}
