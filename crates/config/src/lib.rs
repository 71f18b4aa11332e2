//! Configuration loading, validation, and management for sqlwright.
//!
//! Loads configuration from `~/.sqlwright/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use sqlwright_core::Dialect;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.sqlwright/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Provider used when a request names none
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default token ceiling for the model's answer
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Default sampling temperature, in [0, 1]
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Deadline for a single backend call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Dialect assumed when the request context carries no hint
    #[serde(default)]
    pub default_dialect: Dialect,

    /// Backends keyed by logical provider id
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Context token budget
    #[serde(default)]
    pub budget: BudgetConfig,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_temperature() -> f32 {
    0.1
}
fn default_request_timeout_secs() -> u64 {
    60
}

/// Which wire protocol a provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Any OpenAI-compatible `/chat/completions` endpoint
    OpenAi,
    /// Anthropic Messages API
    Anthropic,
    /// Locally-run Ollama (OpenAI-compatible, no key)
    Ollama,
}

impl ProviderKind {
    /// Infer the kind from a well-known provider id.
    pub fn infer(provider_id: &str) -> Self {
        match provider_id {
            "anthropic" => Self::Anthropic,
            "ollama" => Self::Ollama,
            _ => Self::OpenAi,
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o-mini",
            Self::Anthropic => "claude-3-5-sonnet-20241022",
            Self::Ollama => "llama3.1",
        }
    }

    pub fn requires_api_key(self) -> bool {
        !matches!(self, Self::Ollama)
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Wire protocol; inferred from the provider id when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ProviderKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,

    /// Models advertised for this provider
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<String>,
}

impl ProviderConfig {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind: Some(kind),
            ..Default::default()
        }
    }

    pub fn resolved_kind(&self, provider_id: &str) -> ProviderKind {
        self.kind.unwrap_or_else(|| ProviderKind::infer(provider_id))
    }

    /// The model used when a request does not name one.
    pub fn resolved_model(&self, provider_id: &str) -> String {
        self.default_model
            .clone()
            .or_else(|| self.models.first().cloned())
            .unwrap_or_else(|| self.resolved_kind(provider_id).default_model().to_string())
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .field("models", &self.models)
            .finish()
    }
}

/// Token budget settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Fixed context window; when unset it is derived from the model name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_window: Option<usize>,

    #[serde(default = "default_system_reserve")]
    pub system_reserve: usize,

    #[serde(default = "default_user_reserve")]
    pub user_reserve: usize,

    /// Share of the window kept for the model's answer
    #[serde(default = "default_output_fraction")]
    pub output_fraction: f64,

    /// Lower bound of the output reserve
    #[serde(default = "default_output_floor")]
    pub output_floor: usize,

    /// Fixed component weights (`schema`, `examples`, `business`,
    /// `performance`). Empty means weights are chosen per request.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub priorities: BTreeMap<String, u32>,
}

fn default_system_reserve() -> usize {
    1500
}
fn default_user_reserve() -> usize {
    400
}
fn default_output_fraction() -> f64 {
    0.25
}
fn default_output_floor() -> usize {
    256
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            context_window: None,
            system_reserve: default_system_reserve(),
            user_reserve: default_user_reserve(),
            output_fraction: default_output_fraction(),
            output_floor: default_output_floor(),
            priorities: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.sqlwright/config.toml).
    ///
    /// Environment variables override the file:
    /// - `SQLWRIGHT_PROVIDER`, `SQLWRIGHT_MODEL`
    /// - `SQLWRIGHT_MAX_TOKENS`, `SQLWRIGHT_TEMPERATURE`, `SQLWRIGHT_REQUEST_TIMEOUT`
    /// - `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, `OLLAMA_ENDPOINT`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`.
    ///
    /// API keys only fill keys the file left empty; everything else wins
    /// over the file.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("OPENAI_API_KEY") {
            let entry = self
                .providers
                .entry("openai".into())
                .or_insert_with(|| ProviderConfig::new(ProviderKind::OpenAi));
            entry.api_key.get_or_insert(key);
        }

        if let Some(key) = non_empty("ANTHROPIC_API_KEY") {
            let entry = self
                .providers
                .entry("anthropic".into())
                .or_insert_with(|| ProviderConfig::new(ProviderKind::Anthropic));
            entry.api_key.get_or_insert(key);
        }

        if let Some(endpoint) = non_empty("OLLAMA_ENDPOINT") {
            let entry = self
                .providers
                .entry("ollama".into())
                .or_insert_with(|| ProviderConfig::new(ProviderKind::Ollama));
            entry.api_url = Some(endpoint);
        }

        if let Some(provider) = non_empty("SQLWRIGHT_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = non_empty("SQLWRIGHT_MODEL") {
            match self.providers.get_mut(&self.default_provider) {
                Some(entry) => entry.default_model = Some(model),
                None => tracing::warn!(
                    provider = %self.default_provider,
                    "SQLWRIGHT_MODEL ignored: default provider is not configured"
                ),
            }
        }

        if let Some(raw) = non_empty("SQLWRIGHT_MAX_TOKENS") {
            self.default_max_tokens = parse_env("SQLWRIGHT_MAX_TOKENS", &raw)?;
        }

        if let Some(raw) = non_empty("SQLWRIGHT_TEMPERATURE") {
            self.default_temperature = parse_env("SQLWRIGHT_TEMPERATURE", &raw)?;
        }

        if let Some(raw) = non_empty("SQLWRIGHT_REQUEST_TIMEOUT") {
            self.request_timeout_secs = parse_env("SQLWRIGHT_REQUEST_TIMEOUT", &raw)?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".sqlwright")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.default_temperature) {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 1.0".into(),
            ));
        }

        if self.default_max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "default_max_tokens must be > 0".into(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be > 0".into(),
            ));
        }

        if self.default_provider.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "default_provider must not be empty".into(),
            ));
        }

        if !(0.0..1.0).contains(&self.budget.output_fraction) {
            return Err(ConfigError::ValidationError(
                "budget.output_fraction must be in [0.0, 1.0)".into(),
            ));
        }

        if self.budget.context_window == Some(0) {
            return Err(ConfigError::ValidationError(
                "budget.context_window must be > 0 when set".into(),
            ));
        }

        for (id, provider) in &self.providers {
            if let Some(url) = &provider.api_url {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ConfigError::ValidationError(format!(
                        "providers.{id}.api_url must be an http(s) URL"
                    )));
                }
            }
            if provider.default_model.as_deref().is_some_and(|m| m.trim().is_empty()) {
                return Err(ConfigError::ValidationError(format!(
                    "providers.{id}.default_model must not be empty"
                )));
            }
        }

        Ok(())
    }

    /// The model used for `provider_id` when a request names none.
    pub fn model_for(&self, provider_id: &str) -> Option<String> {
        self.providers
            .get(provider_id)
            .map(|p| p.resolved_model(provider_id))
    }

    /// Generate a default config TOML string (for the `config` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            default_max_tokens: default_max_tokens(),
            default_temperature: default_temperature(),
            request_timeout_secs: default_request_timeout_secs(),
            default_dialect: Dialect::default(),
            providers: HashMap::new(),
            budget: BudgetConfig::default(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::ValidationError(format!("{key} has an invalid value: {raw}")))
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for sqlwright_core::Error {
    fn from(e: ConfigError) -> Self {
        sqlwright_core::Error::config(e.to_string())
    }
}
