//! Provider registry: owns the backends and dispatches requests to them.
//!
//! The registry maps provider ids to handles. A dispatch copies the handle
//! out under the map's read lock and releases the lock before the backend is
//! called, so slow backends never block registration or other callers. Usage
//! statistics live in a [`UsageTracker`] behind their own narrow lock.
//!
//! Every backend call races a [`CancellationToken`] and the configured
//! request deadline. Cancelled and timed-out calls return early and leave
//! the usage statistics untouched.

use crate::anthropic::{ANTHROPIC_BASE_URL, AnthropicBackend};
use crate::extract;
use crate::openai_compat::{OLLAMA_BASE_URL, OPENAI_BASE_URL, OpenAiCompatBackend};
use chrono::Utc;
use parking_lot::RwLock;
use sqlwright_config::{AppConfig, ProviderConfig, ProviderKind};
use sqlwright_core::{
    Backend, BackendRequest, Capabilities, Capability, Error, GenerationResult, HealthState,
    HealthStatus, ProviderError, Result,
};
use sqlwright_telemetry::UsageTracker;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Deadline applied when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

// ── Types ─────────────────────────────────────────────────────────────────

/// A registered backend. Only the registry holds these.
#[derive(Clone)]
struct ProviderHandle {
    id: String,
    capabilities: Capabilities,
    backend: Arc<dyn Backend>,
}

/// Everything the registry needs to call a backend.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// The capability the backend must advertise
    pub capability: Capability,
}

/// Registered providers, their usage statistics and the request deadline.
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, ProviderHandle>>,
    usage: UsageTracker,
    request_timeout: Duration,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl ProviderRegistry {
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            providers: RwLock::new(HashMap::new()),
            usage: UsageTracker::new(),
            request_timeout,
        }
    }

    // ── Registration ──────────────────────────────────────────────────

    /// Register (or re-register) a backend under `id` and seed its stats.
    pub fn register(&self, id: impl Into<String>, backend: Arc<dyn Backend>) {
        let id = id.into();
        let handle = ProviderHandle {
            id: id.clone(),
            capabilities: backend.capabilities(),
            backend,
        };
        self.providers.write().insert(id.clone(), handle);
        self.usage.seed(&id);
        info!(provider = %id, "Provider registered");
    }

    /// Swap the backend of an existing provider, keeping its statistics.
    pub fn replace(&self, id: &str, backend: Arc<dyn Backend>) -> Result<()> {
        let mut providers = self.providers.write();
        let handle = providers
            .get_mut(id)
            .ok_or_else(|| ProviderError::NotRegistered(id.to_string()))?;
        handle.capabilities = backend.capabilities();
        handle.backend = backend;
        info!(provider = %id, "Provider updated");
        Ok(())
    }

    /// Register every backend that was built successfully.
    ///
    /// Failures are logged and skipped; if nothing registers the result is a
    /// configuration error.
    pub fn from_backends<I>(backends: I, request_timeout: Duration) -> Result<Self>
    where
        I: IntoIterator<Item = (String, std::result::Result<Arc<dyn Backend>, ProviderError>)>,
    {
        let registry = Self::new(request_timeout);
        let mut failures = Vec::new();

        for (id, built) in backends {
            match built {
                Ok(backend) => registry.register(id, backend),
                Err(e) => {
                    warn!(provider = %id, error = %e, "Failed to initialize provider");
                    failures.push(format!("{id}: {e}"));
                }
            }
        }

        if registry.is_empty() {
            let detail = if failures.is_empty() {
                "no providers configured".to_string()
            } else {
                failures.join("; ")
            };
            return Err(Error::config(format!("No providers could be initialized ({detail})")));
        }
        Ok(registry)
    }

    /// Build backends for every configured provider.
    pub fn build_from_config(config: &AppConfig) -> Result<Self> {
        let mut ids: Vec<&String> = config.providers.keys().collect();
        ids.sort();
        let backends = ids
            .into_iter()
            .map(|id| (id.clone(), build_backend(id, &config.providers[id])));
        Self::from_backends(backends, Duration::from_secs(config.request_timeout_secs))
    }

    // ── Lookup ────────────────────────────────────────────────────────

    /// Registered provider ids, sorted.
    pub fn providers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.providers.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn contains(&self, id: &str) -> bool {
        self.providers.read().contains_key(id)
    }

    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }

    pub fn capabilities(&self, id: &str) -> Option<Capabilities> {
        self.providers.read().get(id).map(|h| h.capabilities)
    }

    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    fn handle(&self, id: &str) -> std::result::Result<ProviderHandle, ProviderError> {
        self.providers
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| ProviderError::NotRegistered(id.to_string()))
    }

    fn supporting_handle(
        &self,
        id: &str,
        capability: Capability,
    ) -> std::result::Result<ProviderHandle, ProviderError> {
        let handle = self.handle(id)?;
        if !handle.capabilities.supports(capability) {
            return Err(ProviderError::Unsupported {
                provider: handle.id,
                capability: capability.to_string(),
            });
        }
        Ok(handle)
    }

    /// Fail unless `id` is registered and can serve `capability`.
    pub fn ensure_supports(&self, id: &str, capability: Capability) -> Result<()> {
        self.supporting_handle(id, capability)?;
        Ok(())
    }

    // ── Dispatch ──────────────────────────────────────────────────────

    /// Call a provider and extract a structured answer from its output.
    pub async fn dispatch(
        &self,
        provider_id: &str,
        request: DispatchRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult> {
        let handle = self.supporting_handle(provider_id, request.capability)?;

        let requested_model = request.model.clone();
        let backend_request = BackendRequest {
            model: request.model,
            system_prompt: request.system_prompt,
            user_prompt: request.user_prompt,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!(
            provider = %handle.id,
            model = %requested_model,
            capability = %request.capability,
            "Dispatching request"
        );
        let started = Instant::now();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(provider = %handle.id, "Request cancelled");
                return Err(ProviderError::Cancelled(format!(
                    "request to '{}' was cancelled",
                    handle.id
                ))
                .into());
            }
            outcome = tokio::time::timeout(self.request_timeout, handle.backend.call(backend_request)) => {
                match outcome {
                    Err(_elapsed) => {
                        warn!(
                            provider = %handle.id,
                            timeout_secs = self.request_timeout.as_secs(),
                            "Request timed out"
                        );
                        return Err(ProviderError::Timeout(format!(
                            "no response from '{}' within {:?}",
                            handle.id, self.request_timeout
                        ))
                        .into());
                    }
                    Ok(Err(e)) => {
                        self.usage.record(&handle.id, &requested_model, false, started.elapsed(), 0);
                        warn!(provider = %handle.id, error = %e, "Backend call failed");
                        return Err(e.into());
                    }
                    Ok(Ok(response)) => response,
                }
            }
        };

        let elapsed = started.elapsed();
        let model = if response.model.is_empty() {
            requested_model
        } else {
            response.model
        };
        let tokens = response.tokens_used.unwrap_or(0);

        let extraction = match extract::extract(&response.text) {
            Ok(extraction) => extraction,
            Err(e) => {
                self.usage.record(&handle.id, &model, false, elapsed, tokens);
                warn!(provider = %handle.id, model = %model, "No SQL answer in model output");
                return Err(e);
            }
        };
        self.usage.record(&handle.id, &model, true, elapsed, tokens);

        let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        info!(
            provider = %handle.id,
            model = %model,
            duration_ms,
            tokens,
            strategy = %extraction.strategy,
            "Request completed"
        );

        let mut metadata = BTreeMap::new();
        metadata.insert("extraction_strategy".to_string(), extraction.strategy.to_string());
        metadata.insert("request_id".to_string(), uuid::Uuid::new_v4().to_string());

        Ok(GenerationResult {
            query: extraction.query,
            explanation: extraction.explanation,
            confidence: extraction.confidence,
            suggestions: extraction.suggestions,
            warnings: extraction.warnings,
            provider: handle.id,
            model,
            tokens_used: tokens,
            duration_ms,
            metadata,
        })
    }

    // ── Health & models ───────────────────────────────────────────────

    /// Probe one provider. Unregistered ids report `Unavailable`.
    ///
    /// Health checks never touch usage statistics.
    pub async fn health_check(&self, provider_id: &str, cancel: &CancellationToken) -> Result<HealthStatus> {
        let Ok(handle) = self.handle(provider_id) else {
            return Ok(HealthStatus::unavailable(provider_id));
        };

        let started = Instant::now();
        let probe = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(ProviderError::Cancelled(format!(
                    "health check of '{provider_id}' was cancelled"
                ))
                .into());
            }
            probe = tokio::time::timeout(self.request_timeout, handle.backend.health_probe()) => probe,
        };
        let response_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let (state, message) = match probe {
            Ok(Ok(true)) => (HealthState::Healthy, "Provider is responding".to_string()),
            Ok(Ok(false)) => (
                HealthState::Unhealthy,
                "Provider responded with an error status".to_string(),
            ),
            Ok(Err(e)) => (HealthState::Unhealthy, e.to_string()),
            Err(_elapsed) => (
                HealthState::Unhealthy,
                format!("No response within {:?}", self.request_timeout),
            ),
        };

        debug!(provider = %provider_id, state = ?state, response_time_ms, "Health check finished");
        Ok(HealthStatus {
            provider: provider_id.to_string(),
            state,
            message,
            last_checked: Utc::now(),
            response_time_ms,
        })
    }

    /// Probe every registered provider concurrently.
    pub async fn health_all(&self, cancel: &CancellationToken) -> Vec<HealthStatus> {
        let ids = self.providers();
        let checks = ids.iter().map(|id| async move {
            match self.health_check(id, cancel).await {
                Ok(status) => status,
                Err(e) => HealthStatus {
                    provider: id.clone(),
                    state: HealthState::Unhealthy,
                    message: e.to_string(),
                    last_checked: Utc::now(),
                    response_time_ms: 0,
                },
            }
        });
        futures::future::join_all(checks).await
    }

    pub async fn list_models(&self, provider_id: &str) -> Result<Vec<String>> {
        let handle = self.handle(provider_id)?;
        Ok(handle.backend.list_models().await?)
    }

    /// Models of every registered provider. Providers whose listing fails
    /// are left out.
    pub async fn list_models_all(&self) -> BTreeMap<String, Vec<String>> {
        let ids = self.providers();
        let listings = ids
            .iter()
            .map(|id| async move { (id, self.list_models(id).await) });

        let mut models = BTreeMap::new();
        for (id, listed) in futures::future::join_all(listings).await {
            match listed {
                Ok(list) => {
                    models.insert(id.clone(), list);
                }
                Err(e) => warn!(provider = %id, error = %e, "Model listing failed"),
            }
        }
        models
    }
}

// ── Backend construction ──────────────────────────────────────────────────

/// Build the backend for one configured provider.
pub fn build_backend(
    id: &str,
    config: &ProviderConfig,
) -> std::result::Result<Arc<dyn Backend>, ProviderError> {
    let kind = config.resolved_kind(id);
    let api_key = config
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .unwrap_or_default();

    if kind.requires_api_key() && api_key.is_empty() {
        return Err(ProviderError::NotConfigured(format!("no API key for '{id}'")));
    }

    let base_url = config
        .api_url
        .clone()
        .unwrap_or_else(|| default_base_url(kind).to_string());
    let models = config.models.clone();

    let backend: Arc<dyn Backend> = match kind {
        ProviderKind::OpenAi => {
            Arc::new(OpenAiCompatBackend::new(id, base_url, api_key)?.with_models(models))
        }
        ProviderKind::Ollama => Arc::new(
            OpenAiCompatBackend::new(id, ollama_base_url(&base_url), api_key)?.with_models(models),
        ),
        ProviderKind::Anthropic => Arc::new(
            AnthropicBackend::new(api_key)?
                .with_name(id)
                .with_base_url(base_url)
                .with_models(models),
        ),
    };
    Ok(backend)
}

/// The default endpoint for each wire protocol.
pub fn default_base_url(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::OpenAi => OPENAI_BASE_URL,
        ProviderKind::Anthropic => ANTHROPIC_BASE_URL,
        ProviderKind::Ollama => OLLAMA_BASE_URL,
    }
}

/// Ollama serves the OpenAI protocol under `/v1`; endpoints are often given
/// without it.
fn ollama_base_url(url: &str) -> String {
    let url = url.trim_end_matches('/');
    if url.ends_with("/v1") {
        url.to_string()
    } else {
        format!("{url}/v1")
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
