//! The caller-facing SQL assistant.

use crate::plan::{self, RequestPlan};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sqlwright_config::{AppConfig, ProviderConfig};
use sqlwright_context::{AssembledContext, CandidateSet, ContextAssembler, Retriever};
use sqlwright_core::dialect::keys;
use sqlwright_core::{
    Capabilities, GenerationRequest, GenerationResult, HealthStatus, ProviderError, RequestKind,
    Result,
};
use sqlwright_prompts::{FixPromptInput, fix_user_prompt, generation_user_prompt, system_prompt};
use sqlwright_providers::{DispatchRequest, ProviderRegistry, build_backend};
use sqlwright_telemetry::UsageStat;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One registered provider, as reported by [`SqlAssistant::list_providers`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSummary {
    pub id: String,
    pub capabilities: Capabilities,
    /// Model used when a request names none
    pub default_model: Option<String>,
    pub is_default: bool,
}

/// Generates and repairs SQL through the registered providers.
///
/// Each request is normalized against the configuration, classified, given a
/// token budget, enriched with retrieved context and dispatched. Provider
/// configuration can be changed at runtime without losing usage statistics.
pub struct SqlAssistant {
    registry: Arc<ProviderRegistry>,
    retriever: Option<Arc<dyn Retriever>>,
    assembler: ContextAssembler,
    config: RwLock<AppConfig>,
}

impl SqlAssistant {
    /// Build the registry from `config` and wrap it.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let registry = ProviderRegistry::build_from_config(&config)?;
        info!(
            providers = registry.providers().len(),
            default = %config.default_provider,
            "SQL assistant ready"
        );
        Ok(Self::new(Arc::new(registry), config))
    }

    pub fn new(registry: Arc<ProviderRegistry>, config: AppConfig) -> Self {
        Self {
            registry,
            retriever: None,
            assembler: ContextAssembler::new(),
            config: RwLock::new(config),
        }
    }

    /// Attach a source of schema, example, business-rule and performance
    /// candidates. It is consulted when a request carries a `connection_id`.
    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn with_assembler(mut self, assembler: ContextAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// A copy of the current configuration.
    pub fn config(&self) -> AppConfig {
        self.config.read().clone()
    }

    // ── Requests ──────────────────────────────────────────────────────

    /// Turn a natural-language request into SQL.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult> {
        self.run(RequestKind::Generate, request, cancel).await
    }

    /// Repair a query that failed with a database error.
    pub async fn fix(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult> {
        self.run(RequestKind::Fix, request, cancel).await
    }

    async fn run(
        &self,
        kind: RequestKind,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult> {
        // The guard must not live across an await point
        let config = self.config();

        let plan = plan::normalize(request, kind, &config)?;
        let text = plan::search_text(request, kind);
        let budget = plan::plan_budget(&config.budget, &plan.model, &text, kind)?;

        debug!(
            kind = kind.as_str(),
            provider = %plan.provider,
            model = %plan.model,
            dialect = plan.dialect.as_str(),
            window = budget.total,
            "Request planned"
        );

        self.registry.ensure_supports(&plan.provider, plan.capability())?;
        let candidates = self.retrieve(request, &text, cancel).await?;
        let context = self.assembler.assemble(budget, &candidates);
        let rendered = context.render();

        let user_prompt = match kind {
            RequestKind::Generate => {
                generation_user_prompt(&request.prompt, request.schema.as_deref(), &rendered)
            }
            RequestKind::Fix => fix_user_prompt(&FixPromptInput {
                query: &request.query,
                error: &request.error,
                additional: Some(request.prompt.as_str()).filter(|p| !p.trim().is_empty()),
                schema: request.schema.as_deref(),
                context: &rendered,
            }),
        };

        let dispatch = DispatchRequest {
            model: plan.model.clone(),
            system_prompt: system_prompt(plan.dialect, plan.category),
            user_prompt,
            max_tokens: plan.max_tokens,
            temperature: plan.temperature,
            capability: plan.capability(),
        };

        let mut result = self.registry.dispatch(&plan.provider, dispatch, cancel).await?;
        annotate(&mut result, &plan, &context);
        Ok(result)
    }

    /// Fetch candidates for the request's connection.
    ///
    /// A failing retriever degrades to an empty candidate set; cancellation
    /// aborts the request.
    async fn retrieve(
        &self,
        request: &GenerationRequest,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<CandidateSet> {
        let Some(retriever) = &self.retriever else {
            return Ok(CandidateSet::default());
        };
        let Some(connection_id) = request
            .context
            .get(keys::CONNECTION_ID)
            .filter(|id| !id.trim().is_empty())
        else {
            return Ok(CandidateSet::default());
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                Err(ProviderError::Cancelled("context retrieval was cancelled".into()).into())
            }
            retrieved = retriever.retrieve(connection_id, text) => match retrieved {
                Ok(candidates) => {
                    debug!(
                        connection = %connection_id,
                        tables = candidates.schema.len(),
                        examples = candidates.examples.len(),
                        "Context retrieved"
                    );
                    Ok(candidates)
                }
                Err(e) => {
                    warn!(connection = %connection_id, error = %e, "Context retrieval failed, continuing without it");
                    Ok(CandidateSet::default())
                }
            }
        }
    }

    // ── Providers ─────────────────────────────────────────────────────

    pub async fn health(&self, provider_id: &str, cancel: &CancellationToken) -> Result<HealthStatus> {
        self.registry.health_check(provider_id, cancel).await
    }

    pub async fn health_all(&self, cancel: &CancellationToken) -> Vec<HealthStatus> {
        self.registry.health_all(cancel).await
    }

    pub fn usage(&self, provider_id: &str) -> Option<UsageStat> {
        self.registry.usage().get(provider_id)
    }

    pub fn usage_all(&self) -> BTreeMap<String, UsageStat> {
        self.registry.usage().snapshot()
    }

    /// Registered providers, sorted by id.
    pub fn list_providers(&self) -> Vec<ProviderSummary> {
        let config = self.config.read();
        self.registry
            .providers()
            .into_iter()
            .filter_map(|id| {
                let capabilities = self.registry.capabilities(&id)?;
                Some(ProviderSummary {
                    default_model: config.model_for(&id),
                    is_default: id == config.default_provider,
                    capabilities,
                    id,
                })
            })
            .collect()
    }

    pub async fn list_models(&self, provider_id: &str) -> Result<Vec<String>> {
        self.registry.list_models(provider_id).await
    }

    /// Models of every provider that answers, keyed by provider id.
    pub async fn list_models_all(&self) -> BTreeMap<String, Vec<String>> {
        self.registry.list_models_all().await
    }

    /// Register or reconfigure a provider. Existing usage statistics survive.
    pub fn update_provider(&self, provider_id: &str, provider: ProviderConfig) -> Result<()> {
        let backend = build_backend(provider_id, &provider)?;
        if self.registry.contains(provider_id) {
            self.registry.replace(provider_id, backend)?;
        } else {
            self.registry.register(provider_id, backend);
        }
        self.config
            .write()
            .providers
            .insert(provider_id.to_string(), provider);
        Ok(())
    }

    /// Probe a provider configuration without registering it.
    pub async fn test_provider(
        &self,
        provider_id: &str,
        provider: &ProviderConfig,
        cancel: &CancellationToken,
    ) -> Result<HealthStatus> {
        let backend = build_backend(provider_id, provider)?;
        let scratch = ProviderRegistry::new(self.registry.request_timeout());
        scratch.register(provider_id, backend);
        scratch.health_check(provider_id, cancel).await
    }
}

/// Record how the request was handled in the result metadata.
fn annotate(result: &mut GenerationResult, plan: &RequestPlan, context: &AssembledContext) {
    let metadata = &mut result.metadata;
    metadata.insert("request_kind".into(), plan.kind.as_str().into());
    metadata.insert("dialect".into(), plan.dialect.as_str().into());
    if let Some(category) = plan.category {
        metadata.insert("error_category".into(), category.as_str().into());
    }
    metadata.insert("context_window".into(), context.budget.total.to_string());
    metadata.insert("context_tokens".into(), context.budget.used_total().to_string());
    metadata.insert(
        "context_unused".into(),
        (context.budget.unused() + context.budget.remaining()).to_string(),
    );
}
