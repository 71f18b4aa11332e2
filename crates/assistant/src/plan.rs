//! Request normalization.
//!
//! Turns a caller's [`GenerationRequest`] into a [`RequestPlan`] with every
//! optional knob resolved against the configuration. Nothing here touches the
//! network, so malformed requests fail before any provider is called.

use sqlwright_config::{AppConfig, BudgetConfig, ProviderKind};
use sqlwright_context::{BudgetAllocator, Priorities, ReservePolicy, TokenBudget, recommended_window};
use sqlwright_core::{
    Capability, Dialect, Error, ErrorCategory, GenerationRequest, RequestKind, Result,
    classify_error_category, dialect_from_context,
};

/// A validated request with defaults filled in.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RequestPlan {
    pub kind: RequestKind,
    pub provider: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub dialect: Dialect,
    /// Set for fix requests only
    pub category: Option<ErrorCategory>,
}

impl RequestPlan {
    pub fn capability(&self) -> Capability {
        match self.kind {
            RequestKind::Generate => Capability::Generate,
            RequestKind::Fix => Capability::Fix,
        }
    }
}

pub(crate) fn normalize(
    request: &GenerationRequest,
    kind: RequestKind,
    config: &AppConfig,
) -> Result<RequestPlan> {
    match kind {
        RequestKind::Generate if request.prompt.trim().is_empty() => {
            return Err(Error::InvalidRequest("prompt must not be empty".into()));
        }
        RequestKind::Fix if request.query.trim().is_empty() => {
            return Err(Error::InvalidRequest("query to fix must not be empty".into()));
        }
        RequestKind::Fix if request.error.trim().is_empty() => {
            return Err(Error::InvalidRequest("error message must not be empty".into()));
        }
        _ => {}
    }

    let temperature = request.temperature.unwrap_or(config.default_temperature);
    if !(0.0..=1.0).contains(&temperature) {
        return Err(Error::InvalidRequest(format!(
            "temperature {temperature} is outside [0, 1]"
        )));
    }

    let max_tokens = request.max_tokens.unwrap_or(config.default_max_tokens);
    if max_tokens == 0 {
        return Err(Error::InvalidRequest("max_tokens must be > 0".into()));
    }

    let provider = non_blank(request.provider.as_deref())
        .unwrap_or(&config.default_provider)
        .to_string();
    let model = non_blank(request.model.as_deref())
        .map(String::from)
        .or_else(|| config.model_for(&provider))
        .unwrap_or_else(|| ProviderKind::infer(&provider).default_model().to_string());

    let category = match kind {
        RequestKind::Generate => None,
        RequestKind::Fix => Some(classify_error_category(&request.error)),
    };

    Ok(RequestPlan {
        kind,
        provider,
        model,
        max_tokens,
        temperature,
        dialect: dialect_from_context(&request.context, config.default_dialect),
        category,
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// The text retrieval and priority tuning look at.
pub(crate) fn search_text(request: &GenerationRequest, kind: RequestKind) -> String {
    match kind {
        RequestKind::Generate => request.prompt.trim().to_string(),
        RequestKind::Fix => [request.prompt.trim(), request.error.trim(), request.query.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Size the context window for `model` under the configured budget policy.
pub(crate) fn plan_budget(
    budget: &BudgetConfig,
    model: &str,
    text: &str,
    kind: RequestKind,
) -> Result<TokenBudget> {
    let allocator = BudgetAllocator::new(ReservePolicy {
        system_reserve: budget.system_reserve,
        user_reserve: budget.user_reserve,
        output_fraction: budget.output_fraction,
        output_floor: budget.output_floor,
    })?;

    let priorities = if budget.priorities.is_empty() {
        Priorities::for_request(text, kind)
    } else {
        Priorities::from_named(budget.priorities.iter().map(|(name, w)| (name, *w)))?
    };

    let window = budget
        .context_window
        .unwrap_or_else(|| recommended_window(model));
    Ok(allocator.allocate(window, &priorities)?)
}
