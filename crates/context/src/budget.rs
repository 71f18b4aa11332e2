//! Token budget allocation.
//!
//! The window is split in two steps:
//!
//! 1. **Fixed reserves.** The system-prompt and user-request reserves are
//!    constants capped by the window; the output reserve is a fraction of the
//!    window with a floor. If the reserves alone exceed the window the
//!    allocation fails.
//! 2. **Context pool.** What is left is shared by the [`ContextComponent`]s
//!    in proportion to their weights. Weights are normalized to 100% of the
//!    pool; flooring leftovers go to the heaviest component.
//!
//! Ties between equal weights are always broken by declaration order of
//! [`ContextComponent`] (schema, examples, business, performance), never by
//! the order a caller inserted weights.

use serde::{Deserialize, Serialize};
use sqlwright_core::RequestKind;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::str::FromStr;

// ── Types ─────────────────────────────────────────────────────────────────

/// A variable section of the prompt context.
///
/// Declaration order is the tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextComponent {
    Schema,
    Examples,
    Business,
    Performance,
}

impl ContextComponent {
    pub const ALL: [ContextComponent; 4] = [
        Self::Schema,
        Self::Examples,
        Self::Business,
        Self::Performance,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Schema => "schema",
            Self::Examples => "examples",
            Self::Business => "business",
            Self::Performance => "performance",
        }
    }
}

impl std::fmt::Display for ContextComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContextComponent {
    type Err = BudgetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "schema" => Ok(Self::Schema),
            "examples" => Ok(Self::Examples),
            "business" | "business_rules" => Ok(Self::Business),
            "performance" => Ok(Self::Performance),
            other => Err(BudgetError::UnknownComponent(other.to_string())),
        }
    }
}

/// Priority weights per component. Missing components weigh 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Priorities {
    weights: BTreeMap<ContextComponent, u32>,
}

const BUSINESS_TERMS: &[&str] = &["revenue", "profit", "customer", "order", "discount", "refund"];
const PERFORMANCE_TERMS: &[&str] = &["slow", "performance", "optimize", "fast", "index"];

impl Priorities {
    /// No weights at all; every component is disabled.
    pub fn new() -> Self {
        Self {
            weights: BTreeMap::new(),
        }
    }

    pub fn with(mut self, component: ContextComponent, weight: u32) -> Self {
        self.set(component, weight);
        self
    }

    pub fn set(&mut self, component: ContextComponent, weight: u32) {
        self.weights.insert(component, weight);
    }

    pub fn weight(&self, component: ContextComponent) -> u32 {
        self.weights.get(&component).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.weights.values().map(|&w| u64::from(w)).sum()
    }

    /// Build from `(name, weight)` pairs such as a config table.
    pub fn from_named<I, S>(pairs: I) -> Result<Self, BudgetError>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: AsRef<str>,
    {
        let mut priorities = Self::new();
        for (name, weight) in pairs {
            priorities.set(name.as_ref().parse()?, weight);
        }
        Ok(priorities)
    }

    /// Weights tuned to the request text.
    ///
    /// Fix requests lean on examples; business vocabulary pulls in business
    /// rules and performance vocabulary pulls in performance hints.
    pub fn for_request(text: &str, kind: RequestKind) -> Self {
        let lowered = text.to_lowercase();
        let mut priorities = Self::default();

        if kind == RequestKind::Fix {
            priorities.set(ContextComponent::Examples, 9);
            priorities.set(ContextComponent::Performance, 2);
        }
        if BUSINESS_TERMS.iter().any(|t| lowered.contains(t)) {
            priorities.set(ContextComponent::Business, 8);
        }
        if PERFORMANCE_TERMS.iter().any(|t| lowered.contains(t)) {
            priorities.set(ContextComponent::Performance, 7);
        }
        priorities
    }
}

impl Default for Priorities {
    fn default() -> Self {
        Self::new()
            .with(ContextComponent::Schema, 10)
            .with(ContextComponent::Examples, 7)
            .with(ContextComponent::Business, 5)
            .with(ContextComponent::Performance, 3)
    }
}

/// Fixed reserve sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservePolicy {
    /// Tokens kept for the system prompt (capped by the window)
    pub system_reserve: usize,
    /// Tokens kept for the user request (capped by the window)
    pub user_reserve: usize,
    /// Share of the window kept for the answer, in [0, 1)
    pub output_fraction: f64,
    /// Lower bound of the answer reserve
    pub output_floor: usize,
}

impl Default for ReservePolicy {
    fn default() -> Self {
        Self {
            system_reserve: 1500,
            user_reserve: 400,
            output_fraction: 0.25,
            output_floor: 256,
        }
    }
}

impl ReservePolicy {
    fn validate(&self) -> Result<(), BudgetError> {
        if !(0.0..1.0).contains(&self.output_fraction) {
            return Err(BudgetError::InvalidPolicy(format!(
                "output_fraction {} is outside [0, 1)",
                self.output_fraction
            )));
        }
        Ok(())
    }
}

/// Allocation for one component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextAllocation {
    pub component: ContextComponent,
    pub priority: u32,
    /// Share of the context pool, derived from the weights
    pub ratio: f64,
    pub allocated: usize,
    /// Tokens actually rendered (filled in by assembly)
    pub used: usize,
}

impl ContextAllocation {
    /// `used / allocated`, or `None` for a disabled component.
    pub fn utilization(&self) -> Option<f64> {
        (self.allocated > 0).then(|| self.used as f64 / self.allocated as f64)
    }
}

/// A partitioned context window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBudget {
    pub total: usize,
    pub system_reserve: usize,
    pub user_reserve: usize,
    pub output_reserve: usize,
    /// One entry per component, in declaration order
    pub allocations: Vec<ContextAllocation>,
}

impl TokenBudget {
    pub fn reserved(&self) -> usize {
        self.system_reserve + self.user_reserve + self.output_reserve
    }

    /// Tokens left after the fixed reserves.
    pub fn context_pool(&self) -> usize {
        self.total.saturating_sub(self.reserved())
    }

    pub fn allocated_total(&self) -> usize {
        self.allocations.iter().map(|a| a.allocated).sum()
    }

    /// Total minus every reserve and every allocation.
    pub fn remaining(&self) -> usize {
        self.context_pool().saturating_sub(self.allocated_total())
    }

    pub fn used_total(&self) -> usize {
        self.allocations.iter().map(|a| a.used).sum()
    }

    /// Allocated tokens that assembly did not fill.
    pub fn unused(&self) -> usize {
        self.allocations
            .iter()
            .map(|a| a.allocated.saturating_sub(a.used))
            .sum()
    }

    pub fn allocation(&self, component: ContextComponent) -> Option<&ContextAllocation> {
        self.allocations.iter().find(|a| a.component == component)
    }

    pub(crate) fn record_usage(&mut self, component: ContextComponent, used: usize) {
        if let Some(a) = self.allocations.iter_mut().find(|a| a.component == component) {
            a.used = used;
        }
    }

    /// Human-readable breakdown, derived from the fields above.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Token budget: {} total", self.total);
        let _ = writeln!(
            out,
            "  reserved: system {}, user {}, output {}",
            self.system_reserve, self.user_reserve, self.output_reserve
        );
        let _ = writeln!(
            out,
            "  context pool: {} (allocated {}, used {}, remaining {})",
            self.context_pool(),
            self.allocated_total(),
            self.used_total(),
            self.remaining()
        );
        for a in &self.allocations {
            let _ = writeln!(
                out,
                "  {:<12} weight {:>3}  {:>5.1}%  {:>6} allocated  {:>6} used",
                a.component.as_str(),
                a.priority,
                a.ratio * 100.0,
                a.allocated,
                a.used
            );
        }
        out
    }
}

/// Budget errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BudgetError {
    #[error("fixed reserves ({reserved} tokens) exceed the context window ({window} tokens)")]
    ReservesExceedWindow { reserved: usize, window: usize },

    #[error("unknown context component: {0}")]
    UnknownComponent(String),

    #[error("invalid reserve policy: {0}")]
    InvalidPolicy(String),
}

impl From<BudgetError> for sqlwright_core::Error {
    fn from(e: BudgetError) -> Self {
        sqlwright_core::Error::config(e.to_string())
    }
}

// ── Allocator ─────────────────────────────────────────────────────────────

/// Splits a context window according to a [`ReservePolicy`] and [`Priorities`].
#[derive(Debug, Clone, Default)]
pub struct BudgetAllocator {
    policy: ReservePolicy,
}

impl BudgetAllocator {
    pub fn new(policy: ReservePolicy) -> Result<Self, BudgetError> {
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &ReservePolicy {
        &self.policy
    }

    /// Partition `total_window` tokens.
    pub fn allocate(
        &self,
        total_window: usize,
        priorities: &Priorities,
    ) -> Result<TokenBudget, BudgetError> {
        let system_reserve = self.policy.system_reserve.min(total_window);
        let user_reserve = self.policy.user_reserve.min(total_window);
        let output_reserve = ((total_window as f64 * self.policy.output_fraction).floor() as usize)
            .max(self.policy.output_floor);

        let reserved = system_reserve + user_reserve + output_reserve;
        if reserved > total_window {
            return Err(BudgetError::ReservesExceedWindow {
                reserved,
                window: total_window,
            });
        }
        let pool = total_window - reserved;
        let weight_sum = priorities.total();

        let mut allocations: Vec<ContextAllocation> = ContextComponent::ALL
            .into_iter()
            .map(|component| {
                let priority = priorities.weight(component);
                let (ratio, allocated) = if weight_sum == 0 {
                    (0.0, 0)
                } else {
                    (
                        f64::from(priority) / weight_sum as f64,
                        (pool as u64 * u64::from(priority) / weight_sum) as usize,
                    )
                };
                ContextAllocation {
                    component,
                    priority,
                    ratio,
                    allocated,
                    used: 0,
                }
            })
            .collect();

        if weight_sum > 0 {
            let leftover = pool - allocations.iter().map(|a| a.allocated).sum::<usize>();
            if let Some(top) = heaviest(&allocations) {
                allocations[top].allocated += leftover;
            }
        }

        Ok(TokenBudget {
            total: total_window,
            system_reserve,
            user_reserve,
            output_reserve,
            allocations,
        })
    }
}

/// Index of the highest weight; the earliest component wins ties.
fn heaviest(allocations: &[ContextAllocation]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, a) in allocations.iter().enumerate() {
        match best {
            Some(b) if allocations[b].priority >= a.priority => {}
            _ => best = Some(i),
        }
    }
    best
}

// ── Model windows ─────────────────────────────────────────────────────────

const MODEL_WINDOWS: &[(&str, usize)] = &[
    ("claude-2", 100_000),
    ("claude", 200_000),
    ("gpt-4o", 128_000),
    ("gpt-4-turbo", 128_000),
    ("gpt-4-32k", 32_000),
    ("gpt-4", 8_192),
    ("gpt-3.5-turbo-16k", 16_384),
    ("gpt-3.5", 4_096),
];

const FALLBACK_WINDOW: usize = 4_096;

/// Context window for a model family, by substring; 4096 when unknown.
pub fn recommended_window(model: &str) -> usize {
    let lowered = model.to_lowercase();
    MODEL_WINDOWS
        .iter()
        .find(|(family, _)| lowered.contains(family))
        .map(|(_, window)| *window)
        .unwrap_or(FALLBACK_WINDOW)
}

// ── Tests ─────────────────────────────────────────────────────────────────
