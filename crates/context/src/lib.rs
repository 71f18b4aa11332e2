//! Context budgeting and assembly for sqlwright prompts.
//!
//! A model's context window is split into fixed reserves (system prompt,
//! user request, answer) and a pool shared by four retrieved components:
//! schema, examples, business rules and performance hints. The
//! [`BudgetAllocator`] sizes each component; the [`ContextAssembler`]
//! renders ranked candidates into each allocation without ever cutting an
//! item in half.

pub mod assembler;
pub mod budget;
pub mod candidates;
pub mod token;

pub use assembler::{AssembledContext, ContextAssembler, UtilizationAdvice, UtilizationLevel};
pub use budget::{
    BudgetAllocator, BudgetError, ContextAllocation, ContextComponent, Priorities, ReservePolicy,
    TokenBudget, recommended_window,
};
pub use candidates::{
    BusinessRuleCandidate, CandidateSet, ColumnInfo, ExampleCandidate, PerformanceHint,
    Relationship, Retriever, SchemaCandidate, StaticRetriever,
};
