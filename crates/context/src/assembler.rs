//! Context assembly: renders retrieved candidates into budgeted sections.
//!
//! Each [`ContextComponent`] with a non-zero allocation becomes one markdown
//! section:
//!
//! 1. **Schema**: table, relevance, description, columns with key and
//!    nullability flags, relationships
//! 2. **Examples**: ranked SQL snippets with usage counts (at most five)
//! 3. **Business**: rule name, description, optional SQL mapping
//! 4. **Performance**: one-line hints with kind and impact
//!
//! Items are added best-first while the section's estimated size stays
//! within the allocation. The first item that does not fit ends the section,
//! so lower-ranked items are the ones dropped and no item is ever cut in
//! half. A section whose top item alone does not fit renders empty.
//!
//! Assembly is deterministic and performs no I/O.

use crate::budget::{ContextComponent, TokenBudget};
use crate::candidates::{
    BusinessRuleCandidate, CandidateSet, ExampleCandidate, PerformanceHint, SchemaCandidate,
};
use crate::token;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use tracing::debug;

// ── Types ─────────────────────────────────────────────────────────────────

/// Utilization below this share of an allocation leaves room for more context.
pub const LOW_UTILIZATION: f64 = 0.70;
/// Utilization above this share of an allocation is close to the limit.
pub const HIGH_UTILIZATION: f64 = 0.95;

const DEFAULT_MAX_EXAMPLES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtilizationLevel {
    /// Could include more context
    RoomForMore,
    Balanced,
    NearLimit,
}

/// Advisory utilization note for one component. Never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilizationAdvice {
    pub component: ContextComponent,
    pub utilization: f64,
    pub level: UtilizationLevel,
}

/// Statistics for a single rendered section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionStats {
    pub component: ContextComponent,
    pub tokens: usize,
    pub items_included: usize,
    pub items_total: usize,
}

/// Output of [`ContextAssembler::assemble`].
#[derive(Debug, Clone)]
pub struct AssembledContext {
    /// Rendered text per component; empty sections are omitted.
    pub sections: BTreeMap<ContextComponent, String>,
    /// The input budget with `used` filled in.
    pub budget: TokenBudget,
    pub stats: Vec<SectionStats>,
    pub advice: Vec<UtilizationAdvice>,
}

impl AssembledContext {
    pub fn section(&self, component: ContextComponent) -> Option<&str> {
        self.sections.get(&component).map(String::as_str)
    }

    /// All sections in component order, separated by blank lines.
    pub fn render(&self) -> String {
        self.sections
            .values()
            .map(|s| s.trim_end())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

// ── Assembler ─────────────────────────────────────────────────────────────

/// The context assembler. Stateless; create one and reuse it.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    max_examples: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self {
            max_examples: DEFAULT_MAX_EXAMPLES,
        }
    }
}

impl ContextAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_examples(mut self, max_examples: usize) -> Self {
        self.max_examples = max_examples;
        self
    }

    /// Render `candidates` into `budget`, recording tokens used per component.
    pub fn assemble(&self, mut budget: TokenBudget, candidates: &CandidateSet) -> AssembledContext {
        let mut sections = BTreeMap::new();
        let mut stats = Vec::new();
        let mut advice = Vec::new();

        for component in ContextComponent::ALL {
            let allocated = budget.allocation(component).map_or(0, |a| a.allocated);
            let items = self.render_items(component, candidates);

            if allocated == 0 {
                stats.push(SectionStats {
                    component,
                    tokens: 0,
                    items_included: 0,
                    items_total: items.len(),
                });
                continue;
            }

            let fitted = fit_section(header(component), separator(component), &items, allocated);
            budget.record_usage(component, fitted.tokens);

            if fitted.included < items.len() {
                debug!(
                    component = %component,
                    dropped = items.len() - fitted.included,
                    allocated,
                    "Lowest-ranked items dropped to fit budget"
                );
            }

            let utilization = fitted.tokens as f64 / allocated as f64;
            let level = if utilization < LOW_UTILIZATION {
                UtilizationLevel::RoomForMore
            } else if utilization > HIGH_UTILIZATION {
                UtilizationLevel::NearLimit
            } else {
                UtilizationLevel::Balanced
            };
            debug!(
                component = %component,
                used = fitted.tokens,
                allocated,
                utilization = format!("{:.0}%", utilization * 100.0),
                level = ?level,
                "Context utilization"
            );
            advice.push(UtilizationAdvice {
                component,
                utilization,
                level,
            });

            stats.push(SectionStats {
                component,
                tokens: fitted.tokens,
                items_included: fitted.included,
                items_total: items.len(),
            });
            if !fitted.text.is_empty() {
                sections.insert(component, fitted.text);
            }
        }

        AssembledContext {
            sections,
            budget,
            stats,
            advice,
        }
    }

    fn render_items(&self, component: ContextComponent, candidates: &CandidateSet) -> Vec<String> {
        match component {
            ContextComponent::Schema => candidates.schema.iter().map(render_schema).collect(),
            ContextComponent::Examples => candidates
                .examples
                .iter()
                .take(self.max_examples)
                .enumerate()
                .map(|(i, e)| render_example(i + 1, e))
                .collect(),
            ContextComponent::Business => candidates
                .business_rules
                .iter()
                .map(render_business_rule)
                .collect(),
            ContextComponent::Performance => candidates
                .performance_hints
                .iter()
                .map(render_performance_hint)
                .collect(),
        }
    }
}

// ── Section fitting ───────────────────────────────────────────────────────

struct Fitted {
    text: String,
    tokens: usize,
    included: usize,
}

fn fit_section(header: &str, separator: &str, items: &[String], budget: usize) -> Fitted {
    let mut text = String::from(header);
    let mut included = 0;

    for item in items {
        let sep = if included == 0 { "" } else { separator };
        if token::estimate_joined(&[&text, sep, item]) > budget {
            break;
        }
        text.push_str(sep);
        text.push_str(item);
        included += 1;
    }

    if included == 0 {
        return Fitted {
            text: String::new(),
            tokens: 0,
            included: 0,
        };
    }

    Fitted {
        tokens: token::estimate_tokens(&text),
        text,
        included,
    }
}

fn header(component: ContextComponent) -> &'static str {
    match component {
        ContextComponent::Schema => "## Database Schema\n\n",
        ContextComponent::Examples => "## Similar Query Examples\n\n",
        ContextComponent::Business => "## Applicable Business Rules\n\n",
        ContextComponent::Performance => "## Performance Considerations\n\n",
    }
}

fn separator(component: ContextComponent) -> &'static str {
    match component {
        ContextComponent::Performance => "",
        _ => "\n",
    }
}

// ── Item renderers ────────────────────────────────────────────────────────

fn render_schema(table: &SchemaCandidate) -> String {
    let mut out = format!("### {} (relevance: {:.2})\n", table.table, table.relevance);
    if let Some(description) = table.description.as_deref().filter(|d| !d.is_empty()) {
        let _ = writeln!(out, "{description}");
    }
    if !table.columns.is_empty() {
        out.push_str("Columns:\n");
        for col in &table.columns {
            let _ = write!(out, "- {}: {}", col.name, col.data_type);
            if col.primary_key {
                out.push_str(" [PK]");
            }
            if col.foreign_key {
                out.push_str(" [FK]");
            }
            if !col.nullable {
                out.push_str(" [NOT NULL]");
            }
            out.push('\n');
        }
    }
    if !table.relationships.is_empty() {
        out.push_str("Relationships:\n");
        for rel in &table.relationships {
            let _ = writeln!(
                out,
                "- {} ({}) -> {} ({})",
                table.table, rel.column, rel.target_table, rel.target_column
            );
        }
    }
    out
}

fn render_example(rank: usize, example: &ExampleCandidate) -> String {
    let mut out = format!("### Example {rank} (similarity: {:.2})\n", example.similarity);
    if let Some(question) = example.question.as_deref().filter(|q| !q.is_empty()) {
        let _ = writeln!(out, "Question: {question}");
    }
    let _ = writeln!(out, "```sql\n{}\n```", example.sql.trim());
    if example.usage_count > 1 {
        let _ = writeln!(out, "Used {} times", example.usage_count);
    }
    out
}

fn render_business_rule(rule: &BusinessRuleCandidate) -> String {
    let mut out = format!("### {}\n{}\n", rule.name, rule.description);
    if let Some(mapping) = rule.sql_mapping.as_deref().filter(|m| !m.is_empty()) {
        let _ = writeln!(out, "SQL Mapping: `{mapping}`");
    }
    out
}

fn render_performance_hint(hint: &PerformanceHint) -> String {
    format!("- **{}** ({} impact): {}\n", hint.kind, hint.impact, hint.description)
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::{BudgetAllocator, ContextAllocation, Priorities};
    use crate::candidates::{ColumnInfo, Relationship};
    use proptest::prelude::*;

    // ── Helpers ────────────────────────────────────────────────────────

    fn budget_with(allocs: &[(ContextComponent, usize)]) -> TokenBudget {
        let allocations = ContextComponent::ALL
            .into_iter()
            .map(|component| {
                let allocated = allocs
                    .iter()
                    .find(|(c, _)| *c == component)
                    .map_or(0, |(_, n)| *n);
                ContextAllocation {
                    component,
                    priority: u32::from(allocated > 0),
                    ratio: 0.0,
                    allocated,
                    used: 0,
                }
            })
            .collect::<Vec<_>>();
        TokenBudget {
            total: allocations.iter().map(|a| a.allocated).sum(),
            system_reserve: 0,
            user_reserve: 0,
            output_reserve: 0,
            allocations,
        }
    }

    fn table(name: &str, relevance: f64) -> SchemaCandidate {
        SchemaCandidate {
            table: name.into(),
            description: Some(format!("The {name} table")),
            relevance,
            columns: vec![
                ColumnInfo::new("id", "bigint").primary_key(),
                ColumnInfo::new("customer_id", "bigint").foreign_key().not_null(),
                ColumnInfo::new("note", "text"),
            ],
            relationships: vec![Relationship {
                column: "customer_id".into(),
                target_table: "customers".into(),
                target_column: "id".into(),
            }],
        }
    }

    fn example(sql: &str, usage_count: u32) -> ExampleCandidate {
        ExampleCandidate {
            question: Some("how many orders".into()),
            sql: sql.into(),
            similarity: 0.8,
            usage_count,
        }
    }

    fn full_candidates() -> CandidateSet {
        CandidateSet {
            schema: vec![table("orders", 0.92), table("customers", 0.61)],
            examples: vec![example("SELECT COUNT(*) FROM orders", 12)],
            business_rules: vec![BusinessRuleCandidate {
                name: "Net revenue".into(),
                description: "Revenue after refunds".into(),
                sql_mapping: Some("SUM(amount) - SUM(refunded)".into()),
            }],
            performance_hints: vec![PerformanceHint {
                kind: "index".into(),
                description: "Filter on created_at to use idx_orders_created_at".into(),
                impact: "high".into(),
            }],
        }
    }

    fn generous() -> TokenBudget {
        budget_with(&[
            (ContextComponent::Schema, 2000),
            (ContextComponent::Examples, 2000),
            (ContextComponent::Business, 2000),
            (ContextComponent::Performance, 2000),
        ])
    }

    // ── Tests ──────────────────────────────────────────────────────────

    #[test]
    fn renders_every_component() {
        let ctx = ContextAssembler::new().assemble(generous(), &full_candidates());

        let schema = ctx.section(ContextComponent::Schema).unwrap();
        assert!(schema.starts_with("## Database Schema"));
        assert!(schema.contains("### orders (relevance: 0.92)"));
        assert!(schema.contains("- id: bigint [PK] [NOT NULL]"));
        assert!(schema.contains("- customer_id: bigint [FK] [NOT NULL]"));
        assert!(schema.contains("- note: text\n"));
        assert!(schema.contains("- orders (customer_id) -> customers (id)"));

        let examples = ctx.section(ContextComponent::Examples).unwrap();
        assert!(examples.contains("### Example 1 (similarity: 0.80)"));
        assert!(examples.contains("```sql\nSELECT COUNT(*) FROM orders\n```"));
        assert!(examples.contains("Used 12 times"));

        let business = ctx.section(ContextComponent::Business).unwrap();
        assert!(business.contains("SQL Mapping: `SUM(amount) - SUM(refunded)`"));

        let perf = ctx.section(ContextComponent::Performance).unwrap();
        assert!(perf.contains("- **index** (high impact):"));

        let rendered = ctx.render();
        let schema_pos = rendered.find("## Database Schema").unwrap();
        let perf_pos = rendered.find("## Performance Considerations").unwrap();
        assert!(schema_pos < perf_pos);
    }

    #[test]
    fn single_use_examples_have_no_usage_line() {
        let candidates = CandidateSet {
            examples: vec![example("SELECT 1", 1)],
            ..Default::default()
        };
        let ctx = ContextAssembler::new().assemble(generous(), &candidates);
        assert!(!ctx.section(ContextComponent::Examples).unwrap().contains("Used"));
    }

    #[test]
    fn zero_allocation_renders_nothing() {
        let budget = budget_with(&[(ContextComponent::Schema, 2000)]);
        let ctx = ContextAssembler::new().assemble(budget, &full_candidates());

        assert!(ctx.section(ContextComponent::Schema).is_some());
        assert!(ctx.section(ContextComponent::Examples).is_none());
        assert!(ctx.section(ContextComponent::Performance).is_none());
        assert!(ctx.advice.iter().all(|a| a.component == ContextComponent::Schema));
    }

    #[test]
    fn lowest_ranked_items_are_dropped_whole() {
        let candidates = full_candidates();
        let first = render_schema(&candidates.schema[0]);
        let fits_one = token::estimate_joined(&[header(ContextComponent::Schema), &first]);

        let budget = budget_with(&[(ContextComponent::Schema, fits_one)]);
        let ctx = ContextAssembler::new().assemble(budget, &candidates);

        let schema = ctx.section(ContextComponent::Schema).unwrap();
        assert!(schema.contains("### orders"));
        assert!(!schema.contains("### customers"));
        assert!(schema.ends_with(&first));

        let alloc = ctx.budget.allocation(ContextComponent::Schema).unwrap();
        assert_eq!(alloc.used, fits_one);
        assert!(alloc.used <= alloc.allocated);

        let stats = &ctx.stats[0];
        assert_eq!((stats.items_included, stats.items_total), (1, 2));
    }

    #[test]
    fn top_item_too_large_renders_empty() {
        let budget = budget_with(&[(ContextComponent::Schema, 10)]);
        let ctx = ContextAssembler::new().assemble(budget, &full_candidates());

        assert!(ctx.section(ContextComponent::Schema).is_none());
        assert_eq!(ctx.budget.allocation(ContextComponent::Schema).unwrap().used, 0);
        assert_eq!(ctx.advice[0].level, UtilizationLevel::RoomForMore);
    }

    #[test]
    fn examples_are_capped() {
        let candidates = CandidateSet {
            examples: (0..8).map(|i| example(&format!("SELECT {i}"), 0)).collect(),
            ..Default::default()
        };
        let ctx = ContextAssembler::new().assemble(generous(), &candidates);
        let examples = ctx.section(ContextComponent::Examples).unwrap();
        assert!(examples.contains("### Example 5"));
        assert!(!examples.contains("### Example 6"));

        let ctx = ContextAssembler::new()
            .with_max_examples(2)
            .assemble(generous(), &candidates);
        assert_eq!(ctx.stats[1].items_total, 2);
    }

    #[test]
    fn usage_written_back_to_budget() {
        let ctx = ContextAssembler::new().assemble(generous(), &full_candidates());
        for component in ContextComponent::ALL {
            let section = ctx.section(component).unwrap();
            let alloc = ctx.budget.allocation(component).unwrap();
            assert_eq!(alloc.used, token::estimate_tokens(section));
        }
        assert_eq!(ctx.budget.used_total() + ctx.budget.unused(), 8000);
    }

    #[test]
    fn utilization_advice_levels() {
        let candidates = full_candidates();
        let perf = render_performance_hint(&candidates.performance_hints[0]);
        let exact = token::estimate_joined(&[header(ContextComponent::Performance), &perf]);

        let budget = budget_with(&[
            (ContextComponent::Schema, 5000),
            (ContextComponent::Performance, exact),
        ]);
        let ctx = ContextAssembler::new().assemble(budget, &candidates);

        let level = |c: ContextComponent| ctx.advice.iter().find(|a| a.component == c).unwrap().level;
        assert_eq!(level(ContextComponent::Schema), UtilizationLevel::RoomForMore);
        assert_eq!(level(ContextComponent::Performance), UtilizationLevel::NearLimit);
    }

    #[test]
    fn empty_candidates_produce_no_sections() {
        let ctx = ContextAssembler::new().assemble(generous(), &CandidateSet::default());
        assert!(ctx.is_empty());
        assert_eq!(ctx.render(), "");
        assert_eq!(ctx.budget.used_total(), 0);
    }

    #[test]
    fn works_with_allocator_output() {
        let budget = BudgetAllocator::default()
            .allocate(8000, &Priorities::default())
            .unwrap();
        let ctx = ContextAssembler::new().assemble(budget, &full_candidates());
        assert_eq!(ctx.sections.len(), 4);
        assert!(ctx.budget.used_total() <= ctx.budget.allocated_total());
    }

    #[test]
    fn deterministic_assembly() {
        let a = ContextAssembler::new().assemble(generous(), &full_candidates());
        let b = ContextAssembler::new().assemble(generous(), &full_candidates());
        assert_eq!(a.render(), b.render());
        assert_eq!(a.budget, b.budget);
    }

    proptest! {
        #[test]
        fn sections_never_exceed_allocation(
            schema_alloc in 0usize..400,
            perf_alloc in 0usize..120,
            tables in 0usize..6,
            hints in 0usize..10,
        ) {
            let candidates = CandidateSet {
                schema: (0..tables).map(|i| table(&format!("t{i}"), 0.5)).collect(),
                performance_hints: (0..hints)
                    .map(|i| PerformanceHint {
                        kind: "index".into(),
                        description: format!("hint number {i}"),
                        impact: "low".into(),
                    })
                    .collect(),
                ..Default::default()
            };
            let budget = budget_with(&[
                (ContextComponent::Schema, schema_alloc),
                (ContextComponent::Performance, perf_alloc),
            ]);
            let ctx = ContextAssembler::new().assemble(budget, &candidates);

            for alloc in &ctx.budget.allocations {
                prop_assert!(alloc.used <= alloc.allocated);
            }
            for (component, text) in &ctx.sections {
                prop_assert!(text.starts_with(header(*component)));
                prop_assert!(text.len() > header(*component).len());
            }
        }
    }
}
