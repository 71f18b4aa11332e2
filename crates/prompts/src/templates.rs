//! System prompt templates.
//!
//! Both templates are pure functions of the dialect (and, for repairs, the
//! error category). The JSON answer format they ask for is the one the
//! response extractor tries first.

use crate::{dialects, guidance};
use sqlwright_core::{Dialect, ErrorCategory};
use std::fmt::Write as _;

/// Answer format shared by both templates.
pub const RESPONSE_FORMAT: &str = r#"## Response format

Reply with a single JSON object and nothing else:

{
  "query": "the SQL statement",
  "explanation": "what the query does and why it is written this way",
  "confidence": 0.9,
  "suggestions": ["optional improvements or alternatives"],
  "warnings": ["caveats the user should know about"]
}

Confidence guide: 0.95 and above when the query is certainly correct, 0.8 when
it is correct but may need small adjustments, 0.65 when it should work but
may not be optimal, below 0.5 when you are unsure."#;

const GENERATION_RULES: &str = "## Rules

1. Use only tables and columns that appear in the schema context. If the
   request needs something that is not there, say so in `warnings`.
2. Write read-only queries unless the request explicitly asks to change data.
3. Join with explicit JOIN ... ON clauses that follow the documented
   relationships. Never produce an accidental cross join.
4. Every non-aggregated column in SELECT appears in GROUP BY; filter
   aggregates with HAVING.
5. Give ORDER BY an explicit direction and limit large result sets.
6. Handle NULLs on purpose with COALESCE or IS NULL checks.
7. Use bind placeholders for values that come from users.
8. Put each major clause on its own line and use short, meaningful aliases.";

const FIX_RULES: &str = "## Rules

1. Make the smallest change that resolves the error; keep the query's intent
   and its result shape.
2. Check names against the schema context before changing them.
3. Explain exactly what changed in `explanation`.
4. If the error cannot be fixed by editing the query (for example a missing
   privilege), return the original query and explain why in `warnings`.
5. Mention other problems you notice in `suggestions` instead of fixing them
   silently.";

/// Pick the template: `None` for generation, `Some(category)` for repair.
pub fn system_prompt(dialect: Dialect, category: Option<ErrorCategory>) -> String {
    match category {
        None => generation_prompt(dialect),
        Some(category) => fix_prompt(dialect, category),
    }
}

pub fn generation_prompt(dialect: Dialect) -> String {
    let mut out = String::from(
        "You are an expert SQL author. Turn natural-language questions into correct, \
         efficient and safe SQL for the user's database.\n\n",
    );
    let _ = writeln!(out, "## Target dialect: {}\n", dialect.display_name());
    let _ = writeln!(out, "{}\n", dialects::cheat_sheet(dialect));
    let _ = writeln!(out, "{GENERATION_RULES}\n");
    out.push_str(RESPONSE_FORMAT);
    out
}

pub fn fix_prompt(dialect: Dialect, category: ErrorCategory) -> String {
    let example = guidance::worked_example(category);

    let mut out = String::from(
        "You are an expert SQL debugger. Given a failing query and the database's \
         error message, find the cause and return a corrected query.\n\n",
    );
    let _ = writeln!(out, "## Target dialect: {}\n", dialect.display_name());
    let _ = writeln!(out, "{}\n", dialects::cheat_sheet(dialect));
    let _ = writeln!(out, "## Error category: {}\n", category.as_str());
    let _ = writeln!(out, "{}\n", guidance::focus(category));
    let _ = writeln!(out, "### Example\n\nError: {}\n", example.error);
    let _ = writeln!(out, "Before:\n```sql\n{}\n```\n", example.before);
    let _ = writeln!(out, "After:\n```sql\n{}\n```\n", example.after);
    let _ = writeln!(out, "{}\n", example.note);
    let _ = writeln!(out, "{FIX_RULES}\n");
    out.push_str(RESPONSE_FORMAT);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn none_selects_generation_template() {
        let prompt = system_prompt(Dialect::Postgres, None);
        assert!(prompt.starts_with("You are an expert SQL author"));
        assert!(prompt.contains("## Target dialect: PostgreSQL"));
        assert!(prompt.contains("ILIKE"));
        assert!(!prompt.contains("## Error category"));
    }

    #[test]
    fn some_selects_fix_template() {
        let prompt = system_prompt(Dialect::MySql, Some(ErrorCategory::Syntax));
        assert!(prompt.starts_with("You are an expert SQL debugger"));
        assert!(prompt.contains("backticks"));
        assert!(prompt.contains("## Error category: syntax"));
        assert!(prompt.contains("SELECT id, name, FROM users"));
    }

    #[test]
    fn both_templates_request_the_json_schema() {
        for prompt in [
            generation_prompt(Dialect::Generic),
            fix_prompt(Dialect::Oracle, ErrorCategory::Unknown),
        ] {
            for field in ["\"query\"", "\"explanation\"", "\"confidence\"", "\"suggestions\"", "\"warnings\""] {
                assert!(prompt.contains(field), "missing {field}");
            }
        }
    }

    #[test]
    fn fix_example_follows_category() {
        let constraint = fix_prompt(Dialect::Postgres, ErrorCategory::Constraint);
        assert!(constraint.contains("ON CONFLICT (email)"));

        let perf = fix_prompt(Dialect::Postgres, ErrorCategory::Performance);
        assert!(perf.contains("created_at >= '2024-01-01'"));
    }

    proptest! {
        #[test]
        fn templates_are_pure(d in 0usize..6, c in 0usize..7) {
            let dialect = Dialect::ALL[d];
            let category = ErrorCategory::ALL[c];
            prop_assert_eq!(system_prompt(dialect, None), system_prompt(dialect, None));
            prop_assert_eq!(
                system_prompt(dialect, Some(category)),
                system_prompt(dialect, Some(category))
            );
        }
    }
}
