//! Repair guidance per error category, each with a worked example.

use sqlwright_core::ErrorCategory;

/// A before/after repair used to show the model the expected kind of fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkedExample {
    pub error: &'static str,
    pub before: &'static str,
    pub after: &'static str,
    pub note: &'static str,
}

/// What to look at first for a category of failure.
pub fn focus(category: ErrorCategory) -> &'static str {
    match category {
        ErrorCategory::Syntax => {
            "### Syntax errors
Check clause order (SELECT, FROM, WHERE, GROUP BY, HAVING, ORDER BY), commas
in column lists, balanced parentheses and quotes, misspelled keywords and
reserved words used as identifiers."
        }
        ErrorCategory::Reference => {
            "### Reference errors
Compare every table and column name with the schema. Look for typos, missing
schema qualification, aliases used before they are defined and columns that
are ambiguous across joined tables."
        }
        ErrorCategory::Type => {
            "### Type errors
Find the comparison, function argument or UNION branch whose types disagree.
Prefer an explicit CAST over relying on implicit conversion, and check date
literals against the dialect's expected format."
        }
        ErrorCategory::Permission => {
            "### Permission errors
A query rewrite rarely fixes missing privileges. Point to the object that was
denied, suggest a view or table the user can read if one exists, and say
which grant is needed."
        }
        ErrorCategory::Constraint => {
            "### Constraint errors
Identify the violated key or check. Make sure inserted keys are unique,
referenced rows exist, NOT NULL columns get values, and use the dialect's
upsert form when duplicates are expected."
        }
        ErrorCategory::Performance => {
            "### Performance problems
Look for missing join conditions, unfiltered scans of large tables, SELECT *,
correlated subqueries that could be joins, and filters that defeat an index
by wrapping the column in a function."
        }
        ErrorCategory::Unknown => {
            "### Unclassified errors
Read the message for a position, object name or keyword. Locate that part of
the query, check it against the schema and the dialect rules, and apply the
most likely fix."
        }
    }
}

pub fn worked_example(category: ErrorCategory) -> WorkedExample {
    match category {
        ErrorCategory::Syntax => WorkedExample {
            error: "syntax error at or near \"FROM\"",
            before: "SELECT id, name, FROM users WHERE active = true",
            after: "SELECT id, name FROM users WHERE active = true",
            note: "Removed the trailing comma before FROM.",
        },
        ErrorCategory::Reference => WorkedExample {
            error: "column \"user_name\" does not exist",
            before: "SELECT user_name FROM users",
            after: "SELECT name FROM users",
            note: "The schema names the column `name`.",
        },
        ErrorCategory::Type => WorkedExample {
            error: "type mismatch: cannot compare integer with text",
            before: "SELECT * FROM orders WHERE customer_id = '42'",
            after: "SELECT * FROM orders WHERE customer_id = 42",
            note: "customer_id is an integer, so compare against a number.",
        },
        ErrorCategory::Permission => WorkedExample {
            error: "permission denied for table salaries",
            before: "SELECT employee_id, amount FROM salaries",
            after: "SELECT employee_id, amount FROM salary_summary",
            note: "salary_summary is a readable view over the restricted table.",
        },
        ErrorCategory::Constraint => WorkedExample {
            error: "duplicate key value violates unique constraint \"users_email_key\"",
            before: "INSERT INTO users (email, name) VALUES ('a@example.com', 'Ann')",
            after: "INSERT INTO users (email, name) VALUES ('a@example.com', 'Ann')\nON CONFLICT (email) DO UPDATE SET name = EXCLUDED.name",
            note: "The row may already exist, so update it instead of failing.",
        },
        ErrorCategory::Performance => WorkedExample {
            error: "canceling statement due to statement timeout",
            before: "SELECT * FROM events WHERE DATE(created_at) = '2024-01-01'",
            after: "SELECT id, kind, created_at FROM events\nWHERE created_at >= '2024-01-01' AND created_at < '2024-01-02'",
            note: "A range filter can use the created_at index; listing columns avoids wide rows.",
        },
        ErrorCategory::Unknown => WorkedExample {
            error: "query failed near position 38",
            before: "SELECT name FROM users WHERE id IN (1, 2",
            after: "SELECT name FROM users WHERE id IN (1, 2)",
            note: "Closed the IN list.",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_has_guidance_and_example() {
        for category in ErrorCategory::ALL {
            assert!(focus(category).starts_with("### "));
            let example = worked_example(category);
            assert_ne!(example.before, example.after, "{category:?}");
            assert!(!example.note.is_empty());
        }
    }

    #[test]
    fn examples_classify_into_their_category() {
        use sqlwright_core::classify_error_category;

        for category in [
            ErrorCategory::Syntax,
            ErrorCategory::Reference,
            ErrorCategory::Type,
            ErrorCategory::Permission,
            ErrorCategory::Constraint,
            ErrorCategory::Performance,
        ] {
            let example = worked_example(category);
            assert_eq!(classify_error_category(example.error), category, "{}", example.error);
        }
    }
}
