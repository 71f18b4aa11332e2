//! Per-dialect cheat sheets shared by both templates.

use sqlwright_core::Dialect;

/// Short reference of dialect conventions, rendered as a markdown section.
pub fn cheat_sheet(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Postgres => {
            "### PostgreSQL conventions
- Quote identifiers with double quotes (\"order\"), literals with single quotes
- Bind parameters: $1, $2, ...
- Concatenate with || or CONCAT(); case-insensitive match with ILIKE
- Dates: NOW(), CURRENT_DATE, arithmetic with INTERVAL '7 days'
- JSON: ->, ->> and the jsonb_* functions; arrays with ANY(...)
- Paginate with LIMIT ... OFFSET ...
- Upsert with INSERT ... ON CONFLICT; RETURNING after writes
- Window functions: ROW_NUMBER(), RANK(), LAG(), LEAD()"
        }
        Dialect::MySql => {
            "### MySQL conventions
- Quote identifiers with backticks (`order`), literals with single quotes
- Bind parameters: ?
- Concatenate with CONCAT(); comparisons are case-insensitive by default
- Dates: NOW(), CURDATE(), DATE_ADD(), DATE_SUB()
- Null handling: IFNULL(), COALESCE(), IF()
- Paginate with LIMIT count OFFSET offset
- Upsert with INSERT ... ON DUPLICATE KEY UPDATE
- AUTO_INCREMENT for surrogate keys"
        }
        Dialect::Sqlite => {
            "### SQLite conventions
- Quote identifiers with double quotes, literals with single quotes
- Bind parameters: ?, ?NNN, :name
- Concatenate with ||
- Dates are text or numbers: date('now'), datetime('now', '-7 days'), julianday()
- No native BOOLEAN; use 0 and 1
- Type affinity is dynamic; typeof() reveals the stored type
- ALTER TABLE is limited to renames and added columns
- Upsert with INSERT ... ON CONFLICT or INSERT OR REPLACE"
        }
        Dialect::MsSql => {
            "### SQL Server conventions
- Quote identifiers with square brackets ([order]), literals with single quotes
- Bind parameters: @p1, @p2, ...
- Concatenate with + or CONCAT()
- Limit rows with TOP (n), paginate with ORDER BY ... OFFSET ... FETCH NEXT
- Dates: GETDATE(), DATEADD(), DATEDIFF()
- Null handling: ISNULL(), COALESCE()
- Upsert with MERGE; OUTPUT returns affected rows
- IDENTITY columns for surrogate keys"
        }
        Dialect::Oracle => {
            "### Oracle conventions
- Double-quoted identifiers are case-sensitive; literals use single quotes
- Bind parameters: :1, :2 or :name
- Concatenate with || or CONCAT()
- Limit rows with FETCH FIRST n ROWS ONLY (12c+) or ROWNUM
- Dates: SYSDATE, TO_DATE(), ADD_MONTHS(), TRUNC(date)
- Null handling: NVL(), NVL2(), COALESCE(); empty string is NULL
- Select constants FROM DUAL
- Upsert with MERGE; hierarchies with CONNECT BY"
        }
        Dialect::Generic => {
            "### Standard SQL conventions
- Prefer ANSI syntax and explicit JOIN ... ON clauses
- Literals use single quotes
- Portable functions: COALESCE, NULLIF, CASE, CAST
- Avoid vendor-specific extensions unless the request needs them
- Use a bind placeholder for values supplied by users"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_dialect_has_a_sheet() {
        for dialect in Dialect::ALL {
            let sheet = cheat_sheet(dialect);
            assert!(sheet.starts_with("### "), "{dialect:?}");
            assert!(sheet.lines().count() >= 5, "{dialect:?}");
        }
    }

    #[test]
    fn placeholders_match_dialect() {
        assert!(cheat_sheet(Dialect::Postgres).contains("$1"));
        assert!(cheat_sheet(Dialect::MsSql).contains("@p1"));
        assert!(cheat_sheet(Dialect::Oracle).contains(":name"));
    }
}
