//! Dialect and error-category classification.
//!
//! Both classifiers are pure, case-insensitive substring matchers over a
//! fixed, ordered keyword table. The first matching keyword wins; no match
//! yields the catch-all tag. Neither can fail.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Context keys the classifier is allowed to read.
pub mod keys {
    pub const CONNECTION_ID: &str = "connection_id";
    pub const CONNECTION_TYPE: &str = "connection_type";
    pub const DATABASE_TYPE: &str = "database_type";
    pub const DRIVER: &str = "driver";
    pub const DIALECT: &str = "dialect";
}

/// SQL flavor used to select prompt guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Postgres,
    MySql,
    Sqlite,
    MsSql,
    Oracle,
    #[default]
    Generic,
}

impl Dialect {
    pub const ALL: [Dialect; 6] = [
        Self::Postgres,
        Self::MySql,
        Self::Sqlite,
        Self::MsSql,
        Self::Oracle,
        Self::Generic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
            Self::MsSql => "mssql",
            Self::Oracle => "oracle",
            Self::Generic => "generic",
        }
    }

    /// Human-readable product name.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Postgres => "PostgreSQL",
            Self::MySql => "MySQL",
            Self::Sqlite => "SQLite",
            Self::MsSql => "SQL Server",
            Self::Oracle => "Oracle",
            Self::Generic => "Generic SQL",
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = UnknownTag;

    /// Parses an exact dialect name (not a free-text hint; see [`classify_dialect`]).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" => Ok(Self::MySql),
            "sqlite" => Ok(Self::Sqlite),
            "mssql" => Ok(Self::MsSql),
            "oracle" => Ok(Self::Oracle),
            "generic" => Ok(Self::Generic),
            other => Err(UnknownTag(other.to_string())),
        }
    }
}

/// Class of SQL failure used to select fix guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Syntax,
    Reference,
    Type,
    Permission,
    Constraint,
    Performance,
    #[default]
    Unknown,
}

impl ErrorCategory {
    pub const ALL: [ErrorCategory; 7] = [
        Self::Syntax,
        Self::Reference,
        Self::Type,
        Self::Permission,
        Self::Constraint,
        Self::Performance,
        Self::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Syntax => "syntax",
            Self::Reference => "reference",
            Self::Type => "type",
            Self::Permission => "permission",
            Self::Constraint => "constraint",
            Self::Performance => "performance",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorCategory {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == needle)
            .ok_or(UnknownTag(needle))
    }
}

/// A tag name that does not belong to the enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tag: {0}")]
pub struct UnknownTag(pub String);

// ── Keyword tables (order matters: first match wins) ──────────────────────

const DIALECT_KEYWORDS: &[(&str, Dialect)] = &[
    ("postgres", Dialect::Postgres),
    ("pg", Dialect::Postgres),
    ("mysql", Dialect::MySql),
    ("mariadb", Dialect::MySql),
    ("sqlite", Dialect::Sqlite),
    ("mssql", Dialect::MsSql),
    ("sqlserver", Dialect::MsSql),
    ("sql server", Dialect::MsSql),
    ("oracle", Dialect::Oracle),
];

const ERROR_KEYWORDS: &[(&str, ErrorCategory)] = &[
    ("syntax error", ErrorCategory::Syntax),
    ("parse error", ErrorCategory::Syntax),
    ("unexpected token", ErrorCategory::Syntax),
    ("expected", ErrorCategory::Syntax),
    ("missing", ErrorCategory::Syntax),
    ("does not exist", ErrorCategory::Reference),
    ("unknown column", ErrorCategory::Reference),
    ("unknown table", ErrorCategory::Reference),
    ("ambiguous", ErrorCategory::Reference),
    ("not found", ErrorCategory::Reference),
    ("type mismatch", ErrorCategory::Type),
    ("invalid type", ErrorCategory::Type),
    ("cannot cast", ErrorCategory::Type),
    ("incompatible types", ErrorCategory::Type),
    ("permission denied", ErrorCategory::Permission),
    ("access denied", ErrorCategory::Permission),
    ("insufficient privileges", ErrorCategory::Permission),
    ("constraint", ErrorCategory::Constraint),
    ("unique violation", ErrorCategory::Constraint),
    ("foreign key", ErrorCategory::Constraint),
    ("not null", ErrorCategory::Constraint),
    ("check constraint", ErrorCategory::Constraint),
    ("timeout", ErrorCategory::Performance),
    ("cancelled", ErrorCategory::Performance),
    ("resource exhausted", ErrorCategory::Performance),
    ("too many rows", ErrorCategory::Performance),
];

fn first_match<T: Copy>(table: &[(&str, T)], text: &str) -> Option<T> {
    let lowered = text.to_lowercase();
    table
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, tag)| *tag)
}

/// Map a connection-type hint (e.g. `"postgresql"`, `"MariaDB 10.6"`) to a dialect.
pub fn classify_dialect(hint: &str) -> Dialect {
    first_match(DIALECT_KEYWORDS, hint).unwrap_or(Dialect::Generic)
}

/// Map a database error message to an error category.
pub fn classify_error_category(message: &str) -> ErrorCategory {
    first_match(ERROR_KEYWORDS, message).unwrap_or(ErrorCategory::Unknown)
}

/// Resolve the dialect from a request's context map.
///
/// Reads only the documented keys, in order: `connection_type`,
/// `database_type` and `driver` are classified as hints and the first
/// non-`Generic` result wins; otherwise an explicit `dialect` name is
/// parsed; otherwise `fallback`.
pub fn dialect_from_context(context: &HashMap<String, String>, fallback: Dialect) -> Dialect {
    let detected = [keys::CONNECTION_TYPE, keys::DATABASE_TYPE, keys::DRIVER]
        .into_iter()
        .filter_map(|key| context.get(key))
        .map(|hint| classify_dialect(hint))
        .find(|dialect| *dialect != Dialect::Generic);

    if let Some(dialect) = detected {
        return dialect;
    }

    context
        .get(keys::DIALECT)
        .and_then(|name| name.parse().ok())
        .unwrap_or(fallback)
}
