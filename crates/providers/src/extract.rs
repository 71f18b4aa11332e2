//! Response extraction: recovers a structured SQL answer from model text.
//!
//! Models are asked for a JSON object but do not always comply. Extraction
//! runs an ordered list of strategies and the first one that produces a
//! non-empty query wins:
//!
//! | # | Strategy          | Confidence                          |
//! |---|-------------------|-------------------------------------|
//! | 1 | whole text JSON   | reported (missing or 0 → 0.5)       |
//! | 2 | ```` ```sql ```` fence | 0.8                            |
//! | 3 | fence starting with a SQL keyword | 0.8                 |
//! | 4 | embedded `{…}` JSON | reported, capped at 0.8           |
//! | 5 | SQL-looking line  | 0.7                                 |
//!
//! When nothing matches the raw text is returned inside the error so the
//! caller can show it.

use serde::Deserialize;
use sqlwright_core::{Error, Result};

const DEFAULT_CONFIDENCE: f64 = 0.5;
const FENCE_CONFIDENCE: f64 = 0.8;
const EMBEDDED_JSON_CAP: f64 = 0.8;
const LINE_CONFIDENCE: f64 = 0.7;
const MIN_LINE_LEN: usize = 10;

const SQL_KEYWORDS: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "CREATE", "DROP", "ALTER", "WITH",
];

// ── Types ─────────────────────────────────────────────────────────────────

/// Which strategy produced an extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    StructuredJson,
    TaggedFence,
    KeywordFence,
    EmbeddedJson,
    LineScan,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StructuredJson => "structured_json",
            Self::TaggedFence => "sql_fence",
            Self::KeywordFence => "keyword_fence",
            Self::EmbeddedJson => "embedded_json",
            Self::LineScan => "line_scan",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured answer recovered from model text.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub query: String,
    pub explanation: String,
    /// Always in [0, 1]
    pub confidence: f64,
    pub suggestions: Vec<String>,
    pub warnings: Vec<String>,
    pub strategy: Strategy,
}

/// The JSON shape the templates ask for. Every field is optional so partial
/// answers still parse.
#[derive(Debug, Default, Deserialize)]
struct RawAnswer {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    suggestions: Option<Vec<String>>,
    #[serde(default)]
    warnings: Option<Vec<String>>,
}

// ── Entry point ───────────────────────────────────────────────────────────

type StrategyFn = fn(&str) -> Option<Extraction>;

/// Tried in order; the first success wins.
const STRATEGIES: &[StrategyFn] = &[
    structured_json,
    tagged_fence,
    keyword_fence,
    embedded_json,
    line_scan,
];

/// Extract a SQL answer from raw model text.
pub fn extract(raw: &str) -> Result<Extraction> {
    STRATEGIES
        .iter()
        .find_map(|strategy| strategy(raw))
        .ok_or_else(|| Error::Extraction {
            reason: "no JSON answer, SQL code block or SQL statement found".into(),
            raw: raw.to_string(),
        })
}

// ── Strategies ────────────────────────────────────────────────────────────

fn structured_json(raw: &str) -> Option<Extraction> {
    let answer: RawAnswer = serde_json::from_str(raw.trim()).ok()?;
    from_answer(answer, raw, Strategy::StructuredJson, 1.0)
}

fn tagged_fence(raw: &str) -> Option<Extraction> {
    fenced_blocks(raw)
        .into_iter()
        .find(|f| f.is_tagged_sql() && !f.body.is_empty())
        .map(|f| from_sql(f.body, raw, FENCE_CONFIDENCE, Strategy::TaggedFence))
}

fn keyword_fence(raw: &str) -> Option<Extraction> {
    fenced_blocks(raw)
        .into_iter()
        .find(|f| starts_with_sql_keyword(f.body))
        .map(|f| from_sql(f.body, raw, FENCE_CONFIDENCE, Strategy::KeywordFence))
}

fn embedded_json(raw: &str) -> Option<Extraction> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    let answer: RawAnswer = serde_json::from_str(&raw[start..=end]).ok()?;
    from_answer(answer, raw, Strategy::EmbeddedJson, EMBEDDED_JSON_CAP)
}

fn line_scan(raw: &str) -> Option<Extraction> {
    raw.lines()
        .map(str::trim)
        .find(|line| line.len() > MIN_LINE_LEN && starts_with_sql_keyword(line))
        .map(|line| from_sql(line, raw, LINE_CONFIDENCE, Strategy::LineScan))
}

// ── Helpers ───────────────────────────────────────────────────────────────

fn from_answer(answer: RawAnswer, raw: &str, strategy: Strategy, cap: f64) -> Option<Extraction> {
    let query = answer.query?.trim().to_string();
    if query.is_empty() {
        return None;
    }

    let confidence = match answer.confidence {
        None => DEFAULT_CONFIDENCE,
        Some(c) if c == 0.0 => DEFAULT_CONFIDENCE,
        Some(c) => c.clamp(0.0, 1.0),
    };

    Some(Extraction {
        query,
        explanation: answer
            .explanation
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| raw.trim().to_string()),
        confidence: confidence.min(cap),
        suggestions: answer.suggestions.unwrap_or_default(),
        warnings: answer.warnings.unwrap_or_default(),
        strategy,
    })
}

fn from_sql(sql: &str, raw: &str, confidence: f64, strategy: Strategy) -> Extraction {
    Extraction {
        query: sql.trim().to_string(),
        explanation: raw.trim().to_string(),
        confidence,
        suggestions: Vec::new(),
        warnings: Vec::new(),
        strategy,
    }
}

/// A fenced code block.
#[derive(Debug, PartialEq)]
struct Fence<'a> {
    info: &'a str,
    body: &'a str,
}

impl Fence<'_> {
    fn is_tagged_sql(&self) -> bool {
        self.info
            .split_whitespace()
            .next()
            .is_some_and(|tag| tag.eq_ignore_ascii_case("sql"))
    }
}

/// Every complete ```` ``` ```` block, in order. An unterminated fence ends
/// the scan.
fn fenced_blocks(text: &str) -> Vec<Fence<'_>> {
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("```") {
        let after = &rest[open + 3..];
        let Some(close) = after.find("```") else {
            break;
        };
        let inner = &after[..close];

        let (info, body) = match inner.split_once('\n') {
            Some((info, body)) => (info.trim(), body),
            // Single-line fence: an optional leading `sql` tag, then the body
            None => match inner.trim_start().split_once(char::is_whitespace) {
                Some((tag, body)) if tag.eq_ignore_ascii_case("sql") => ("sql", body),
                _ => ("", inner),
            },
        };
        blocks.push(Fence {
            info,
            body: body.trim(),
        });
        rest = &after[close + 3..];
    }
    blocks
}

/// Whether the first non-blank line begins with a SQL statement keyword as a
/// whole word.
fn starts_with_sql_keyword(text: &str) -> bool {
    let Some(line) = text.lines().map(str::trim).find(|l| !l.is_empty()) else {
        return false;
    };
    let word: String = line
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    SQL_KEYWORDS.iter().any(|k| word.eq_ignore_ascii_case(k))
}

// ── Tests ─────────────────────────────────────────────────────────────────
