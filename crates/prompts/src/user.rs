//! User-message composition.
//!
//! The assembled context (already rendered as markdown sections) goes first,
//! followed by any schema text the caller passed explicitly, the request
//! itself and a short reminder of the answer format.

const GENERATE_REMINDER: &str =
    "Respond with the JSON object described in the system prompt: query, explanation, \
     confidence, suggestions, warnings.";

const FIX_REMINDER: &str =
    "Respond with the corrected SQL in the JSON object described in the system prompt: \
     query, explanation, confidence, suggestions, warnings.";

/// Inputs for a repair request.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixPromptInput<'a> {
    pub query: &'a str,
    pub error: &'a str,
    /// Free-text notes from the caller
    pub additional: Option<&'a str>,
    pub schema: Option<&'a str>,
    /// Rendered context sections; may be empty
    pub context: &'a str,
}

pub fn generation_user_prompt(request: &str, schema: Option<&str>, context: &str) -> String {
    let mut parts = leading_parts(schema, context);
    parts.push(format!("## Request\n\n{}", request.trim()));
    parts.push(GENERATE_REMINDER.to_string());
    parts.join("\n\n")
}

pub fn fix_user_prompt(input: &FixPromptInput<'_>) -> String {
    let mut parts = leading_parts(input.schema, input.context);
    parts.push(format!("## Error Message\n\n{}", input.error.trim()));
    parts.push(format!("## Broken Query\n\n```sql\n{}\n```", input.query.trim()));
    if let Some(additional) = non_blank(input.additional) {
        parts.push(format!("## Additional Context\n\n{additional}"));
    }
    parts.push(FIX_REMINDER.to_string());
    parts.join("\n\n")
}

/// Retrieved context, then explicit schema. Without retrieved context the
/// explicit schema is the primary schema section.
fn leading_parts(schema: Option<&str>, context: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let context = context.trim();
    if !context.is_empty() {
        parts.push(context.to_string());
    }
    if let Some(schema) = non_blank(schema) {
        let heading = if context.is_empty() {
            "## Database Schema"
        } else {
            "## Additional Schema Information"
        };
        parts.push(format!("{heading}\n\n{schema}"));
    }
    parts
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}
