//! `sqlwright generate` and `sqlwright fix`.

use super::{CliResult, RequestArgs, build_assistant, cancel_on_ctrl_c, load_config, print_json};
use sqlwright_core::{GenerationRequest, GenerationResult, Result};
use std::path::Path;

pub async fn generate(config_path: Option<&Path>, prompt: String, args: RequestArgs) -> CliResult {
    let request = args.apply(GenerationRequest::generate(prompt))?;
    let assistant = build_assistant(load_config(config_path)?, args.candidates.as_deref())?;

    let cancel = cancel_on_ctrl_c();
    report(assistant.generate(&request, &cancel).await)
}

pub async fn fix(
    config_path: Option<&Path>,
    query: String,
    error: String,
    notes: Option<String>,
    args: RequestArgs,
) -> CliResult {
    let mut request = args.apply(GenerationRequest::fix(query, error))?;
    request.prompt = notes.unwrap_or_default();
    let assistant = build_assistant(load_config(config_path)?, args.candidates.as_deref())?;

    let cancel = cancel_on_ctrl_c();
    report(assistant.fix(&request, &cancel).await)
}

/// Print the result, or the error report, as JSON.
fn report(outcome: Result<GenerationResult>) -> CliResult {
    match outcome {
        Ok(result) => print_json(&result),
        Err(e) => {
            print_json(&e.report())?;
            Err(e.into())
        }
    }
}
