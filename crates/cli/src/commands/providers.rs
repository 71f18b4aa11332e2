//! `sqlwright providers`, `sqlwright health` and `sqlwright models`.

use super::{CliResult, build_assistant, cancel_on_ctrl_c, load_config, print_json};
use std::path::Path;

pub fn list(config_path: Option<&Path>) -> CliResult {
    let assistant = build_assistant(load_config(config_path)?, None)?;
    print_json(&assistant.list_providers())
}

pub async fn health(config_path: Option<&Path>, provider: Option<&str>) -> CliResult {
    let assistant = build_assistant(load_config(config_path)?, None)?;
    let cancel = cancel_on_ctrl_c();

    match provider {
        Some(id) => print_json(&assistant.health(id, &cancel).await?),
        None => print_json(&assistant.health_all(&cancel).await),
    }
}

pub async fn models(config_path: Option<&Path>, provider: Option<&str>) -> CliResult {
    let assistant = build_assistant(load_config(config_path)?, None)?;
    match provider {
        Some(id) => print_json(&assistant.list_models(id).await?),
        None => print_json(&assistant.list_models_all().await),
    }
}
