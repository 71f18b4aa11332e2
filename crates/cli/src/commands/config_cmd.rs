//! `sqlwright config`: validate and show the configuration.

use super::{CliResult, load_config};
use sqlwright_config::AppConfig;
use std::path::Path;

pub fn run(config_path: Option<&Path>, default: bool) -> CliResult {
    if default {
        print!("{}", AppConfig::default_toml());
        return Ok(());
    }

    let config = load_config(config_path)?;
    println!("{}", summary(&config));
    Ok(())
}

/// Human-readable overview. API keys are never printed.
fn summary(config: &AppConfig) -> String {
    let mut lines = vec![
        format!("Provider:     {}", config.default_provider),
        format!(
            "Model:        {}",
            config
                .model_for(&config.default_provider)
                .unwrap_or_else(|| "(provider not configured)".into())
        ),
        format!("Max tokens:   {}", config.default_max_tokens),
        format!("Temperature:  {}", config.default_temperature),
        format!("Timeout:      {}s", config.request_timeout_secs),
        format!("Dialect:      {}", config.default_dialect.display_name()),
        format!(
            "Window:       {}",
            config
                .budget
                .context_window
                .map_or_else(|| "by model".to_string(), |w| w.to_string())
        ),
    ];

    let mut ids: Vec<_> = config.providers.keys().collect();
    ids.sort();
    lines.push(format!("Providers:    {}", ids.len()));
    for id in ids {
        let provider = &config.providers[id];
        let key = if provider.api_key.is_some() { "key set" } else { "no key" };
        lines.push(format!(
            "  {id:<12} {:?}, {key}, model {}",
            provider.resolved_kind(id),
            provider.resolved_model(id)
        ));
    }
    lines.join("\n")
}
