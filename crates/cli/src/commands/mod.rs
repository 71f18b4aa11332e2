//! Subcommand implementations and the plumbing they share.

pub mod config_cmd;
pub mod generate;
pub mod providers;

use serde::Serialize;
use sqlwright_assistant::SqlAssistant;
use sqlwright_config::AppConfig;
use sqlwright_context::StaticRetriever;
use sqlwright_core::GenerationRequest;
use sqlwright_core::dialect::keys;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Options shared by `generate` and `fix`.
#[derive(Debug, Default, clap::Args)]
pub struct RequestArgs {
    /// Provider id (defaults to `default_provider`)
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Model (defaults to the provider's default model)
    #[arg(short, long)]
    pub model: Option<String>,

    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Sampling temperature in [0, 1]
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Database flavor, e.g. postgres, mysql, sqlite
    #[arg(short, long)]
    pub dialect: Option<String>,

    /// File with schema text (DDL or a description) to include verbatim
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// JSON file with ranked schema, example, business-rule and performance candidates
    #[arg(long)]
    pub candidates: Option<PathBuf>,

    /// Connection id passed to retrieval
    #[arg(long)]
    pub connection: Option<String>,
}

impl RequestArgs {
    /// Copy the options onto `request`.
    pub fn apply(&self, mut request: GenerationRequest) -> CliResult<GenerationRequest> {
        request.provider = self.provider.clone();
        request.model = self.model.clone();
        request.max_tokens = self.max_tokens;
        request.temperature = self.temperature;

        if let Some(path) = &self.schema {
            request.schema = Some(read_file(path)?);
        }
        if let Some(dialect) = &self.dialect {
            request.context.insert(keys::CONNECTION_TYPE.into(), dialect.clone());
        }

        // A candidates file is only consulted for requests that name a connection
        let connection = match (&self.connection, &self.candidates) {
            (Some(id), _) => Some(id.clone()),
            (None, Some(_)) => Some("cli".to_string()),
            (None, None) => None,
        };
        if let Some(connection) = connection {
            request.context.insert(keys::CONNECTION_ID.into(), connection);
        }
        Ok(request)
    }
}

/// Load configuration from `path`, or from the default location.
///
/// Environment overrides apply either way.
pub fn load_config(path: Option<&Path>) -> CliResult<AppConfig> {
    let Some(path) = path else {
        return Ok(AppConfig::load()?);
    };
    let mut config = AppConfig::load_from(path)?;
    config.apply_env(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

pub fn build_assistant(config: AppConfig, candidates: Option<&Path>) -> CliResult<SqlAssistant> {
    let assistant = SqlAssistant::from_config(config)?;
    match candidates {
        Some(path) => {
            let retriever = StaticRetriever::from_json(&read_file(path)?)?;
            Ok(assistant.with_retriever(Arc::new(retriever)))
        }
        None => Ok(assistant),
    }
}

/// A token that fires on Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling");
            trigger.cancel();
        }
    });
    token
}

pub fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_file(path: &Path) -> CliResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()).into())
}
