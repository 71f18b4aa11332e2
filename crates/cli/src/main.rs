//! sqlwright CLI, the main entry point.
//!
//! Commands:
//! - `generate`  Turn a natural-language request into SQL
//! - `fix`       Repair a query that failed with a database error
//! - `providers` List configured providers
//! - `health`    Probe one or every provider
//! - `models`    List the models the providers offer
//! - `config`    Validate and show the configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::RequestArgs;

#[derive(Parser)]
#[command(
    name = "sqlwright",
    about = "sqlwright: natural-language-to-SQL generation and SQL repair",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.sqlwright/config.toml
    #[arg(long, global = true, env = "SQLWRIGHT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate SQL from a natural-language request
    Generate {
        /// What the query should do
        prompt: String,

        #[command(flatten)]
        args: RequestArgs,
    },

    /// Fix a query that failed
    Fix {
        /// The failing query
        #[arg(short, long)]
        query: String,

        /// The error message the database returned
        #[arg(short, long)]
        error: String,

        /// Extra notes for the model
        #[arg(long)]
        notes: Option<String>,

        #[command(flatten)]
        args: RequestArgs,
    },

    /// List configured providers
    Providers,

    /// Check provider health
    Health {
        /// Only check this provider
        provider: Option<String>,
    },

    /// List models offered by the providers
    Models {
        /// Only list this provider's models
        provider: Option<String>,
    },

    /// Validate and show the configuration
    Config {
        /// Print a default config file instead
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Generate { prompt, args } => {
            commands::generate::generate(config_path, prompt, args).await?
        }
        Commands::Fix {
            query,
            error,
            notes,
            args,
        } => commands::generate::fix(config_path, query, error, notes, args).await?,
        Commands::Providers => commands::providers::list(config_path)?,
        Commands::Health { provider } => {
            commands::providers::health(config_path, provider.as_deref()).await?
        }
        Commands::Models { provider } => commands::providers::models(config_path, provider.as_deref()).await?,
        Commands::Config { default } => commands::config_cmd::run(config_path, default)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generate() {
        let cli = Cli::try_parse_from([
            "sqlwright",
            "generate",
            "top customers",
            "--provider",
            "anthropic",
            "--dialect",
            "postgres",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Generate { prompt, args } => {
                assert_eq!(prompt, "top customers");
                assert_eq!(args.provider.as_deref(), Some("anthropic"));
                assert_eq!(args.dialect.as_deref(), Some("postgres"));
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn parses_fix() {
        let cli = Cli::try_parse_from([
            "sqlwright",
            "fix",
            "--query",
            "SELEC 1",
            "--error",
            "syntax error",
            "--temperature",
            "0.3",
        ])
        .unwrap();

        match cli.command {
            Commands::Fix {
                query, error, args, ..
            } => {
                assert_eq!(query, "SELEC 1");
                assert_eq!(error, "syntax error");
                assert_eq!(args.temperature, Some(0.3));
            }
            _ => panic!("expected fix"),
        }
    }

    #[test]
    fn fix_requires_query_and_error() {
        assert!(Cli::try_parse_from(["sqlwright", "fix", "--query", "SELECT 1"]).is_err());
    }

    #[test]
    fn health_and_models_provider_is_optional() {
        let cli = Cli::try_parse_from(["sqlwright", "health"]).unwrap();
        assert!(matches!(cli.command, Commands::Health { provider: None }));

        let cli = Cli::try_parse_from(["sqlwright", "health", "ollama"]).unwrap();
        assert!(matches!(cli.command, Commands::Health { provider: Some(ref p) } if p == "ollama"));

        let cli = Cli::try_parse_from(["sqlwright", "models"]).unwrap();
        assert!(matches!(cli.command, Commands::Models { provider: None }));
    }
}
