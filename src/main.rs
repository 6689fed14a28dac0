//! Main entry point for the NLP Analysis API

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nlp_analysis_api::cli::commands::{self, Commands};
use nlp_analysis_api::ServiceConfig;

/// NLP Analysis API - sentiment, NER, translation, paraphrasing and summarization
#[derive(Parser, Debug)]
#[command(name = "nlp-analysis-api", version, about, long_about = None)]
struct Args {
    /// Configuration file (toml, yaml or json); defaults to NLP_CONFIG
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let default_filter = format!(
        "{}={},tower_http={}",
        env!("CARGO_CRATE_NAME"),
        default_level,
        default_level
    );

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServiceConfig::load(args.config.as_deref())?;

    // Execute command
    match args.command {
        Some(Commands::Serve {
            host,
            port,
            strict,
            no_preload,
        }) => {
            commands::handle_serve(config, host, port, strict, no_preload).await?;
        }
        Some(Commands::Config) => {
            commands::handle_config(&config)?;
        }
        Some(Commands::Check { pairs }) => {
            commands::handle_check(config, pairs).await?;
        }
        None => {
            let port = std::env::var("PORT").ok().and_then(|p| p.parse().ok());
            commands::handle_serve(config, None, port, false, false).await?;
        }
    }

    Ok(())
}
