//! CLI command definitions and handlers

use clap::Subcommand;
use std::sync::Arc;
use tracing::info;

use crate::core::client::InferenceClient;
use crate::core::config::ServiceConfig;
use crate::core::pipeline::{PipelineLoader, RemoteLoader};
use crate::core::validation::normalize_lang_code;
use crate::providers::ModelRegistry;

/// Commands for the NLP Analysis API
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP API server (default)
    Serve {
        /// Bind address (default from config: 0.0.0.0)
        #[arg(long)]
        host: Option<String>,

        /// Listen port (default from config: 8000)
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        /// Refuse to start when a model fails to load
        #[arg(long)]
        strict: bool,

        /// Skip loading models at startup
        #[arg(long)]
        no_preload: bool,
    },

    /// Print the effective configuration as YAML
    Config,

    /// Load the models through the configured backend and report
    Check {
        /// Translation pairs to load as well, e.g. `en:es`
        #[arg(long = "pair", value_parser = parse_pair)]
        pairs: Vec<(String, String)>,
    },
}

/// Parse `src:tgt` (or `src-tgt` for two-letter codes) into normalized codes
pub fn parse_pair(value: &str) -> Result<(String, String), String> {
    let (source, target) = value
        .split_once(':')
        .or_else(|| value.split_once('-'))
        .ok_or_else(|| format!("expected SRC:TGT, got '{}'", value))?;

    let source = normalize_lang_code(source, "source").map_err(|e| e.to_string())?;
    let target = normalize_lang_code(target, "target").map_err(|e| e.to_string())?;
    Ok((source, target))
}

/// Handle server command
pub async fn handle_serve(
    mut config: ServiceConfig,
    host: Option<String>,
    port: Option<u16>,
    strict: bool,
    no_preload: bool,
) -> anyhow::Result<()> {
    use crate::server::api::run_server;

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if strict {
        config.models.strict_startup = true;
    }
    if no_preload {
        config.models.preload = false;
    }

    let (host, port) = (config.server.host.clone(), config.server.port);
    info!("Starting HTTP server on {}:{}", host, port);
    println!("🚀 Server starting on http://{}:{}", host, port);
    println!("📄 OpenAPI document: http://{}:{}/openapi.json", host, port);
    println!("💓 Health check: http://{}:{}/health", host, port);

    run_server(config).await
}

/// Handle config command
pub fn handle_config(config: &ServiceConfig) -> anyhow::Result<()> {
    print!("{}", config.to_yaml()?);
    Ok(())
}

/// Handle check command
pub async fn handle_check(config: ServiceConfig, pairs: Vec<(String, String)>) -> anyhow::Result<()> {
    info!("Checking models against {}", config.inference.endpoint);

    let client = InferenceClient::new(config.inference.clone())?;
    let loader: Arc<dyn PipelineLoader> = Arc::new(RemoteLoader::new(client));
    let registry = ModelRegistry::from_settings(&config.models, loader);

    let report = registry.load_all(false).await?;
    let mut failed = report.failed.len();

    for status in registry.statuses().await {
        match (&status.active_model, status.loaded) {
            (Some(active), true) if *active != status.model => {
                println!("⚠️  {:<14} {} (fallback for {})", status.name, active, status.model)
            }
            (_, true) => println!("✅ {:<14} {}", status.name, status.model),
            (_, false) => println!("❌ {:<14} {}", status.name, status.model),
        }
    }

    for (source, target) in pairs {
        let model = registry.translation.model_for(&source, &target);
        match registry.translation.load(&source, &target).await {
            Ok(_) => println!("✅ {:<14} {}", format!("{}-{}", source, target), model),
            Err(e) => {
                failed += 1;
                println!("❌ {:<14} {} ({})", format!("{}-{}", source, target), model, e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} model(s) unavailable", failed);
    }

    println!("\n✅ All models available");
    Ok(())
}
