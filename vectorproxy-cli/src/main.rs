//! VectorProxy CLI - launches the embedding enrichment proxy

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use vectorproxy_core::config::ProxyConfig;
use vectorproxy_core::embeddings::EmbeddingProviderFactory;

/// Command-line flags override values loaded from files and the environment.
#[derive(Parser, Debug)]
#[command(name = "vectorproxy")]
#[command(about = "Bulk-ingest proxy that adds vector embeddings to documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base URL of the downstream document store
    #[arg(long)]
    url: Option<String>,

    /// Comma-separated path expressions of the fields to embed
    #[arg(long = "gjson-paths", visible_alias = "paths")]
    paths: Option<String>,

    /// Enrich but return the result instead of forwarding it
    #[arg(long)]
    dry_run: bool,

    /// Listen port
    #[arg(long)]
    port: Option<u16>,

    /// Embedding model identifier
    #[arg(long)]
    embedding_model: Option<String>,

    /// Embedding output dimensionality
    #[arg(long)]
    embeddings_dimension: Option<usize>,

    /// Maximum number of documents enriched concurrently
    #[arg(long)]
    parallel: Option<usize>,
}

impl Cli {
    fn apply(&self, config: &mut ProxyConfig) {
        if let Some(url) = &self.url {
            config.store_url = url.clone();
        }
        if let Some(paths) = &self.paths {
            config.set_paths_csv(paths);
        }
        if self.dry_run {
            config.dry_run = true;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(model) = &self.embedding_model {
            config.embeddings.model = model.clone();
        }
        if let Some(dimensions) = self.embeddings_dimension {
            config.embeddings.dimensions = dimensions;
        }
        if let Some(parallel) = self.parallel {
            config.max_concurrency = parallel;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = ProxyConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    if config.paths.is_empty() {
        tracing::warn!("no paths configured, documents will be forwarded without embeddings");
    }

    tracing::info!(
        version = vectorproxy_core::VERSION,
        provider = ?config.embeddings.provider,
        model = %config.embeddings.model,
        "vectorproxy starting"
    );

    let provider = EmbeddingProviderFactory::create(&config.embeddings).await?;
    vectorproxy_core::proxy::serve(config, provider).await?;

    Ok(())
}
