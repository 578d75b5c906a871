//! `typeahead` command-line entrypoint.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use tokio_util::sync::CancellationToken;

use typeahead::config::SearchConfig;
use typeahead::embedding::{EmbeddingProvider, HashEmbedder, OpenAiConfig, OpenAiEmbeddingProvider};
use typeahead::sanitize::{ValueKind, default_sanitizer};
use typeahead::search::{ItemAccessors, SemanticSearchEngine};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser, Debug)]
#[command(name = "typeahead")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rank the lines of a file against a query
    Search {
        /// File with one item per line
        items_file: PathBuf,

        /// Query text (remaining arguments are joined with spaces)
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        query: Vec<String>,
    },

    /// Check a stylesheet value; prints it when accepted, `REJECTED` otherwise
    Sanitize {
        /// color, length, font, shadow, time or generic
        kind: ValueKind,

        #[arg(allow_hyphen_values = true)]
        value: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Commands::Search { items_file, query } => run_search(&items_file, &query.join(" ")).await,
        Commands::Sanitize { kind, value } => match default_sanitizer().sanitize(kind, &value) {
            Some(accepted) => {
                println!("{}", accepted);
                Ok(())
            }
            None => {
                println!("REJECTED");
                std::process::exit(1);
            }
        },
    }
}

async fn run_search(items_file: &Path, query: &str) -> anyhow::Result<()> {
    let contents = tokio::fs::read_to_string(items_file)
        .await
        .with_context(|| format!("failed to read items from {}", items_file.display()))?;
    let items: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();

    let config = SearchConfig::from_env()?;
    let provider: Arc<dyn EmbeddingProvider> = match OpenAiConfig::from_env() {
        Some(openai) => Arc::new(OpenAiEmbeddingProvider::new(openai)?),
        None => {
            tracing::warn!(
                "TYPEAHEAD_OPENAI_API_KEY not set, using the offline hash embedder"
            );
            Arc::new(HashEmbedder::default())
        }
    };

    tracing::info!(
        items = items.len(),
        provider = provider.name(),
        "Searching"
    );

    let engine = SemanticSearchEngine::new(provider, ItemAccessors::identity(), config)?;
    let outcome = engine
        .search(query, &items, &CancellationToken::new())
        .await?;

    if let Some(message) = outcome.status.message() {
        eprintln!("{}", message);
    }
    for result in &outcome.results {
        println!(
            "{:.4}\t{}\t{}",
            result.similarity, result.source, result.item
        );
    }
    Ok(())
}
