//! sqlvec CLI - Command-line interface
//!
//! Usage:
//!   sqlvec init
//!   sqlvec add <text>... [--id <id>...] [--metadata <json>]
//!   sqlvec search <query> [-k N] [--scores]
//!   sqlvec ask <question> [-k N]
//!   sqlvec remove <id>...
//!   sqlvec drop

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlvec_core::{AppConfig, DistanceFunction, LoggingConfig, Metadata};
use sqlvec_store::{SqlVectorStore, VectorStore};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sqlvec")]
#[command(about = "Vector store over SQL databases with native VECTOR columns")]
#[command(version)]
struct Cli {
    /// TOML configuration file (environment variables still override it)
    #[arg(long, global = true, env = "SQLVEC_CONFIG")]
    config: Option<PathBuf>,

    /// Table holding the documents
    #[arg(long, global = true)]
    table: Option<String>,

    /// Namespace scoping inserts and searches
    #[arg(long, global = true)]
    namespace: Option<String>,

    /// cosine_distance, l2_distance, inner_product or negative_inner_product
    #[arg(long, global = true)]
    distance: Option<DistanceFunction>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the table and its vector index
    Init,
    /// Drop the table
    Drop,
    /// Embed and store texts
    Add {
        /// Texts to store
        #[arg(required = true)]
        texts: Vec<String>,
        /// Ids to replace, one per text (omit to insert with generated ids)
        #[arg(long = "id")]
        ids: Vec<i64>,
        /// JSON object stored as metadata for every text
        #[arg(long)]
        metadata: Option<String>,
    },
    /// Delete texts by id
    Remove {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Find the nearest texts to a query
    Search {
        query: String,
        #[arg(short, default_value_t = 4)]
        k: usize,
        /// Include distances in the output
        #[arg(long)]
        scores: bool,
    },
    /// Answer a question from the nearest texts
    Ask {
        question: String,
        #[arg(short, default_value_t = 4)]
        k: usize,
    },
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)?.with_env_override()?,
            None => AppConfig::from_env()?,
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    /// Command-line flags take precedence over file and environment
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(table) = &self.table {
            config.store.table = table.clone();
        }
        if let Some(namespace) = &self.namespace {
            config.store.namespace = Some(namespace.clone());
        }
        if let Some(distance) = self.distance {
            config.store.distance = distance;
        }
    }
}

fn init_tracing(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    init_tracing(&config.logging);

    tracing::debug!(
        table = %config.store.table,
        namespace = ?config.store.namespace,
        distance = %config.store.distance,
        "Configuration loaded"
    );

    let store = SqlVectorStore::connect(&config)
        .await
        .context("failed to initialise vector store")?;

    match cli.command {
        Commands::Init => {
            store.create_default_schema().await?;
            println!("Schema ready: {}", store.table());
        }
        Commands::Drop => {
            store.destroy_default_schema().await?;
            println!("Dropped: {}", store.table());
        }
        Commands::Add {
            texts,
            ids,
            metadata,
        } => {
            let metadata = metadata
                .map(|raw| serde_json::from_str::<Metadata>(&raw))
                .transpose()
                .context("--metadata must be a JSON object")?
                .map(|m| vec![m; texts.len()]);
            let ids = (!ids.is_empty()).then_some(ids);

            let stored = store
                .add_texts(&texts, ids.as_deref(), metadata.as_deref())
                .await?;
            for id in stored {
                println!("{id}");
            }
        }
        Commands::Remove { ids } => {
            let deleted = store.remove_texts(&ids).await?;
            println!("Deleted {deleted} row(s)");
        }
        Commands::Search { query, k, scores } => {
            if scores {
                for hit in store.similarity_search_with_score(&query, k).await? {
                    println!("{}", serde_json::to_string(&hit)?);
                }
            } else {
                for doc in store.similarity_search(&query, k).await? {
                    println!("{}", serde_json::to_string(&doc)?);
                }
            }
        }
        Commands::Ask { question, k } => {
            let response = store.ask(&question, k).await?;
            println!("{}", response.answer);
            tracing::debug!(context = %response.context, "Answer context");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_add_with_ids() {
        let cli = Cli::parse_from([
            "sqlvec", "add", "first", "second", "--id", "1", "--id", "2", "--distance",
            "l2_distance",
        ]);
        assert_eq!(cli.distance, Some(DistanceFunction::L2Distance));
        match cli.command {
            Commands::Add { texts, ids, .. } => {
                assert_eq!(texts, vec!["first", "second"]);
                assert_eq!(ids, vec![1, 2]);
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "sqlvec",
            "--table",
            "kb",
            "--namespace",
            "tenant",
            "search",
            "hello",
            "-k",
            "2",
        ]);
        let mut config = AppConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.store.table, "kb");
        assert_eq!(config.store.namespace.as_deref(), Some("tenant"));
        assert_eq!(config.store.distance, DistanceFunction::CosineDistance);
        assert!(matches!(cli.command, Commands::Search { k: 2, .. }));
    }
}
